use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::recorder::PromptRunner;

pub mod check_compliance;
pub mod classify_intent;
pub mod extract_details;
pub mod justify_approval;
pub mod validate_product;

pub use check_compliance::CheckComplianceTool;
pub use classify_intent::ClassifyIntentTool;
pub use extract_details::ExtractDetailsTool;
pub use justify_approval::JustifyApprovalTool;
pub use validate_product::ValidateProductTool;

/// A model-backed procurement tool.
///
/// Tools degrade to structured error JSON instead of failing the turn: a
/// wrong-intent election or an unparsable model reply produces a payload the
/// model can read, reason about, and recover from.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The plugin segment of the qualified name.
    fn plugin(&self) -> &'static str;

    /// The function segment; this is the name the model elects and the
    /// label clients see on tool steps.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema of the tool's arguments, declared to the model.
    fn parameters(&self) -> Value;

    async fn execute(&self, arguments: Value, prompts: &PromptRunner<'_>) -> Result<Value>;

    fn qualified_name(&self) -> String {
        format!("{}.{}", self.plugin(), self.name())
    }
}

/// What the chat call declares about one tool.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Registered tools keyed by function name; iteration order is stable so
/// the declaration list sent to the model is deterministic.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|tool| tool.as_ref())
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// The self-correction payload returned when the model invokes a tool for
/// an intent it does not serve. Valid JSON keeps the workflow alive; the
/// message and suggestion steer the model back on course.
pub(crate) fn wrong_tool_json(message: &str, suggestion: &str, intent: &str) -> Value {
    json!({
        "status": "error",
        "error": "wrong_tool",
        "message": message,
        "suggestion": suggestion,
        "intent": intent,
        "confidence": 0.0,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::prompts::PromptLibrary;
    use crate::tools::{ClassifyIntentTool, ToolRegistry, ValidateProductTool};

    #[test]
    fn registry_resolves_tools_by_function_name() {
        let prompts = Arc::new(PromptLibrary::new());
        let mut registry = ToolRegistry::new();
        registry.register(ClassifyIntentTool::new(prompts.clone()));
        registry.register(ValidateProductTool::new(prompts));

        assert_eq!(registry.len(), 2);
        let tool = registry.get("ClassifyIntent").expect("tool registered");
        assert_eq!(tool.qualified_name(), "ClassifyIntentTool.ClassifyIntent");
        assert!(registry.get("SubmitToErp").is_none());
    }

    #[test]
    fn descriptors_expose_name_and_schema() {
        let prompts = Arc::new(PromptLibrary::new());
        let mut registry = ToolRegistry::new();
        registry.register(ClassifyIntentTool::new(prompts));

        let descriptors = registry.descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "ClassifyIntent");
        assert_eq!(descriptors[0].parameters["type"], "object");
    }
}
