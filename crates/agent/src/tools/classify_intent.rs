use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use procura_core::json::{extract_f64, extract_string, safe_parse};

use super::Tool;
use crate::prompts::PromptLibrary;
use crate::recorder::PromptRunner;

/// Classification is a deliberately narrow step: one intent and a
/// confidence score, nothing else. Entity extraction happens later in
/// `ExtractDetails`, where getting it wrong cannot derail routing.
pub struct ClassifyIntentTool {
    prompts: Arc<PromptLibrary>,
}

impl ClassifyIntentTool {
    pub fn new(prompts: Arc<PromptLibrary>) -> Self {
        Self { prompts }
    }
}

#[async_trait]
impl Tool for ClassifyIntentTool {
    fn plugin(&self) -> &'static str {
        "ClassifyIntentTool"
    }

    fn name(&self) -> &'static str {
        "ClassifyIntent"
    }

    fn description(&self) -> &'static str {
        "Determines the primary intent and a confidence score for any user request made to the purchasing system. Returns one of: RequestPurchase, ShowSupportedProducts, ShowSpecs, ShowComplianceRules, Other."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "userRequest": {
                    "type": "string",
                    "description": "The initial, unprocessed text query from the user that needs to be classified.",
                },
            },
            "required": ["userRequest"],
        })
    }

    async fn execute(&self, arguments: Value, prompts: &PromptRunner<'_>) -> Result<Value> {
        let user_request = extract_string(&arguments, "userRequest", "");
        debug!(tool = self.name(), "classifying user intent");

        let prompt = self.prompts.classify_intent(&user_request);
        let raw = match prompts.run(&prompt).await {
            Ok(raw) => raw,
            Err(error) => {
                return Ok(json!({ "error": format!("Failed to reach the model: {error}") }));
            }
        };

        let Some(parsed) = safe_parse(raw.trim()) else {
            return Ok(json!({ "error": "Failed to parse model response as JSON" }));
        };

        Ok(json!({
            "intent": extract_string(&parsed, "intent", "Other"),
            "confidence": extract_f64(&parsed, "confidence", 0.0),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use procura_core::telemetry::TelemetryCollector;

    use crate::prompts::PromptLibrary;
    use crate::recorder::PromptRunner;
    use crate::testing::CannedLlm;
    use crate::tools::{ClassifyIntentTool, Tool};

    fn tool() -> ClassifyIntentTool {
        ClassifyIntentTool::new(Arc::new(PromptLibrary::new()))
    }

    #[tokio::test]
    async fn returns_intent_and_confidence_from_model_reply() {
        let llm = CannedLlm::new().push_reply(r#"{"intent":"RequestPurchase","confidence":0.97}"#);
        let collector = TelemetryCollector::new();
        let runner = PromptRunner::new(&llm, &collector);

        let result = tool()
            .execute(json!({ "userRequest": "order a new laptop" }), &runner)
            .await
            .expect("tool runs");

        assert_eq!(result, json!({ "intent": "RequestPurchase", "confidence": 0.97 }));
    }

    #[tokio::test]
    async fn unparsable_model_reply_degrades_to_error_json() {
        let llm = CannedLlm::new().push_reply("the user probably wants a laptop");
        let collector = TelemetryCollector::new();
        let runner = PromptRunner::new(&llm, &collector);

        let result = tool()
            .execute(json!({ "userRequest": "laptop please" }), &runner)
            .await
            .expect("tool runs");

        assert!(result.get("error").is_some());
        assert!(result.get("intent").is_none());
    }

    #[tokio::test]
    async fn model_failure_degrades_to_error_json() {
        let llm = CannedLlm::new();
        let collector = TelemetryCollector::new();
        let runner = PromptRunner::new(&llm, &collector);

        let result =
            tool().execute(json!({ "userRequest": "laptop" }), &runner).await.expect("tool runs");

        let message = result["error"].as_str().expect("error message");
        assert!(message.starts_with("Failed to reach the model"));
    }

    #[tokio::test]
    async fn missing_confidence_defaults_to_zero() {
        let llm = CannedLlm::new().push_reply(r#"{"intent":"Other"}"#);
        let collector = TelemetryCollector::new();
        let runner = PromptRunner::new(&llm, &collector);

        let result =
            tool().execute(json!({ "userRequest": "hi" }), &runner).await.expect("tool runs");

        assert_eq!(result, json!({ "intent": "Other", "confidence": 0.0 }));
    }
}
