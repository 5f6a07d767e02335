use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use procura_core::json::{extract_bool, extract_f64, extract_string, safe_parse};

use super::{wrong_tool_json, Tool};
use crate::prompts::PromptLibrary;
use crate::recorder::PromptRunner;

/// Gatekeeper for the purchase workflow: confirms the requested item is a
/// workplace computer before any details are extracted. The metadata stays
/// generic; the "what counts as valid" lives entirely in the prompt.
pub struct ValidateProductTool {
    prompts: Arc<PromptLibrary>,
}

impl ValidateProductTool {
    pub fn new(prompts: Arc<PromptLibrary>) -> Self {
        Self { prompts }
    }
}

#[async_trait]
impl Tool for ValidateProductTool {
    fn plugin(&self) -> &'static str {
        "ValidateProductTool"
    }

    fn name(&self) -> &'static str {
        "ValidateProduct"
    }

    fn description(&self) -> &'static str {
        "Confirms the requested product aligns with the agent's allowed categories and flags non-qualifying items. Used to confirm an item is in scope before proceeding."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "userRequest": {
                    "type": "string",
                    "description": "The product the user is requesting and requires validation.",
                },
                "intent": {
                    "type": "string",
                    "description": "The pre-determined user intent, used to verify this tool is being called for the correct purpose (e.g., 'RequestPurchase').",
                },
            },
            "required": ["userRequest", "intent"],
        })
    }

    async fn execute(&self, arguments: Value, prompts: &PromptRunner<'_>) -> Result<Value> {
        let user_request = extract_string(&arguments, "userRequest", "");
        let intent = extract_string(&arguments, "intent", "");

        if intent != "RequestPurchase" {
            warn!(
                tool = self.name(),
                intent = %intent,
                "validation invoked with a non-purchase intent"
            );
            return Ok(wrong_tool_json(
                "This tool validates products for purchase requests only.",
                "Use ClassifyIntent to determine the correct intent first, or use a tool appropriate for the current intent.",
                &intent,
            ));
        }

        let prompt = self.prompts.validate_product(&user_request);
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
            "isWorkplaceComputer": extract_bool(&parsed, "is_workplace_computer", false),
            "confidence": extract_f64(&parsed, "confidence", 0.0),
            "validationMethod": extract_string(&parsed, "validation_method", "model_judgment"),
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
    use crate::tools::{Tool, ValidateProductTool};

    fn tool() -> ValidateProductTool {
        ValidateProductTool::new(Arc::new(PromptLibrary::new()))
    }

    #[tokio::test]
    async fn qualifying_item_passes_validation() {
        let llm = CannedLlm::new().push_reply(
            r#"{"is_workplace_computer":true,"confidence":0.93,"validation_method":"category match"}"#,
        );
        let collector = TelemetryCollector::new();
        let runner = PromptRunner::new(&llm, &collector);

        let result = tool()
            .execute(
                json!({ "userRequest": "a ThinkPad T14s", "intent": "RequestPurchase" }),
                &runner,
            )
            .await
            .expect("tool runs");

        assert_eq!(
            result,
            json!({
                "isWorkplaceComputer": true,
                "confidence": 0.93,
                "validationMethod": "category match",
            })
        );
    }

    #[tokio::test]
    async fn wrong_intent_returns_self_correction_payload_without_model_call() {
        let llm = CannedLlm::new();
        let collector = TelemetryCollector::new();
        let runner = PromptRunner::new(&llm, &collector);

        let result = tool()
            .execute(json!({ "userRequest": "a laptop", "intent": "ShowSpecs" }), &runner)
            .await
            .expect("tool runs");

        assert_eq!(result["error"], "wrong_tool");
        assert_eq!(result["intent"], "ShowSpecs");
        assert!(collector.is_empty(), "guard must short-circuit before any prompt runs");
    }

    #[tokio::test]
    async fn unparsable_model_reply_degrades_to_error_json() {
        let llm = CannedLlm::new().push_reply("yes that is a laptop");
        let collector = TelemetryCollector::new();
        let runner = PromptRunner::new(&llm, &collector);

        let result = tool()
            .execute(
                json!({ "userRequest": "a laptop", "intent": "RequestPurchase" }),
                &runner,
            )
            .await
            .expect("tool runs");

        assert!(result.get("error").is_some());
    }
}
