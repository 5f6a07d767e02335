use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use procura_core::json::{extract_bool, extract_decimal, extract_string, extract_string_array, safe_parse};

use super::Tool;
use crate::prompts::PromptLibrary;
use crate::recorder::PromptRunner;

const DENIED_FALLBACK_MESSAGE: &str =
    "Your justification needs more specific details to warrant the premium cost.";

const DENIED_SUGGESTIONS: [&str; 5] = [
    "Provide specific technical requirements that require premium hardware",
    "Explain current performance bottlenecks affecting your productivity",
    "Detail how this hardware directly impacts business outcomes",
    "Quantify time savings or efficiency gains from the upgrade",
    "Specify software requirements that demand premium specifications",
];

/// Evaluates justifications for hardware purchases that exceed the standard
/// cost limit. Denials always carry actionable suggestions, even when the
/// model forgot to provide any.
pub struct JustifyApprovalTool {
    prompts: Arc<PromptLibrary>,
}

impl JustifyApprovalTool {
    pub fn new(prompts: Arc<PromptLibrary>) -> Self {
        Self { prompts }
    }
}

#[async_trait]
impl Tool for JustifyApprovalTool {
    fn plugin(&self) -> &'static str {
        "JustifyApprovalTool"
    }

    fn name(&self) -> &'static str {
        "JustifyApproval"
    }

    fn description(&self) -> &'static str {
        "Evaluates the justification for hardware purchases that exceed the $1000 cost limit."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "justification": {
                    "type": "string",
                    "description": "The justification provided by the user for exceeding the cost limit.",
                },
                "item": {
                    "type": "string",
                    "description": "The requested hardware item that exceeds the limit.",
                },
                "cost": {
                    "type": "number",
                    "description": "The cost that exceeds the $1000 limit.",
                },
            },
            "required": ["justification", "item", "cost"],
        })
    }

    async fn execute(&self, arguments: Value, prompts: &PromptRunner<'_>) -> Result<Value> {
        let justification = extract_string(&arguments, "justification", "");
        let item = extract_string(&arguments, "item", "");
        let cost = extract_decimal(&arguments, "cost", Decimal::ZERO);

        let prompt = self.prompts.justify_approval(&justification, &item, &format!("${cost}"));

        let raw = match prompts.run(&prompt).await {
            Ok(raw) => raw,
            Err(error) => {
                return Ok(json!({
                    "justificationApproved": false,
                    "reason": format!("Justification evaluation failed: {error}"),
                    "error": "evaluation_error",
                }));
            }
        };

        let parsed = match safe_parse(raw.trim()) {
            Some(parsed)
                if parsed.get("approved").is_some() && parsed.get("reason").is_some() =>
            {
                parsed
            }
            _ => {
                return Ok(json!({
                    "justificationApproved": false,
                    "reason": "Unable to process justification properly",
                    "message": "Please provide a clearer justification for this hardware purchase.",
                    "suggestions": DENIED_SUGGESTIONS,
                    "error": "json_parse_error",
                }));
            }
        };

        let approved = extract_bool(&parsed, "approved", false);
        let reason = extract_string(&parsed, "reason", "");
        let message = parsed.get("message").and_then(Value::as_str).map(str::to_string);
        let suggestions = extract_string_array(&parsed, "suggestions");

        if !approved && suggestions.is_empty() {
            return Ok(json!({
                "justificationApproved": false,
                "reason": reason,
                "message": DENIED_FALLBACK_MESSAGE,
                "suggestions": DENIED_SUGGESTIONS,
            }));
        }

        Ok(json!({
            "justificationApproved": approved,
            "reason": reason,
            "message": message,
            "suggestions": (!suggestions.is_empty()).then_some(suggestions),
        }))
    }
}
