use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use procura_core::domain::product::Product;
use procura_core::json::{extract_f64, extract_i64, extract_string, extract_string_array, safe_parse};
use procura_db::ProductRepository;

use super::{wrong_tool_json, Tool};
use crate::prompts::PromptLibrary;
use crate::recorder::PromptRunner;

/// Extracts structured order details (SKUs, quantity, department) from a
/// validated purchase request, then enriches the result from the catalog:
/// matched SKUs become full listing rows, and a not-found request gets the
/// complete summary listing so the user can pick.
pub struct ExtractDetailsTool {
    prompts: Arc<PromptLibrary>,
    catalog: Arc<dyn ProductRepository>,
}

impl ExtractDetailsTool {
    pub fn new(prompts: Arc<PromptLibrary>, catalog: Arc<dyn ProductRepository>) -> Self {
        Self { prompts, catalog }
    }
}

#[async_trait]
impl Tool for ExtractDetailsTool {
    fn plugin(&self) -> &'static str {
        "ExtractDetailsTool"
    }

    fn name(&self) -> &'static str {
        "ExtractDetails"
    }

    fn description(&self) -> &'static str {
        "Extracts structured order details - model, quantity, department, confidence and matching SKUs - from a user's purchase request. Returns a JSON object matching the extraction schema."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "userRequest": {
                    "type": "string",
                    "description": "Natural language text describing what the user wants to purchase.",
                },
                "intent": {
                    "type": "string",
                    "description": "The user intent. This tool should only be used for 'RequestPurchase' intents.",
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
                "detail extraction invoked with a non-purchase intent"
            );
            return Ok(wrong_tool_json(
                "This tool extracts order details for purchase requests only.",
                "Use a tool appropriate for the current intent.",
                &intent,
            ));
        }

        let listing = match self.catalog.list_summaries().await {
            Ok(summaries) => {
                let mut listing = String::new();
                for summary in &summaries {
                    let _ = writeln!(listing, "- {}: {}", summary.sku, summary.name);
                }
                listing
            }
            Err(error) => {
                return Ok(json!({ "error": format!("catalog lookup failed: {error}") }));
            }
        };

        let prompt = self.prompts.extract_details(&user_request, listing.trim_end());
        let raw = match prompts.run(&prompt).await {
            Ok(raw) => raw,
            Err(error) => {
                return Ok(json!({ "error": format!("Failed to reach the model: {error}") }));
            }
        };

        let Some(parsed) = safe_parse(raw.trim()) else {
            return Ok(json!({ "error": "Failed to parse model response as JSON" }));
        };

        let status = extract_string(&parsed, "status", "not_found");
        let skus = extract_string_array(&parsed, "sku");
        let quantity = extract_i64(&parsed, "quantity", 1);
        let confidence = extract_f64(&parsed, "confidence", 0.0);
        let department = {
            let department = extract_string(&parsed, "department", "");
            (!department.is_empty() && department != "null").then_some(department)
        };

        let products = if !skus.is_empty() {
            match self.catalog.find_by_skus(&skus).await {
                Ok(products) => products.iter().map(Product::summary).collect(),
                Err(error) => {
                    return Ok(json!({ "error": format!("catalog lookup failed: {error}") }));
                }
            }
        } else if status == "not_found" {
            match self.catalog.list_summaries().await {
                Ok(summaries) => summaries,
                Err(error) => {
                    return Ok(json!({ "error": format!("catalog lookup failed: {error}") }));
                }
            }
        } else {
            Vec::new()
        };

        Ok(json!({
            "status": status,
            "sku": skus,
            "quantity": quantity,
            "department": department,
            "confidence": confidence,
            "products": products,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use procura_core::telemetry::TelemetryCollector;
    use procura_db::InMemoryProductRepository;

    use crate::prompts::PromptLibrary;
    use crate::recorder::PromptRunner;
    use crate::testing::CannedLlm;
    use crate::tools::{ExtractDetailsTool, Tool};

    fn tool() -> ExtractDetailsTool {
        ExtractDetailsTool::new(
            Arc::new(PromptLibrary::new()),
            Arc::new(InMemoryProductRepository::with_default_catalog()),
        )
    }

    #[tokio::test]
    async fn matched_skus_are_enriched_from_the_catalog() {
        let llm = CannedLlm::new().push_reply(
            r#"{"status":"matched","sku":["DELL-LAT5440"],"quantity":2,"department":"QA","confidence":0.9}"#,
        );
        let collector = TelemetryCollector::new();
        let runner = PromptRunner::new(&llm, &collector);

        let result = tool()
            .execute(
                json!({ "userRequest": "two Dell Latitude 5440s for QA", "intent": "RequestPurchase" }),
                &runner,
            )
            .await
            .expect("tool runs");

        assert_eq!(result["status"], "matched");
        assert_eq!(result["quantity"], 2);
        assert_eq!(result["department"], "QA");
        assert_eq!(result["products"].as_array().expect("products array").len(), 1);
        assert_eq!(result["products"][0]["sku"], "DELL-LAT5440");
    }

    #[tokio::test]
    async fn not_found_returns_the_full_listing() {
        let llm = CannedLlm::new().push_reply(
            r#"{"status":"not_found","sku":[],"quantity":1,"department":null,"confidence":0.3}"#,
        );
        let collector = TelemetryCollector::new();
        let runner = PromptRunner::new(&llm, &collector);

        let result = tool()
            .execute(
                json!({ "userRequest": "a gaming rig", "intent": "RequestPurchase" }),
                &runner,
            )
            .await
            .expect("tool runs");

        assert_eq!(result["status"], "not_found");
        assert_eq!(result["department"], json!(null));
        assert_eq!(result["products"].as_array().expect("products array").len(), 11);
    }

    #[tokio::test]
    async fn wrong_intent_short_circuits_before_catalog_and_model() {
        let llm = CannedLlm::new();
        let collector = TelemetryCollector::new();
        let runner = PromptRunner::new(&llm, &collector);

        let result = tool()
            .execute(json!({ "userRequest": "anything", "intent": "Other" }), &runner)
            .await
            .expect("tool runs");

        assert_eq!(result["error"], "wrong_tool");
        assert!(collector.is_empty());
    }

    #[tokio::test]
    async fn ambiguous_match_returns_skus_without_full_listing() {
        let llm = CannedLlm::new().push_reply(
            r#"{"status":"ambiguous","sku":["MBP-16-M3","MBP-14-M3"],"quantity":1,"confidence":0.6}"#,
        );
        let collector = TelemetryCollector::new();
        let runner = PromptRunner::new(&llm, &collector);

        let result = tool()
            .execute(
                json!({ "userRequest": "a macbook pro", "intent": "RequestPurchase" }),
                &runner,
            )
            .await
            .expect("tool runs");

        assert_eq!(result["status"], "ambiguous");
        assert_eq!(result["products"].as_array().expect("products array").len(), 2);
    }
}
