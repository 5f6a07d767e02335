//! Telemetry recording around in-tool prompt executions.
//!
//! Every tool runs its own prompt through the model. The invocation layer
//! records that inner run as an anonymous call (the well-known prefix plus
//! a generated suffix) with its own result entry; the step reducer later
//! collapses it into the tool's step.

use serde_json::json;
use uuid::Uuid;

use procura_core::json::looks_like_json;
use procura_core::telemetry::{TelemetryCollector, TelemetryEntry, NESTED_CALL_PREFIX};

use crate::llm::{LlmClient, LlmError};

const PARAM_PREVIEW_CHARS: usize = 120;

/// Per-request facade handed to tools for prompt execution.
pub struct PromptRunner<'a> {
    llm: &'a dyn LlmClient,
    collector: &'a TelemetryCollector,
}

impl<'a> PromptRunner<'a> {
    pub fn new(llm: &'a dyn LlmClient, collector: &'a TelemetryCollector) -> Self {
        Self { llm, collector }
    }

    /// Executes a prompt, recording the anonymous call entry before and the
    /// JSON result entry after (when the reply is JSON-shaped).
    pub async fn run(&self, prompt: &str) -> Result<String, LlmError> {
        let label = format!("{NESTED_CALL_PREFIX}{}", Uuid::new_v4().simple());
        let payload = json!({
            "toolName": label,
            "parameters": { "prompt": truncate(prompt, PARAM_PREVIEW_CHARS) },
        })
        .to_string();
        self.collector.add(TelemetryEntry::ToolCallStarted { payload });

        let reply = self.llm.prompt(prompt).await?;
        if looks_like_json(&reply) {
            self.collector.add(TelemetryEntry::ToolJsonResult {
                tool_label: label,
                json: reply.trim().to_string(),
            });
        }
        Ok(reply)
    }
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use procura_core::telemetry::{reduce, TelemetryCollector, TelemetryEntry};

    use super::{truncate, PromptRunner};
    use crate::testing::CannedLlm;

    #[tokio::test]
    async fn run_records_anonymous_call_and_json_result() {
        let llm = CannedLlm::new().push_reply(r#"{"intent":"Other","confidence":0.4}"#);
        let collector = TelemetryCollector::new();
        let runner = PromptRunner::new(&llm, &collector);

        let reply = runner.run("classify this").await.expect("prompt runs");
        assert_eq!(reply, r#"{"intent":"Other","confidence":0.4}"#);

        let entries = collector.snapshot();
        assert_eq!(entries.len(), 2);
        let TelemetryEntry::ToolCallStarted { payload } = &entries[0] else {
            panic!("expected a call entry first");
        };
        assert!(payload.contains("InvokePromptAsync_"));
        let TelemetryEntry::ToolJsonResult { tool_label, json } = &entries[1] else {
            panic!("expected a json result entry second");
        };
        assert!(tool_label.starts_with("InvokePromptAsync_"));
        assert_eq!(json, r#"{"intent":"Other","confidence":0.4}"#);
    }

    #[tokio::test]
    async fn non_json_reply_records_no_result_entry() {
        let llm = CannedLlm::new().push_reply("plain prose answer");
        let collector = TelemetryCollector::new();
        let runner = PromptRunner::new(&llm, &collector);

        runner.run("narrate").await.expect("prompt runs");
        assert_eq!(collector.len(), 1);
    }

    #[tokio::test]
    async fn anonymous_entries_alone_never_become_steps() {
        let llm = CannedLlm::new().push_reply(r#"{"leaked":true}"#);
        let collector = TelemetryCollector::new();
        let runner = PromptRunner::new(&llm, &collector);

        runner.run("orphan").await.expect("prompt runs");
        assert!(reduce(&collector.snapshot()).is_empty());
    }

    #[test]
    fn truncate_appends_ellipsis_only_when_needed() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer prompt body", 8), "a longer...");
    }
}
