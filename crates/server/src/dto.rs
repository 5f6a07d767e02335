//! Wire DTOs for the purchase-request endpoint and the mapping from the
//! agent's JSON completion into them.

use serde::Serialize;
use serde_json::Value;

use procura_core::domain::conversation::Transcript;
use procura_core::json::{extract_string, safe_parse};
use procura_core::telemetry::{TelemetryEntry, ToolStep};

/// The response body for one processed turn. Tool steps and the mapped
/// history always ship; the raw telemetry lines only appear when the caller
/// asked for debug output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReply {
    pub reflection: String,
    pub next_step: String,
    pub user_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Value>,
    pub session_id: String,
    pub history: Vec<ChatMessageDto>,
    pub tool_steps: Vec<ToolStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessageDto {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReply {
    pub error: String,
    pub correlation_id: String,
}

impl AgentReply {
    /// Maps the agent's completion into the reply. The completion should be
    /// the JSON object the system prompt demands; when it is not, the whole
    /// text lands in `reflection` so the caller still sees something.
    pub fn from_completion(
        completion: &str,
        session_id: String,
        history: Vec<ChatMessageDto>,
        tool_steps: Vec<ToolStep>,
        telemetry: Option<Vec<String>>,
    ) -> Self {
        match safe_parse(completion.trim()) {
            Some(parsed) => Self {
                reflection: extract_string(&parsed, "reflection", ""),
                next_step: extract_string(&parsed, "nextStep", ""),
                user_prompt: extract_string(&parsed, "userPrompt", ""),
                products: parsed.get("products").filter(|value| !value.is_null()).cloned(),
                session_id,
                history,
                tool_steps,
                telemetry,
            },
            None => Self {
                reflection: completion.to_string(),
                next_step: String::new(),
                user_prompt: String::new(),
                products: None,
                session_id,
                history,
                tool_steps,
                telemetry,
            },
        }
    }
}

pub fn map_history(transcript: &Transcript) -> Vec<ChatMessageDto> {
    transcript
        .messages()
        .iter()
        .map(|message| ChatMessageDto {
            role: message.role.label(),
            content: message.content.clone(),
        })
        .collect()
}

pub fn render_telemetry(entries: &[TelemetryEntry]) -> Vec<String> {
    entries.iter().map(ToString::to_string).collect()
}
