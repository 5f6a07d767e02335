use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

use procura_core::config::{LlmConfig, LlmProvider};
use procura_core::domain::conversation::{ChatMessage, ChatRole, Transcript};

use crate::recorder::truncate;
use crate::tools::ToolDescriptor;

/// What the model did with one completion request: elected a tool, or
/// produced narrative text.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelTurn {
    ToolCall { id: String, name: String, arguments: Value },
    Message(String),
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm client configuration invalid: {0}")]
    Configuration(String),
    #[error("llm transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("llm api returned status {status}: {detail}")]
    Api { status: u16, detail: String },
    #[error("llm response had unexpected shape: {0}")]
    Protocol(String),
}

/// The hosted-model seam. `chat` runs the orchestrated completion that may
/// elect a tool; `prompt` is the direct prompt execution tools use
/// internally.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(
        &self,
        transcript: &Transcript,
        tools: &[ToolDescriptor],
    ) -> Result<ModelTurn, LlmError>;

    async fn prompt(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Client for any endpoint speaking the OpenAI chat-completions protocol
/// (hosted OpenAI deployments and local ollama both do).
pub struct OpenAiChatClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
    max_retries: u32,
}

impl OpenAiChatClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|error| {
                LlmError::Configuration(format!("failed to construct http client: {error}"))
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(config.provider).to_string());

        Ok(Self {
            http,
            endpoint: chat_completions_endpoint(&base_url),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    async fn execute(&self, body: &Value) -> Result<Value, LlmError> {
        let mut attempt = 0u32;
        loop {
            let mut request = self.http.post(&self.endpoint).json(body);
            if let Some(api_key) = &self.api_key {
                request = request.bearer_auth(api_key.expose_secret());
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    return response.json().await.map_err(LlmError::Transport);
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let detail = truncate(&response.text().await.unwrap_or_default(), 200);
                    if !retryable_status(status) || attempt >= self.max_retries {
                        return Err(LlmError::Api { status, detail });
                    }
                    warn!(
                        event_name = "llm.request.retry",
                        status,
                        attempt,
                        "model endpoint returned a retryable status"
                    );
                }
                Err(error) => {
                    if attempt >= self.max_retries {
                        return Err(LlmError::Transport(error));
                    }
                    warn!(
                        event_name = "llm.request.retry",
                        attempt,
                        error = %error,
                        "model endpoint transport error"
                    );
                }
            }

            tokio::time::sleep(backoff_delay(attempt)).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiChatClient {
    async fn chat(
        &self,
        transcript: &Transcript,
        tools: &[ToolDescriptor],
    ) -> Result<ModelTurn, LlmError> {
        let body = request_body(&self.model, transcript, tools);
        let response = self.execute(&body).await?;
        parse_model_turn(&response)
    }

    async fn prompt(&self, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.0,
        });
        let response = self.execute(&body).await?;
        match parse_model_turn(&response)? {
            ModelTurn::Message(text) => Ok(text),
            ModelTurn::ToolCall { name, .. } => Err(LlmError::Protocol(format!(
                "expected a text completion, got a tool call for `{name}`"
            ))),
        }
    }
}

fn default_base_url(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAi => "https://api.openai.com/v1",
        LlmProvider::Ollama => "http://localhost:11434/v1",
    }
}

fn chat_completions_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(250u64.saturating_mul(1u64 << attempt.min(6)))
}

fn request_body(model: &str, transcript: &Transcript, tools: &[ToolDescriptor]) -> Value {
    let messages: Vec<Value> = transcript.messages().iter().map(wire_message).collect();
    let mut body = json!({
        "model": model,
        "messages": messages,
        "temperature": 0.0,
    });
    if !tools.is_empty() {
        body["tools"] = Value::Array(tools.iter().map(tool_declaration).collect());
    }
    body
}

fn wire_message(message: &ChatMessage) -> Value {
    match (message.role, &message.tool_call_id) {
        (ChatRole::Assistant, Some(call_id)) => json!({
            "role": "assistant",
            "content": Value::Null,
            "tool_calls": [{
                "id": call_id,
                "type": "function",
                "function": {
                    "name": message.name.clone().unwrap_or_default(),
                    "arguments": message.content,
                },
            }],
        }),
        (ChatRole::Tool, Some(call_id)) => json!({
            "role": "tool",
            "tool_call_id": call_id,
            "content": message.content,
        }),
        _ => json!({ "role": message.role.label(), "content": message.content }),
    }
}

fn tool_declaration(descriptor: &ToolDescriptor) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": descriptor.name,
            "description": descriptor.description,
            "parameters": descriptor.parameters,
        },
    })
}

fn parse_model_turn(response: &Value) -> Result<ModelTurn, LlmError> {
    let message = response
        .pointer("/choices/0/message")
        .ok_or_else(|| LlmError::Protocol("response had no choices".to_string()))?;

    if let Some(call) = message.pointer("/tool_calls/0") {
        let id = call.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
        let name = call
            .pointer("/function/name")
            .and_then(Value::as_str)
            .ok_or_else(|| LlmError::Protocol("tool call had no function name".to_string()))?
            .to_string();
        let raw_arguments =
            call.pointer("/function/arguments").and_then(Value::as_str).unwrap_or("{}");
        let arguments = serde_json::from_str(raw_arguments)
            .unwrap_or_else(|_| json!({ "raw": raw_arguments }));
        return Ok(ModelTurn::ToolCall { id, name, arguments });
    }

    let content = message.get("content").and_then(Value::as_str).unwrap_or_default();
    Ok(ModelTurn::Message(content.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use procura_core::domain::conversation::{ChatMessage, Transcript};

    use super::{
        chat_completions_endpoint, parse_model_turn, request_body, wire_message, ModelTurn,
    };
    use crate::tools::ToolDescriptor;

    fn descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "ClassifyIntent".to_string(),
            description: "classify".to_string(),
            parameters: json!({ "type": "object" }),
        }
    }

    #[test]
    fn plain_messages_map_to_role_and_content() {
        let wire = wire_message(&ChatMessage::user("need a laptop"));
        assert_eq!(wire, json!({ "role": "user", "content": "need a laptop" }));
    }

    #[test]
    fn tool_request_maps_to_assistant_tool_calls() {
        let wire = wire_message(&ChatMessage::tool_request("call-1", "ClassifyIntent", r#"{"a":1}"#));
        assert_eq!(wire["role"], "assistant");
        assert_eq!(wire["tool_calls"][0]["id"], "call-1");
        assert_eq!(wire["tool_calls"][0]["function"]["name"], "ClassifyIntent");
        assert_eq!(wire["tool_calls"][0]["function"]["arguments"], r#"{"a":1}"#);
    }

    #[test]
    fn tool_result_maps_to_tool_role() {
        let wire = wire_message(&ChatMessage::tool_result("call-1", "ClassifyIntent", r#"{"b":2}"#));
        assert_eq!(wire, json!({
            "role": "tool",
            "tool_call_id": "call-1",
            "content": r#"{"b":2}"#,
        }));
    }

    #[test]
    fn request_body_includes_tools_only_when_present() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::user("hello"));

        let bare = request_body("llama3.1", &transcript, &[]);
        assert!(bare.get("tools").is_none());
        assert_eq!(bare["model"], "llama3.1");

        let with_tools = request_body("llama3.1", &transcript, &[descriptor()]);
        assert_eq!(with_tools["tools"][0]["function"]["name"], "ClassifyIntent");
        assert_eq!(with_tools["tools"][0]["type"], "function");
    }

    #[test]
    fn completion_with_tool_call_parses_to_tool_turn() {
        let response = json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "id": "call-9",
                        "type": "function",
                        "function": {
                            "name": "ExtractDetails",
                            "arguments": r#"{"userRequest":"two thinkpads"}"#,
                        },
                    }],
                },
            }],
        });

        let turn = parse_model_turn(&response).expect("parses");
        assert_eq!(
            turn,
            ModelTurn::ToolCall {
                id: "call-9".to_string(),
                name: "ExtractDetails".to_string(),
                arguments: json!({ "userRequest": "two thinkpads" }),
            }
        );
    }

    #[test]
    fn completion_with_content_parses_to_message_turn() {
        let response = json!({
            "choices": [{ "message": { "content": "all done" } }],
        });

        assert_eq!(
            parse_model_turn(&response).expect("parses"),
            ModelTurn::Message("all done".to_string())
        );
    }

    #[test]
    fn unparsable_arguments_are_wrapped_rather_than_dropped() {
        let response = json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "id": "call-1",
                        "function": { "name": "CheckCompliance", "arguments": "not json" },
                    }],
                },
            }],
        });

        let turn = parse_model_turn(&response).expect("parses");
        let ModelTurn::ToolCall { arguments, .. } = turn else {
            panic!("expected tool call");
        };
        assert_eq!(arguments, json!({ "raw": "not json" }));
    }

    #[test]
    fn empty_response_is_a_protocol_error() {
        assert!(parse_model_turn(&json!({})).is_err());
    }

    #[test]
    fn endpoint_joins_without_duplicate_slash() {
        assert_eq!(
            chat_completions_endpoint("http://localhost:11434/v1/"),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_endpoint("https://api.openai.com/v1"),
            "https://api.openai.com/v1/chat/completions"
        );
    }
}
