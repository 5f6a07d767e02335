use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use procura_core::domain::conversation::{ChatMessage, SessionState, Transcript};
use procura_core::domain::workflow::WorkflowState;
use procura_core::telemetry::{TelemetryCollector, TelemetryEntry};
use procura_db::{RepositoryError, SessionStore};

use crate::llm::{LlmClient, LlmError, ModelTurn};
use crate::prompts::PromptLibrary;
use crate::recorder::{truncate, PromptRunner};
use crate::tools::ToolRegistry;

const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;
const ARGUMENT_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model call failed: {0}")]
    Llm(#[from] LlmError),
    #[error("session storage failed: {0}")]
    Session(#[source] RepositoryError),
}

/// The result of one processed turn.
pub struct TurnOutcome {
    pub completion: String,
    pub transcript: Transcript,
    pub workflow: WorkflowState,
}

/// Orchestrates one agent turn: threads the session transcript through the
/// model, executes elected tools (recording telemetry for each), and closes
/// on the model's narrative completion.
pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    sessions: Arc<dyn SessionStore>,
    prompts: Arc<PromptLibrary>,
    max_tool_rounds: usize,
}

impl AgentRuntime {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        sessions: Arc<dyn SessionStore>,
        prompts: Arc<PromptLibrary>,
    ) -> Self {
        Self { llm, tools, sessions, prompts, max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS }
    }

    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds.max(1);
        self
    }

    /// Processes one user turn against the given session. The collector is
    /// request-scoped: the caller creates it fresh and reduces it after.
    pub async fn process_request(
        &self,
        session_id: &str,
        user_input: &str,
        collector: &TelemetryCollector,
    ) -> Result<TurnOutcome, AgentError> {
        info!(
            event_name = "agent.turn.start",
            session_id,
            "processing purchase request"
        );

        let mut session = self
            .sessions
            .load(session_id)
            .await
            .map_err(AgentError::Session)?
            .unwrap_or_default();

        if session.transcript.is_empty() {
            session.transcript.push(ChatMessage::system(self.prompts.system_prompt()));
        }
        session.transcript.push(ChatMessage::user(self.prompts.user_turn(user_input)));

        let runner = PromptRunner::new(self.llm.as_ref(), collector);
        let descriptors = self.tools.descriptors();
        let mut completion = None;

        for _ in 0..self.max_tool_rounds {
            match self.llm.chat(&session.transcript, &descriptors).await? {
                ModelTurn::ToolCall { id, name, arguments } => {
                    self.handle_tool_call(&id, &name, arguments, &runner, &mut session, collector)
                        .await;
                }
                ModelTurn::Message(text) => {
                    collector.add(TelemetryEntry::AgentNarrative { text: text.clone() });
                    session.transcript.push(ChatMessage::assistant(text.clone()));
                    completion = Some(text);
                    break;
                }
            }
        }

        let completion = match completion {
            Some(text) => text,
            None => {
                warn!(
                    event_name = "agent.turn.round_budget_exhausted",
                    session_id,
                    max_tool_rounds = self.max_tool_rounds,
                    "turn ended without a narrative completion"
                );
                let text = round_budget_reply();
                collector.add(TelemetryEntry::AgentNarrative { text: text.clone() });
                session.transcript.push(ChatMessage::assistant(text.clone()));
                text
            }
        };

        self.sessions
            .save(session_id, session.clone())
            .await
            .map_err(AgentError::Session)?;

        info!(
            event_name = "agent.turn.complete",
            session_id,
            transcript_len = session.transcript.len(),
            telemetry_entries = collector.len(),
            "turn finished"
        );

        Ok(TurnOutcome {
            completion,
            transcript: session.transcript,
            workflow: session.workflow,
        })
    }

    async fn handle_tool_call(
        &self,
        call_id: &str,
        name: &str,
        arguments: Value,
        runner: &PromptRunner<'_>,
        session: &mut SessionState,
        collector: &TelemetryCollector,
    ) {
        let arguments_text = arguments.to_string();

        let Some(tool) = self.tools.get(name) else {
            warn!(
                event_name = "agent.turn.unknown_tool",
                tool = name,
                "model elected an unregistered tool"
            );
            let reply = json!({
                "error": "unknown_tool",
                "message": format!("no tool named `{name}` is registered"),
            })
            .to_string();
            session.transcript.push(ChatMessage::tool_request(call_id, name, arguments_text));
            session.transcript.push(ChatMessage::tool_result(call_id, name, reply));
            return;
        };

        collector.add(TelemetryEntry::ToolCallStarted {
            payload: call_payload(&tool.qualified_name(), &arguments),
        });

        let result = match tool.execute(arguments, runner).await {
            Ok(result) => result,
            Err(error) => {
                warn!(
                    event_name = "agent.turn.tool_failed",
                    tool = name,
                    error = %error,
                    "tool execution failed; degrading to error payload"
                );
                json!({ "error": format!("tool execution failed: {error}") })
            }
        };

        let result_text = result.to_string();
        collector.add(TelemetryEntry::ToolJsonResult {
            tool_label: tool.name().to_string(),
            json: result_text.clone(),
        });

        session.workflow.record_tool_result(tool.name(), result);
        session.transcript.push(ChatMessage::tool_request(call_id, name, arguments_text));
        session.transcript.push(ChatMessage::tool_result(call_id, name, result_text));
    }
}

/// The call payload the telemetry filter emits: qualified name plus a
/// stringified, truncated view of the arguments.
fn call_payload(qualified_name: &str, arguments: &Value) -> String {
    let parameters: BTreeMap<String, String> = arguments
        .as_object()
        .map(|object| {
            object
                .iter()
                .map(|(key, value)| {
                    let rendered = match value {
                        Value::String(text) => truncate(text, ARGUMENT_PREVIEW_CHARS),
                        other => other.to_string(),
                    };
                    (key.clone(), rendered)
                })
                .collect()
        })
        .unwrap_or_default();

    json!({ "toolName": qualified_name, "parameters": parameters }).to_string()
}

fn round_budget_reply() -> String {
    json!({
        "reflection": "The turn used the maximum number of tool invocations without reaching a final answer.",
        "nextStep": "Ask the user to restate or narrow the request.",
        "userPrompt": "I could not finish processing this request. Could you restate it with the product and quantity you need?",
    })
    .to_string()
}
