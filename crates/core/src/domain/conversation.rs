use serde::{Deserialize, Serialize};

use crate::domain::workflow::WorkflowState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

impl ChatRole {
    pub fn label(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// One message in a session transcript.
///
/// `tool_call_id` and `name` are set on the two message kinds that carry a
/// tool exchange: the assistant's election of a tool (content = argument
/// JSON) and the tool's result (content = result JSON).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into(), name: None, tool_call_id: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into(), name: None, tool_call_id: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into(), name: None, tool_call_id: None }
    }

    /// The assistant's decision to invoke a tool with the given arguments.
    pub fn tool_request(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments_json: impl Into<String>,
    ) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: arguments_json.into(),
            name: Some(tool_name.into()),
            tool_call_id: Some(call_id.into()),
        }
    }

    /// The result a tool handed back for a prior request.
    pub fn tool_result(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        result_json: impl Into<String>,
    ) -> Self {
        Self {
            role: ChatRole::Tool,
            content: result_json.into(),
            name: Some(tool_name.into()),
            tool_call_id: Some(call_id.into()),
        }
    }

    pub fn is_tool_exchange(&self) -> bool {
        self.tool_call_id.is_some()
    }
}

/// Ordered chat history for one session, grown turn by turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

/// Everything the session store persists across turns for one session:
/// the transcript plus the best-effort workflow state rebuilt from tool
/// results. The telemetry log is deliberately absent; it lives and dies
/// with a single request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub transcript: Transcript,
    pub workflow: WorkflowState,
}
