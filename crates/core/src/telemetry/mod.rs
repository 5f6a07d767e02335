//! Per-request telemetry: what the invocation layer recorded during one
//! agent turn, and the reduction of that log into presentable tool steps.
//!
//! Entries are typed at the point of collection, so downstream consumers
//! never sniff string prefixes to tell a tool call from a narrative.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

pub mod steps;

pub use steps::{reduce, ToolStep};

/// Label prefix the completion layer puts on the anonymous prompt execution
/// it issues inside every tool invocation. A generated opaque suffix follows.
pub const NESTED_CALL_PREFIX: &str = "InvokePromptAsync_";

/// Sentinel label for a call entry whose payload did not yield a usable name.
pub const UNKNOWN_TOOL: &str = "Unknown Tool";

/// One record appended during a turn. Never mutated, never reordered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TelemetryEntry {
    /// A function invocation began. `payload` is the JSON emitted by the
    /// invocation layer: `{"toolName": "Plugin.Function", "parameters": {..}}`.
    /// Name recovery from it is fallible and must degrade, not abort.
    #[serde(rename_all = "camelCase")]
    ToolCallStarted { payload: String },
    /// A JSON-shaped result was captured for the named function.
    #[serde(rename_all = "camelCase")]
    ToolJsonResult { tool_label: String, json: String },
    /// The model produced narrative text.
    #[serde(rename_all = "camelCase")]
    AgentNarrative { text: String },
}

impl fmt::Display for TelemetryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToolCallStarted { payload } => write!(f, "[TOOL_CALL] {payload}"),
            Self::ToolJsonResult { tool_label, json } => {
                write!(f, "[TOOL_JSON_RESULT] {tool_label}: {json}")
            }
            Self::AgentNarrative { text } => write!(f, "[AGENT_RESPONSE] {text}"),
        }
    }
}

/// Append-only, ordered log of entries for one turn.
///
/// One instance exists per HTTP request; sharing a collector across
/// concurrent requests would corrupt step attribution. The mutex only makes
/// `add` callable from `&self` across await points within that one request
/// task; there is no cross-task contention by construction.
#[derive(Debug, Default)]
pub struct TelemetryCollector {
    entries: Mutex<Vec<TelemetryEntry>>,
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends unconditionally: no validation, no deduplication.
    pub fn add(&self, entry: TelemetryEntry) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).push(entry);
    }

    /// All entries added so far, in insertion order.
    pub fn snapshot(&self) -> Vec<TelemetryEntry> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
