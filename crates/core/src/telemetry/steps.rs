//! Reduction of a turn's raw telemetry log into ordered tool steps.
//!
//! The completion layer double-emits every logical tool use: the real call
//! carries the tool's qualified name, and a secondary anonymous prompt
//! execution (`InvokePromptAsync_<id>`) carries the actual result. The
//! reducer collapses that pair into one step so callers only ever see real
//! tool names.

use serde::{Deserialize, Serialize};

use super::{TelemetryEntry, NESTED_CALL_PREFIX, UNKNOWN_TOOL};

/// One resolved unit of work: a real tool call merged with its JSON result
/// and the narrative the model produced after it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolStep {
    pub tool_name: String,
    pub json_result: String,
    pub agent_response: String,
}

/// Folds one turn's entries into ordered steps.
///
/// Single left-to-right pass; total over arbitrary input. Orphan results and
/// narratives are dropped, a trailing unterminated step is flushed as-is,
/// and the post-filter removes anything that never resolved to a real name.
pub fn reduce(entries: &[TelemetryEntry]) -> Vec<ToolStep> {
    let mut steps = Vec::new();
    let mut current = ToolStep::default();
    let mut has_active_step = false;
    let mut parent_tool_name = String::new();

    for entry in entries {
        match entry {
            TelemetryEntry::ToolCallStarted { payload } => {
                let label = derive_label(payload);
                if label.starts_with(NESTED_CALL_PREFIX) {
                    // The anonymous inner call is the same logical step as
                    // the real call that preceded it; its results must land
                    // on the parent, never on a step of its own.
                    if has_active_step && !parent_tool_name.is_empty() {
                        current.tool_name = parent_tool_name.clone();
                    } else {
                        // No parent context: keep accumulating, the
                        // post-filter will drop this step if it stays
                        // unresolved.
                        current.tool_name = UNKNOWN_TOOL.to_string();
                        has_active_step = true;
                    }
                } else {
                    if has_active_step {
                        steps.push(std::mem::take(&mut current));
                    }
                    current = ToolStep { tool_name: label.clone(), ..ToolStep::default() };
                    parent_tool_name = label;
                    has_active_step = true;
                }
            }
            TelemetryEntry::ToolJsonResult { json, .. } if has_active_step => {
                // Last write wins when both the real call and its nested
                // execution captured a result.
                current.json_result = json.clone();
            }
            TelemetryEntry::AgentNarrative { text } if has_active_step => {
                current.agent_response = text.clone();
                steps.push(std::mem::take(&mut current));
                has_active_step = false;
                parent_tool_name.clear();
            }
            _ => {}
        }
    }

    if has_active_step {
        steps.push(current);
    }

    steps.retain(|step| {
        !step.tool_name.is_empty()
            && step.tool_name != UNKNOWN_TOOL
            && !step.tool_name.starts_with(NESTED_CALL_PREFIX)
    });
    steps
}

/// Recovers the short display label from a call payload.
///
/// The payload's `toolName` is a dot-separated plugin/function identifier;
/// the function segment is the label. Any parse or shape failure degrades to
/// the unknown-tool sentinel.
fn derive_label(payload: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) else {
        return UNKNOWN_TOOL.to_string();
    };
    let Some(full_name) = value.get("toolName").and_then(|name| name.as_str()) else {
        return UNKNOWN_TOOL.to_string();
    };
    match full_name.split('.').nth(1) {
        Some(function) => function.to_string(),
        None => full_name.to_string(),
    }
}
