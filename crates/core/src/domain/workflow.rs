use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable identifier for one piece of reconstructed workflow state.
///
/// Each slot is fed by exactly one tool; routing happens by slot lookup
/// instead of branching on result payload types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateSlot {
    IntentClassification,
    ProductValidation,
    OrderDetails,
    ComplianceCheck,
    ApprovalJustification,
}

impl StateSlot {
    /// The slot a tool's result belongs to, by function name. Unknown tools
    /// have no slot; their results are not state.
    pub fn for_tool(function_name: &str) -> Option<Self> {
        match function_name {
            "ClassifyIntent" => Some(Self::IntentClassification),
            "ValidateProduct" => Some(Self::ProductValidation),
            "ExtractDetails" => Some(Self::OrderDetails),
            "CheckCompliance" => Some(Self::ComplianceCheck),
            "JustifyApproval" => Some(Self::ApprovalJustification),
            _ => None,
        }
    }
}

/// Best-effort workflow state threaded across turns: the latest JSON result
/// per slot. A later result for the same slot replaces the earlier one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    slots: BTreeMap<StateSlot, Value>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, slot: StateSlot, value: Value) {
        self.slots.insert(slot, value);
    }

    /// Routes a tool result into its slot. Returns false (and stores
    /// nothing) when the tool has no slot.
    pub fn record_tool_result(&mut self, function_name: &str, value: Value) -> bool {
        match StateSlot::for_tool(function_name) {
            Some(slot) => {
                self.record(slot, value);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, slot: StateSlot) -> Option<&Value> {
        self.slots.get(&slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{StateSlot, WorkflowState};

    #[test]
    fn tool_results_route_to_their_slots() {
        let mut state = WorkflowState::new();

        assert!(state.record_tool_result("ClassifyIntent", json!({"intent": "RequestPurchase"})));
        assert!(state.record_tool_result("CheckCompliance", json!({"compliant": false})));

        assert_eq!(
            state.get(StateSlot::IntentClassification),
            Some(&json!({"intent": "RequestPurchase"}))
        );
        assert_eq!(state.get(StateSlot::ComplianceCheck), Some(&json!({"compliant": false})));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn unknown_tools_store_nothing() {
        let mut state = WorkflowState::new();
        assert!(!state.record_tool_result("SubmitToErp", json!({"ok": true})));
        assert!(state.is_empty());
    }

    #[test]
    fn later_results_replace_earlier_ones() {
        let mut state = WorkflowState::new();
        state.record_tool_result("ClassifyIntent", json!({"confidence": 0.2}));
        state.record_tool_result("ClassifyIntent", json!({"confidence": 0.95}));

        assert_eq!(
            state.get(StateSlot::IntentClassification),
            Some(&json!({"confidence": 0.95}))
        );
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn state_round_trips_through_serde() {
        let mut state = WorkflowState::new();
        state.record(StateSlot::OrderDetails, json!({"quantity": 2}));

        let serialized = serde_json::to_string(&state).expect("serialize");
        let restored: WorkflowState = serde_json::from_str(&serialized).expect("deserialize");
        assert_eq!(restored, state);
    }
}
