//! Expand/collapse state for task groups
//!
//! Tasks with an outstanding approval are force-expanded. The user's own
//! expansion set is snapshotted on the transition from "nothing pending" to
//! "something pending" and restored once every approval is resolved, so
//! toggles made while an approval is open are discarded on revert.

use std::collections::{BTreeSet, HashMap};

use super::TaskEventGroup;

/// Which task groups are expanded, plus the pre-force snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    /// Task ids currently expanded
    pub expanded: BTreeSet<String>,

    /// Expansion set saved before approvals forced groups open
    pub pre_force_snapshot: Option<BTreeSet<String>>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-evaluate the auto-expand rule after the groups were rebuilt
    pub fn apply_pending_approvals(&mut self, groups: &HashMap<String, TaskEventGroup>) {
        let pending: BTreeSet<String> = groups
            .iter()
            .filter(|(_, group)| group.has_pending_approval)
            .map(|(id, _)| id.clone())
            .collect();

        self.apply_pending_ids(pending);
    }

    fn apply_pending_ids(&mut self, pending: BTreeSet<String>) {
        if pending.is_empty() {
            if let Some(snapshot) = self.pre_force_snapshot.take() {
                tracing::debug!(restored = snapshot.len(), "approvals resolved, reverting expansion");
                self.expanded = snapshot;
            }
            return;
        }

        if self.pre_force_snapshot.is_none() {
            self.pre_force_snapshot = Some(self.expanded.clone());
        }
        self.expanded.extend(pending);
    }

    /// Flip a single task between expanded and collapsed
    pub fn toggle(&mut self, task_id: &str) {
        if !self.expanded.remove(task_id) {
            self.expanded.insert(task_id.to_string());
        }
    }

    pub fn is_expanded(&self, task_id: &str) -> bool {
        self.expanded.contains(task_id)
    }

    /// Whether approvals are currently forcing groups open
    pub fn is_forced(&self) -> bool {
        self.pre_force_snapshot.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::build_task_groups;
    use crate::{ApprovalStatus, ConversationEvent};

    fn groups_with_approval(status: ApprovalStatus) -> HashMap<String, TaskEventGroup> {
        let events = vec![
            ConversationEvent::tool_call(1, "Task", "t1"),
            ConversationEvent::tool_call(2, "Bash", "b1")
                .under_task("t1")
                .with_approval("a1", status),
        ];
        build_task_groups(&events).task_groups
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_auto_expand_and_revert_round_trip() {
        let mut state = ExpansionState::new();

        state.apply_pending_approvals(&groups_with_approval(ApprovalStatus::Pending));
        assert_eq!(state.expanded, set(&["t1"]));
        assert_eq!(state.pre_force_snapshot, Some(BTreeSet::new()));

        state.apply_pending_approvals(&groups_with_approval(ApprovalStatus::Approved));
        assert!(state.expanded.is_empty());
        assert_eq!(state.pre_force_snapshot, None);
    }

    #[test]
    fn test_revert_restores_user_choice() {
        let mut state = ExpansionState::new();
        state.toggle("t9");

        state.apply_pending_approvals(&groups_with_approval(ApprovalStatus::Pending));
        assert_eq!(state.expanded, set(&["t1", "t9"]));

        state.apply_pending_approvals(&groups_with_approval(ApprovalStatus::Denied));
        assert_eq!(state.expanded, set(&["t9"]));
    }

    #[test]
    fn test_snapshot_taken_only_once() {
        let mut state = ExpansionState::new();

        state.apply_pending_ids(set(&["t1"]));
        state.toggle("t5");
        state.apply_pending_ids(set(&["t1", "t2"]));

        assert_eq!(state.pre_force_snapshot, Some(BTreeSet::new()));
        assert_eq!(state.expanded, set(&["t1", "t2", "t5"]));

        state.apply_pending_ids(BTreeSet::new());
        assert!(state.expanded.is_empty());
    }

    #[test]
    fn test_toggle_leaves_snapshot_alone() {
        let mut state = ExpansionState::new();
        state.apply_pending_ids(set(&["t1"]));

        state.toggle("t1");
        assert!(!state.is_expanded("t1"));
        assert!(state.is_forced());
        assert_eq!(state.pre_force_snapshot, Some(BTreeSet::new()));

        state.toggle("t1");
        assert!(state.is_expanded("t1"));
    }

    #[test]
    fn test_no_pending_without_snapshot_is_noop() {
        let mut state = ExpansionState::new();
        state.toggle("t3");

        state.apply_pending_approvals(&HashMap::new());

        assert_eq!(state.expanded, set(&["t3"]));
        assert!(!state.is_forced());
    }
}
