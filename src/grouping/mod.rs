//! Task grouping for conversation views
//!
//! Events produced inside a sub-task carry the `tool_id` of the `Task` call
//! that spawned them in `parent_tool_use_id`. [`build_task_groups`] folds those
//! events under their parent so a view can render one collapsible block per
//! task, and [`ExpansionState`] tracks which blocks are open.

mod expansion;

pub use expansion::ExpansionState;

use std::collections::HashMap;

use crate::{ApprovalStatus, ConversationEvent, EventType};

/// A `Task` tool call together with the events it produced
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEventGroup {
    /// The root `Task` tool call
    pub parent_task: ConversationEvent,

    /// Events attributed to the task, in arrival order
    pub sub_task_events: Vec<ConversationEvent>,

    /// Number of tool calls among `sub_task_events`
    pub tool_call_count: usize,

    /// Last sub-event in arrival order
    pub latest_event: Option<ConversationEvent>,

    /// Whether any sub-event is blocked on a pending approval
    pub has_pending_approval: bool,
}

impl TaskEventGroup {
    fn new(parent_task: ConversationEvent, sub_task_events: Vec<ConversationEvent>) -> Self {
        let tool_call_count = sub_task_events
            .iter()
            .filter(|e| e.event_type == EventType::ToolCall)
            .count();
        let latest_event = sub_task_events.last().cloned();
        let has_pending_approval = sub_task_events
            .iter()
            .any(|e| e.approval_status == Some(ApprovalStatus::Pending));

        Self {
            parent_task,
            sub_task_events,
            tool_call_count,
            latest_event,
            has_pending_approval,
        }
    }

    /// The `tool_id` of the parent task (the group key)
    pub fn task_id(&self) -> &str {
        self.parent_task.tool_id.as_deref().unwrap_or_default()
    }
}

/// Output of [`build_task_groups`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskGrouping {
    /// Groups keyed by the parent task's `tool_id`
    pub task_groups: HashMap<String, TaskEventGroup>,

    /// Events without a parent task, in input order
    pub root_events: Vec<ConversationEvent>,

    /// Whether any input event belonged to a sub-task
    pub has_sub_tasks: bool,
}

impl TaskGrouping {
    /// Groups in the order their parent tasks appear among the root events
    pub fn ordered_groups(&self) -> Vec<&TaskEventGroup> {
        self.root_events
            .iter()
            .filter_map(|e| e.tool_id.as_deref())
            .filter_map(|id| self.task_groups.get(id))
            .collect()
    }

    /// The group rooted at `event`, if that event is a grouped task call
    pub fn group_for(&self, event: &ConversationEvent) -> Option<&TaskEventGroup> {
        if !event.is_task_call() {
            return None;
        }
        event
            .tool_id
            .as_deref()
            .and_then(|id| self.task_groups.get(id))
    }
}

/// Partition a conversation into root events and per-task groups.
///
/// Sub-events whose parent task is not among the root events are dropped:
/// they show up neither as roots nor in a group. A `Task` call without any
/// sub-events stays a plain root event.
pub fn build_task_groups(events: &[ConversationEvent]) -> TaskGrouping {
    let has_sub_tasks = events.iter().any(|e| e.parent_tool_use_id.is_some());
    if !has_sub_tasks {
        return TaskGrouping {
            task_groups: HashMap::new(),
            root_events: events.to_vec(),
            has_sub_tasks: false,
        };
    }

    let mut root_events = Vec::new();
    let mut sub_events: HashMap<&str, Vec<ConversationEvent>> = HashMap::new();

    for event in events {
        match event.parent_tool_use_id.as_deref() {
            Some(parent) => sub_events.entry(parent).or_default().push(event.clone()),
            None => root_events.push(event.clone()),
        }
    }

    let mut task_groups = HashMap::new();
    for event in root_events.iter().filter(|e| e.is_task_call()) {
        let Some(tool_id) = event.tool_id.as_deref() else {
            continue;
        };
        if let Some(children) = sub_events.remove(tool_id) {
            task_groups.insert(
                tool_id.to_string(),
                TaskEventGroup::new(event.clone(), children),
            );
        }
    }

    if !sub_events.is_empty() {
        tracing::trace!(
            orphaned_parents = sub_events.len(),
            "sub-task events without a parent task were left out"
        );
    }

    TaskGrouping {
        task_groups,
        root_events,
        has_sub_tasks: true,
    }
}
