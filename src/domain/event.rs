use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tool name the agent uses to spawn a sub-task
pub const TASK_TOOL_NAME: &str = "Task";

/// The kind of a conversation event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Message,
    ToolCall,
    ToolResult,
}

/// Author of a message event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// State of the human-approval gate linked to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApprovalStatus::Pending => write!(f, "pending"),
            ApprovalStatus::Approved => write!(f, "approved"),
            ApprovalStatus::Denied => write!(f, "denied"),
        }
    }
}

/// One event in a session's conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEvent {
    /// Unique within a session, increasing in arrival order
    pub id: i64,

    /// The kind of event
    pub event_type: EventType,

    /// Message author (messages only)
    #[serde(default)]
    pub role: Option<Role>,

    /// Tool name (tool calls only)
    #[serde(default)]
    pub tool_name: Option<String>,

    /// Tool call identifier, unique per call (tool calls only)
    #[serde(default)]
    pub tool_id: Option<String>,

    /// The `tool_id` this result answers (tool results only)
    #[serde(default)]
    pub tool_result_for_id: Option<String>,

    /// `tool_id` of the `Task` call this event was produced under
    #[serde(default)]
    pub parent_tool_use_id: Option<String>,

    /// Approval gate linked to this event
    #[serde(default)]
    pub approval_id: Option<String>,

    #[serde(default)]
    pub approval_status: Option<ApprovalStatus>,

    /// Message text or tool payload, as delivered by the daemon
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ConversationEvent {
    fn new(id: i64, event_type: EventType) -> Self {
        Self {
            id,
            event_type,
            role: None,
            tool_name: None,
            tool_id: None,
            tool_result_for_id: None,
            parent_tool_use_id: None,
            approval_id: None,
            approval_status: None,
            content: None,
            created_at: None,
        }
    }

    /// Create a message event
    pub fn message(id: i64, role: Role, content: impl Into<String>) -> Self {
        let mut event = Self::new(id, EventType::Message);
        event.role = Some(role);
        event.content = Some(content.into());
        event
    }

    /// Create a tool call event
    pub fn tool_call(id: i64, tool_name: impl Into<String>, tool_id: impl Into<String>) -> Self {
        let mut event = Self::new(id, EventType::ToolCall);
        event.tool_name = Some(tool_name.into());
        event.tool_id = Some(tool_id.into());
        event
    }

    /// Create a tool result event answering `tool_id`
    pub fn tool_result(id: i64, tool_id: impl Into<String>) -> Self {
        let mut event = Self::new(id, EventType::ToolResult);
        event.tool_result_for_id = Some(tool_id.into());
        event
    }

    /// Attribute this event to the `Task` call with the given `tool_id`
    pub fn under_task(mut self, parent_tool_id: impl Into<String>) -> Self {
        self.parent_tool_use_id = Some(parent_tool_id.into());
        self
    }

    /// Link an approval gate to this event
    pub fn with_approval(mut self, approval_id: impl Into<String>, status: ApprovalStatus) -> Self {
        self.approval_id = Some(approval_id.into());
        self.approval_status = Some(status);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Whether this is a `Task` tool call (a sub-task spawn)
    pub fn is_task_call(&self) -> bool {
        self.event_type == EventType::ToolCall && self.tool_name.as_deref() == Some(TASK_TOOL_NAME)
    }

    /// Whether this event carries the given approval in pending state
    pub fn is_pending_approval(&self, approval_id: &str) -> bool {
        self.approval_status == Some(ApprovalStatus::Pending)
            && self.approval_id.as_deref() == Some(approval_id)
    }
}
