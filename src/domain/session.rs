use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an agent session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created but not launched yet
    Draft,
    Starting,
    Running,
    /// Blocked on a human approval or input
    WaitingInput,
    Completing,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Draft => "draft",
            SessionStatus::Starting => "starting",
            SessionStatus::Running => "running",
            SessionStatus::WaitingInput => "waiting_input",
            SessionStatus::Completing => "completing",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    /// Completed or failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One supervised agent run, as reported by the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,

    pub status: SessionStatus,

    #[serde(default)]
    pub archived: bool,

    /// Edit tools are approved without asking
    #[serde(default)]
    pub auto_accept_edits: bool,

    /// Every tool call is approved without asking
    #[serde(default)]
    pub dangerously_skip_permissions: bool,

    /// When the bypass above switches itself off again
    #[serde(default)]
    pub dangerously_skip_permissions_expires_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub title: Option<String>,

    /// Short generated summary of the session
    #[serde(default)]
    pub summary: Option<String>,

    /// The initial prompt
    #[serde(default)]
    pub query: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub error_message: Option<String>,

    #[serde(default)]
    pub input_tokens: Option<u64>,

    #[serde(default)]
    pub output_tokens: Option<u64>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a session with only the required fields set
    pub fn new(id: impl Into<String>, status: SessionStatus) -> Self {
        Self {
            id: id.into(),
            status,
            archived: false,
            auto_accept_edits: false,
            dangerously_skip_permissions: false,
            dangerously_skip_permissions_expires_at: None,
            title: None,
            summary: None,
            query: None,
            model: None,
            error_message: None,
            input_tokens: None,
            output_tokens: None,
            created_at: None,
            last_activity_at: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Whether the bypass flag is set and its expiry (if any) has passed
    pub fn bypass_expired(&self, now: DateTime<Utc>) -> bool {
        self.dangerously_skip_permissions
            && self
                .dangerously_skip_permissions_expires_at
                .is_some_and(|expires_at| expires_at <= now)
    }
}
