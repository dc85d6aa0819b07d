//! Push notifications delivered by the daemon's event channel.

use serde::{Deserialize, Serialize};

use crate::SessionStatus;

/// Daemon event - union of all notifications the reconciler consumes.
///
/// Ids are optional on the wire so a malformed event still decodes and can
/// be logged and dropped by its handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DaemonEvent {
    /// A session moved to a new status
    SessionStatusChanged {
        session_id: String,
        #[serde(default)]
        old_status: Option<SessionStatus>,
        #[serde(default)]
        new_status: Option<SessionStatus>,
    },

    /// A tool call is waiting for human approval
    NewApproval {
        #[serde(default)]
        approval_id: Option<String>,
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default)]
        tool_name: Option<String>,
    },

    /// An approval was approved or denied (by a human or by policy)
    ApprovalResolved {
        approval_id: String,
        session_id: String,
        #[serde(default)]
        approved: Option<bool>,
    },

    /// Session-level permission policies changed
    SessionSettingsChanged {
        session_id: String,
        #[serde(default)]
        auto_accept_edits: Option<bool>,
        #[serde(default)]
        dangerously_skip_permissions: Option<bool>,
        #[serde(default)]
        dangerously_skip_permissions_timeout_ms: Option<u64>,
        #[serde(default)]
        reason: Option<String>,
    },
}

impl DaemonEvent {
    /// Wire name of the event
    pub fn kind(&self) -> &'static str {
        match self {
            DaemonEvent::SessionStatusChanged { .. } => "session_status_changed",
            DaemonEvent::NewApproval { .. } => "new_approval",
            DaemonEvent::ApprovalResolved { .. } => "approval_resolved",
            DaemonEvent::SessionSettingsChanged { .. } => "session_settings_changed",
        }
    }

    /// Session this event is about, when present
    pub fn session_id(&self) -> Option<&str> {
        match self {
            DaemonEvent::SessionStatusChanged { session_id, .. }
            | DaemonEvent::ApprovalResolved { session_id, .. }
            | DaemonEvent::SessionSettingsChanged { session_id, .. } => Some(session_id),
            DaemonEvent::NewApproval { session_id, .. } => session_id.as_deref(),
        }
    }

    pub fn status_changed(session_id: impl Into<String>, new_status: SessionStatus) -> Self {
        DaemonEvent::SessionStatusChanged {
            session_id: session_id.into(),
            old_status: None,
            new_status: Some(new_status),
        }
    }

    pub fn new_approval(
        approval_id: impl Into<String>,
        session_id: impl Into<String>,
        tool_name: impl Into<String>,
    ) -> Self {
        DaemonEvent::NewApproval {
            approval_id: Some(approval_id.into()),
            session_id: Some(session_id.into()),
            tool_name: Some(tool_name.into()),
        }
    }

    pub fn approval_resolved(approval_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        DaemonEvent::ApprovalResolved {
            approval_id: approval_id.into(),
            session_id: session_id.into(),
            approved: None,
        }
    }
}
