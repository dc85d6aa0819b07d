//! User-facing notifications.
//!
//! The reconciler decides *whether* to notify; a [`Notifier`] decides *how*
//! (desktop notification, toast, log line). Two sinks ship with the crate:
//! [`LogNotifier`] writes structured log records and [`RecordingNotifier`]
//! keeps everything it receives in memory.

pub mod format;
mod sinks;

pub use sinks::{LogNotifier, RecordedNotification, RecordingNotifier};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Notification urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    High,
}

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SessionCompleted,
    SessionFailed,
    SettingsChanged,
}

/// A generic notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationOptions {
    /// Stable id, used for dedup and replacement
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub priority: Priority,
    pub session_id: String,
}

/// "Approval required" notification for one pending tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalNotification {
    pub session_id: String,
    pub approval_id: String,
    /// Display name of the tool (MCP names already formatted)
    pub tool_name: String,
    pub title: Option<String>,
    pub model: String,
}

/// Notification sink
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, options: NotificationOptions) -> anyhow::Result<()>;

    async fn notify_approval_required(&self, approval: ApprovalNotification) -> anyhow::Result<()>;

    /// Withdraw the notification shown for an approval, if any
    async fn clear_notification_by_approval_id(&self, approval_id: &str) -> anyhow::Result<()>;
}
