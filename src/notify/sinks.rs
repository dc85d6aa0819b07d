use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{ApprovalNotification, NotificationOptions, Notifier, Priority};

/// Writes notifications as structured log records
pub struct LogNotifier {
    /// Log at debug level instead of info/warn
    muted: bool,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self { muted: false }
    }

    pub fn muted() -> Self {
        Self { muted: true }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, options: NotificationOptions) -> anyhow::Result<()> {
        if self.muted {
            debug!(id = %options.id, title = %options.title, "notification (muted)");
            return Ok(());
        }
        match options.priority {
            Priority::High => warn!(
                id = %options.id,
                session_id = %options.session_id,
                body = %options.body,
                "{}",
                options.title
            ),
            Priority::Normal => info!(
                id = %options.id,
                session_id = %options.session_id,
                body = %options.body,
                "{}",
                options.title
            ),
        }
        Ok(())
    }

    async fn notify_approval_required(&self, approval: ApprovalNotification) -> anyhow::Result<()> {
        if self.muted {
            debug!(approval_id = %approval.approval_id, "approval notification (muted)");
            return Ok(());
        }
        warn!(
            session_id = %approval.session_id,
            approval_id = %approval.approval_id,
            model = %approval.model,
            title = approval.title.as_deref().unwrap_or(""),
            "Approval required: {}",
            approval.tool_name
        );
        Ok(())
    }

    async fn clear_notification_by_approval_id(&self, approval_id: &str) -> anyhow::Result<()> {
        debug!(approval_id, "cleared approval notification");
        Ok(())
    }
}

/// Everything a [`RecordingNotifier`] received, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedNotification {
    Notify(NotificationOptions),
    ApprovalRequired(ApprovalNotification),
    Cleared(String),
}

/// Keeps every notification in memory
#[derive(Default)]
pub struct RecordingNotifier {
    records: Mutex<Vec<RecordedNotification>>,
    fail_next: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, record: RecordedNotification) -> anyhow::Result<()> {
        let mut fail_next = self.fail_next.lock().unwrap_or_else(|e| e.into_inner());
        if *fail_next {
            *fail_next = false;
            anyhow::bail!("notification sink unavailable");
        }
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
        Ok(())
    }

    /// Make the next delivery fail
    pub fn fail_next(&self) {
        *self.fail_next.lock().unwrap_or_else(|e| e.into_inner()) = true;
    }

    pub fn records(&self) -> Vec<RecordedNotification> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Generic notifications only
    pub fn notifications(&self) -> Vec<NotificationOptions> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                RecordedNotification::Notify(options) => Some(options),
                _ => None,
            })
            .collect()
    }

    pub fn approval_notifications(&self) -> Vec<ApprovalNotification> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                RecordedNotification::ApprovalRequired(approval) => Some(approval),
                _ => None,
            })
            .collect()
    }

    pub fn cleared_approval_ids(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                RecordedNotification::Cleared(id) => Some(id),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, options: NotificationOptions) -> anyhow::Result<()> {
        self.push(RecordedNotification::Notify(options))
    }

    async fn notify_approval_required(&self, approval: ApprovalNotification) -> anyhow::Result<()> {
        self.push(RecordedNotification::ApprovalRequired(approval))
    }

    async fn clear_notification_by_approval_id(&self, approval_id: &str) -> anyhow::Result<()> {
        self.push(RecordedNotification::Cleared(approval_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationKind;

    fn options(id: &str) -> NotificationOptions {
        NotificationOptions {
            id: id.to_string(),
            kind: NotificationKind::SessionCompleted,
            title: "Session Completed".to_string(),
            body: "done".to_string(),
            priority: Priority::Normal,
            session_id: "s1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.notify(options("n1")).await.unwrap();
        notifier.clear_notification_by_approval_id("a1").await.unwrap();

        let records = notifier.records();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[0], RecordedNotification::Notify(_)));
        assert_eq!(notifier.cleared_approval_ids(), vec!["a1".to_string()]);
    }

    #[tokio::test]
    async fn test_fail_next_fails_once() {
        let notifier = RecordingNotifier::new();
        notifier.fail_next();

        assert!(notifier.notify(options("n1")).await.is_err());
        assert!(notifier.notify(options("n2")).await.is_ok());
        assert_eq!(notifier.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let notifier = LogNotifier::muted();
        assert!(notifier.notify(options("n1")).await.is_ok());
    }
}
