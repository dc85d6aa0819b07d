//! `session_settings_changed` handling

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::Reconciler;
use crate::notify::format::short_id;
use crate::notify::{NotificationKind, NotificationOptions, Priority};

/// Decoded settings change event
#[derive(Debug, Clone, Default)]
pub(super) struct SettingsChange {
    pub session_id: String,
    pub auto_accept_edits: Option<bool>,
    pub dangerously_skip_permissions: Option<bool>,
    pub dangerously_skip_permissions_timeout_ms: Option<u64>,
    pub reason: Option<String>,
}

impl SettingsChange {
    /// Expiry to store when bypass is being switched on.
    ///
    /// `None` when the change does not enable bypass or carries no timeout.
    fn bypass_expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.dangerously_skip_permissions != Some(true) {
            return None;
        }
        self.dangerously_skip_permissions_timeout_ms
            .and_then(|ms| i64::try_from(ms).ok())
            .map(|ms| now + Duration::milliseconds(ms))
    }
}

fn format_timeout(ms: u64) -> String {
    let secs = ms / 1000;
    if secs >= 60 && secs % 60 == 0 {
        format!("{} min", secs / 60)
    } else if secs > 0 {
        format!("{} s", secs)
    } else {
        format!("{} ms", ms)
    }
}

/// Notification for a settings change; bypass wins over auto-accept
fn settings_notification(change: &SettingsChange) -> Option<NotificationOptions> {
    let (title, priority) = match (change.dangerously_skip_permissions, change.auto_accept_edits) {
        (Some(true), _) => {
            let title = match change.dangerously_skip_permissions_timeout_ms {
                Some(ms) => format!("Bypass permissions enabled for {}", format_timeout(ms)),
                None => "Bypass permissions enabled".to_string(),
            };
            (title, Priority::High)
        }
        (Some(false), _) => ("Bypass permissions disabled".to_string(), Priority::Normal),
        (None, Some(true)) => ("Auto-accept edits enabled".to_string(), Priority::Normal),
        (None, Some(false)) => ("Auto-accept edits disabled".to_string(), Priority::Normal),
        (None, None) => return None,
    };

    let mut body = format!("Session {}", short_id(&change.session_id));
    if let Some(reason) = change.reason.as_deref().filter(|r| !r.is_empty()) {
        body.push_str(&format!(" ({})", reason));
    }

    Some(NotificationOptions {
        id: format!("settings_changed:{}", change.session_id),
        kind: NotificationKind::SettingsChanged,
        title,
        body,
        priority,
        session_id: change.session_id.clone(),
    })
}

impl Reconciler {
    pub(super) async fn handle_settings_changed(&self, change: SettingsChange) {
        let now = Utc::now();

        let has_actual_changes = self.ctx.with_state(|state| {
            let (current_auto_accept, current_bypass) = state
                .get(&change.session_id)
                .map(|s| (s.auto_accept_edits, s.dangerously_skip_permissions))
                .unwrap_or((false, false));

            let auto_accept_changed = change
                .auto_accept_edits
                .is_some_and(|value| value != current_auto_accept);
            let bypass_changed = change
                .dangerously_skip_permissions
                .is_some_and(|value| value != current_bypass);

            let known = state.modify_session(&change.session_id, |session| {
                if let Some(value) = change.auto_accept_edits {
                    session.auto_accept_edits = value;
                }
                if let Some(value) = change.dangerously_skip_permissions {
                    session.dangerously_skip_permissions = value;
                    // Enabling without a timeout keeps whatever expiry is stored
                    match (value, change.bypass_expiry(now)) {
                        (false, _) => session.dangerously_skip_permissions_expires_at = None,
                        (true, Some(expires_at)) => {
                            session.dangerously_skip_permissions_expires_at = Some(expires_at)
                        }
                        (true, None) => {}
                    }
                }
            });
            if !known {
                debug!(session_id = %change.session_id, "Settings change for unknown session");
            }

            auto_accept_changed || bypass_changed
        });

        if !has_actual_changes {
            debug!(session_id = %change.session_id, "Settings unchanged, not notifying");
            return;
        }

        if let Some(options) = settings_notification(&change) {
            self.ctx.deliver(options).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::DaemonEvent;
    use crate::reconciler::test_support::harness;
    use crate::{Session, SessionStatus};

    fn settings_event(
        auto_accept_edits: Option<bool>,
        bypass: Option<bool>,
        timeout_ms: Option<u64>,
    ) -> DaemonEvent {
        DaemonEvent::SessionSettingsChanged {
            session_id: "s1".to_string(),
            auto_accept_edits,
            dangerously_skip_permissions: bypass,
            dangerously_skip_permissions_timeout_ms: timeout_ms,
            reason: Some("user".to_string()),
        }
    }

    #[tokio::test]
    async fn test_noop_settings_change_writes_without_notifying() {
        let h = harness();
        h.daemon.set_session(Session::new("s1", SessionStatus::Running));
        h.reconciler.refresh_sessions().await;
        let generation = h.state.lock().unwrap().generation();

        h.reconciler
            .handle(settings_event(Some(false), None, None))
            .await;

        assert!(h.notifier.notifications().is_empty());
        assert!(h.state.lock().unwrap().generation() > generation);
    }

    #[tokio::test]
    async fn test_auto_accept_change_notifies() {
        let h = harness();
        h.daemon.set_session(Session::new("s1", SessionStatus::Running));
        h.reconciler.refresh_sessions().await;

        h.reconciler
            .handle(settings_event(Some(true), None, None))
            .await;

        let notifications = h.notifier.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Auto-accept edits enabled");
        assert_eq!(notifications[0].body, "Session s1 (user)");
        assert!(h.state.lock().unwrap().get("s1").unwrap().auto_accept_edits);
    }

    #[tokio::test]
    async fn test_bypass_with_timeout_sets_expiry() {
        let h = harness();
        h.daemon.set_session(Session::new("s1", SessionStatus::Running));
        h.reconciler.refresh_sessions().await;
        let before = Utc::now();

        h.reconciler
            .handle(settings_event(Some(true), Some(true), Some(15 * 60 * 1000)))
            .await;

        let notifications = h.notifier.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Bypass permissions enabled for 15 min");
        assert_eq!(notifications[0].priority, Priority::High);

        let state = h.state.lock().unwrap();
        let session = state.get("s1").unwrap();
        assert!(session.dangerously_skip_permissions);
        assert!(session.auto_accept_edits);
        let expires_at = session.dangerously_skip_permissions_expires_at.unwrap();
        assert!(expires_at >= before + Duration::minutes(15));
        assert!(expires_at <= Utc::now() + Duration::minutes(15));
    }

    #[tokio::test]
    async fn test_disabling_bypass_clears_expiry() {
        let h = harness();
        let mut session = Session::new("s1", SessionStatus::Running);
        session.dangerously_skip_permissions = true;
        session.dangerously_skip_permissions_expires_at = Some(Utc::now() + Duration::minutes(5));
        h.daemon.set_session(session);
        h.reconciler.refresh_sessions().await;

        h.reconciler
            .handle(settings_event(None, Some(false), None))
            .await;

        let state = h.state.lock().unwrap();
        let session = state.get("s1").unwrap();
        assert!(!session.dangerously_skip_permissions);
        assert_eq!(session.dangerously_skip_permissions_expires_at, None);
        assert_eq!(h.notifier.notifications()[0].title, "Bypass permissions disabled");
    }

    #[tokio::test]
    async fn test_bypass_echo_without_timeout_keeps_expiry() {
        let h = harness();
        let expires_at = Utc::now() + Duration::minutes(15);
        let mut session = Session::new("s1", SessionStatus::Running);
        session.dangerously_skip_permissions = true;
        session.dangerously_skip_permissions_expires_at = Some(expires_at);
        h.daemon.set_session(session);
        h.reconciler.refresh_sessions().await;

        h.reconciler
            .handle(settings_event(None, Some(true), None))
            .await;

        assert!(h.notifier.notifications().is_empty());
        let state = h.state.lock().unwrap();
        let session = state.get("s1").unwrap();
        assert!(session.dangerously_skip_permissions);
        assert_eq!(session.dangerously_skip_permissions_expires_at, Some(expires_at));
    }

    #[test]
    fn test_format_timeout() {
        assert_eq!(format_timeout(900_000), "15 min");
        assert_eq!(format_timeout(90_000), "90 s");
        assert_eq!(format_timeout(500), "500 ms");
    }

    #[test]
    fn test_empty_change_has_no_notification() {
        let change = SettingsChange {
            session_id: "s1".to_string(),
            ..SettingsChange::default()
        };
        assert!(settings_notification(&change).is_none());
    }
}
