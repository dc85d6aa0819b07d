//! `session_status_changed` handling

use tracing::{debug, info, warn};

use super::Reconciler;
use crate::notify::format::{short_id, summarize_session};
use crate::notify::{NotificationKind, NotificationOptions, Priority};
use crate::{Session, SessionStatus};

/// Completed/failed notification for a session that just reached `status`
pub(super) fn terminal_notification(
    session: &Session,
    status: SessionStatus,
) -> Option<NotificationOptions> {
    let summary = summarize_session(session);
    let short = short_id(&session.id);

    let (kind, title, body, priority) = match status {
        SessionStatus::Completed => (
            NotificationKind::SessionCompleted,
            format!("Session Completed ({})", short),
            format!("Completed: {}", summary),
            Priority::Normal,
        ),
        SessionStatus::Failed => {
            let detail = session
                .error_message
                .as_deref()
                .filter(|m| !m.trim().is_empty())
                .map(str::to_string)
                .unwrap_or(summary);
            (
                NotificationKind::SessionFailed,
                format!("Session Failed ({})", short),
                format!("Failed: {}", detail),
                Priority::High,
            )
        }
        _ => return None,
    };

    Some(NotificationOptions {
        id: format!("session_{}:{}", status, session.id),
        kind,
        title,
        body,
        priority,
        session_id: session.id.clone(),
    })
}

impl Reconciler {
    pub(super) async fn handle_status_changed(
        &self,
        session_id: &str,
        new_status: Option<SessionStatus>,
    ) {
        // Transition detection uses the local view from before the refresh
        let previous_status = self
            .ctx
            .with_state(|state| state.get(session_id).map(|s| s.status));

        let fetched = match self.ctx.daemon.get_session_state(session_id).await {
            Ok(session) => {
                self.ctx
                    .with_state(|state| state.update_session(session.clone()));
                Some(session)
            }
            Err(e) => {
                warn!(session_id, "Failed to fetch session state: {}", e);
                None
            }
        };

        let Some(new_status) = new_status else {
            warn!(session_id, "Status change event without new_status, ignoring");
            return;
        };

        if fetched.is_none() {
            self.ctx
                .with_state(|state| state.update_session_status(session_id, new_status));
        }

        debug!(
            session_id,
            previous = previous_status.map(|s| s.as_str()).unwrap_or("unknown"),
            new = %new_status,
            "Session status changed"
        );

        if new_status != SessionStatus::WaitingInput {
            let cleared = self
                .ctx
                .with_state(|state| state.clear_notifications_for_session(session_id));
            if cleared > 0 {
                debug!(session_id, cleared, "Cleared pending notification markers");
            }
        }

        let is_edge = new_status.is_terminal() && previous_status != Some(new_status);
        if is_edge {
            self.notify_terminal_status(session_id, new_status, fetched.as_ref())
                .await;
        }

        self.ctx
            .with_state(|state| state.request_conversation_refresh(session_id));
    }

    async fn notify_terminal_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        fetched: Option<&Session>,
    ) {
        if self
            .ctx
            .with_state(|state| state.was_recently_navigated_from(session_id))
        {
            info!(session_id, %status, "Suppressing notification for session the user just left");
            return;
        }

        let session = match fetched {
            Some(session) => session.clone(),
            None => self.ctx.with_state(|state| {
                state
                    .get(session_id)
                    .cloned()
                    .unwrap_or_else(|| Session::new(session_id, status))
            }),
        };

        if let Some(options) = terminal_notification(&session, status) {
            self.ctx.deliver(options).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::{DaemonCall, DaemonEvent};
    use crate::reconciler::test_support::harness;

    const SESSION: &str = "s1abcdef99";

    #[tokio::test]
    async fn test_completion_notifies_once() {
        let h = harness();
        h.daemon
            .set_session(Session::new(SESSION, SessionStatus::Running).with_title("Fix login"));
        h.reconciler.refresh_sessions().await;

        h.daemon
            .set_session(Session::new(SESSION, SessionStatus::Completed).with_title("Fix login"));
        h.reconciler
            .handle(DaemonEvent::status_changed(SESSION, SessionStatus::Completed))
            .await;
        h.reconciler
            .handle(DaemonEvent::status_changed(SESSION, SessionStatus::Completed))
            .await;

        let notifications = h.notifier.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Session Completed (s1abcdef)");
        assert_eq!(notifications[0].kind, NotificationKind::SessionCompleted);
        assert!(notifications[0].body.contains("Fix login"));

        let state = h.state.lock().unwrap();
        assert_eq!(state.conversation_refresh_count(SESSION), 2);
    }

    #[tokio::test]
    async fn test_failure_uses_error_message_and_high_priority() {
        let h = harness();
        h.daemon.set_session(Session::new(SESSION, SessionStatus::Running));
        h.reconciler.refresh_sessions().await;

        let mut failed = Session::new(SESSION, SessionStatus::Failed).with_title("Deploy");
        failed.error_message = Some("rate limited".to_string());
        h.daemon.set_session(failed);

        h.reconciler
            .handle(DaemonEvent::status_changed(SESSION, SessionStatus::Failed))
            .await;

        let notifications = h.notifier.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].priority, Priority::High);
        assert_eq!(notifications[0].title, "Session Failed (s1abcdef)");
        assert_eq!(notifications[0].body, "Failed: rate limited");
    }

    #[test]
    fn test_failure_falls_back_to_summary() {
        let session = Session::new(SESSION, SessionStatus::Failed).with_summary("Port tests");
        let options = terminal_notification(&session, SessionStatus::Failed).unwrap();
        assert_eq!(options.body, "Failed: Port tests");

        assert!(terminal_notification(&session, SessionStatus::Running).is_none());
    }

    #[tokio::test]
    async fn test_navigated_away_suppresses_notification_but_refreshes() {
        let h = harness();
        h.daemon.set_session(Session::new(SESSION, SessionStatus::Completed));
        h.reconciler.navigated_away_from(SESSION);

        h.reconciler
            .handle(DaemonEvent::status_changed(SESSION, SessionStatus::Completed))
            .await;

        assert!(h.notifier.notifications().is_empty());
        let state = h.state.lock().unwrap();
        assert_eq!(state.get(SESSION).unwrap().status, SessionStatus::Completed);
        assert_eq!(state.conversation_refresh_count(SESSION), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_falls_back_to_local_state() {
        let h = harness();
        h.daemon.set_session(Session::new(SESSION, SessionStatus::Running));
        h.reconciler.refresh_sessions().await;
        h.daemon.fail(DaemonCall::GetSessionState);

        h.reconciler
            .handle(DaemonEvent::status_changed(SESSION, SessionStatus::Completed))
            .await;

        assert_eq!(h.notifier.notifications().len(), 1);
        let state = h.state.lock().unwrap();
        assert_eq!(state.get(SESSION).unwrap().status, SessionStatus::Completed);
        assert_eq!(state.conversation_refresh_count(SESSION), 1);
    }

    #[tokio::test]
    async fn test_missing_new_status_aborts() {
        let h = harness();
        h.daemon.set_session(Session::new(SESSION, SessionStatus::Completed));

        h.reconciler
            .handle(DaemonEvent::SessionStatusChanged {
                session_id: SESSION.to_string(),
                old_status: None,
                new_status: None,
            })
            .await;

        assert!(h.notifier.notifications().is_empty());
        let state = h.state.lock().unwrap();
        // The refresh from step one still happened
        assert!(state.get(SESSION).is_some());
        assert_eq!(state.conversation_refresh_count(SESSION), 0);
    }

    #[tokio::test]
    async fn test_full_record_replaces_partial_state() {
        let h = harness();
        h.daemon.set_session(Session::new(SESSION, SessionStatus::Running));
        h.reconciler.refresh_sessions().await;

        let mut running = Session::new(SESSION, SessionStatus::Running);
        running.input_tokens = Some(4096);
        running.output_tokens = Some(512);
        h.daemon.set_session(running);

        h.reconciler
            .handle(DaemonEvent::status_changed(SESSION, SessionStatus::Running))
            .await;

        let state = h.state.lock().unwrap();
        let stored = state.get(SESSION).unwrap();
        assert_eq!(stored.input_tokens, Some(4096));
        assert_eq!(stored.output_tokens, Some(512));
    }

    #[tokio::test]
    async fn test_leaving_waiting_input_clears_markers() {
        let h = harness();
        h.daemon.set_session(Session::new(SESSION, SessionStatus::Running));
        h.state
            .lock()
            .unwrap()
            .mark_notified(crate::store::approval_notification_key(SESSION, "a1"));

        h.reconciler
            .handle(DaemonEvent::status_changed(SESSION, SessionStatus::WaitingInput))
            .await;
        assert!(h.state.lock().unwrap().is_notified("approval_required:s1abcdef99:a1"));

        h.reconciler
            .handle(DaemonEvent::status_changed(SESSION, SessionStatus::Running))
            .await;
        assert!(!h.state.lock().unwrap().is_notified("approval_required:s1abcdef99:a1"));
    }

    #[tokio::test]
    async fn test_notifier_failure_becomes_toast() {
        let h = harness();
        h.daemon.set_session(Session::new(SESSION, SessionStatus::Completed));
        h.notifier.fail_next();

        h.reconciler
            .handle(DaemonEvent::status_changed(SESSION, SessionStatus::Completed))
            .await;

        let toasts = h.state.lock().unwrap().drain_toasts();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].session_id.as_deref(), Some(SESSION));
    }
}
