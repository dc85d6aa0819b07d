//! Daemon event reconciliation
//!
//! The [`Reconciler`] consumes the daemon's push events one at a time and
//! keeps the local [`AppState`] in line with them:
//!
//! - `session_status_changed` re-fetches the session and raises an
//!   edge-triggered completed/failed notification
//! - `new_approval` raises a debounced "approval required" notification
//! - `approval_resolved` feeds the debounce's race guard and clears the
//!   notification
//! - `session_settings_changed` applies permission policy flags
//!
//! Every handler is fault-isolated: daemon or notifier failures are logged
//! (and surfaced as toasts where the user has to know), never propagated.
//! The local store is treated as possibly stale, so handlers re-fetch
//! authoritative state instead of trusting the event payload.

mod actions;
mod approval;
mod bypass;
mod settings;
mod status;

pub use bypass::{expire_bypass_permissions, BypassExpiryWatcher};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ReconcilerSettings;
use crate::daemon::{DaemonClient, DaemonEvent};
use crate::notify::{NotificationOptions, Notifier};
use crate::store::{AppState, Toast};

/// Collaborators shared by the reconciler and its deferred tasks
#[derive(Clone)]
pub(crate) struct Context {
    pub(crate) state: Arc<Mutex<AppState>>,
    pub(crate) daemon: Arc<dyn DaemonClient>,
    pub(crate) notifier: Arc<dyn Notifier>,
}

impl Context {
    pub(crate) fn lock(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("App state lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Run a closure against the state without holding the lock afterwards
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut AppState) -> R) -> R {
        let mut state = self.lock();
        f(&mut state)
    }

    /// Deliver a generic notification, turning a sink failure into a toast
    pub(crate) async fn deliver(&self, options: NotificationOptions) -> bool {
        let session_id = options.session_id.clone();
        let title = options.title.clone();

        match self.notifier.notify(options).await {
            Ok(()) => true,
            Err(e) => {
                warn!(session_id = %session_id, "Failed to deliver notification '{}': {:#}", title, e);
                self.with_state(|state| {
                    state.push_toast(
                        Toast::error("Notification failed", format!("{}: {:#}", title, e))
                            .for_session(session_id),
                    )
                });
                false
            }
        }
    }
}

/// Applies daemon push events to the local application state
pub struct Reconciler {
    ctx: Context,
    settings: ReconcilerSettings,

    /// Deferred approval checks still waiting out the debounce, by approval id
    pending_approvals: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl Reconciler {
    pub fn new(
        state: Arc<Mutex<AppState>>,
        daemon: Arc<dyn DaemonClient>,
        notifier: Arc<dyn Notifier>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            ctx: Context {
                state,
                daemon,
                notifier,
            },
            settings,
            pending_approvals: Mutex::new(HashMap::new()),
        }
    }

    /// Shared application state
    pub fn state(&self) -> Arc<Mutex<AppState>> {
        self.ctx.state.clone()
    }

    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    /// Apply one daemon event
    pub async fn handle(&self, event: DaemonEvent) {
        debug!(kind = event.kind(), session_id = event.session_id().unwrap_or(""), "Daemon event");

        match event {
            DaemonEvent::SessionStatusChanged {
                session_id,
                new_status,
                ..
            } => self.handle_status_changed(&session_id, new_status).await,
            DaemonEvent::NewApproval {
                approval_id,
                session_id,
                tool_name,
            } => {
                self.handle_new_approval(
                    approval_id.as_deref(),
                    session_id.as_deref(),
                    tool_name.as_deref(),
                )
                .await
            }
            DaemonEvent::ApprovalResolved {
                approval_id,
                session_id,
                ..
            } => self.handle_approval_resolved(&approval_id, &session_id).await,
            DaemonEvent::SessionSettingsChanged {
                session_id,
                auto_accept_edits,
                dangerously_skip_permissions,
                dangerously_skip_permissions_timeout_ms,
                reason,
            } => self.handle_settings_changed(settings::SettingsChange {
                session_id,
                auto_accept_edits,
                dangerously_skip_permissions,
                dangerously_skip_permissions_timeout_ms,
                reason,
            })
            .await,
        }
    }

    /// Process events until the channel closes, then wait for deferred work
    pub async fn run(&self, mut events: mpsc::Receiver<DaemonEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        info!("Daemon event channel closed");
        self.settle().await;
    }

    /// Wait for every deferred approval check to finish
    pub async fn settle(&self) {
        loop {
            let handles: Vec<_> = {
                let mut pending = self
                    .pending_approvals
                    .lock()
                    .unwrap_or_else(|e| e.into_inner());
                pending.drain().map(|(_, handle)| handle).collect()
            };
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    if !e.is_cancelled() {
                        warn!("Deferred approval check panicked: {}", e);
                    }
                }
            }
        }
    }

    /// Load every session from the daemon into the store.
    ///
    /// Returns the number of sessions loaded, 0 when the daemon is unreachable.
    pub async fn refresh_sessions(&self) -> usize {
        match self.ctx.daemon.list_sessions().await {
            Ok(sessions) => {
                let count = sessions.len();
                self.ctx.with_state(|state| {
                    for session in sessions {
                        state.update_session(session);
                    }
                });
                info!("Loaded {} sessions from daemon", count);
                count
            }
            Err(e) => {
                warn!("Failed to list sessions: {}", e);
                0
            }
        }
    }

    /// Record that the user just left a session view, e.g. after continuing
    /// or forking it, so its completion does not pop up a notification.
    pub fn navigated_away_from(&self, session_id: &str) {
        self.ctx
            .with_state(|state| state.track_navigated_from(session_id));
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        let pending = self
            .pending_approvals
            .get_mut()
            .unwrap_or_else(|e| e.into_inner());
        for (_, handle) in pending.drain() {
            handle.abort();
        }
    }
}
