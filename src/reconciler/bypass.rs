//! Bypass-permissions countdown
//!
//! Bypass can be enabled for a limited time. The expiry is polled on a
//! fixed interval rather than scheduled per session.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::info;

use crate::store::AppState;

/// Switch off bypass on every session whose expiry has passed.
///
/// Returns the ids of the sessions that were changed.
pub fn expire_bypass_permissions(state: &mut AppState, now: DateTime<Utc>) -> Vec<String> {
    let expired: Vec<String> = state
        .sessions()
        .into_iter()
        .filter(|s| s.bypass_expired(now))
        .map(|s| s.id.clone())
        .collect();

    for session_id in &expired {
        state.modify_session(session_id, |session| {
            session.dangerously_skip_permissions = false;
            session.dangerously_skip_permissions_expires_at = None;
        });
        info!(session_id = %session_id, "Bypass permissions expired");
    }

    expired
}

/// Background task running [`expire_bypass_permissions`] periodically.
///
/// Stops when dropped.
pub struct BypassExpiryWatcher {
    handle: JoinHandle<()>,
}

impl BypassExpiryWatcher {
    pub fn spawn(state: Arc<Mutex<AppState>>, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
                expire_bypass_permissions(&mut guard, Utc::now());
            }
        });
        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for BypassExpiryWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
