//! Application state shared between the reconciler and the views
//!
//! [`AppState`] is the single source of truth for session records and for the
//! bookkeeping the reconciler needs: which notifications were already shown,
//! which sessions the user just left, and which approvals resolved recently.
//! It is handed around as `Arc<Mutex<AppState>>`; the lock is never held
//! across an await point.

mod expiring;

pub use expiring::ExpiringSet;

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{Session, SessionStatus};

/// Maximum number of undismissed toasts kept around
const MAX_TOASTS: usize = 20;

/// A user-visible error raised by a failed downstream action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub body: String,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Toast {
    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            session_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn for_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Dedup key for the "approval required" notification of one approval
pub fn approval_notification_key(session_id: &str, approval_id: &str) -> String {
    format!("approval_required:{}:{}", session_id, approval_id)
}

/// Local session store and notification bookkeeping
pub struct AppState {
    sessions: HashMap<String, Session>,

    /// Notification ids that were already delivered
    notified: HashSet<String>,

    /// Sessions the user navigated away from moments ago
    recently_navigated_from: ExpiringSet,

    /// Approvals that resolved moments ago (possibly before anyone saw them)
    recently_resolved_approvals: ExpiringSet,

    toasts: VecDeque<Toast>,

    /// Conversation refresh requests per session
    conversation_refreshes: HashMap<String, u64>,

    /// Incremented on every mutation so views know when to re-read
    generation: u64,
}

impl AppState {
    pub fn new(navigation_ttl: Duration, resolved_approval_ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            notified: HashSet::new(),
            recently_navigated_from: ExpiringSet::new(navigation_ttl),
            recently_resolved_approvals: ExpiringSet::new(resolved_approval_ttl),
            toasts: VecDeque::new(),
            conversation_refreshes: HashMap::new(),
            generation: 0,
        }
    }

    /// Current generation counter
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn touch(&mut self) {
        self.generation += 1;
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// All sessions, most recently active first
    pub fn sessions(&self) -> Vec<&Session> {
        let mut sessions: Vec<_> = self.sessions.values().collect();
        sessions.sort_by(|a, b| {
            b.last_activity_at
                .cmp(&a.last_activity_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        sessions
    }

    /// Replace the whole record with an authoritative snapshot.
    ///
    /// Archiving a session drops its notification markers and refresh counter.
    pub fn update_session(&mut self, session: Session) {
        if session.archived {
            self.forget_bookkeeping(&session.id);
        }
        self.sessions.insert(session.id.clone(), session);
        self.touch();
    }

    /// Set only the status of a known session.
    ///
    /// Returns false if the session is not in the store.
    pub fn update_session_status(&mut self, session_id: &str, status: SessionStatus) -> bool {
        let Some(session) = self.sessions.get_mut(session_id) else {
            return false;
        };
        session.status = status;
        self.touch();
        true
    }

    /// Apply a closure to a known session
    pub fn modify_session(&mut self, session_id: &str, f: impl FnOnce(&mut Session)) -> bool {
        let Some(session) = self.sessions.get_mut(session_id) else {
            return false;
        };
        f(session);
        self.touch();
        true
    }

    pub fn remove_session(&mut self, session_id: &str) -> Option<Session> {
        let removed = self.sessions.remove(session_id);
        if removed.is_some() {
            self.forget_bookkeeping(session_id);
            self.touch();
        }
        removed
    }

    fn forget_bookkeeping(&mut self, session_id: &str) {
        self.clear_notifications_for_session(session_id);
        self.conversation_refreshes.remove(session_id);
    }

    // ------------------------------------------------------------------
    // Notification dedup
    // ------------------------------------------------------------------

    pub fn is_notified(&self, key: &str) -> bool {
        self.notified.contains(key)
    }

    pub fn mark_notified(&mut self, key: impl Into<String>) {
        self.notified.insert(key.into());
    }

    /// Forget every notification marker that belongs to a session
    pub fn clear_notifications_for_session(&mut self, session_id: &str) -> usize {
        let before = self.notified.len();
        self.notified
            .retain(|key| !key.split(':').any(|segment| segment == session_id));
        before - self.notified.len()
    }

    // ------------------------------------------------------------------
    // Short-lived caches
    // ------------------------------------------------------------------

    /// Remember that the user just left this session
    pub fn track_navigated_from(&mut self, session_id: impl Into<String>) {
        self.recently_navigated_from.insert(session_id);
    }

    pub fn was_recently_navigated_from(&self, session_id: &str) -> bool {
        self.recently_navigated_from.contains(session_id)
    }

    pub fn record_resolved_approval(&mut self, approval_id: impl Into<String>) {
        self.recently_resolved_approvals.insert(approval_id);
    }

    pub fn was_recently_resolved(&self, approval_id: &str) -> bool {
        self.recently_resolved_approvals.contains(approval_id)
    }

    // ------------------------------------------------------------------
    // Side-effect requests
    // ------------------------------------------------------------------

    /// Ask views showing this session to reload its conversation
    pub fn request_conversation_refresh(&mut self, session_id: &str) {
        *self
            .conversation_refreshes
            .entry(session_id.to_string())
            .or_insert(0) += 1;
        self.touch();
    }

    /// How many conversation refreshes were requested for a session
    pub fn conversation_refresh_count(&self, session_id: &str) -> u64 {
        self.conversation_refreshes
            .get(session_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn push_toast(&mut self, toast: Toast) {
        if self.toasts.len() >= MAX_TOASTS {
            self.toasts.pop_front();
        }
        self.toasts.push_back(toast);
        self.touch();
    }

    /// Take every queued toast, oldest first
    pub fn drain_toasts(&mut self) -> Vec<Toast> {
        self.toasts.drain(..).collect()
    }
}
