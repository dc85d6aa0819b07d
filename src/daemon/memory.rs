//! Snapshot-backed daemon used for replays and tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{DaemonClient, DaemonError, DaemonEvent};
use crate::{ApprovalStatus, ConversationEvent, Session};

/// Recorded daemon state: sessions and their conversations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonSnapshot {
    #[serde(default)]
    pub sessions: Vec<Session>,

    /// Conversations keyed by session id
    #[serde(default)]
    pub conversations: HashMap<String, Vec<ConversationEvent>>,
}

impl DaemonSnapshot {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot file: {}", path.display()))
    }
}

/// Daemon queries that can be made to fail on purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaemonCall {
    GetSessionState,
    GetConversation,
    ListSessions,
    ApproveFunctionCall,
    DenyFunctionCall,
}

/// A recorded approve/deny decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub approval_id: String,
    pub approved: bool,
    pub note: Option<String>,
}

struct Inner {
    sessions: HashMap<String, Session>,
    conversations: HashMap<String, Vec<ConversationEvent>>,
    failing: HashSet<DaemonCall>,
    decisions: Vec<Decision>,
    calls: HashMap<DaemonCall, usize>,
}

/// In-memory [`DaemonClient`]
pub struct InMemoryDaemon {
    inner: Mutex<Inner>,
}

impl InMemoryDaemon {
    pub fn new() -> Self {
        Self::from_snapshot(DaemonSnapshot::default())
    }

    pub fn from_snapshot(snapshot: DaemonSnapshot) -> Self {
        let sessions = snapshot
            .sessions
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();

        Self {
            inner: Mutex::new(Inner {
                sessions,
                conversations: snapshot.conversations,
                failing: HashSet::new(),
                decisions: Vec::new(),
                calls: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a call and fail it if requested
    fn enter(&self, call: DaemonCall) -> Result<MutexGuard<'_, Inner>, DaemonError> {
        let mut inner = self.lock();
        *inner.calls.entry(call).or_insert(0) += 1;
        if inner.failing.contains(&call) {
            return Err(DaemonError::Connection(format!("{:?} failed (simulated)", call)));
        }
        Ok(inner)
    }

    pub fn set_session(&self, session: Session) {
        self.lock().sessions.insert(session.id.clone(), session);
    }

    pub fn set_conversation(&self, session_id: impl Into<String>, events: Vec<ConversationEvent>) {
        self.lock().conversations.insert(session_id.into(), events);
    }

    /// Make every subsequent call of this kind fail
    pub fn fail(&self, call: DaemonCall) {
        self.lock().failing.insert(call);
    }

    pub fn recover(&self, call: DaemonCall) {
        self.lock().failing.remove(&call);
    }

    /// How many times a call was made (including failed ones)
    pub fn call_count(&self, call: DaemonCall) -> usize {
        self.lock().calls.get(&call).copied().unwrap_or(0)
    }

    pub fn decisions(&self) -> Vec<Decision> {
        self.lock().decisions.clone()
    }

    /// Mirror a push event into the snapshot, as the real daemon would have
    /// done before emitting it.
    pub fn apply_event(&self, event: &DaemonEvent) {
        let mut inner = self.lock();
        match event {
            DaemonEvent::SessionStatusChanged {
                session_id,
                new_status: Some(status),
                ..
            } => {
                if let Some(session) = inner.sessions.get_mut(session_id) {
                    session.status = *status;
                }
            }
            DaemonEvent::ApprovalResolved {
                approval_id,
                session_id,
                approved,
            } => {
                let status = match approved {
                    Some(false) => ApprovalStatus::Denied,
                    _ => ApprovalStatus::Approved,
                };
                if let Some(events) = inner.conversations.get_mut(session_id) {
                    for e in events
                        .iter_mut()
                        .filter(|e| e.approval_id.as_deref() == Some(approval_id.as_str()))
                    {
                        e.approval_status = Some(status);
                    }
                }
            }
            DaemonEvent::SessionSettingsChanged {
                session_id,
                auto_accept_edits,
                dangerously_skip_permissions,
                ..
            } => {
                if let Some(session) = inner.sessions.get_mut(session_id) {
                    if let Some(value) = auto_accept_edits {
                        session.auto_accept_edits = *value;
                    }
                    if let Some(value) = dangerously_skip_permissions {
                        session.dangerously_skip_permissions = *value;
                    }
                }
            }
            _ => {}
        }
    }
}

impl Default for InMemoryDaemon {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DaemonClient for InMemoryDaemon {
    async fn get_session_state(&self, session_id: &str) -> Result<Session, DaemonError> {
        let inner = self.enter(DaemonCall::GetSessionState)?;
        inner
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| DaemonError::NotFound(format!("session {}", session_id)))
    }

    async fn get_conversation(
        &self,
        session_id: &str,
    ) -> Result<Vec<ConversationEvent>, DaemonError> {
        let inner = self.enter(DaemonCall::GetConversation)?;
        Ok(inner
            .conversations
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, DaemonError> {
        let inner = self.enter(DaemonCall::ListSessions)?;
        Ok(inner.sessions.values().cloned().collect())
    }

    async fn approve_function_call(
        &self,
        approval_id: &str,
        comment: Option<&str>,
    ) -> Result<(), DaemonError> {
        let mut inner = self.enter(DaemonCall::ApproveFunctionCall)?;
        inner.decisions.push(Decision {
            approval_id: approval_id.to_string(),
            approved: true,
            note: comment.map(str::to_string),
        });
        Ok(())
    }

    async fn deny_function_call(&self, approval_id: &str, reason: &str) -> Result<(), DaemonError> {
        let mut inner = self.enter(DaemonCall::DenyFunctionCall)?;
        inner.decisions.push(Decision {
            approval_id: approval_id.to_string(),
            approved: false,
            note: Some(reason.to_string()),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionStatus;

    #[tokio::test]
    async fn test_failing_calls_are_counted() {
        let daemon = InMemoryDaemon::new();
        daemon.set_session(Session::new("s1", SessionStatus::Running));
        daemon.fail(DaemonCall::GetSessionState);

        assert!(daemon.get_session_state("s1").await.is_err());
        daemon.recover(DaemonCall::GetSessionState);
        assert!(daemon.get_session_state("s1").await.is_ok());
        assert_eq!(daemon.call_count(DaemonCall::GetSessionState), 2);
    }

    #[tokio::test]
    async fn test_apply_resolution_updates_conversation() {
        let daemon = InMemoryDaemon::new();
        daemon.set_conversation(
            "s1",
            vec![ConversationEvent::tool_call(1, "Bash", "b1")
                .with_approval("a1", ApprovalStatus::Pending)],
        );

        daemon.apply_event(&DaemonEvent::ApprovalResolved {
            approval_id: "a1".to_string(),
            session_id: "s1".to_string(),
            approved: Some(false),
        });

        let events = daemon.get_conversation("s1").await.unwrap();
        assert_eq!(events[0].approval_status, Some(ApprovalStatus::Denied));
    }

    #[test]
    fn test_parse_snapshot() {
        let json = r#"{
            "sessions": [{"id": "s1", "status": "running", "title": "Fix the build"}],
            "conversations": {"s1": [{"id": 1, "event_type": "message", "role": "user", "content": "fix it"}]}
        }"#;
        let snapshot: DaemonSnapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.sessions.len(), 1);
        assert_eq!(snapshot.conversations["s1"].len(), 1);
    }
}
