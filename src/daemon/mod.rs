//! Session daemon integration.
//!
//! The daemon owns the agent sessions. SessionDesk talks to it two ways:
//!
//! - **Queries** through [`DaemonClient`]: session snapshots, conversations,
//!   and approval decisions.
//! - **Push events** as an NDJSON stream of [`DaemonEvent`]s, decoded by
//!   [`EventStream`] and fed to the reconciler.
//!
//! [`HttpDaemonClient`] talks to a running daemon over HTTP.
//! [`InMemoryDaemon`] serves a recorded snapshot for replays and tests.

mod events;
mod http;
mod memory;
mod stream;

pub use events::DaemonEvent;
pub use http::{HttpDaemonClient, DEFAULT_DAEMON_URL};
pub use memory::{DaemonCall, DaemonSnapshot, Decision, InMemoryDaemon};
pub use stream::EventStream;

use async_trait::async_trait;

use crate::{ConversationEvent, Session};

/// Errors returned by daemon queries
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("Failed to reach daemon: {0}")]
    Connection(String),

    #[error("Daemon returned status {code}: {message}")]
    Status { code: u16, message: String },

    #[error("Failed to decode daemon response: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Query side of the daemon
#[async_trait]
pub trait DaemonClient: Send + Sync {
    /// Authoritative snapshot of one session
    async fn get_session_state(&self, session_id: &str) -> Result<Session, DaemonError>;

    /// Full conversation of a session, in arrival order
    async fn get_conversation(&self, session_id: &str)
    -> Result<Vec<ConversationEvent>, DaemonError>;

    async fn list_sessions(&self) -> Result<Vec<Session>, DaemonError>;

    async fn approve_function_call(
        &self,
        approval_id: &str,
        comment: Option<&str>,
    ) -> Result<(), DaemonError>;

    async fn deny_function_call(&self, approval_id: &str, reason: &str)
    -> Result<(), DaemonError>;
}
