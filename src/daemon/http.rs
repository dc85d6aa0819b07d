//! HTTP client for a running session daemon.
//!
//! ureq is blocking, so every query runs on the blocking pool.

use std::io::Read;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{DaemonClient, DaemonError, EventStream};
use crate::{ConversationEvent, Session};

/// Default daemon URL
pub const DEFAULT_DAEMON_URL: &str = "http://127.0.0.1:7777";

fn encode_url_path_segment(segment: &str) -> String {
    // RFC3986 unreserved = ALPHA / DIGIT / "-" / "." / "_" / "~"
    let mut out = String::with_capacity(segment.len());
    for &b in segment.as_bytes() {
        let is_unreserved =
            matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~');
        if is_unreserved {
            out.push(b as char);
        } else {
            out.push('%');
            out.push_str(&format!("{:02X}", b));
        }
    }
    out
}

fn map_ureq_error(err: ureq::Error) -> DaemonError {
    match err {
        ureq::Error::Status(404, response) => {
            DaemonError::NotFound(response.get_url().to_string())
        }
        ureq::Error::Status(code, response) => DaemonError::Status {
            code,
            message: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => DaemonError::Connection(transport.to_string()),
    }
}

/// Daemon client speaking JSON over HTTP
#[derive(Clone)]
pub struct HttpDaemonClient {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpDaemonClient {
    /// Create a client with the default URL and timeout
    pub fn new() -> Self {
        Self::with_url(DEFAULT_DAEMON_URL, Duration::from_secs(30))
    }

    pub fn with_url(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(request_timeout)
            .build();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T>(&self, path: String) -> Result<T, DaemonError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let agent = self.agent.clone();
        let url = format!("{}{}", self.base_url, path);

        tokio::task::spawn_blocking(move || {
            let response = agent.get(&url).call().map_err(map_ureq_error)?;
            response
                .into_json::<T>()
                .map_err(|e| DaemonError::Decode(e.to_string()))
        })
        .await
        .map_err(|e| DaemonError::Connection(format!("request task failed: {}", e)))?
    }

    async fn post_json<B>(&self, path: String, body: B) -> Result<(), DaemonError>
    where
        B: Serialize + Send + 'static,
    {
        let agent = self.agent.clone();
        let url = format!("{}{}", self.base_url, path);

        tokio::task::spawn_blocking(move || {
            agent
                .post(&url)
                .send_json(body)
                .map(|_| ())
                .map_err(map_ureq_error)
        })
        .await
        .map_err(|e| DaemonError::Connection(format!("request task failed: {}", e)))?
    }

    /// Open the push event subscription.
    ///
    /// Blocking: the returned stream reads from the socket as it is iterated,
    /// so drive it from a blocking thread.
    pub fn subscribe_events(
        &self,
    ) -> Result<EventStream<Box<dyn Read + Send + Sync + 'static>>, DaemonError> {
        let url = format!("{}/events", self.base_url);
        // The subscription stays open indefinitely; no read timeout here.
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .build();
        let response = agent.get(&url).call().map_err(map_ureq_error)?;
        Ok(EventStream::new(response.into_reader()))
    }
}

impl Default for HttpDaemonClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct ApproveBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

#[derive(Serialize)]
struct DenyBody {
    reason: String,
}

#[async_trait]
impl DaemonClient for HttpDaemonClient {
    async fn get_session_state(&self, session_id: &str) -> Result<Session, DaemonError> {
        self.get_json(format!("/sessions/{}", encode_url_path_segment(session_id)))
            .await
    }

    async fn get_conversation(
        &self,
        session_id: &str,
    ) -> Result<Vec<ConversationEvent>, DaemonError> {
        self.get_json(format!(
            "/sessions/{}/conversation",
            encode_url_path_segment(session_id)
        ))
        .await
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, DaemonError> {
        self.get_json("/sessions".to_string()).await
    }

    async fn approve_function_call(
        &self,
        approval_id: &str,
        comment: Option<&str>,
    ) -> Result<(), DaemonError> {
        self.post_json(
            format!("/approvals/{}/approve", encode_url_path_segment(approval_id)),
            ApproveBody {
                comment: comment.map(str::to_string),
            },
        )
        .await
    }

    async fn deny_function_call(&self, approval_id: &str, reason: &str) -> Result<(), DaemonError> {
        self.post_json(
            format!("/approvals/{}/deny", encode_url_path_segment(approval_id)),
            DenyBody {
                reason: reason.to_string(),
            },
        )
        .await
    }
}
