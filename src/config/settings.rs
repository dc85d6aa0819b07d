//! Settings configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::daemon::DEFAULT_DAEMON_URL;

/// Connection to the session daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonSettings {
    /// Base URL of the daemon's HTTP API
    #[serde(default = "default_daemon_url")]
    pub url: String,

    /// Read timeout for queries, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_daemon_url() -> String {
    DEFAULT_DAEMON_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            url: default_daemon_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl DaemonSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Timing knobs of the event reconciler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerSettings {
    /// Delay before an approval notification is shown, giving auto-approval
    /// policies a chance to resolve it first
    #[serde(default = "default_approval_debounce_ms")]
    pub approval_debounce_ms: u64,

    /// How long a session counts as "just navigated away from"
    #[serde(default = "default_navigation_ttl_ms")]
    pub navigation_ttl_ms: u64,

    /// How long a resolved approval id is remembered
    #[serde(default = "default_resolved_approval_ttl_ms")]
    pub resolved_approval_ttl_ms: u64,

    /// Poll interval of the bypass-permissions expiry check
    #[serde(default = "default_bypass_poll_interval_ms")]
    pub bypass_poll_interval_ms: u64,
}

fn default_approval_debounce_ms() -> u64 {
    100
}

fn default_navigation_ttl_ms() -> u64 {
    5_000
}

fn default_resolved_approval_ttl_ms() -> u64 {
    10_000
}

fn default_bypass_poll_interval_ms() -> u64 {
    1_000
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            approval_debounce_ms: default_approval_debounce_ms(),
            navigation_ttl_ms: default_navigation_ttl_ms(),
            resolved_approval_ttl_ms: default_resolved_approval_ttl_ms(),
            bypass_poll_interval_ms: default_bypass_poll_interval_ms(),
        }
    }
}

impl ReconcilerSettings {
    pub fn approval_debounce(&self) -> Duration {
        Duration::from_millis(self.approval_debounce_ms)
    }

    pub fn navigation_ttl(&self) -> Duration {
        Duration::from_millis(self.navigation_ttl_ms)
    }

    pub fn resolved_approval_ttl(&self) -> Duration {
        Duration::from_millis(self.resolved_approval_ttl_ms)
    }

    /// Never zero, `tokio::time::interval` panics on a zero period
    pub fn bypass_poll_interval(&self) -> Duration {
        Duration::from_millis(self.bypass_poll_interval_ms.max(1))
    }
}

/// Notification output of the host binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// When false, notifications are only logged at debug level
    #[serde(default = "default_notifications_enabled")]
    pub enabled: bool,
}

fn default_notifications_enabled() -> bool {
    true
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: default_notifications_enabled(),
        }
    }
}
