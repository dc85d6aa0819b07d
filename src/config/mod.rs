//! Configuration loading and management

mod io;
mod settings;

pub use settings::{DaemonSettings, NotificationSettings, ReconcilerSettings};

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Session daemon connection
    #[serde(default)]
    pub daemon: DaemonSettings,

    /// Event reconciler timing
    #[serde(default)]
    pub reconciler: ReconcilerSettings,

    /// Notification output
    #[serde(default)]
    pub notifications: NotificationSettings,
}
