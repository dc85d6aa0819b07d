//! Init command implementation

use anyhow::{bail, Result};
use std::path::Path;

/// Default configuration content for sessiondesk init
pub const DEFAULT_CONFIG: &str = r#"# SessionDesk Configuration
# =========================
#
# SessionDesk follows a session daemon's event stream and tells you when an
# agent needs an approval, finishes, or fails.

# ============================================================================
# DAEMON - Where the session daemon listens
# ============================================================================
#
#   url                  - Base URL of the daemon's HTTP API
#   request_timeout_secs - Timeout for a single query (the event stream has none)

[daemon]
url = "http://127.0.0.1:7777"
request_timeout_secs = 30

# ============================================================================
# RECONCILER - Event handling timing
# ============================================================================
#
#   approval_debounce_ms     - Wait before notifying about a new approval, so
#                              approvals resolved right away stay silent
#   navigation_ttl_ms        - Completion notifications are suppressed this long
#                              after you left a session
#   resolved_approval_ttl_ms - How long a resolved approval is remembered
#   bypass_poll_interval_ms  - How often expired bypass permissions are reset

[reconciler]
approval_debounce_ms = 100
navigation_ttl_ms = 5000
resolved_approval_ttl_ms = 10000
bypass_poll_interval_ms = 1000

# ============================================================================
# NOTIFICATIONS
# ============================================================================

[notifications]
enabled = true
"#;

/// Write the default config, refusing to clobber an existing file
pub fn init_command(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "Configuration already exists: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    // Create parent directory (if any)
    if let Some(parent) = config_path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(config_path, DEFAULT_CONFIG)?;
    println!("Created: {}", config_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessiondesk::config::Config;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_matches_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        let defaults = Config::default();

        assert_eq!(parsed.daemon.url, defaults.daemon.url);
        assert_eq!(
            parsed.reconciler.approval_debounce_ms,
            defaults.reconciler.approval_debounce_ms
        );
        assert_eq!(
            parsed.reconciler.bypass_poll_interval_ms,
            defaults.reconciler.bypass_poll_interval_ms
        );
        assert_eq!(parsed.notifications.enabled, defaults.notifications.enabled);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# mine").unwrap();

        assert!(init_command(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine");

        init_command(&path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);
    }
}
