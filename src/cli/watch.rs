//! Watch command implementation

use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use sessiondesk::config::Config;
use sessiondesk::daemon::HttpDaemonClient;
use sessiondesk::notify::{LogNotifier, Notifier};
use sessiondesk::reconciler::{BypassExpiryWatcher, Reconciler};
use sessiondesk::store::AppState;

/// Buffered events between the socket reader thread and the reconciler
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Follow the daemon's event stream until it closes or Ctrl-C is pressed
pub async fn watch_command(config: Config) -> Result<()> {
    let settings = config.reconciler.clone();
    let daemon = Arc::new(HttpDaemonClient::with_url(
        config.daemon.url.clone(),
        config.daemon.request_timeout(),
    ));
    let notifier: Arc<dyn Notifier> = if config.notifications.enabled {
        Arc::new(LogNotifier::new())
    } else {
        Arc::new(LogNotifier::muted())
    };
    let state = Arc::new(Mutex::new(AppState::new(
        settings.navigation_ttl(),
        settings.resolved_approval_ttl(),
    )));

    let reconciler = Reconciler::new(state.clone(), daemon.clone(), notifier, settings.clone());
    reconciler.refresh_sessions().await;

    let bypass_watcher = BypassExpiryWatcher::spawn(state.clone(), settings.bypass_poll_interval());
    let toast_reporter = spawn_toast_reporter(state.clone());

    info!("Watching daemon at {}", daemon.base_url());

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let subscriber = daemon.clone();
    // A plain thread: it blocks on the socket and must not hold up runtime shutdown
    let reader = std::thread::spawn(move || -> Result<()> {
        let stream = subscriber
            .subscribe_events()
            .context("Failed to subscribe to daemon events")?;
        for event in stream {
            match event {
                Ok(event) => {
                    if tx.blocking_send(event).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Skipping daemon event: {:#}", e),
            }
        }
        Ok(())
    });

    let outcome: Result<()> = tokio::select! {
        _ = reconciler.run(rx) => match tokio::task::spawn_blocking(move || reader.join()).await? {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("Daemon event reader panicked")),
        },
        signal = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            signal.map_err(Into::into)
        }
    };

    bypass_watcher.stop();
    toast_reporter.abort();
    report_toasts(&state);

    if outcome.is_ok() {
        info!("Daemon event stream closed");
    }
    outcome
}

fn spawn_toast_reporter(state: Arc<Mutex<AppState>>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            report_toasts(&state);
        }
    })
}

/// Log and discard queued in-app toasts
fn report_toasts(state: &Mutex<AppState>) {
    let toasts = state.lock().unwrap_or_else(|e| e.into_inner()).drain_toasts();
    for toast in toasts {
        match toast.session_id {
            Some(session_id) => warn!(session_id = %session_id, "{}: {}", toast.title, toast.body),
            None => warn!("{}: {}", toast.title, toast.body),
        }
    }
}
