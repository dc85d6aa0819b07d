//! Replay command implementation

use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};

use sessiondesk::config::Config;
use sessiondesk::daemon::{DaemonSnapshot, EventStream, InMemoryDaemon};
use sessiondesk::notify::{RecordedNotification, RecordingNotifier};
use sessiondesk::reconciler::Reconciler;
use sessiondesk::store::AppState;

/// Feed recorded events through the reconciler against a recorded daemon
/// state and print what would have been shown.
pub async fn replay_command(config: &Config, snapshot_path: &Path, events_path: &Path) -> Result<()> {
    let snapshot = DaemonSnapshot::from_file(snapshot_path)?;
    let events = File::open(events_path)
        .with_context(|| format!("Failed to open events file: {}", events_path.display()))?;

    let settings = config.reconciler.clone();
    let daemon = Arc::new(InMemoryDaemon::from_snapshot(snapshot));
    let notifier = Arc::new(RecordingNotifier::new());
    let state = Arc::new(Mutex::new(AppState::new(
        settings.navigation_ttl(),
        settings.resolved_approval_ttl(),
    )));
    let reconciler = Reconciler::new(state.clone(), daemon.clone(), notifier.clone(), settings);

    let loaded = reconciler.refresh_sessions().await;

    let mut replayed = 0;
    for event in EventStream::new(events) {
        let event = event?;
        // The daemon changes its own state before it pushes the event
        daemon.apply_event(&event);
        reconciler.handle(event).await;
        replayed += 1;
    }
    reconciler.settle().await;

    println!("Replayed {} events over {} sessions\n", replayed, loaded);

    let records = notifier.records();
    if records.is_empty() {
        println!("No notifications.");
    } else {
        println!("Notifications ({}):", records.len());
        for record in records {
            match record {
                RecordedNotification::Notify(n) => {
                    println!("  [{}] {} - {}", n.id, n.title, n.body)
                }
                RecordedNotification::ApprovalRequired(a) => println!(
                    "  [approval {}] {} wants {}",
                    a.approval_id,
                    a.title.as_deref().unwrap_or(&a.session_id),
                    a.tool_name
                ),
                RecordedNotification::Cleared(approval_id) => {
                    println!("  [approval {}] cleared", approval_id)
                }
            }
        }
    }

    let mut state = state.lock().unwrap_or_else(|e| e.into_inner());

    let toasts = state.drain_toasts();
    if !toasts.is_empty() {
        println!("\nToasts ({}):", toasts.len());
        for toast in toasts {
            println!("  {}: {}", toast.title, toast.body);
        }
    }

    println!("\nSessions:");
    for session in state.sessions() {
        println!("  {} [{}]", session.id, session.status);
    }

    Ok(())
}
