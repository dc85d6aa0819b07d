//! Shared test utilities for reconciler integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use sessiondesk::config::ReconcilerSettings;
use sessiondesk::daemon::InMemoryDaemon;
use sessiondesk::notify::RecordingNotifier;
use sessiondesk::reconciler::Reconciler;
use sessiondesk::store::AppState;

/// A reconciler wired to an in-memory daemon and a recording notifier
pub struct TestDesk {
    pub reconciler: Reconciler,
    pub daemon: Arc<InMemoryDaemon>,
    pub notifier: Arc<RecordingNotifier>,
    pub state: Arc<Mutex<AppState>>,
}

/// Creates a desk with the given approval debounce
pub fn create_test_desk(approval_debounce_ms: u64) -> TestDesk {
    let settings = ReconcilerSettings {
        approval_debounce_ms,
        ..ReconcilerSettings::default()
    };
    let state = Arc::new(Mutex::new(AppState::new(
        settings.navigation_ttl(),
        settings.resolved_approval_ttl(),
    )));
    let daemon = Arc::new(InMemoryDaemon::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let reconciler = Reconciler::new(state.clone(), daemon.clone(), notifier.clone(), settings);

    TestDesk {
        reconciler,
        daemon,
        notifier,
        state,
    }
}
