//! End-to-end reconciler scenarios driven through the public API

mod common;

use common::create_test_desk;
use sessiondesk::daemon::DaemonEvent;
use sessiondesk::notify::RecordedNotification;
use sessiondesk::{ApprovalStatus, ConversationEvent, Session, SessionStatus};
use tokio::sync::mpsc;

const SESSION: &str = "s1a2b3c4d5e6";

/// Push a status transition the way the daemon does: state first, then event
async fn transition(desk: &common::TestDesk, status: SessionStatus) {
    let event = DaemonEvent::status_changed(SESSION, status);
    desk.daemon.apply_event(&event);
    desk.reconciler.handle(event).await;
}

#[tokio::test]
async fn test_session_lifecycle_notifies_completion_once() {
    let desk = create_test_desk(30);
    desk.daemon.set_session(
        Session::new(SESSION, SessionStatus::Starting).with_summary("Refactor the parser"),
    );
    desk.reconciler.refresh_sessions().await;

    transition(&desk, SessionStatus::Running).await;
    transition(&desk, SessionStatus::Completed).await;
    transition(&desk, SessionStatus::Completed).await;

    let notifications = desk.notifier.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Session Completed (s1a2b3c4)");
    assert!(notifications[0].body.contains("Refactor the parser"));

    let state = desk.state.lock().unwrap();
    assert_eq!(state.get(SESSION).unwrap().status, SessionStatus::Completed);
    assert_eq!(state.conversation_refresh_count(SESSION), 3);
}

#[tokio::test]
async fn test_completion_after_navigating_away_is_silent() {
    let desk = create_test_desk(30);
    desk.daemon
        .set_session(Session::new(SESSION, SessionStatus::Running));
    desk.reconciler.refresh_sessions().await;

    desk.reconciler.navigated_away_from(SESSION);
    transition(&desk, SessionStatus::Completed).await;

    assert!(desk.notifier.notifications().is_empty());
    assert_eq!(
        desk.state.lock().unwrap().get(SESSION).unwrap().status,
        SessionStatus::Completed
    );
}

#[tokio::test]
async fn test_approval_resolved_within_debounce_is_never_notified() {
    let desk = create_test_desk(100);
    desk.daemon
        .set_session(Session::new(SESSION, SessionStatus::Running));
    desk.daemon.set_conversation(
        SESSION,
        vec![ConversationEvent::tool_call(1, "Bash", "tool-1")
            .with_approval("a1", ApprovalStatus::Pending)],
    );
    desk.reconciler.refresh_sessions().await;

    let (tx, rx) = mpsc::channel(8);
    tx.send(DaemonEvent::new_approval("a1", SESSION, "Bash"))
        .await
        .unwrap();
    tx.send(DaemonEvent::approval_resolved("a1", SESSION))
        .await
        .unwrap();
    drop(tx);

    desk.reconciler.run(rx).await;

    assert!(desk.notifier.approval_notifications().is_empty());
    assert_eq!(desk.notifier.cleared_approval_ids(), vec!["a1".to_string()]);
    assert_eq!(
        desk.state.lock().unwrap().get(SESSION).unwrap().status,
        SessionStatus::Running
    );
}

#[tokio::test]
async fn test_unresolved_approval_notifies_then_clears() {
    let desk = create_test_desk(30);
    desk.daemon.set_session(
        Session::new(SESSION, SessionStatus::Running)
            .with_title("Fix flaky test")
            .with_model("sonnet"),
    );
    desk.daemon.set_conversation(
        SESSION,
        vec![
            ConversationEvent::tool_call(1, "Task", "task-1"),
            ConversationEvent::tool_call(2, "mcp__linear__create_issue", "tool-2")
                .under_task("task-1")
                .with_approval("a1", ApprovalStatus::Pending),
        ],
    );
    desk.reconciler.refresh_sessions().await;

    desk.reconciler
        .handle(DaemonEvent::NewApproval {
            approval_id: Some("a1".to_string()),
            session_id: Some(SESSION.to_string()),
            tool_name: None,
        })
        .await;
    desk.reconciler.settle().await;

    let approvals = desk.notifier.approval_notifications();
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].tool_name, "Linear - Create Issue");
    assert_eq!(approvals[0].title.as_deref(), Some("Fix flaky test"));
    assert_eq!(approvals[0].model, "sonnet");
    assert_eq!(
        desk.state.lock().unwrap().get(SESSION).unwrap().status,
        SessionStatus::WaitingInput
    );

    let resolved = DaemonEvent::approval_resolved("a1", SESSION);
    desk.daemon.apply_event(&resolved);
    desk.reconciler.handle(resolved).await;

    let records = desk.notifier.records();
    assert!(matches!(
        records.last(),
        Some(RecordedNotification::Cleared(id)) if id == "a1"
    ));
    assert_eq!(
        desk.state.lock().unwrap().get(SESSION).unwrap().status,
        SessionStatus::Running
    );
}

#[tokio::test]
async fn test_user_decision_reaches_daemon() {
    let desk = create_test_desk(30);
    desk.daemon
        .set_session(Session::new(SESSION, SessionStatus::WaitingInput));
    desk.reconciler.refresh_sessions().await;

    desk.reconciler
        .deny(SESSION, "a1", "not in this repo")
        .await
        .unwrap();

    let decisions = desk.daemon.decisions();
    assert_eq!(decisions.len(), 1);
    assert!(!decisions[0].approved);
    assert_eq!(decisions[0].note.as_deref(), Some("not in this repo"));
}
