//! `new_approval` and `approval_resolved` handling
//!
//! An approval created under an auto-accept policy is often resolved a few
//! milliseconds later. The "approval required" notification is therefore
//! deferred by a short debounce and dropped if the approval resolved in the
//! meantime. The deferred check runs as its own task so the event loop keeps
//! consuming events (notably the resolution) while it waits.

use tracing::{debug, info, warn};

use super::{Context, Reconciler};
use crate::notify::format::{format_mcp_tool_name, is_mcp_tool, summarize_session};
use crate::notify::ApprovalNotification;
use crate::store::{approval_notification_key, Toast};
use crate::SessionStatus;

/// Model label used when session metadata is unavailable
const FALLBACK_MODEL: &str = "AI Agent";

const FALLBACK_TOOL_NAME: &str = "Unknown tool";

/// Everything the deferred check needs to notify about one approval
#[derive(Debug, Clone)]
struct PendingApproval {
    session_id: String,
    approval_id: String,
    tool_name: String,
}

impl Reconciler {
    pub(super) async fn handle_new_approval(
        &self,
        approval_id: Option<&str>,
        session_id: Option<&str>,
        tool_name: Option<&str>,
    ) {
        let (Some(approval_id), Some(session_id)) = (approval_id, session_id) else {
            warn!(
                approval_id = approval_id.unwrap_or(""),
                session_id = session_id.unwrap_or(""),
                "New approval event missing ids, ignoring"
            );
            return;
        };

        let mut tool_name = tool_name.map(str::to_string);

        match self.ctx.daemon.get_conversation(session_id).await {
            Ok(events) => {
                let Some(event) = events.iter().find(|e| e.is_pending_approval(approval_id)) else {
                    debug!(session_id, approval_id, "Approval no longer pending, skipping");
                    return;
                };
                if tool_name.is_none() {
                    tool_name = event.tool_name.clone();
                }
            }
            Err(e) => {
                // Without the conversation we cannot confirm the approval is
                // still pending; the debounce re-check below still applies.
                warn!(session_id, approval_id, "Failed to fetch conversation: {}", e);
            }
        }

        let key = approval_notification_key(session_id, approval_id);
        if self.ctx.with_state(|state| state.is_notified(&key)) {
            debug!(%key, "Approval already notified");
            return;
        }

        let pending = PendingApproval {
            session_id: session_id.to_string(),
            approval_id: approval_id.to_string(),
            tool_name: tool_name.unwrap_or_else(|| FALLBACK_TOOL_NAME.to_string()),
        };
        self.schedule_approval_notification(pending);
    }

    fn schedule_approval_notification(&self, pending: PendingApproval) {
        let mut in_flight = self
            .pending_approvals
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        in_flight.retain(|_, handle| !handle.is_finished());

        if in_flight.contains_key(&pending.approval_id) {
            debug!(approval_id = %pending.approval_id, "Approval check already scheduled");
            return;
        }

        let ctx = self.ctx.clone();
        let debounce = self.settings.approval_debounce();
        let approval_id = pending.approval_id.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            deliver_approval_notification(&ctx, pending).await;
        });
        in_flight.insert(approval_id, handle);
    }

    pub(super) async fn handle_approval_resolved(&self, approval_id: &str, session_id: &str) {
        self.ctx.with_state(|state| {
            state.record_resolved_approval(approval_id);
            state.update_session_status(session_id, SessionStatus::Running);
            state.request_conversation_refresh(session_id);
        });

        if let Err(e) = self
            .ctx
            .notifier
            .clear_notification_by_approval_id(approval_id)
            .await
        {
            warn!(approval_id, "Failed to clear approval notification: {:#}", e);
        }
    }
}

async fn deliver_approval_notification(ctx: &Context, pending: PendingApproval) {
    let key = approval_notification_key(&pending.session_id, &pending.approval_id);

    let skip = ctx.with_state(|state| {
        state.was_recently_resolved(&pending.approval_id) || state.is_notified(&key)
    });
    if skip {
        info!(
            approval_id = %pending.approval_id,
            "Approval resolved during debounce, not notifying"
        );
        return;
    }

    let tool_name = if is_mcp_tool(&pending.tool_name) {
        format_mcp_tool_name(&pending.tool_name)
    } else {
        pending.tool_name.clone()
    };

    let (title, model) = match ctx.daemon.get_session_state(&pending.session_id).await {
        Ok(session) => (
            Some(summarize_session(&session)),
            session
                .model
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| FALLBACK_MODEL.to_string()),
        ),
        Err(e) => {
            warn!(
                session_id = %pending.session_id,
                "Failed to fetch session for approval notification, using defaults: {}", e
            );
            (None, FALLBACK_MODEL.to_string())
        }
    };

    // The resolution may have arrived while the metadata was loading
    if ctx.with_state(|state| state.was_recently_resolved(&pending.approval_id)) {
        info!(
            approval_id = %pending.approval_id,
            "Approval resolved while loading session metadata, not notifying"
        );
        return;
    }

    let notification = ApprovalNotification {
        session_id: pending.session_id.clone(),
        approval_id: pending.approval_id.clone(),
        tool_name,
        title,
        model,
    };

    match ctx.notifier.notify_approval_required(notification).await {
        Ok(()) => ctx.with_state(|state| state.mark_notified(key)),
        Err(e) => {
            warn!(approval_id = %pending.approval_id, "Failed to deliver approval notification: {:#}", e);
            ctx.with_state(|state| {
                state.push_toast(
                    Toast::error("Notification failed", format!("Approval required: {:#}", e))
                        .for_session(pending.session_id.clone()),
                )
            });
        }
    }

    let resolved = ctx.with_state(|state| {
        let resolved = state.was_recently_resolved(&pending.approval_id);
        if !resolved {
            state.update_session_status(&pending.session_id, SessionStatus::WaitingInput);
        }
        state.request_conversation_refresh(&pending.session_id);
        resolved
    });

    // Resolved while the notification was going out: its clear already ran
    if resolved {
        if let Err(e) = ctx
            .notifier
            .clear_notification_by_approval_id(&pending.approval_id)
            .await
        {
            warn!(approval_id = %pending.approval_id, "Failed to clear approval notification: {:#}", e);
        }
    }
}
