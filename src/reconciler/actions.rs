//! User decisions on approvals
//!
//! The session is optimistically moved back to `Running` before the daemon
//! call. A failed call surfaces as a toast; the optimistic status is kept.

use tracing::{info, warn};

use super::Reconciler;
use crate::daemon::DaemonError;
use crate::store::Toast;
use crate::SessionStatus;

impl Reconciler {
    /// Approve a pending tool call
    pub async fn approve(
        &self,
        session_id: &str,
        approval_id: &str,
        comment: Option<&str>,
    ) -> Result<(), DaemonError> {
        self.ctx
            .with_state(|state| state.update_session_status(session_id, SessionStatus::Running));

        match self
            .ctx
            .daemon
            .approve_function_call(approval_id, comment)
            .await
        {
            Ok(()) => {
                info!(session_id, approval_id, "Approved tool call");
                Ok(())
            }
            Err(e) => {
                self.report_decision_failure(session_id, "Failed to approve", &e);
                Err(e)
            }
        }
    }

    /// Deny a pending tool call with a reason the agent will see
    pub async fn deny(
        &self,
        session_id: &str,
        approval_id: &str,
        reason: &str,
    ) -> Result<(), DaemonError> {
        self.ctx
            .with_state(|state| state.update_session_status(session_id, SessionStatus::Running));

        match self
            .ctx
            .daemon
            .deny_function_call(approval_id, reason)
            .await
        {
            Ok(()) => {
                info!(session_id, approval_id, "Denied tool call");
                Ok(())
            }
            Err(e) => {
                self.report_decision_failure(session_id, "Failed to deny", &e);
                Err(e)
            }
        }
    }

    fn report_decision_failure(&self, session_id: &str, title: &str, error: &DaemonError) {
        warn!(session_id, "{}: {}", title, error);
        self.ctx.with_state(|state| {
            state.push_toast(Toast::error(title, error.to_string()).for_session(session_id))
        });
    }
}
