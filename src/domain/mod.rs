//! Core domain types for SessionDesk

mod event;
mod session;

pub use event::{ApprovalStatus, ConversationEvent, EventType, Role, TASK_TOOL_NAME};
pub use session::{Session, SessionStatus};
