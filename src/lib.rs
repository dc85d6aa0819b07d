//! SessionDesk - supervise long-running agent sessions
//!
//! SessionDesk sits between a session daemon and a desktop front-end. The
//! daemon runs the agents; SessionDesk keeps a local picture of every session
//! current and decides when the human has to be told something.
//!
//! ## Pieces
//!
//! 1. **Task grouping** ([`grouping`]): folds the events an agent produced
//!    inside a `Task` sub-task under that task, and tracks which task blocks
//!    are expanded, force-expanding those waiting on an approval.
//!
//! 2. **Reconciler** ([`reconciler`]): applies the daemon's push events
//!    (status changes, new and resolved approvals, permission settings) to
//!    the [`store::AppState`] and raises or suppresses notifications.

pub mod config;
pub mod daemon;
pub mod domain;
pub mod grouping;
pub mod notify;
pub mod reconciler;
pub mod store;

pub use domain::*;
