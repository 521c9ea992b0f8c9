//! Live sessions — keep bindings current as the tree mutates and route
//! key events, all from one cooperative task.

pub mod debounce;
pub mod session;

pub use debounce::Debouncer;
pub use session::{Command, OverlaySnapshot, Session, SessionHandle};

/// Session error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The session task has stopped.
    #[error("session closed")]
    Closed,
}
