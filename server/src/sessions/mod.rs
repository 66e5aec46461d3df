//! Editor sessions.

mod manager;

pub use manager::{SessionHandle, SessionInfo, SessionManager};
