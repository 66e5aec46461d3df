//! Request handlers for editor sessions.

mod commit;
mod records;
mod session;

pub use commit::*;
pub use records::*;
pub use session::*;
