//! Persistence collaborators for the admin backend.

mod http;

pub use http::{BackendSetupError, HttpBackend};
