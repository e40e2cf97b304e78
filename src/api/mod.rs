//! HTTP surface for the triage engine.
//!
//! `triage_router()` returns a composable `Router`; `server` owns the
//! listener lifecycle.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::triage_router;
pub use server::{start_server, ServerSession, TriageServer};
pub use types::ApiContext;
