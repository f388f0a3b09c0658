//! dp2gc-api: HTTP API for dp2gc
//!
//! Serves the quarter event aggregation endpoint.
//! Built with axum for async HTTP handling.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use error::{ApiError, Result};
pub use server::{create_app, start_server, AppState};
