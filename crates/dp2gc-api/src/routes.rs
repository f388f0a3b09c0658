//! Route definitions

use axum::{routing::get, Router};

use crate::handlers::{get_dhu_event_list, root};
use crate::server::AppState;

/// Create the API router
pub fn routes() -> Router<AppState> {
    Router::new()
        // Liveness check
        .route("/", get(root))
        // Quarter event aggregation
        .route("/get_dhu_event_list", get(get_dhu_event_list))
}
