//! HTTP API Server
//!
//! Starts and manages the axum-based HTTP server.

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use dp2gc_core::{EventAggregator, QuarterTable, ServerConfig};

use crate::middleware::cors::cors_layer;
use crate::routes::routes;

/// Shared application state
///
/// Built once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub quarters: Arc<QuarterTable>,
    pub aggregator: Arc<EventAggregator>,
}

impl AppState {
    pub fn new(quarters: QuarterTable, aggregator: EventAggregator) -> Self {
        Self {
            quarters: Arc::new(quarters),
            aggregator: Arc::new(aggregator),
        }
    }
}

/// Build the application router with CORS and request tracing
pub fn create_app(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .merge(routes())
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP API server
pub async fn start_server(config: &ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = create_app(state, &config.allowed_origins);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address {}:{}: {}", config.host, config.port, e))?;
    info!("HTTP API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
