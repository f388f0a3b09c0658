//! dp2gc-server: main binary
//!
//! Usage:
//!   dp2gc-server                    - Start the HTTP server
//!   dp2gc-server --config <path>    - Start with an explicit config file
//!   dp2gc-server --help             - Show help

use dp2gc_api::AppState;
use dp2gc_core::{Config, EventAggregator, QuarterToken, ServerConfig};
use dp2gc_portal::PortalClient;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// Serve HTTP, optionally with a config file path
    Server { config_path: Option<String> },
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1))?;

    let config_path = match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("dp2gc-server {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server { config_path } => config_path,
    };

    // Load .env file first so RUST_LOG from it takes effect
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse()?)
        )
        .init();

    let config = match config_path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            Config::from_toml_file(&path)
        }
        None => Config::load(),
    }
    .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting dp2gc-server...");
    tracing::info!("Portal: {}", config.portal.login_url);
    for token in QuarterToken::ALL {
        if let Some(range) = config.quarters.get(token) {
            tracing::debug!("Quarter {}: {} to {}", token, range.start, range.end);
        }
    }

    run_server(config).await
}

/// Parse command line arguments
fn parse_args<I>(args: I) -> anyhow::Result<RunMode>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut config_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
                config_path = Some(path);
            }
            other => anyhow::bail!("Unknown argument: {} (see --help)", other),
        }
    }

    Ok(RunMode::Server { config_path })
}

/// Print help message
fn print_help() {
    println!("dp2gc-server - class calendar aggregation API");
    println!();
    println!("Usage:");
    println!("  dp2gc-server                  Start the HTTP server");
    println!("  dp2gc-server --config <path>  Use the given TOML config file");
    println!("  dp2gc-server --help           Show this help message");
    println!("  dp2gc-server --version        Show version");
    println!();
    println!("Environment Variables:");
    println!("  API_HOST                Bind address (default: 0.0.0.0)");
    println!("  API_PORT                HTTP port (default: 8000)");
    println!("  API_ALLOWED_ORIGINS     Comma-separated CORS origins");
    println!("  PORTAL_LOGIN_URL        Portal login endpoint");
    println!("  PORTAL_API_URL          Portal calendar endpoint");
    println!("  PORTAL_TIMEOUT_SECS     Portal request timeout (default: 30)");
    println!("  AGGREGATION_CONCURRENT  Scrape months concurrently (default: false)");
    println!("  RUST_LOG                Log filter (default: info)");
}

/// Run the HTTP server until Ctrl+C
async fn run_server(config: Config) -> anyhow::Result<()> {
    let portal = PortalClient::new(config.portal.clone())
        .map_err(|e| anyhow::anyhow!("Failed to create portal client: {}", e))?;

    let aggregator = EventAggregator::new(Arc::new(portal))
        .with_concurrency(config.aggregation.concurrent);
    tracing::info!(
        "Month scraping: {}",
        if aggregator.is_concurrent() { "concurrent" } else { "sequential" }
    );

    let state = AppState::new(config.quarters.clone(), aggregator);
    tracing::info!("Press Ctrl+C to exit");

    serve_until(&config.server, state, tokio::signal::ctrl_c()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Serve HTTP until `shutdown` resolves. A server failure is returned.
async fn serve_until<F>(server_config: &ServerConfig, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        result = dp2gc_api::start_server(server_config, state) => {
            result.map_err(|e| anyhow::anyhow!("HTTP API error: {}", e))?;
            anyhow::bail!("HTTP API server stopped unexpectedly");
        }
        signal = shutdown => {
            signal?;
            tracing::info!("Shutting down...");
        }
    }

    Ok(())
}
