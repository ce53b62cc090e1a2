use api_rest::AppState;
use hts_core::CoreConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the HTS dashboard server
///
/// Starts the REST API (with Swagger UI) on the configured address.
///
/// # Environment Variables
/// - `HTS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `HTS_RELAY_URL`: relay that forwards upstream requests (default: direct requests)
/// - `HTS_REQUEST_TIMEOUT_SECS`: per-request timeout in seconds (default: 30)
/// - `HTS_MAPPING_FILE`: YAML file overriding data element and option identifiers
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hts=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("HTS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::from_env_values(
        std::env::var("HTS_RELAY_URL").ok(),
        std::env::var("HTS_REQUEST_TIMEOUT_SECS").ok(),
        std::env::var("HTS_MAPPING_FILE").ok().map(PathBuf::from),
    )?);

    match cfg.relay_url() {
        Some(relay) => tracing::info!("++ Routing upstream requests through {}", relay),
        None => tracing::info!("++ Sending upstream requests directly"),
    }
    tracing::info!("++ Starting HTS REST on {}", rest_addr);

    let app = api_rest::router(AppState::from_config(cfg)?);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- HTS REST stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
