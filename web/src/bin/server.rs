//! Mintpass server.
//!
//! Wires configuration, the `PostgreSQL` store, the per-network ledger
//! gateway, the metadata uploader, and the orchestrator, then serves the
//! REST API with the claim sweeper running alongside until ctrl-c.

use mintpass_core::providers::SystemClock;
use mintpass_core::{EventService, Sweeper};
use mintpass_ledger::HttpGateway;
use mintpass_postgres::{PgStore, PgStoreConfig};
use mintpass_web::{AppState, Config, build_router};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mintpass=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        networks = config.networks.len(),
        "configuration loaded"
    );

    // Store: connect, verify schema.
    let store = PgStore::connect(&PgStoreConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        connect_timeout: Duration::from_secs(config.database.connect_timeout),
    })
    .await?;
    store.migrate().await?;
    tracing::info!("store connected and migrated");

    // Ledger gateway and metadata uploader.
    let gateway = Arc::new(HttpGateway::new(config.networks.clone()));
    let uploader = Arc::new(mintpass_web::metadata::PinningUploader::new(
        reqwest::Client::new(),
        config.metadata.endpoint.clone(),
        config.metadata.token.clone(),
    ));

    // Orchestrator, with the event-id counter seeded from the store.
    let service = Arc::new(
        EventService::open(
            Arc::new(store.clone()),
            gateway.clone(),
            uploader,
            Arc::new(SystemClock::new()),
        )
        .await?,
    );

    // Background sweeper.
    let sweeper = Sweeper::new(Arc::new(store.clone()), gateway, config.sweep_interval);
    let sweeper_task = tokio::spawn(sweeper.run());

    // Serve until ctrl-c.
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "mintpass server listening");

    axum::serve(listener, build_router(AppState::new(service)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    sweeper_task.abort();
    store.close().await;
    tracing::info!("mintpass server stopped");
    Ok(())
}
