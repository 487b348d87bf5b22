//! maildrip - Scheduled campaign delivery server entry point

mod http;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use maildrip_common::config::{Config, LoggingConfig};
use maildrip_core::{Dispatcher, HttpEmailTransport, RetryPolicy, StaticCredentials};
use maildrip_storage::db::DatabasePool;
use maildrip_storage::store::CampaignStore;
use maildrip_storage::{MemoryCampaignStore, PgCampaignStore};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::http::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(&config.logging);

    info!("Starting maildrip delivery server...");

    // Build the campaign store
    let store = build_store(&config).await?;

    // Email transport and delivery credentials
    let transport = Arc::new(HttpEmailTransport::from_config(&config.transport)?);
    let credentials = Arc::new(StaticCredentials::from_config(&config.credentials));

    // Dispatcher over the store, transport, and retry policy
    let policy = RetryPolicy::from_config(&config.scheduler);
    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        transport,
        credentials,
        policy,
    ));

    // Start the dispatch loop
    let dispatch_handle = {
        let dispatcher = dispatcher.clone();
        let poll_interval = Duration::from_secs(config.scheduler.poll_interval_secs);
        tokio::spawn(async move {
            dispatcher.run(poll_interval).await;
        })
    };

    // Start the admin/API server
    let api_handle = {
        let state = Arc::new(AppState { store, dispatcher });
        let bind = format!("{}:{}", config.server.bind_address, config.server.port);
        tokio::spawn(async move {
            let app = create_router(state);
            let listener = match tokio::net::TcpListener::bind(&bind).await {
                Ok(listener) => listener,
                Err(e) => {
                    tracing::error!("Failed to bind API server on {}: {}", bind, e);
                    return;
                }
            };
            info!("Starting API server on {}", bind);
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("API server error: {}", e);
            }
        })
    };

    info!("maildrip server started successfully");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    dispatch_handle.abort();
    api_handle.abort();

    info!("maildrip server shutdown complete");

    Ok(())
}

/// Select the campaign store backend from configuration
async fn build_store(config: &Config) -> Result<Arc<dyn CampaignStore>> {
    match config.database.backend.as_str() {
        "postgres" => {
            let db_pool = DatabasePool::new(&config.database).await?;
            info!("Database connection established");

            db_pool.migrate().await?;
            info!("Database migrations completed");

            Ok(Arc::new(PgCampaignStore::new(db_pool.pool().clone())))
        }
        "memory" => {
            info!("Using in-memory campaign store");
            Ok(Arc::new(MemoryCampaignStore::new()))
        }
        other => bail!("unknown database backend: {}", other),
    }
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},maildrip=debug", config.level)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
