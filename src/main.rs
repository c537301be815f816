//! volunteer-hub server entry point.
//!
//! Starts the Axum HTTP server with REST, chat relay and WebSocket
//! endpoints, plus the periodic completion sweep.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use volunteer_hub::app_state::AppState;
use volunteer_hub::chat::{ChatRelay, CompletionClient, GeminiClient};
use volunteer_hub::config::HubConfig;
use volunteer_hub::domain::{Clock, EventBus, SystemClock};
use volunteer_hub::persistence::{MemoryStore, PostgresStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = HubConfig::from_env().context("invalid LISTEN_ADDR")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting volunteer-hub");

    // Build persistence layer
    let store: Arc<dyn Store> = match &config.database {
        Some(db) => {
            let store = PostgresStore::connect(db)
                .await
                .context("failed to connect to PostgreSQL")?;
            tracing::info!(max_connections = db.max_connections, "using PostgreSQL store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    // Build domain layer
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let event_bus = EventBus::new(config.event_bus_capacity);

    // Build chat relay
    if config.chat.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not set; chat requests will fail");
    }
    let client: Arc<dyn CompletionClient> =
        Arc::new(GeminiClient::new(&config.chat).context("failed to build upstream client")?);
    let chat = ChatRelay::from_config(&config.chat, client, Arc::clone(&clock));

    // Build service layer and application state
    let app_state = AppState::new(store, clock, event_bus, chat);

    if config.sweep_interval_secs > 0 {
        let _sweep = Arc::clone(&app_state.sweeper)
            .spawn(Duration::from_secs(config.sweep_interval_secs));
        tracing::info!(interval_secs = config.sweep_interval_secs, "completion sweep scheduled");
    }

    // Build router
    let app = volunteer_hub::build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
