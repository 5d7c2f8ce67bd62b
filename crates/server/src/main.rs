use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shelfscout_core::{
    load_config, validate_config, Aggregator, Blocklist, Fetcher, HttpFetcher, ProviderStore,
    TomlProviderStore,
};
use shelfscout_server::{create_router, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("SHELFSCOUT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;
    info!("Configuration loaded successfully");

    // Provider store
    let store = TomlProviderStore::open(&config.store.providers_path).with_context(|| {
        format!(
            "Failed to open provider store {:?}",
            config.store.providers_path
        )
    })?;
    let providers = store.list().await;
    if providers.is_empty() {
        warn!(
            "No providers configured in {:?}; searches will return nothing",
            config.store.providers_path
        );
    } else {
        info!(
            "Loaded {} providers ({} enabled)",
            providers.len(),
            providers.iter().filter(|p| p.enabled).count()
        );
    }
    let store: Arc<dyn ProviderStore> = Arc::new(store);

    // Outbound HTTP
    let fetcher: Arc<dyn Fetcher> =
        Arc::new(HttpFetcher::new(&config.http).context("Failed to create HTTP client")?);

    let blocklist = Arc::new(Blocklist::from_settings(&config.search));
    info!("Blocklist cooldown: {}s", config.search.blocklist_timer_secs);

    let aggregator = Arc::new(Aggregator::new(
        config.search.clone(),
        fetcher,
        store,
        blocklist,
    ));

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), aggregator));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
