use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use livetail_server::api::{self, AppState};
use livetail_server::config::Config;
use livetail_server::kube::KubeClient;
use livetail_server::producer::KubeLogProducer;
use livetail_server::repository::{KubeActivityStore, KubeExecutionLister};
use livetail_server::service::{CoordinateResolver, ExecutionLocator, LiveLogService};
use livetail_server::transport::SseBroker;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "livetail_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Livetail Server...");

    // Load configuration
    let config = load_config()?;
    info!(
        "Loaded configuration: kube_api_url={}, default_namespace={}",
        config.kube_api_url, config.default_namespace
    );

    // Initialize cluster client
    let client = KubeClient::from_config(&config).context("Failed to create cluster client")?;

    info!("Cluster client initialized");

    // Initialize services
    let resolver = CoordinateResolver::new(
        Arc::new(KubeActivityStore::new(client.clone())),
        config.default_namespace.clone(),
    );
    let locator = ExecutionLocator::new(Arc::new(KubeExecutionLister::new(client.clone())));
    let producer = Arc::new(KubeLogProducer::from_config(client, &config));
    let service = Arc::new(LiveLogService::new(resolver, locator, producer));

    let shutdown = CancellationToken::new();
    let broker = Arc::new(SseBroker::new(
        shutdown.clone(),
        config.event_buffer,
        config.max_connections,
    ));

    info!("Services initialized");

    // Build router with all API endpoints
    let app = api::create_router(AppState {
        service,
        broker,
        shutdown: shutdown.clone(),
    });

    info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("Failed to start server")?;

    info!("Livetail Server stopped");

    Ok(())
}

/// Load configuration from environment or use defaults
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(e) => {
            warn!("Failed to load config from environment ({}), using defaults", e);
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Resolves on Ctrl-C after cancelling every open session
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }

    info!("Shutdown signal received, closing viewer streams");
    shutdown.cancel();
}
