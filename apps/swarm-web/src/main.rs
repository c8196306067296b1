use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::signal::{self, ctrl_c};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod extract;
mod handlers;
mod identity;
mod item_client;
mod routes;
mod startup;

use config::WebConfig;
use identity::{Identity, IdentityProbe};
use item_client::ItemClient;
use startup::{Startup, UpstreamUrl};
use swarm_db::BoardStore;

/// Per-process counters. Each replica keeps its own.
#[derive(Default)]
pub struct BoardMetrics {
    pub requests_served: AtomicU64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swarm_web=debug,tower_http=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config
    let config = WebConfig::load()?;
    let identity = Identity::from_env();
    tracing::info!("Swarm board starting...");
    tracing::info!("Host: {} (container {})", identity.hostname, identity.container_id);
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("Database: {}", config.database_url);
    tracing::info!("Static dir: {}", config.static_dir.display());

    // Secrets and upstream resolution must finish before we bind
    let startup = startup::prepare(&config).await?;

    let pool = swarm_db::db::init_db(&config.database_url).await?;
    let store = BoardStore::new(pool);

    let state = AppState::new(config.clone(), store.clone(), startup);
    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    store.close().await;
    tracing::info!("Store closed, bye");

    Ok(())
}

#[derive(Clone)]
pub struct AppState {
    pub config: WebConfig,
    pub store: BoardStore,
    pub probe: Arc<IdentityProbe>,
    pub items: ItemClient,
    pub upstream: UpstreamUrl,
    pub secret_names: Arc<Vec<String>>,
    pub metrics: Arc<BoardMetrics>,
}

impl AppState {
    fn new(config: WebConfig, store: BoardStore, startup: Startup) -> Self {
        let items = ItemClient::new(
            startup.upstream.clone(),
            &config.items_path,
            &Identity::from_env().hostname,
        );

        Self {
            config,
            store,
            probe: Arc::new(IdentityProbe::new()),
            items,
            upstream: startup.upstream,
            secret_names: Arc::new(startup.secrets.names()),
            metrics: Arc::new(BoardMetrics::default()),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
