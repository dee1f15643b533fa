//! Uni Borrow server

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use uni_borrow::{
    api,
    config::{AppConfig, LoggingConfig, StorageBackend},
    repository::{MemoryStore, PgStore, RecordStore},
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.logging);

    tracing::info!("Starting Uni Borrow v{}", env!("CARGO_PKG_VERSION"));

    let store = open_store(&config).await?;
    let services = Services::new(store, config.auth.clone());

    if config.storage.seed_demo {
        services
            .seed_demo()
            .await
            .context("Failed to seed demo data")?;
    }

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("uni_borrow={},tower_http=debug", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            let store = match &config.storage.snapshot_path {
                Some(path) => MemoryStore::open(path)
                    .await
                    .with_context(|| format!("Failed to open snapshot {}", path.display()))?,
                None => MemoryStore::new(),
            };
            match store.snapshot_path() {
                Some(path) => tracing::info!(
                    "Using in-memory record store mirrored to {}",
                    path.display()
                ),
                None => tracing::info!("Using in-memory record store"),
            }
            Ok(Arc::new(store))
        }
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .connect(&config.database.url)
                .await
                .context("Failed to connect to database")?;

            tracing::info!("Connected to database");

            let store = PgStore::new(pool);
            store.migrate().await.context("Failed to run database migrations")?;

            tracing::info!("Database migrations completed");
            Ok(Arc::new(store))
        }
    }
}
