use std::sync::Arc;

use anyhow::Context;
use storage::services::{
    BatchProcessorConfig, RatingEngine, RatingEngineConfig, TierClassifier,
};
use storage::{Database, MemoryStore, PgStore, RatingStore};

mod app;
mod config;
mod error;
mod features;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting contest rating API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    tracing::info!("Configuration loaded successfully");

    let store: Arc<dyn RatingStore> = match &config.database_url {
        Some(database_url) => {
            tracing::info!(
                "Connecting to database at: {}",
                database_url.split('@').next_back().unwrap_or("unknown")
            );
            let db = Database::new(database_url)
                .await
                .context("Failed to initialize database")?;
            tracing::info!("Database connection established");

            tracing::info!("Running database migrations");
            db.run_migrations()
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Database migrations completed successfully");

            Arc::new(PgStore::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, ratings are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let engine = RatingEngine::new(RatingEngineConfig {
        tolerance: config.rating_tolerance,
        max_iterations: config.rating_max_iterations,
        ..RatingEngineConfig::default()
    })
    .context("Invalid rating engine configuration")?;

    let state = AppState::new(
        store,
        engine,
        TierClassifier::default(),
        BatchProcessorConfig {
            storage_timeout: config.storage_timeout,
        },
    );

    let bind_address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;

    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!(
        "Swagger UI available at http://{}/swagger-ui/",
        bind_address
    );

    axum::serve(listener, app::router(state))
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
