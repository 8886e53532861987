//! Service bootstrap.
//!
//! Startup order:
//! 1. Load the catalog and build the recommender (fatal on failure)
//! 2. Open the database pool
//! 3. Serve until Ctrl-C, then close the pool

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use data_loader::Catalog;
use recommender::{FeatureConfig, U2IRecommender};

use crate::config::Config;
use crate::cors::cors_layer;
use crate::database::DatabaseManager;

/// Shared state handed to request handlers
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<U2IRecommender>,
    pub catalog: Arc<Catalog>,
    pub db: PgPool,
}

/// Router with the service middleware and no domain routes
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load catalog and model from the configured locations
pub async fn load_recommender(config: &Config) -> Result<(Catalog, U2IRecommender)> {
    let start_time = Instant::now();
    let data_dir = config.recommender.data_dir.clone();
    let model_path = config.recommender.model_path.clone();

    let (catalog, recommender) = tokio::task::spawn_blocking(move || -> Result<_> {
        let catalog = Catalog::load_from_dir(&data_dir)
            .with_context(|| format!("Failed to load catalog from {}", data_dir.display()))?;
        let recommender = U2IRecommender::new(&model_path, &catalog, &FeatureConfig::default())
            .with_context(|| format!("Failed to build recommender from {}", model_path.display()))?;
        Ok((catalog, recommender))
    })
    .await
    .context("Recommender loading task panicked")??;

    info!(
        "Recommender `{}` loaded in {:.2?}",
        recommender.model_name(),
        start_time.elapsed()
    );
    Ok((catalog, recommender))
}

pub async fn run(config: Config) -> Result<()> {
    let (catalog, recommender) = load_recommender(&config).await?;
    let cors = cors_layer(&config.cors).context("Invalid CORS configuration")?;

    let database = DatabaseManager::connect(&config.database)
        .await
        .context("Failed to open database pool")?;

    let state = AppState {
        recommender: Arc::new(recommender),
        catalog: Arc::new(catalog),
        db: database.pool().clone(),
    };
    let app = build_router(state, cors);

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Listening on http://{}", address);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    database.close().await;
    served.context("Server error")?;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
    }
}
