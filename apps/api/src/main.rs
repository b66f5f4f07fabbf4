mod config;
mod docgen;
mod errors;
mod models;
mod optimizer;
mod pipeline;
mod routes;
mod scoring;
mod standardize;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::optimizer::http::HttpOptimizer;
use crate::optimizer::CvOptimizer;
use crate::pipeline::cache::PartialResultsCache;
use crate::pipeline::PipelineDeps;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::postgres::PgCvStore;
use crate::store::CvStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.rust_log.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CVLift API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    info!("PostgreSQL connection pool established");

    let store: Arc<dyn CvStore> = Arc::new(PgCvStore::new(pool));

    // Initialize the external optimizer client
    let optimizer: Arc<dyn CvOptimizer> = Arc::new(HttpOptimizer::new(
        config.optimizer_api_url.clone(),
        config.optimizer_api_key.clone(),
        config.optimizer_model.clone(),
    ));
    if config.optimizer_api_key.is_none() {
        warn!("OPTIMIZER_API_KEY is not set; optimization jobs will fail as service unavailable");
    }
    info!("Optimizer client initialized (model: {})", config.optimizer_model);

    // Build app state
    let state = AppState {
        pipeline: PipelineDeps {
            store,
            optimizer,
            partials: PartialResultsCache::default(),
        },
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
