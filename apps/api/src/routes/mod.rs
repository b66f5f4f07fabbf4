pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Optimization pipeline
        .route("/api/v1/cvs/optimize", post(handlers::handle_optimize))
        .route(
            "/api/v1/cvs/:id/optimize/status",
            get(handlers::handle_status),
        )
        .route(
            "/api/v1/cvs/:id/optimize/partial",
            get(handlers::handle_partial_results),
        )
        .route(
            "/api/v1/cvs/:id/optimize/document",
            get(handlers::handle_download),
        )
        // Ad-hoc preview (no job)
        .route("/api/v1/cvs/:id/preview", post(handlers::handle_preview))
        .with_state(state)
}
