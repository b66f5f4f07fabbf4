use crate::config::Config;
use crate::pipeline::PipelineDeps;

/// Shared application state injected into all route handlers via Axum
/// extractors. The pipeline dependencies (store, optimizer, partial-results
/// cache) are behind trait objects so tests can swap the seams.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: PipelineDeps,
    pub config: Config,
}
