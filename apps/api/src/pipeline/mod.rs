//! CV optimization job pipeline.
//!
//! Flow: launch (validate, short-circuit on cached result, write initial
//! state) → detached background runner (state machine) → durable record.
//! Disconnected clients poll the status endpoint, which reconciles the
//! durable record with the partial-results cache.

use std::sync::Arc;

use crate::optimizer::CvOptimizer;
use crate::pipeline::cache::PartialResultsCache;
use crate::store::CvStore;

pub mod cache;
pub mod handlers;
pub mod launcher;
pub mod runner;
pub mod stage;
pub mod status;

/// Everything the pipeline needs, shared by the launch request, the detached
/// runner it spawns, and the read-only pollers.
#[derive(Clone)]
pub struct PipelineDeps {
    pub store: Arc<dyn CvStore>,
    pub optimizer: Arc<dyn CvOptimizer>,
    pub partials: PartialResultsCache,
}
