//! Programmable optimizer double for pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::optimizer::{CvOptimizer, OptimizeOutcome, OptimizerError};

enum Behavior {
    Succeed(OptimizeOutcome),
    Unavailable,
    Reject(String),
}

pub struct MockOptimizer {
    behavior: Behavior,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl MockOptimizer {
    /// Succeeds with a small multi-section CV and a 62 to 88 score move.
    pub fn succeeding() -> Self {
        Self::with_outcome(OptimizeOutcome {
            optimized_text: "Reliable backend engineer.\n\
                             Experience\n\
                             - Rebuilt the billing pipeline\n\
                             Skills\n\
                             - Rust, PostgreSQL\n"
                .to_string(),
            original_score: 62,
            improved_score: 88,
            recommendations: vec![
                "Add metrics to the billing migration bullet".to_string(),
                "Mention on-call ownership".to_string(),
            ],
        })
    }

    pub fn with_outcome(outcome: OptimizeOutcome) -> Self {
        Self {
            behavior: Behavior::Succeed(outcome),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            behavior: Behavior::Unavailable,
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn rejecting(message: &str) -> Self {
        Self {
            behavior: Behavior::Reject(message.to_string()),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Makes `optimize` block until the returned handle is notified, so tests
    /// can observe the in-flight state deterministically.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Number of times `optimize` actually ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CvOptimizer for MockOptimizer {
    async fn optimize(
        &self,
        _raw_text: &str,
        _job_description: Option<&str>,
    ) -> Result<OptimizeOutcome, OptimizerError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Succeed(outcome) => Ok(outcome.clone()),
            Behavior::Unavailable => {
                Err(OptimizerError::Unavailable("mock optimizer offline".to_string()))
            }
            Behavior::Reject(message) => Err(OptimizerError::Rejected(message.clone())),
        }
    }
}
