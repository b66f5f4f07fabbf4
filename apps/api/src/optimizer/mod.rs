//! External CV optimizer — the single seam to the hosted AI rewrite service.
//!
//! ARCHITECTURAL RULE: no other module may call the AI provider directly.
//! The pipeline depends on `CvOptimizer` only, carried in app state as an
//! `Arc<dyn CvOptimizer>`, so the HTTP client can be swapped for a double in
//! tests without touching the state machine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod http;
#[cfg(test)]
pub mod mock;
pub mod prompts;

/// Result of one optimization call against the external service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeOutcome {
    pub optimized_text: String,
    pub original_score: u8,
    pub improved_score: u8,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Error)]
pub enum OptimizerError {
    /// No API key configured for the optimizer service.
    #[error("optimizer service is not configured")]
    NotConfigured,

    /// The service could not be reached, rejected our credentials, or kept
    /// failing after retries.
    #[error("optimizer service unavailable: {0}")]
    Unavailable(String),

    /// The service refused this particular request (for example a malformed
    /// input it could not process).
    #[error("optimizer rejected the request: {0}")]
    Rejected(String),

    /// The service answered, but not with output we can use.
    #[error("optimizer returned malformed output: {0}")]
    Malformed(String),
}

impl OptimizerError {
    /// True for failures a client should see as "service unavailable" rather
    /// than a generic optimization failure.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            OptimizerError::NotConfigured | OptimizerError::Unavailable(_)
        )
    }
}

/// Contract of the external optimization collaborator.
#[async_trait]
pub trait CvOptimizer: Send + Sync {
    async fn optimize(
        &self,
        raw_text: &str,
        job_description: Option<&str>,
    ) -> Result<OptimizeOutcome, OptimizerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        assert!(OptimizerError::NotConfigured.is_unavailable());
        assert!(OptimizerError::Unavailable("503".to_string()).is_unavailable());
        assert!(!OptimizerError::Rejected("bad input".to_string()).is_unavailable());
        assert!(!OptimizerError::Malformed("not json".to_string()).is_unavailable());
    }
}
