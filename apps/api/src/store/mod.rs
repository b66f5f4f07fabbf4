//! Durable CV record store.
//!
//! The pipeline sees storage only through `CvStore`, scoped by owning user:
//! ownership mismatch is a hard error, never an empty result. The metadata
//! blob is written whole on every transition — the store offers no
//! field-scoped patch and no optimistic concurrency, so concurrent jobs for
//! one CV are last-writer-wins (an accepted property of the pipeline).

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::cv::{CvRecord, CvSelector, OptimizationMeta};

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[async_trait]
pub trait CvStore: Send + Sync {
    /// Fetches a CV for the given user. `NotFound` when no such CV exists,
    /// `Forbidden` when it exists under a different owner.
    async fn fetch(&self, user_id: Uuid, selector: &CvSelector) -> Result<CvRecord, AppError>;

    /// Replaces the CV's metadata blob. Refuses rows the user does not own.
    async fn update_metadata(
        &self,
        user_id: Uuid,
        cv_id: i64,
        metadata: &OptimizationMeta,
    ) -> Result<(), AppError>;
}
