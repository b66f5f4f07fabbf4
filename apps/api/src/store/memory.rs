//! In-memory `CvStore` used by pipeline tests.
//!
//! Each metadata write replaces the blob atomically under one lock and is
//! appended to a history, so tests can assert both the final record and the
//! sequence of transitions a job wrote.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::cv::{CvRecord, CvSelector, OptimizationMeta};
use crate::store::CvStore;

#[derive(Default)]
pub struct MemoryCvStore {
    rows: Mutex<HashMap<i64, CvRecord>>,
    writes: Mutex<Vec<OptimizationMeta>>,
}

impl MemoryCvStore {
    pub fn with_cv(cv: CvRecord) -> Arc<Self> {
        let store = Arc::new(Self::default());
        store.insert(cv);
        store
    }

    pub fn insert(&self, cv: CvRecord) {
        self.rows.lock().unwrap().insert(cv.id, cv);
    }

    pub fn metadata(&self, cv_id: i64) -> Option<OptimizationMeta> {
        self.rows
            .lock()
            .unwrap()
            .get(&cv_id)
            .map(|cv| cv.metadata.clone())
    }

    /// Every metadata blob written, in order.
    pub fn write_history(&self) -> Vec<OptimizationMeta> {
        self.writes.lock().unwrap().clone()
    }
}

/// A minimal CV row for tests.
pub fn sample_cv(id: i64, user_id: Uuid, raw_text: &str) -> CvRecord {
    CvRecord {
        id,
        user_id,
        file_name: format!("cv_{id}.pdf"),
        raw_text: raw_text.to_string(),
        metadata: OptimizationMeta::default(),
        created_at: Utc::now(),
    }
}

#[async_trait]
impl CvStore for MemoryCvStore {
    async fn fetch(&self, user_id: Uuid, selector: &CvSelector) -> Result<CvRecord, AppError> {
        let rows = self.rows.lock().unwrap();
        let found = match selector {
            CvSelector::Id(id) => rows.get(id).cloned(),
            CvSelector::FileName(name) => rows
                .values()
                .find(|cv| cv.user_id == user_id && cv.file_name == *name)
                .cloned(),
        };
        match found {
            None => Err(AppError::NotFound(format!("CV {selector} not found"))),
            Some(cv) if cv.user_id != user_id => Err(AppError::Forbidden),
            Some(cv) => Ok(cv),
        }
    }

    async fn update_metadata(
        &self,
        user_id: Uuid,
        cv_id: i64,
        metadata: &OptimizationMeta,
    ) -> Result<(), AppError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&cv_id)
            .ok_or_else(|| AppError::NotFound(format!("CV id {cv_id} not found for this user")))?;
        if row.user_id != user_id {
            return Err(AppError::Forbidden);
        }
        row.metadata = metadata.clone();
        drop(rows);
        self.writes.lock().unwrap().push(metadata.clone());
        Ok(())
    }
}
