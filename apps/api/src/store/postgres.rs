//! PostgreSQL-backed `CvStore`.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::cv::{CvRecord, CvSelector, OptimizationMeta};
use crate::store::CvStore;

const CV_COLUMNS: &str = "id, user_id, file_name, raw_text, metadata, created_at";

pub struct PgCvStore {
    pool: PgPool,
}

impl PgCvStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CvStore for PgCvStore {
    async fn fetch(&self, user_id: Uuid, selector: &CvSelector) -> Result<CvRecord, AppError> {
        let record = match selector {
            CvSelector::Id(id) => {
                sqlx::query_as::<_, CvRecord>(&format!(
                    "SELECT {CV_COLUMNS} FROM cvs WHERE id = $1"
                ))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            // Name lookups are scoped to the caller up front so one user's
            // file names never resolve against another's.
            CvSelector::FileName(name) => {
                sqlx::query_as::<_, CvRecord>(&format!(
                    "SELECT {CV_COLUMNS} FROM cvs WHERE user_id = $1 AND file_name = $2"
                ))
                .bind(user_id)
                .bind(name)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        match record {
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
        let result = sqlx::query("UPDATE cvs SET metadata = $1 WHERE id = $2 AND user_id = $3")
            .bind(sqlx::types::Json(metadata))
            .bind(cv_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "CV id {cv_id} not found for this user"
            )));
        }
        Ok(())
    }
}
