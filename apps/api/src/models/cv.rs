use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One uploaded CV belonging to one user.
///
/// `raw_text` is immutable once extracted at upload. `metadata` is the durable
/// job record for the most recent optimization attempt — it is the single
/// source of truth for job state and is rewritten whole on every transition.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CvRecord {
    pub id: i64,
    pub user_id: Uuid,
    pub file_name: String,
    pub raw_text: String,
    #[sqlx(json)]
    pub metadata: OptimizationMeta,
    pub created_at: DateTime<Utc>,
}

/// How a launch or poll request refers to a CV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CvSelector {
    Id(i64),
    FileName(String),
}

impl fmt::Display for CvSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CvSelector::Id(id) => write!(f, "id {id}"),
            CvSelector::FileName(name) => write!(f, "file '{name}'"),
        }
    }
}

/// The durable job record stored in the CV's `metadata` JSON column.
///
/// Field names are camelCase to match the blobs the product already has in
/// storage. Absent fields default and unknown fields are ignored, so records
/// written by any earlier job shape still parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizationMeta {
    pub optimizing: bool,
    pub progress: u8,
    pub stage: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub optimized: bool,
    pub optimized_text: Option<String>,
    pub ats_score: Option<u8>,
    pub improved_ats_score: Option<u8>,
    pub improvements: Vec<String>,
    pub score_delta: Option<i16>,
    pub score_verdict: Option<String>,
    pub recommended_actions: Vec<String>,
    pub error: Option<String>,
    pub error_kind: Option<String>,
    pub analysis_failed_at: Option<DateTime<Utc>>,
    pub docx_base64: Option<String>,
    pub docx_generated_at: Option<DateTime<Utc>>,
    pub preview_html: Option<String>,
    pub preview_unavailable: bool,
    pub job_description_fingerprint: Option<String>,
}

impl OptimizationMeta {
    /// Terminal success with the artifact still on the record. The launch
    /// short-circuit reuses this instead of starting new work.
    pub fn has_cached_result(&self) -> bool {
        self.optimized && self.docx_base64.is_some()
    }
}
