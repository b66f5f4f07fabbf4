//! Status reconciliation — the read side of the pipeline.
//!
//! The durable record classifies the job; the cache is consulted only for
//! in-flight jobs, and only to report fresher progress. Polling is
//! side-effect-free, progress never goes backwards, and a terminal payload is
//! identical on every subsequent poll until a new launch overwrites the
//! record.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::cv::OptimizationMeta;
use crate::pipeline::cache::PartialSnapshot;
use crate::pipeline::stage::Stage;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StatusPayload {
    Complete {
        ats_score: Option<u8>,
        improved_ats_score: Option<u8>,
        improvements: Vec<String>,
        score_delta: Option<i16>,
        score_verdict: Option<String>,
        recommended_actions: Vec<String>,
        completed_at: Option<DateTime<Utc>>,
        docx_available: bool,
        preview_unavailable: bool,
    },
    Failed {
        error: String,
        error_kind: Option<String>,
        failed_at: Option<DateTime<Utc>>,
    },
    InProgress {
        progress: u8,
        stage: String,
        stage_label: String,
    },
    NotStarted {
        message: String,
    },
}

/// Classifies the durable record and, for in-flight jobs, folds in the
/// freshest cache snapshot. Progress is the max of the two sources so a
/// poller that alternates between them never sees it decrease.
pub fn resolve_status(
    meta: &OptimizationMeta,
    partial: Option<&PartialSnapshot>,
) -> StatusPayload {
    if meta.optimized {
        return StatusPayload::Complete {
            ats_score: meta.ats_score,
            improved_ats_score: meta.improved_ats_score,
            improvements: meta.improvements.clone(),
            score_delta: meta.score_delta,
            score_verdict: meta.score_verdict.clone(),
            recommended_actions: meta.recommended_actions.clone(),
            completed_at: meta.completed_at,
            docx_available: meta.docx_base64.is_some(),
            preview_unavailable: meta.preview_unavailable,
        };
    }

    if let Some(error) = &meta.error {
        return StatusPayload::Failed {
            error: error.clone(),
            error_kind: meta.error_kind.clone(),
            failed_at: meta.analysis_failed_at,
        };
    }

    if meta.optimizing {
        let mut progress = meta.progress;
        let mut stage_key = meta
            .stage
            .clone()
            .unwrap_or_else(|| Stage::Started.key().to_string());
        if let Some(snapshot) = partial {
            if snapshot.progress > progress {
                progress = snapshot.progress;
                stage_key = snapshot.state.clone();
            }
        }
        let stage_label = Stage::from_key(&stage_key)
            .map(Stage::label)
            .unwrap_or("In progress")
            .to_string();
        return StatusPayload::InProgress {
            progress,
            stage: stage_key,
            stage_label,
        };
    }

    StatusPayload::NotStarted {
        message: "No optimization has been run for this CV yet".to_string(),
    }
}

/// Payload of the partial-results endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialResultsPayload {
    pub progress: u8,
    pub state: String,
    pub partial_results: Option<String>,
}

/// Partial results prefer the cache; with no entry (expired, other instance,
/// or terminal job) they degrade to what the durable record holds.
pub fn resolve_partial(
    meta: &OptimizationMeta,
    partial: Option<&PartialSnapshot>,
) -> PartialResultsPayload {
    if let Some(snapshot) = partial {
        return PartialResultsPayload {
            progress: snapshot.progress.max(meta.progress),
            state: snapshot.state.clone(),
            partial_results: snapshot.partial_text.clone(),
        };
    }

    PartialResultsPayload {
        progress: meta.progress,
        state: meta
            .stage
            .clone()
            .unwrap_or_else(|| "not_started".to_string()),
        partial_results: meta.optimized_text.clone().filter(|_| meta.optimized),
    }
}
