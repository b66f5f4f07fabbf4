//! Axum route handlers for the optimization pipeline API.

use anyhow::anyhow;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::docgen::{generate_docx, placeholder_scores, DocumentMeta, RenderMode, DOCX_CONTENT_TYPE};
use crate::errors::AppError;
use crate::models::cv::CvSelector;
use crate::pipeline::cache::{job_description_fingerprint, PartialKey};
use crate::pipeline::launcher::{launch, LaunchResponse, OptimizeRequest};
use crate::pipeline::status::{resolve_partial, resolve_status, PartialResultsPayload, StatusPayload};
use crate::standardize::standardize;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Query shape shared by the polling endpoints. The job description is needed
/// so the poller derives the same partial-results key the launch used.
#[derive(Debug, Deserialize)]
pub struct PollQuery {
    pub user_id: Uuid,
    pub job_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub docx_base64: String,
    pub ats_score: u8,
    pub improved_ats_score: u8,
    /// Preview scores are synthesized placeholders, never computed ones.
    pub estimated: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/cvs/optimize
///
/// Launches an optimization job and returns immediately, or returns the
/// cached result when one exists and `force_reoptimize` is not set.
pub async fn handle_optimize(
    State(state): State<AppState>,
    Json(request): Json<OptimizeRequest>,
) -> Result<Json<LaunchResponse>, AppError> {
    let response = launch(&state.pipeline, request).await?;
    Ok(Json(response))
}

/// GET /api/v1/cvs/:id/optimize/status
///
/// Read-only, side-effect-free classification of the job into one of
/// complete, failed, in_progress, or not_started.
pub async fn handle_status(
    State(state): State<AppState>,
    Path(cv_id): Path<i64>,
    Query(query): Query<PollQuery>,
) -> Result<Json<StatusPayload>, AppError> {
    let cv = state
        .pipeline
        .store
        .fetch(query.user_id, &CvSelector::Id(cv_id))
        .await?;
    let key = PartialKey {
        user_id: query.user_id,
        cv_id,
        fingerprint: job_description_fingerprint(query.job_description.as_deref()),
    };
    let partial = state.pipeline.partials.get(&key);
    Ok(Json(resolve_status(&cv.metadata, partial.as_ref())))
}

/// GET /api/v1/cvs/:id/optimize/partial
pub async fn handle_partial_results(
    State(state): State<AppState>,
    Path(cv_id): Path<i64>,
    Query(query): Query<PollQuery>,
) -> Result<Json<PartialResultsPayload>, AppError> {
    let cv = state
        .pipeline
        .store
        .fetch(query.user_id, &CvSelector::Id(cv_id))
        .await?;
    let key = PartialKey {
        user_id: query.user_id,
        cv_id,
        fingerprint: job_description_fingerprint(query.job_description.as_deref()),
    };
    let partial = state.pipeline.partials.get(&key);
    Ok(Json(resolve_partial(&cv.metadata, partial.as_ref())))
}

/// GET /api/v1/cvs/:id/optimize/document
///
/// Streams the optimized DOCX as an attachment named after the original file.
pub async fn handle_download(
    State(state): State<AppState>,
    Path(cv_id): Path<i64>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    let cv = state
        .pipeline
        .store
        .fetch(query.user_id, &CvSelector::Id(cv_id))
        .await?;

    let encoded = cv.metadata.docx_base64.ok_or_else(|| {
        AppError::NotFound(format!("No optimized document exists for CV {cv_id}"))
    })?;
    let bytes = BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| AppError::Internal(anyhow!("stored artifact is not valid base64: {e}")))?;

    let headers = [
        (header::CONTENT_TYPE, DOCX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download_file_name(&cv.file_name)),
        ),
    ];
    Ok((headers, bytes).into_response())
}

/// POST /api/v1/cvs/:id/preview
///
/// Ad-hoc preview document for a CV that has not gone through a job. The
/// scores in the response are placeholders and flagged as estimated.
pub async fn handle_preview(
    State(state): State<AppState>,
    Path(cv_id): Path<i64>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    let cv = state
        .pipeline
        .store
        .fetch(request.user_id, &CvSelector::Id(cv_id))
        .await?;

    if cv.raw_text.trim().is_empty() {
        return Err(AppError::Validation(
            "CV has no extractable text to preview".to_string(),
        ));
    }

    let standardized = standardize(&cv.raw_text);
    let (ats_score, improved_ats_score) = placeholder_scores(&cv.raw_text);
    let artifact = generate_docx(
        &standardized,
        &DocumentMeta {
            source_file_name: cv.file_name.clone(),
            mode: RenderMode::Preview {
                ats_score,
                improved_ats_score,
            },
        },
    )
    .map_err(|e| AppError::Generation(e.to_string()))?;

    Ok(Json(PreviewResponse {
        docx_base64: BASE64.encode(&artifact),
        ats_score,
        improved_ats_score,
        estimated: true,
    }))
}

fn download_file_name(original: &str) -> String {
    let stem = std::path::Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("cv");
    format!("{stem}_optimized.docx")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_file_name_from_original() {
        assert_eq!(download_file_name("resume.pdf"), "resume_optimized.docx");
        assert_eq!(download_file_name("jane.docx"), "jane_optimized.docx");
        assert_eq!(download_file_name(""), "cv_optimized.docx");
    }
}
