//! Background optimization state machine.
//!
//! Flow: ANALYZING (external optimizer) → STANDARDIZING (canonical sections)
//! → GENERATING (DOCX + best-effort preview) → COMPLETE (final blob write,
//! cache cleared). On entry to each state both the durable record and the
//! partial-results cache receive the new progress and label.
//!
//! The runner is detached from the launching request: it finishes or fails on
//! its own, and every failure becomes a single terminal metadata write rather
//! than a propagated error. The cache entry of a failed job is deliberately
//! left to expire so pollers reading either store agree on the failure.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::docgen::{generate_docx, render_preview_html, DocumentMeta, RenderMode};
use crate::errors::AppError;
use crate::models::cv::{CvRecord, OptimizationMeta};
use crate::optimizer::OptimizerError;
use crate::pipeline::cache::{PartialKey, PartialSnapshot};
use crate::pipeline::stage::Stage;
use crate::pipeline::PipelineDeps;
use crate::scoring::compare_scores;
use crate::standardize::standardize;

/// Classified terminal failure of one job.
#[derive(Debug)]
struct JobFailure {
    kind: FailureKind,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    ServiceUnavailable,
    Generation,
    Other,
}

impl FailureKind {
    fn as_str(self) -> &'static str {
        match self {
            FailureKind::ServiceUnavailable => "service_unavailable",
            FailureKind::Generation => "generation_failed",
            FailureKind::Other => "optimization_failed",
        }
    }
}

impl From<OptimizerError> for JobFailure {
    fn from(err: OptimizerError) -> Self {
        if err.is_unavailable() {
            JobFailure {
                kind: FailureKind::ServiceUnavailable,
                message: "The AI optimization service is currently unavailable. Please try again later."
                    .to_string(),
            }
        } else {
            JobFailure {
                kind: FailureKind::Other,
                message: format!("Optimization failed: {err}"),
            }
        }
    }
}

impl From<AppError> for JobFailure {
    fn from(err: AppError) -> Self {
        JobFailure {
            kind: FailureKind::Other,
            message: format!("Optimization failed: {err}"),
        }
    }
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)
    }
}

/// Drives one job to a terminal state.
pub async fn run_job(
    deps: PipelineDeps,
    cv: CvRecord,
    job_description: Option<String>,
    key: PartialKey,
) {
    let cv_id = cv.id;
    let user_id = cv.user_id;
    let mut working = cv.metadata.clone();

    match drive(&deps, &cv, job_description.as_deref(), &key, &mut working).await {
        Ok(()) => info!("Optimization job for CV {cv_id} completed"),
        Err(failure) => {
            warn!("Optimization job for CV {cv_id} failed: {failure}");
            let terminal = terminal_failure(&working, &failure);
            if let Err(err) = deps.store.update_metadata(user_id, cv_id, &terminal).await {
                error!("Failed to record failure for CV {cv_id}: {err}");
            }
        }
    }
}

async fn drive(
    deps: &PipelineDeps,
    cv: &CvRecord,
    job_description: Option<&str>,
    key: &PartialKey,
    working: &mut OptimizationMeta,
) -> Result<(), JobFailure> {
    enter_stage(deps, cv, key, working, Stage::Analyzing, None).await?;
    let outcome = deps.optimizer.optimize(&cv.raw_text, job_description).await?;
    info!(
        "CV {} analyzed: ATS {} to {}",
        cv.id, outcome.original_score, outcome.improved_score
    );

    enter_stage(
        deps,
        cv,
        key,
        working,
        Stage::Standardizing,
        Some(outcome.optimized_text.clone()),
    )
    .await?;
    let standardized = standardize(&outcome.optimized_text);

    enter_stage(
        deps,
        cv,
        key,
        working,
        Stage::Generating,
        Some(outcome.optimized_text.clone()),
    )
    .await?;
    let doc_meta = DocumentMeta {
        source_file_name: cv.file_name.clone(),
        mode: RenderMode::Standard,
    };
    let artifact = generate_docx(&standardized, &doc_meta).map_err(|e| JobFailure {
        kind: FailureKind::Generation,
        message: format!("Document generation failed: {e}"),
    })?;

    // Secondary rendition is best-effort: a failure degrades the result but
    // never fails the job.
    let preview = match render_preview_html(&standardized) {
        Ok(html) => Some(html),
        Err(err) => {
            warn!("Preview rendition for CV {} unavailable: {err}", cv.id);
            None
        }
    };

    let comparison = compare_scores(outcome.original_score, outcome.improved_score);
    let now = Utc::now();
    *working = OptimizationMeta {
        optimizing: false,
        progress: Stage::Complete.progress(),
        stage: Some(Stage::Complete.key().to_string()),
        start_time: working.start_time,
        completed_at: Some(now),
        optimized: true,
        optimized_text: Some(outcome.optimized_text),
        ats_score: Some(outcome.original_score.min(100)),
        improved_ats_score: Some(outcome.improved_score.min(100)),
        improvements: outcome.recommendations,
        score_delta: Some(comparison.delta),
        score_verdict: Some(comparison.verdict.as_str().to_string()),
        recommended_actions: comparison.recommended_actions,
        error: None,
        error_kind: None,
        analysis_failed_at: None,
        docx_base64: Some(BASE64.encode(&artifact)),
        docx_generated_at: Some(now),
        preview_unavailable: preview.is_none(),
        preview_html: preview,
        job_description_fingerprint: working.job_description_fingerprint.clone(),
    };
    deps.store
        .update_metadata(cv.user_id, cv.id, working)
        .await?;
    deps.partials.remove(key);
    Ok(())
}

/// Writes the stage's progress and label to both stores.
async fn enter_stage(
    deps: &PipelineDeps,
    cv: &CvRecord,
    key: &PartialKey,
    working: &mut OptimizationMeta,
    stage: Stage,
    partial_text: Option<String>,
) -> Result<(), JobFailure> {
    working.progress = stage.progress();
    working.stage = Some(stage.key().to_string());
    deps.store
        .update_metadata(cv.user_id, cv.id, working)
        .await?;
    deps.partials.put(
        key.clone(),
        PartialSnapshot {
            progress: stage.progress(),
            state: stage.key().to_string(),
            partial_text,
            updated_at: Utc::now(),
        },
    );
    Ok(())
}

/// The single terminal write for a failed job. Launch-time fields survive;
/// everything else resets so the failure is unambiguous.
fn terminal_failure(working: &OptimizationMeta, failure: &JobFailure) -> OptimizationMeta {
    OptimizationMeta {
        optimizing: false,
        progress: working.progress,
        stage: working.stage.clone(),
        start_time: working.start_time,
        error: Some(failure.message.clone()),
        error_kind: Some(failure.kind.as_str().to_string()),
        analysis_failed_at: Some(Utc::now()),
        job_description_fingerprint: working.job_description_fingerprint.clone(),
        ..OptimizationMeta::default()
    }
}
