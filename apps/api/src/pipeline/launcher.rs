//! Job launch — validation, cached-result short-circuit, initial state write,
//! and detachment of the background runner.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::cv::{CvRecord, CvSelector, OptimizationMeta};
use crate::pipeline::cache::{job_description_fingerprint, PartialKey, PartialSnapshot};
use crate::pipeline::stage::Stage;
use crate::pipeline::{runner, PipelineDeps};

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizeRequest {
    pub user_id: Uuid,
    pub cv_id: Option<i64>,
    pub file_name: Option<String>,
    pub job_description: Option<String>,
    #[serde(default)]
    pub force_reoptimize: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum LaunchResponse {
    /// A new background job was started.
    Optimizing { progress: u8 },
    /// An earlier successful run was reused; the optimizer was not invoked.
    Complete {
        cached: bool,
        ats_score: Option<u8>,
        improved_ats_score: Option<u8>,
        improvements: Vec<String>,
        docx_base64: Option<String>,
    },
}

/// Validates the request and starts a detached optimization job.
///
/// The initial metadata write happens-before the response, so a poller that
/// arrives immediately after launch observes a consistent in-progress state.
/// Without `force_reoptimize`, a record that already holds a complete result
/// with its artifact is returned as-is and no job starts.
pub async fn launch(
    deps: &PipelineDeps,
    request: OptimizeRequest,
) -> Result<LaunchResponse, AppError> {
    let selector = selector_from(&request)?;
    let cv = deps.store.fetch(request.user_id, &selector).await?;

    if !request.force_reoptimize && cv.metadata.has_cached_result() {
        info!(
            "CV {} already optimized; returning cached artifact without new work",
            cv.id
        );
        let meta = &cv.metadata;
        return Ok(LaunchResponse::Complete {
            cached: true,
            ats_score: meta.ats_score,
            improved_ats_score: meta.improved_ats_score,
            improvements: meta.improvements.clone(),
            docx_base64: meta.docx_base64.clone(),
        });
    }

    if cv.raw_text.trim().is_empty() {
        return Err(AppError::Validation(
            "CV has no extractable text to optimize".to_string(),
        ));
    }

    let fingerprint = job_description_fingerprint(request.job_description.as_deref());

    // Fresh blob: a relaunch deliberately overwrites any previous terminal
    // shape so the four-way status classification stays unambiguous.
    let meta = OptimizationMeta {
        optimizing: true,
        progress: Stage::Started.progress(),
        stage: Some(Stage::Started.key().to_string()),
        start_time: Some(Utc::now()),
        job_description_fingerprint: Some(fingerprint.clone()),
        ..OptimizationMeta::default()
    };
    deps.store
        .update_metadata(cv.user_id, cv.id, &meta)
        .await?;

    let key = PartialKey {
        user_id: cv.user_id,
        cv_id: cv.id,
        fingerprint,
    };
    deps.partials.put(
        key.clone(),
        PartialSnapshot {
            progress: Stage::Started.progress(),
            state: Stage::Started.key().to_string(),
            partial_text: None,
            updated_at: Utc::now(),
        },
    );

    info!(
        "Launching optimization job for CV {} (user {})",
        cv.id, cv.user_id
    );

    let job_cv = CvRecord {
        metadata: meta,
        ..cv
    };
    let job_deps = deps.clone();
    let job_description = request.job_description.clone();
    tokio::spawn(async move {
        runner::run_job(job_deps, job_cv, job_description, key).await;
    });

    Ok(LaunchResponse::Optimizing {
        progress: Stage::Started.progress(),
    })
}

fn selector_from(request: &OptimizeRequest) -> Result<CvSelector, AppError> {
    if let Some(id) = request.cv_id {
        return Ok(CvSelector::Id(id));
    }
    match request.file_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => Ok(CvSelector::FileName(name.to_string())),
        _ => Err(AppError::Validation(
            "cv_id or file_name is required".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::optimizer::mock::MockOptimizer;
    use crate::pipeline::cache::PartialResultsCache;
    use crate::store::memory::{sample_cv, MemoryCvStore};

    fn deps(store: Arc<MemoryCvStore>, optimizer: Arc<MockOptimizer>) -> PipelineDeps {
        PipelineDeps {
            store,
            optimizer,
            partials: PartialResultsCache::default(),
        }
    }

    fn request(user_id: Uuid, cv_id: i64) -> OptimizeRequest {
        OptimizeRequest {
            user_id,
            cv_id: Some(cv_id),
            file_name: None,
            job_description: None,
            force_reoptimize: false,
        }
    }

    async fn wait_for_terminal(store: &MemoryCvStore, cv_id: i64) -> OptimizationMeta {
        for _ in 0..500 {
            if let Some(meta) = store.metadata(cv_id) {
                if !meta.optimizing && (meta.optimized || meta.error.is_some()) {
                    return meta;
                }
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("job did not reach a terminal state in time");
    }

    #[tokio::test]
    async fn test_launch_returns_initial_snapshot_and_writes_state_first() {
        let user = Uuid::new_v4();
        let store = MemoryCvStore::with_cv(sample_cv(42, user, "plain cv text"));
        let (optimizer, gate) = MockOptimizer::succeeding().gated();
        let deps = deps(store.clone(), Arc::new(optimizer));

        let response = launch(&deps, request(user, 42)).await.unwrap();
        assert_eq!(response, LaunchResponse::Optimizing { progress: 10 });

        // Single-threaded test runtime and no await since the spawn: the job
        // has not run yet, so this is exactly the launch-time write.
        let meta = store.metadata(42).unwrap();
        assert!(meta.optimizing);
        assert_eq!(meta.progress, 10);
        assert!(meta.start_time.is_some());

        gate.notify_one();
        let terminal = wait_for_terminal(&store, 42).await;
        assert!(terminal.optimized);
    }

    #[tokio::test]
    async fn test_cached_result_short_circuits_without_optimizer_call() {
        let user = Uuid::new_v4();
        let mut cv = sample_cv(42, user, "plain cv text");
        cv.metadata = OptimizationMeta {
            optimized: true,
            ats_score: Some(62),
            improved_ats_score: Some(88),
            improvements: vec!["Add metrics".to_string()],
            docx_base64: Some("UEsDBA==".to_string()),
            ..OptimizationMeta::default()
        };
        let store = MemoryCvStore::with_cv(cv);
        let optimizer = Arc::new(MockOptimizer::succeeding());
        let deps = deps(store.clone(), optimizer.clone());

        let response = launch(&deps, request(user, 42)).await.unwrap();
        match response {
            LaunchResponse::Complete { cached, docx_base64, .. } => {
                assert!(cached);
                assert_eq!(docx_base64.as_deref(), Some("UEsDBA=="));
            }
            other => panic!("expected cached complete, got {other:?}"),
        }
        assert_eq!(optimizer.calls(), 0, "cached launch must not re-optimize");
        assert!(store.write_history().is_empty(), "cached launch must not write");
    }

    #[tokio::test]
    async fn test_force_reoptimize_bypasses_cached_result() {
        let user = Uuid::new_v4();
        let mut cv = sample_cv(42, user, "plain cv text");
        cv.metadata = OptimizationMeta {
            optimized: true,
            docx_base64: Some("UEsDBA==".to_string()),
            ..OptimizationMeta::default()
        };
        let store = MemoryCvStore::with_cv(cv);
        let optimizer = Arc::new(MockOptimizer::succeeding());
        let deps = deps(store.clone(), optimizer.clone());

        let mut req = request(user, 42);
        req.force_reoptimize = true;
        let response = launch(&deps, req).await.unwrap();
        assert_eq!(response, LaunchResponse::Optimizing { progress: 10 });

        let terminal = wait_for_terminal(&store, 42).await;
        assert!(terminal.optimized);
        assert_eq!(optimizer.calls(), 1, "force must always re-invoke the optimizer");
    }

    #[tokio::test]
    async fn test_empty_raw_text_is_rejected_before_any_job_starts() {
        let user = Uuid::new_v4();
        let store = MemoryCvStore::with_cv(sample_cv(42, user, "   "));
        let optimizer = Arc::new(MockOptimizer::succeeding());
        let deps = deps(store.clone(), optimizer.clone());

        let err = launch(&deps, request(user, 42)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(optimizer.calls(), 0);
        assert!(store.write_history().is_empty(), "no state may be written");
    }

    #[tokio::test]
    async fn test_missing_selector_is_a_validation_error() {
        let user = Uuid::new_v4();
        let store = MemoryCvStore::with_cv(sample_cv(42, user, "text"));
        let deps = deps(store, Arc::new(MockOptimizer::succeeding()));

        let mut req = request(user, 42);
        req.cv_id = None;
        req.file_name = Some("  ".to_string());
        let err = launch(&deps, req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_cv_is_not_found() {
        let user = Uuid::new_v4();
        let store = MemoryCvStore::with_cv(sample_cv(42, user, "text"));
        let deps = deps(store, Arc::new(MockOptimizer::succeeding()));

        let err = launch(&deps, request(user, 7)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_foreign_cv_is_forbidden() {
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let store = MemoryCvStore::with_cv(sample_cv(42, owner, "text"));
        let optimizer = Arc::new(MockOptimizer::succeeding());
        let deps = deps(store, optimizer.clone());

        let err = launch(&deps, request(intruder, 42)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        assert_eq!(optimizer.calls(), 0);
    }

    #[tokio::test]
    async fn test_launch_by_file_name() {
        let user = Uuid::new_v4();
        let store = MemoryCvStore::with_cv(sample_cv(42, user, "plain cv text"));
        let deps = deps(store.clone(), Arc::new(MockOptimizer::succeeding()));

        let req = OptimizeRequest {
            user_id: user,
            cv_id: None,
            file_name: Some("cv_42.pdf".to_string()),
            job_description: None,
            force_reoptimize: false,
        };
        let response = launch(&deps, req).await.unwrap();
        assert_eq!(response, LaunchResponse::Optimizing { progress: 10 });
        wait_for_terminal(&store, 42).await;
    }

    #[tokio::test]
    async fn test_concurrent_launches_leave_a_self_consistent_record() {
        // Two force launches race; the blob is last-writer-wins, so exactly
        // one job's outcome survives in full. The record must never mix the
        // two half-and-half.
        let user = Uuid::new_v4();
        let store = MemoryCvStore::with_cv(sample_cv(42, user, "plain cv text"));
        let optimizer = Arc::new(MockOptimizer::succeeding());
        let deps = deps(store.clone(), optimizer.clone());

        let mut first = request(user, 42);
        first.force_reoptimize = true;
        first.job_description = Some("Rust backend role".to_string());
        let mut second = request(user, 42);
        second.force_reoptimize = true;
        second.job_description = Some("Platform engineer role".to_string());

        launch(&deps, first).await.unwrap();
        launch(&deps, second).await.unwrap();

        // Both jobs have fully finished once two terminal writes exist.
        for _ in 0..500 {
            let terminal_writes = store
                .write_history()
                .iter()
                .filter(|m| m.optimized)
                .count();
            if terminal_writes == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert_eq!(optimizer.calls(), 2);

        let meta = store.metadata(42).unwrap();
        assert!(meta.optimized);
        assert!(!meta.optimizing);
        assert!(meta.error.is_none());
        assert!(meta.docx_base64.is_some());
        let fingerprint = meta.job_description_fingerprint.as_deref().unwrap();
        let first_fp = job_description_fingerprint(Some("Rust backend role"));
        let second_fp = job_description_fingerprint(Some("Platform engineer role"));
        assert!(
            fingerprint == first_fp || fingerprint == second_fp,
            "the surviving record must belong wholly to one launch"
        );
    }
}
