//! Ephemeral partial-results cache.
//!
//! Publishes in-flight job progress before it is durably persisted. Entries
//! are keyed by `(user, cv, job-description fingerprint)` and evicted by a
//! per-entry timer after a fixed TTL — pure TTL, no LRU, no read-side
//! refresh. The cache is process-local: in a horizontally scaled deployment
//! a poller routed to another instance simply falls back to the durable
//! record, which lags but never lies.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// How long a partial entry survives without being overwritten or removed.
pub const PARTIAL_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartialKey {
    pub user_id: Uuid,
    pub cv_id: i64,
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialSnapshot {
    pub progress: u8,
    pub state: String,
    pub partial_text: Option<String>,
    pub updated_at: DateTime<Utc>,
}

struct Slot {
    snapshot: PartialSnapshot,
    generation: u64,
}

#[derive(Default)]
struct CacheInner {
    slots: HashMap<PartialKey, Slot>,
    generation: u64,
}

/// Process-local TTL map. Cheap to clone; all clones share one map.
///
/// The mutex is never held across an await point.
#[derive(Clone, Default)]
pub struct PartialResultsCache {
    inner: Arc<Mutex<CacheInner>>,
}

impl PartialResultsCache {
    pub fn put(&self, key: PartialKey, snapshot: PartialSnapshot) {
        self.put_with_ttl(key, snapshot, PARTIAL_TTL);
    }

    pub fn put_with_ttl(&self, key: PartialKey, snapshot: PartialSnapshot, ttl: Duration) {
        let generation = {
            let mut inner = self.inner.lock().unwrap();
            inner.generation += 1;
            let generation = inner.generation;
            inner.slots.insert(key.clone(), Slot { snapshot, generation });
            generation
        };

        // One eviction timer per write. An overwrite bumps the generation, so
        // a stale timer firing later leaves the fresher entry alone.
        let cache = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut inner = cache.inner.lock().unwrap();
            let expired = inner
                .slots
                .get(&key)
                .is_some_and(|slot| slot.generation == generation);
            if expired {
                inner.slots.remove(&key);
            }
        });
    }

    pub fn get(&self, key: &PartialKey) -> Option<PartialSnapshot> {
        self.inner
            .lock()
            .unwrap()
            .slots
            .get(key)
            .map(|slot| slot.snapshot.clone())
    }

    pub fn remove(&self, key: &PartialKey) {
        self.inner.lock().unwrap().slots.remove(key);
    }
}

/// Stable fingerprint for a job description, used to key partial entries.
/// The literal `"none"` stands in when no job description was supplied, so a
/// poller that omits it finds the same entry the launch created.
pub fn job_description_fingerprint(job_description: Option<&str>) -> String {
    match job_description.map(str::trim).filter(|jd| !jd.is_empty()) {
        None => "none".to_string(),
        Some(text) => {
            let digest = Sha256::digest(text.as_bytes());
            format!("{digest:x}")[..16].to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> PartialKey {
        PartialKey {
            user_id: Uuid::nil(),
            cv_id: 42,
            fingerprint: "none".to_string(),
        }
    }

    fn snapshot(progress: u8) -> PartialSnapshot {
        PartialSnapshot {
            progress,
            state: "analyzing".to_string(),
            partial_text: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let cache = PartialResultsCache::default();
        assert!(cache.get(&key()).is_none());

        cache.put(key(), snapshot(40));
        assert_eq!(cache.get(&key()).unwrap().progress, 40);

        cache.put(key(), snapshot(60));
        assert_eq!(cache.get(&key()).unwrap().progress, 60);

        cache.remove(&key());
        assert!(cache.get(&key()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = PartialResultsCache::default();
        cache.put(key(), snapshot(40));
        tokio::task::yield_now().await;

        tokio::time::advance(PARTIAL_TTL + Duration::from_secs(1)).await;
        tokio::task::yield_now().await;

        assert!(cache.get(&key()).is_none(), "entry must expire on pure TTL");
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_restarts_the_ttl() {
        let cache = PartialResultsCache::default();
        cache.put(key(), snapshot(40));

        tokio::time::advance(PARTIAL_TTL - Duration::from_secs(60)).await;
        cache.put(key(), snapshot(60));

        // The first entry's timer fires now; the overwrite must survive it.
        tokio::time::advance(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;
        assert_eq!(cache.get(&key()).unwrap().progress, 60);

        tokio::time::advance(PARTIAL_TTL).await;
        tokio::task::yield_now().await;
        assert!(cache.get(&key()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_independently() {
        let cache = PartialResultsCache::default();
        let other = PartialKey {
            cv_id: 7,
            ..key()
        };

        cache.put(key(), snapshot(40));
        tokio::task::yield_now().await;
        tokio::time::advance(PARTIAL_TTL / 2).await;
        cache.put_with_ttl(other.clone(), snapshot(10), PARTIAL_TTL);
        tokio::task::yield_now().await;

        tokio::time::advance(PARTIAL_TTL / 2 + Duration::from_secs(1)).await;
        tokio::task::yield_now().await;

        assert!(cache.get(&key()).is_none());
        assert_eq!(cache.get(&other).unwrap().progress, 10);
    }

    #[test]
    fn test_fingerprint_is_stable_and_trims() {
        let a = job_description_fingerprint(Some("Senior Rust Engineer"));
        let b = job_description_fingerprint(Some("  Senior Rust Engineer  "));
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_fingerprint_absent_job_description() {
        assert_eq!(job_description_fingerprint(None), "none");
        assert_eq!(job_description_fingerprint(Some("   ")), "none");
    }

    #[test]
    fn test_fingerprint_distinguishes_job_descriptions() {
        let a = job_description_fingerprint(Some("Rust backend role"));
        let b = job_description_fingerprint(Some("Frontend role"));
        assert_ne!(a, b);
    }
}
