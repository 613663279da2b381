use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::features::system_metrics::Snapshot;
use crate::shared::collector::Collector;
use crate::shared::error::StatusError;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub snapshot: Arc<Snapshot>,
    pub expires_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entry: Option<CacheEntry>,
    /// Outcome of the most recent collection, kept even when caching is disabled or the
    /// collection failed so that callers queued behind it can share it. A failure is
    /// held as its message.
    latest: Option<Result<Arc<Snapshot>, String>>,
}

/// Process-wide single-entry snapshot cache.
///
/// Construct once at startup and share by reference. All access goes through
/// [`Cache::get_or_collect`], which holds the lock across check, collect and store, so
/// at most one collection runs at a time and callers queued behind an in-flight
/// collection receive its snapshot.
pub struct Cache {
    collector: Collector,
    ttl: Duration,
    state: Mutex<CacheState>,
    collections: AtomicU64,
    /// Bumped after every completed collection, successful or not.
    generation: AtomicU64,
}

impl Cache {
    pub fn new(collector: Collector, ttl: Duration) -> Self {
        Self {
            collector,
            ttl,
            state: Mutex::new(CacheState::default()),
            collections: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    /// Number of underlying collections started so far.
    pub fn collections(&self) -> u64 {
        self.collections.load(Ordering::SeqCst)
    }

    pub async fn get_or_collect(&self, force_refresh: bool) -> Result<Arc<Snapshot>, StatusError> {
        let observed = self.generation.load(Ordering::SeqCst);
        let mut state = self.state.lock().await;

        // A collection finished while we waited for the lock.
        if self.generation.load(Ordering::SeqCst) != observed {
            match &state.latest {
                Some(Ok(snapshot)) => {
                    debug!("Sharing snapshot {} from in-flight collection", snapshot.id);
                    return Ok(snapshot.clone());
                }
                Some(Err(reason)) => {
                    debug!("Sharing failure from in-flight collection");
                    return Err(StatusError::CollectionFailed(reason.clone()));
                }
                None => {}
            }
        }

        if !force_refresh {
            if let Some(entry) = &state.entry {
                if Instant::now() < entry.expires_at {
                    debug!("Cache hit for snapshot {}", entry.snapshot.id);
                    return Ok(entry.snapshot.clone());
                }
            }
        }

        self.collections.fetch_add(1, Ordering::SeqCst);
        let collected = self.collector.collect().await;
        self.generation.fetch_add(1, Ordering::SeqCst);

        let snapshot = match collected {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                let reason = match &e {
                    StatusError::CollectionFailed(reason) => reason.clone(),
                    other => other.to_string(),
                };
                // Queued callers share this failure; later callers collect again.
                state.latest = Some(Err(reason));
                return Err(e);
            }
        };
        state.latest = Some(Ok(snapshot.clone()));
        state.entry = if self.ttl.is_zero() {
            None
        } else {
            Some(CacheEntry {
                snapshot: snapshot.clone(),
                expires_at: Instant::now() + self.ttl,
            })
        };
        Ok(snapshot)
    }

    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.entry = None;
        debug!("Snapshot cache invalidated");
    }
}
