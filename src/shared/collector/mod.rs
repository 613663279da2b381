use chrono::Utc;
use futures::FutureExt;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::features::filesystem::{DiskSource, DiskTarget, PathResolver};
use crate::features::network::NetworkSource;
use crate::features::system_metrics::{
    is_containerized, CpuSource, MemorySource, PartialFailure, ProcessSource, Snapshot, SnapshotBuilder,
    UptimeSource,
};
use crate::shared::config::{DiskPathEntry, StatusConfig};
use crate::shared::error::{CollectionError, StatusError};
use crate::shared::traits::{CollectContext, MetricKind, MetricSource, Reading, Validatable};

/// Lifecycle of the most recent collection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Idle,
    Running,
    Completed,
    TimedOut,
}

/// Sources keyed by the metric kind they produce.
#[derive(Clone, Default)]
pub struct SourceTable {
    sources: BTreeMap<MetricKind, Arc<dyn MetricSource>>,
}

impl SourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sysinfo/statvfs backed sources for the running host.
    pub fn system() -> Self {
        Self::new()
            .register(Arc::new(UptimeSource::new()))
            .register(Arc::new(CpuSource::new()))
            .register(Arc::new(MemorySource::new()))
            .register(Arc::new(DiskSource::new()))
            .register(Arc::new(NetworkSource::new()))
            .register(Arc::new(ProcessSource::new()))
    }

    /// Registers `source` under its own kind, replacing any previous one.
    pub fn register(mut self, source: Arc<dyn MetricSource>) -> Self {
        self.sources.insert(source.kind(), source);
        self
    }

    pub fn get(&self, kind: MetricKind) -> Option<Arc<dyn MetricSource>> {
        self.sources.get(&kind).cloned()
    }
}

impl fmt::Debug for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.sources.keys()).finish()
    }
}

#[derive(Debug, Clone)]
enum Job {
    Metric(MetricKind),
    Disk(usize, DiskTarget),
}

impl Job {
    fn kind(&self) -> MetricKind {
        match self {
            Self::Metric(kind) => *kind,
            Self::Disk(..) => MetricKind::Disk,
        }
    }

    fn failure(&self, reason: String) -> PartialFailure {
        match self {
            Self::Metric(kind) => PartialFailure::metric(*kind, reason),
            Self::Disk(index, target) => PartialFailure::disk(*index, target.path.clone(), reason),
        }
    }
}

/// Runs every metric source concurrently under one deadline and assembles a snapshot.
pub struct Collector {
    sources: SourceTable,
    resolver: PathResolver,
    disk_paths: Vec<DiskPathEntry>,
    timeout: Duration,
    show_temp: bool,
    workers: Arc<Semaphore>,
    state: Mutex<CollectorState>,
    reported_warnings: Mutex<HashSet<String>>,
    hostname: String,
    containerized: bool,
}

impl Collector {
    pub fn new(config: &StatusConfig, sources: SourceTable) -> Self {
        Self {
            sources,
            resolver: PathResolver::from_config(config),
            disk_paths: config.disk_paths.clone(),
            timeout: config.collect_timeout(),
            show_temp: config.show_temp,
            workers: Arc::new(Semaphore::new(config.max_workers)),
            state: Mutex::new(CollectorState::Idle),
            reported_warnings: Mutex::new(HashSet::new()),
            hostname: whoami::hostname(),
            containerized: is_containerized(),
        }
    }

    pub fn state(&self) -> CollectorState {
        self.state.lock().map(|s| *s).unwrap_or(CollectorState::Idle)
    }

    fn set_state(&self, next: CollectorState) {
        if let Ok(mut state) = self.state.lock() {
            debug!("Collector {:?} -> {:?}", *state, next);
            *state = next;
        }
    }

    /// Runs one collection cycle.
    ///
    /// Returns a possibly partial snapshot, or `CollectionFailed` when there is nothing
    /// to collect from or no source produced data before the deadline.
    pub async fn collect(&self) -> Result<Snapshot, StatusError> {
        let deadline = Instant::now() + self.timeout;
        self.set_state(CollectorState::Running);

        let (targets, warnings) = match self.resolve_targets(deadline).await {
            Ok(resolved) => resolved,
            Err(e) => {
                self.set_state(CollectorState::Completed);
                return Err(e);
            }
        };

        let mut jobs = vec![
            Job::Metric(MetricKind::Uptime),
            Job::Metric(MetricKind::Cpu),
            Job::Metric(MetricKind::Memory),
        ];
        jobs.extend(targets.into_iter().enumerate().map(|(i, t)| Job::Disk(i, t)));
        jobs.push(Job::Metric(MetricKind::Network));
        jobs.push(Job::Metric(MetricKind::Processes));

        let (results, timed_out) = self.run_jobs(&jobs, deadline).await;
        self.set_state(if timed_out { CollectorState::TimedOut } else { CollectorState::Completed });

        self.assemble(&jobs, results, timed_out, warnings)
    }

    async fn resolve_targets(&self, deadline: Instant) -> Result<(Vec<DiskTarget>, Vec<String>), StatusError> {
        let resolver = self.resolver.clone();
        let entries = self.disk_paths.clone();
        let resolving = tokio::task::spawn_blocking(move || resolver.resolve(&entries));

        let resolution = match tokio::time::timeout_at(deadline, resolving).await {
            Ok(Ok(resolution)) => resolution,
            Ok(Err(e)) => {
                return Err(StatusError::CollectionFailed(format!("disk path resolution failed: {}", e)))
            }
            Err(_) => {
                return Err(StatusError::CollectionFailed(
                    "disk path resolution exceeded the collection deadline".to_string(),
                ))
            }
        };

        let warnings: Vec<String> = resolution.warnings.iter().map(|w| w.to_string()).collect();
        self.report_warnings(&warnings);

        if resolution.targets.is_empty() {
            return Err(StatusError::CollectionFailed(
                "no valid disk paths configured and auto-discovery found none".to_string(),
            ));
        }
        Ok((resolution.targets, warnings))
    }

    fn report_warnings(&self, warnings: &[String]) {
        let Ok(mut reported) = self.reported_warnings.lock() else {
            return;
        };
        for warning in warnings {
            if reported.insert(warning.clone()) {
                warn!("Skipping disk entry: {}", warning);
            }
        }
    }

    async fn run_jobs(
        &self,
        jobs: &[Job],
        deadline: Instant,
    ) -> (Vec<Option<Result<Reading, CollectionError>>>, bool) {
        let cancel = CancellationToken::new();
        let base = CollectContext::new(cancel.clone(), self.show_temp).containerized(self.containerized);
        let mut results: Vec<Option<Result<Reading, CollectionError>>> = jobs.iter().map(|_| None).collect();
        let mut tasks = JoinSet::new();

        for (slot, job) in jobs.iter().enumerate() {
            let kind = job.kind();
            let Some(source) = self.sources.get(kind) else {
                results[slot] = Some(Err(CollectionError::unavailable(kind, "no source registered")));
                continue;
            };
            let ctx = match job {
                Job::Disk(_, target) => base.for_target(target.clone()),
                Job::Metric(_) => base.child(),
            };
            let workers = self.workers.clone();
            tasks.spawn(async move { (slot, run_source(kind, source, ctx, workers).await) });
        }
        info!("Collecting {} metric tasks", tasks.len());

        let expiry = tokio::time::sleep_until(deadline);
        tokio::pin!(expiry);
        let mut timed_out = false;

        loop {
            tokio::select! {
                biased;
                joined = tasks.join_next() => match joined {
                    Some(Ok((slot, result))) => results[slot] = Some(result),
                    Some(Err(e)) => warn!("Metric task did not complete: {}", e),
                    None => break,
                },
                _ = &mut expiry => {
                    timed_out = true;
                    break;
                }
            }
        }

        if timed_out {
            warn!(
                "Collection deadline of {:?} reached with {} tasks outstanding",
                self.timeout,
                tasks.len()
            );
            cancel.cancel();
            tasks.abort_all();
        }

        (results, timed_out)
    }

    fn assemble(
        &self,
        jobs: &[Job],
        results: Vec<Option<Result<Reading, CollectionError>>>,
        timed_out: bool,
        warnings: Vec<String>,
    ) -> Result<Snapshot, StatusError> {
        let mut builder = SnapshotBuilder::new()
            .id(Uuid::new_v4().to_string())
            .hostname(self.hostname.clone())
            .collected_at(Utc::now())
            .containerized(self.containerized)
            .timed_out(timed_out)
            .warnings(warnings);
        let mut successes = 0;

        for (job, result) in jobs.iter().zip(results) {
            builder = match result {
                Some(Ok(reading)) => {
                    successes += 1;
                    match reading {
                        Reading::Uptime(uptime) => builder.uptime(uptime),
                        Reading::Cpu(cpu) => builder.cpu(cpu),
                        Reading::Memory(memory) => builder.memory(memory),
                        Reading::Disk(disk) => builder.disk(disk),
                        Reading::Network(network) => builder.network(network),
                        Reading::Processes(processes) => builder.processes(processes),
                    }
                }
                Some(Err(e)) => {
                    warn!("{} collection failed: {}", job.kind(), e);
                    builder.failure(job.failure(e.to_string()))
                }
                None => builder.failure(job.failure("timed out".to_string())),
            };
        }

        if successes == 0 {
            return Err(StatusError::CollectionFailed("no metric source returned data".to_string()));
        }

        let snapshot = builder
            .build()
            .map_err(|e| StatusError::CollectionFailed(format!("invalid snapshot: {}", e)))?;
        info!(
            "Collected snapshot {} ({} of {} sources succeeded)",
            snapshot.id,
            successes,
            jobs.len()
        );
        Ok(snapshot)
    }
}

/// Runs one source inside a worker slot. Panics, mismatched and invalid readings become
/// errors for this slot only.
async fn run_source(
    kind: MetricKind,
    source: Arc<dyn MetricSource>,
    ctx: CollectContext,
    workers: Arc<Semaphore>,
) -> Result<Reading, CollectionError> {
    let _permit = tokio::select! {
        permit = workers.acquire_owned() => permit
            .map_err(|_| CollectionError::system_api(kind, "worker pool closed"))?,
        _ = ctx.cancel.cancelled() => return Err(CollectionError::Cancelled(kind)),
    };

    let result = AssertUnwindSafe(source.collect(&ctx))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(CollectionError::system_api(kind, "source panicked")));

    let reading = result?;
    if reading.kind() != kind {
        return Err(CollectionError::UnexpectedReading(kind));
    }
    reading
        .validate()
        .map_err(|reason| CollectionError::InvalidReading { kind, reason })?;
    Ok(reading)
}
