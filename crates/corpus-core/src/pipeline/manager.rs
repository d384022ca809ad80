//! PipelineManager - continuous pipeline lifecycle
//!
//! Each continuous pipeline runs as one spawned task that repeats the
//! pipeline step on a fixed interval until it is cancelled.
//!
//! Architecture:
//! - The manager owns a map of pipeline id -> handle (record, token, task)
//! - The task and the manager share the record (state + stats)
//! - Stop is cooperative: the token is checked before every iteration and
//!   raced against the sleep; an in-flight step is allowed to finish
//!
//! State machine: Stopped → Running → {Stopped (explicit stop), Error (fatal loop fault)}

use futures::future::join_all;
use futures::FutureExt;
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::validate_pipeline;
use crate::error::{Error, Result};
use crate::pipeline::PipelineStep;
use crate::types::{PipelineConfig, PipelineSnapshot, PipelineState, PipelineStats, PipelineSummary};

/// State and counters shared between the manager and a pipeline task
#[derive(Debug)]
struct PipelineRecord {
    state: PipelineState,
    stats: PipelineStats,
}

type SharedRecord = Arc<StdMutex<PipelineRecord>>;

/// Handle for a pipeline and its background task
struct PipelineHandle {
    stages: Vec<String>,
    config: PipelineConfig,
    record: SharedRecord,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PipelineHandle {
    fn read(&self) -> (PipelineState, PipelineStats) {
        let record = self.record.lock().unwrap_or_else(PoisonError::into_inner);
        (record.state, record.stats.clone())
    }

    fn snapshot(&self, id: &str) -> PipelineSnapshot {
        let (state, stats) = self.read();
        PipelineSnapshot {
            id: id.to_string(),
            stages: self.stages.clone(),
            state,
            config: self.config.clone(),
            stats,
        }
    }
}

/// PipelineManager owns every continuous pipeline
pub struct PipelineManager {
    step: Arc<dyn PipelineStep>,
    /// Pipelines by id; stopped records stay until purged
    pipelines: RwLock<HashMap<String, PipelineHandle>>,
    /// Serializes start/stop bookkeeping; never held across a task join
    operation_lock: Mutex<()>,
    /// Upper bound on how long stop waits for a task to exit
    stop_grace: Duration,
}

impl PipelineManager {
    pub fn new(step: Arc<dyn PipelineStep>, stop_grace: Duration) -> Self {
        Self {
            step,
            pipelines: RwLock::new(HashMap::new()),
            operation_lock: Mutex::new(()),
            stop_grace,
        }
    }

    /// Start a continuous pipeline. Returns false if `id` is already running.
    pub async fn start(&self, id: &str, config: PipelineConfig) -> bool {
        match self.try_start(id, config).await {
            Ok(()) => true,
            Err(e) => {
                warn!(pipeline_id = %id, error = %e, "Failed to start pipeline");
                false
            }
        }
    }

    pub async fn try_start(&self, id: &str, config: PipelineConfig) -> Result<()> {
        validate_pipeline(&config)?;

        let _lock = self.operation_lock.lock().await;
        let mut pipelines = self.pipelines.write().await;

        if let Some(existing) = pipelines.get(id) {
            if existing.read().0 == PipelineState::Running {
                return Err(Error::PipelineAlreadyRunning(id.to_string()));
            }
            // Stopped or failed: the old token is already cancelled unless the
            // task died on its own, so cancelling again is harmless
            existing.cancel.cancel();
        }

        let record = Arc::new(StdMutex::new(PipelineRecord {
            state: PipelineState::Running,
            stats: PipelineStats::new(),
        }));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_pipeline(
            id.to_string(),
            Arc::clone(&self.step),
            config.clone(),
            Arc::clone(&record),
            cancel.clone(),
        ));

        info!(
            pipeline_id = %id,
            interval_ms = config.interval_ms,
            emotion = %config.emotion_tag,
            "Started continuous pipeline"
        );

        pipelines.insert(
            id.to_string(),
            PipelineHandle {
                stages: self.step.stages(),
                config,
                record,
                cancel,
                task: Some(task),
            },
        );
        Ok(())
    }

    /// Stop a running pipeline.
    ///
    /// The state flips to `Stopped` before the task is joined. The join is
    /// bounded by the grace period: a task stuck in an in-flight call may
    /// still be finishing when this returns true.
    pub async fn stop(&self, id: &str) -> bool {
        match self.try_stop(id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(pipeline_id = %id, error = %e, "Failed to stop pipeline");
                false
            }
        }
    }

    pub async fn try_stop(&self, id: &str) -> Result<()> {
        let task = self.detach(id).await?;
        info!(pipeline_id = %id, "Stopped pipeline");
        self.join_task(id, task).await;
        Ok(())
    }

    /// Cancel a running pipeline, mark it `Stopped` and hand back its task.
    ///
    /// Holds the operation lock; the join in `try_stop` happens after it is released.
    async fn detach(&self, id: &str) -> Result<Option<JoinHandle<()>>> {
        let _lock = self.operation_lock.lock().await;
        let mut pipelines = self.pipelines.write().await;
        let handle = pipelines
            .get_mut(id)
            .ok_or_else(|| Error::PipelineNotFound(id.to_string()))?;

        {
            let mut record = handle.record.lock().unwrap_or_else(PoisonError::into_inner);
            if record.state != PipelineState::Running {
                return Err(Error::PipelineNotRunning(id.to_string()));
            }
            handle.cancel.cancel();
            record.state = PipelineState::Stopped;
        }
        Ok(handle.task.take())
    }

    /// Wait for a detached task, at most the grace period
    async fn join_task(&self, id: &str, task: Option<JoinHandle<()>>) {
        let Some(task) = task else {
            return;
        };
        match timeout(self.stop_grace, task).await {
            Ok(Ok(())) => debug!(pipeline_id = %id, "Pipeline task exited"),
            Ok(Err(e)) => warn!(pipeline_id = %id, error = %e, "Pipeline task ended abnormally"),
            Err(_) => warn!(
                pipeline_id = %id,
                grace = ?self.stop_grace,
                "Pipeline task still finishing after grace period"
            ),
        }
    }

    /// Full record for one pipeline
    pub async fn status(&self, id: &str) -> Result<PipelineSnapshot> {
        let pipelines = self.pipelines.read().await;
        pipelines
            .get(id)
            .map(|handle| handle.snapshot(id))
            .ok_or_else(|| Error::PipelineNotFound(id.to_string()))
    }

    /// Summary of every pipeline keyed by id
    pub async fn statuses(&self) -> BTreeMap<String, PipelineSummary> {
        let pipelines = self.pipelines.read().await;
        pipelines
            .iter()
            .map(|(id, handle)| (id.clone(), handle.snapshot(id).into()))
            .collect()
    }

    /// Only the state of every pipeline
    pub async fn states(&self) -> BTreeMap<String, PipelineState> {
        let pipelines = self.pipelines.read().await;
        pipelines
            .iter()
            .map(|(id, handle)| (id.clone(), handle.read().0))
            .collect()
    }

    pub async fn is_running(&self, id: &str) -> bool {
        let pipelines = self.pipelines.read().await;
        pipelines
            .get(id)
            .is_some_and(|handle| handle.read().0 == PipelineState::Running)
    }

    /// Drop records that are not running. Returns how many were removed.
    pub async fn purge_stopped(&self) -> usize {
        let _lock = self.operation_lock.lock().await;
        let mut pipelines = self.pipelines.write().await;
        let before = pipelines.len();
        pipelines.retain(|_, handle| handle.read().0 == PipelineState::Running);
        let purged = before - pipelines.len();
        if purged > 0 {
            info!(purged, "Purged stopped pipelines");
        }
        purged
    }

    /// Stop every running pipeline. Call once at shutdown.
    ///
    /// Grace periods run concurrently, so shutdown waits at most one of them.
    pub async fn cleanup_all(&self) -> usize {
        let ids: Vec<String> = self.pipelines.read().await.keys().cloned().collect();

        let mut detached = Vec::new();
        for id in ids {
            if let Ok(task) = self.detach(&id).await {
                info!(pipeline_id = %id, "Stopped pipeline");
                detached.push((id, task));
            }
        }

        let stopped = detached.len();
        join_all(
            detached
                .into_iter()
                .map(|(id, task)| async move { self.join_task(&id, task).await }),
        )
        .await;

        info!(stopped, "Pipeline cleanup complete");
        stopped
    }
}

impl Drop for PipelineManager {
    fn drop(&mut self) {
        for handle in self.pipelines.get_mut().values() {
            handle.cancel.cancel();
        }
    }
}

/// Body of a continuous pipeline task
async fn run_pipeline(
    id: String,
    step: Arc<dyn PipelineStep>,
    config: PipelineConfig,
    record: SharedRecord,
    cancel: CancellationToken,
) {
    let interval = Duration::from_millis(config.interval_ms);

    loop {
        if cancel.is_cancelled() {
            break;
        }

        match begin_iteration(&record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                fail(&id, &record, &cancel, &e.to_string());
                break;
            }
        }

        let outcome = AssertUnwindSafe(step.execute_once(&config))
            .catch_unwind()
            .await;
        let success = match outcome {
            Ok(success) => success,
            Err(_) => {
                fail(&id, &record, &cancel, "pipeline step panicked");
                break;
            }
        };

        if success {
            info!(pipeline_id = %id, "Pipeline executed successfully");
        } else {
            warn!(pipeline_id = %id, "Pipeline execution failed");
        }

        if let Err(e) = finish_iteration(&record, success) {
            fail(&id, &record, &cancel, &e.to_string());
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(interval) => {}
        }
    }

    info!(pipeline_id = %id, "Pipeline worker stopped");
}

/// Count an execution unless the pipeline has been stopped meanwhile
fn begin_iteration(record: &StdMutex<PipelineRecord>) -> Result<bool> {
    let mut record = record.lock().map_err(|_| Error::LockPoisoned)?;
    if record.state != PipelineState::Running {
        return Ok(false);
    }
    record.stats.execution_count += 1;
    Ok(true)
}

fn finish_iteration(record: &StdMutex<PipelineRecord>, success: bool) -> Result<()> {
    let mut record = record.lock().map_err(|_| Error::LockPoisoned)?;
    if success {
        record.stats.success_count += 1;
    }
    Ok(())
}

/// Terminal transition to `Error`; an explicit stop wins over a late fault
fn fail(id: &str, record: &StdMutex<PipelineRecord>, cancel: &CancellationToken, reason: &str) {
    error!(pipeline_id = %id, error = %reason, "Pipeline worker error");
    let mut record = record.lock().unwrap_or_else(PoisonError::into_inner);
    if record.state == PipelineState::Running && !cancel.is_cancelled() {
        record.state = PipelineState::Error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Instant;

    /// Step that counts calls and returns a fixed result after a delay
    struct CountingStep {
        calls: AtomicU64,
        result: bool,
        delay: Duration,
    }

    impl CountingStep {
        fn new(result: bool) -> Arc<Self> {
            Self::slow(result, Duration::ZERO)
        }

        fn slow(result: bool, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU64::new(0),
                result,
                delay,
            })
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PipelineStep for CountingStep {
        fn stages(&self) -> Vec<String> {
            vec!["vision".into(), "speech".into()]
        }

        async fn execute_once(&self, _config: &PipelineConfig) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            self.result
        }
    }

    /// Succeeds on every other call
    struct AlternatingStep {
        calls: AtomicU64,
    }

    #[async_trait]
    impl PipelineStep for AlternatingStep {
        fn stages(&self) -> Vec<String> {
            vec!["vision".into(), "speech".into()]
        }

        async fn execute_once(&self, _config: &PipelineConfig) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0
        }
    }

    struct PanickingStep;

    #[async_trait]
    impl PipelineStep for PanickingStep {
        fn stages(&self) -> Vec<String> {
            vec!["vision".into(), "speech".into()]
        }

        async fn execute_once(&self, _config: &PipelineConfig) -> bool {
            panic!("step exploded");
        }
    }

    fn config(interval_ms: u64) -> PipelineConfig {
        PipelineConfig {
            interval_ms,
            voice_id: "ito".into(),
            emotion_tag: "curious".into(),
        }
    }

    fn manager(step: Arc<dyn PipelineStep>) -> PipelineManager {
        PipelineManager::new(step, Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_start_runs_iterations() {
        let step = CountingStep::new(true);
        let manager = manager(step.clone());

        assert!(manager.start("p1", config(20)).await);
        sleep(Duration::from_millis(150)).await;

        let status = manager.status("p1").await.unwrap();
        assert_eq!(status.state, PipelineState::Running);
        assert_eq!(status.stages, vec!["vision", "speech"]);
        assert_eq!(status.config.emotion_tag, "curious");
        assert!(status.stats.execution_count >= 2);
        assert!(status.stats.success_count >= 1);
        assert!(status.stats.execution_count >= status.stats.success_count);

        manager.cleanup_all().await;
    }

    #[tokio::test]
    async fn test_duplicate_start_keeps_original_task() {
        let step = CountingStep::new(true);
        let manager = manager(step.clone());

        assert!(manager.start("p1", config(50)).await);
        let started_at = manager.status("p1").await.unwrap().stats.started_at;
        assert!(!manager.start("p1", config(10)).await);

        sleep(Duration::from_millis(260)).await;
        let status = manager.status("p1").await.unwrap();

        // Same record, original interval: one task drives the counters
        assert_eq!(status.stats.started_at, started_at);
        assert_eq!(status.config.interval_ms, 50);
        assert_eq!(step.calls(), status.stats.execution_count);
        assert!(status.stats.execution_count <= 7);

        manager.cleanup_all().await;
    }

    #[tokio::test]
    async fn test_stop_is_immediate_and_final() {
        let step = CountingStep::new(true);
        let manager = manager(step.clone());

        assert!(manager.start("p1", config(20)).await);
        sleep(Duration::from_millis(80)).await;
        assert!(manager.stop("p1").await);

        let stopped = manager.status("p1").await.unwrap();
        assert_eq!(stopped.state, PipelineState::Stopped);

        sleep(Duration::from_millis(150)).await;
        let later = manager.status("p1").await.unwrap();
        assert_eq!(later.stats.execution_count, stopped.stats.execution_count);
        assert_eq!(later.state, PipelineState::Stopped);
    }

    #[tokio::test]
    async fn test_start_then_immediate_stop() {
        let manager = manager(CountingStep::new(false));

        assert!(manager.start("p1", config(100)).await);
        assert!(manager.stop("p1").await);
        assert_eq!(
            manager.status("p1").await.unwrap().state,
            PipelineState::Stopped
        );
    }

    #[tokio::test]
    async fn test_stop_unknown_and_repeated() {
        let manager = manager(CountingStep::new(true));

        assert!(!manager.stop("missing").await);
        assert!(matches!(
            manager.try_stop("missing").await,
            Err(Error::PipelineNotFound(_))
        ));

        assert!(manager.start("p1", config(20)).await);
        assert!(manager.stop("p1").await);
        assert!(!manager.stop("p1").await);
        assert!(matches!(
            manager.try_stop("p1").await,
            Err(Error::PipelineNotRunning(_))
        ));
        assert_eq!(
            manager.status("p1").await.unwrap().state,
            PipelineState::Stopped
        );
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_loop() {
        let manager = manager(CountingStep::new(false));

        assert!(manager.start("p1", config(10)).await);
        sleep(Duration::from_millis(120)).await;

        let status = manager.status("p1").await.unwrap();
        assert_eq!(status.state, PipelineState::Running);
        assert!(status.stats.execution_count >= 3);
        assert_eq!(status.stats.success_count, 0);

        manager.cleanup_all().await;
    }

    #[tokio::test]
    async fn test_counters_never_invert() {
        let step = Arc::new(AlternatingStep {
            calls: AtomicU64::new(0),
        });
        let manager = manager(step);

        assert!(manager.start("p1", config(1)).await);
        for _ in 0..50 {
            let stats = manager.status("p1").await.unwrap().stats;
            assert!(stats.execution_count >= stats.success_count);
            sleep(Duration::from_millis(2)).await;
        }
        manager.cleanup_all().await;

        let stats = manager.status("p1").await.unwrap().stats;
        assert!(stats.success_count > 0);
        assert!(stats.execution_count > stats.success_count);
    }

    #[tokio::test]
    async fn test_panicking_step_moves_to_error() {
        let manager = manager(Arc::new(PanickingStep));

        assert!(manager.start("p1", config(10)).await);
        sleep(Duration::from_millis(100)).await;

        let status = manager.status("p1").await.unwrap();
        assert_eq!(status.state, PipelineState::Error);
        assert_eq!(status.stats.execution_count, 1);
        assert_eq!(status.stats.success_count, 0);

        // Failed pipelines are not running, so stop refuses and start is allowed
        assert!(!manager.stop("p1").await);
        assert!(manager.start("p1", config(10)).await);
        manager.cleanup_all().await;
    }

    #[tokio::test]
    async fn test_restart_resets_stats() {
        let manager = manager(CountingStep::new(true));

        assert!(manager.start("p1", config(10)).await);
        sleep(Duration::from_millis(60)).await;
        assert!(manager.stop("p1").await);
        let first = manager.status("p1").await.unwrap().stats;
        assert!(first.execution_count > 0);

        assert!(manager.start("p1", config(1000)).await);
        let second = manager.status("p1").await.unwrap();
        assert_eq!(second.state, PipelineState::Running);
        assert!(second.stats.execution_count <= 1);
        assert!(second.stats.started_at >= first.started_at);

        manager.cleanup_all().await;
    }

    #[tokio::test]
    async fn test_stop_returns_after_grace_period() {
        let step = CountingStep::slow(true, Duration::from_secs(2));
        let manager = PipelineManager::new(step, Duration::from_millis(100));

        assert!(manager.start("slow", config(10)).await);
        // Let the first call get in flight
        sleep(Duration::from_millis(30)).await;

        let started = Instant::now();
        assert!(manager.stop("slow").await);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(
            manager.status("slow").await.unwrap().state,
            PipelineState::Stopped
        );
    }

    #[tokio::test]
    async fn test_independent_pipelines() {
        let manager = manager(CountingStep::new(true));

        assert!(manager.start("a", config(10)).await);
        assert!(manager.start("b", config(10)).await);
        assert!(manager.stop("a").await);

        let states = manager.states().await;
        assert_eq!(states["a"], PipelineState::Stopped);
        assert_eq!(states["b"], PipelineState::Running);
        assert!(manager.is_running("b").await);
        assert!(!manager.is_running("a").await);

        let summaries = manager.statuses().await;
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries["b"].stages, vec!["vision", "speech"]);

        manager.cleanup_all().await;
    }

    #[tokio::test]
    async fn test_slow_stop_does_not_block_other_pipelines() {
        let step = CountingStep::slow(true, Duration::from_secs(3));
        let manager = Arc::new(PipelineManager::new(step, Duration::from_secs(1)));

        assert!(manager.start("a", config(10)).await);
        sleep(Duration::from_millis(30)).await;

        let stopping = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.stop("a").await })
        };
        // Stop of "a" is now waiting out its grace period
        sleep(Duration::from_millis(50)).await;
        assert_eq!(manager.states().await["a"], PipelineState::Stopped);

        let started = Instant::now();
        assert!(manager.start("b", config(10)).await);
        assert!(
            started.elapsed() < Duration::from_millis(500),
            "start of b waited {:?}",
            started.elapsed()
        );
        assert!(manager.is_running("b").await);

        assert!(stopping.await.unwrap());
        assert!(manager.stop("b").await);
    }

    #[tokio::test]
    async fn test_cleanup_all_waits_one_grace_period() {
        let step = CountingStep::slow(true, Duration::from_secs(3));
        let manager = PipelineManager::new(step, Duration::from_millis(400));

        for id in ["a", "b", "c"] {
            assert!(manager.start(id, config(10)).await);
        }
        sleep(Duration::from_millis(30)).await;

        let started = Instant::now();
        assert_eq!(manager.cleanup_all().await, 3);
        assert!(
            started.elapsed() < Duration::from_millis(900),
            "cleanup took {:?}",
            started.elapsed()
        );
        assert!(
            manager
                .states()
                .await
                .values()
                .all(|s| *s == PipelineState::Stopped)
        );
    }

    #[tokio::test]
    async fn test_cleanup_all_and_purge() {
        let manager = manager(CountingStep::new(true));

        assert!(manager.start("a", config(10)).await);
        assert!(manager.start("b", config(10)).await);
        assert!(manager.start("c", config(10)).await);
        assert!(manager.stop("c").await);

        assert_eq!(manager.cleanup_all().await, 2);
        assert!(
            manager
                .states()
                .await
                .values()
                .all(|s| *s == PipelineState::Stopped)
        );

        assert_eq!(manager.purge_stopped().await, 3);
        assert!(manager.states().await.is_empty());
        assert!(manager.status("a").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let manager = manager(CountingStep::new(true));
        assert!(!manager.start("p1", config(0)).await);
        assert!(manager.status("p1").await.is_err());
    }

    #[tokio::test]
    async fn test_drop_cancels_tasks() {
        let step = CountingStep::new(true);
        let manager = manager(step.clone());

        assert!(manager.start("p1", config(10)).await);
        sleep(Duration::from_millis(40)).await;
        drop(manager);

        sleep(Duration::from_millis(30)).await;
        let calls = step.calls();
        sleep(Duration::from_millis(80)).await;
        assert_eq!(step.calls(), calls);
    }
}
