//! Background chunk generation: a worker pool that feeds results back to the frame loop.
#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tessera_chunk::{
    ChunkEffects, ChunkJob, ChunkManager, ChunkResult, DecorationGenerator, InstallOutcome,
};
use tessera_geom::Vec3;
use tessera_world::HeightSampler;

#[derive(Debug)]
pub enum RuntimeError {
    /// The worker pool could not be started.
    PoolBuild(String),
    /// All workers have exited.
    Disconnected,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::PoolBuild(e) => write!(f, "failed to start chunk workers: {e}"),
            RuntimeError::Disconnected => write!(f, "chunk workers disconnected"),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// One unit of work. The sampler travels with the job so a terrain change
/// never races a worker mid-chunk; stale results are dropped on install.
struct GenRequest {
    job: ChunkJob,
    sampler: Arc<HeightSampler>,
}

/// Generates chunk decorations off the frame thread.
///
/// Jobs come from [`ChunkManager::plan`]; results are published back with
/// [`ChunkWorkers::pump`], which goes through [`ChunkManager::install`] so
/// superseded work is discarded instead of cancelled.
pub struct ChunkWorkers {
    job_tx: Sender<GenRequest>,
    res_rx: Receiver<ChunkResult>,
    _pool: Arc<ThreadPool>,
    queued: Arc<AtomicUsize>,
    inflight: Arc<AtomicUsize>,
    workers: usize,
}

impl ChunkWorkers {
    pub fn new(workers: usize, generator: Arc<dyn DecorationGenerator>) -> Result<Self, RuntimeError> {
        let workers = workers.max(1);
        let (job_tx, job_rx) = unbounded::<GenRequest>();
        let (res_tx, res_rx) = unbounded::<ChunkResult>();
        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("tessera-gen-{i}"))
                .build()
                .map_err(|e| RuntimeError::PoolBuild(e.to_string()))?,
        );
        let queued = Arc::new(AtomicUsize::new(0));
        let inflight = Arc::new(AtomicUsize::new(0));
        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let generator = Arc::clone(&generator);
            let queued = Arc::clone(&queued);
            let inflight = Arc::clone(&inflight);
            pool.spawn(move || {
                while let Ok(req) = rx.recv() {
                    queued.fetch_sub(1, Ordering::Relaxed);
                    inflight.fetch_add(1, Ordering::Relaxed);
                    let decorations = generator.generate(&req.job, req.sampler.as_ref());
                    inflight.fetch_sub(1, Ordering::Relaxed);
                    let sent = tx.send(ChunkResult {
                        job: req.job,
                        decorations,
                    });
                    if sent.is_err() {
                        break;
                    }
                }
            });
        }
        log::info!("chunk workers started: {workers}");
        Ok(Self {
            job_tx,
            res_rx,
            _pool: pool,
            queued,
            inflight,
            workers,
        })
    }

    /// Two fewer than the available cores, at least one.
    pub fn default_worker_count() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(2))
            .unwrap_or(1)
            .max(1)
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    pub fn submit(&self, job: ChunkJob, sampler: &Arc<HeightSampler>) -> Result<(), RuntimeError> {
        self.queued.fetch_add(1, Ordering::Relaxed);
        let req = GenRequest {
            job,
            sampler: Arc::clone(sampler),
        };
        if self.job_tx.send(req).is_err() {
            self.queued.fetch_sub(1, Ordering::Relaxed);
            return Err(RuntimeError::Disconnected);
        }
        Ok(())
    }

    /// Plans a pass for `viewer` and queues its jobs. Unloads take effect
    /// immediately; loads arrive through [`Self::pump`].
    pub fn schedule(
        &self,
        manager: &mut ChunkManager,
        viewer: Vec3,
        sampler: &Arc<HeightSampler>,
    ) -> Result<ChunkEffects, RuntimeError> {
        let plan = manager.plan(viewer, sampler.seed());
        let n = plan.jobs.len();
        for job in plan.jobs {
            self.submit(job, sampler)?;
        }
        if n > 0 {
            log::debug!("queued {n} chunk jobs around {}", plan.center);
        }
        Ok(plan.effects)
    }

    pub fn drain_results(&self) -> Vec<ChunkResult> {
        self.res_rx.try_iter().collect()
    }

    /// Installs every finished result. Returns the published changes.
    pub fn pump(&self, manager: &mut ChunkManager) -> ChunkEffects {
        let mut effects = ChunkEffects::default();
        for result in self.drain_results() {
            apply(manager, result, &mut effects);
        }
        effects.sort();
        effects
    }

    /// Blocks until the manager has nothing pending or `timeout` passes.
    pub fn pump_until_idle(
        &self,
        manager: &mut ChunkManager,
        timeout: Duration,
    ) -> Result<ChunkEffects, RuntimeError> {
        let deadline = Instant::now() + timeout;
        let mut effects = ChunkEffects::default();
        while manager.pending_len() > 0 {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                log::warn!("chunk workers still busy: {} pending", manager.pending_len());
                break;
            }
            match self.res_rx.recv_timeout(left) {
                Ok(result) => apply(manager, result, &mut effects),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(RuntimeError::Disconnected),
            }
        }
        effects.sort();
        Ok(effects)
    }

    /// (queued, in flight)
    pub fn queue_counts(&self) -> (usize, usize) {
        (
            self.queued.load(Ordering::Relaxed),
            self.inflight.load(Ordering::Relaxed),
        )
    }
}

fn apply(manager: &mut ChunkManager, result: ChunkResult, effects: &mut ChunkEffects) {
    match manager.install(result) {
        InstallOutcome::Loaded(c, lod) => effects.loaded.push((c, lod)),
        InstallOutcome::LodChanged(change) => effects.lod_changed.push(change),
        InstallOutcome::Discarded | InstallOutcome::Failed(_) => {}
    }
}
