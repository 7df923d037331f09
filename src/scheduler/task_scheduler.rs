use super::task_runner::TaskRunner;
use crate::config::Config;
use crate::error::Result;
use crate::executor::{
    ExecutionMode, PoolStatsSnapshot, Task, TaskPriority, TaskTraits, WorkerPool,
};
use std::panic::Location;
use std::sync::Arc;

/// The pools a scheduler runs, split by priority class and I/O requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    Background,
    BackgroundFileIo,
    Foreground,
    ForegroundFileIo,
}

impl PoolKind {
    pub const ALL: [PoolKind; 4] = [
        PoolKind::Background,
        PoolKind::BackgroundFileIo,
        PoolKind::Foreground,
        PoolKind::ForegroundFileIo,
    ];

    /// Pool that runs tasks with `traits`.
    pub fn for_traits(traits: &TaskTraits) -> Self {
        match (traits.priority() == TaskPriority::Background, traits.file_io()) {
            (true, false) => PoolKind::Background,
            (true, true) => PoolKind::BackgroundFileIo,
            (false, false) => PoolKind::Foreground,
            (false, true) => PoolKind::ForegroundFileIo,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PoolKind::Background => "background",
            PoolKind::BackgroundFileIo => "background-file-io",
            PoolKind::Foreground => "foreground",
            PoolKind::ForegroundFileIo => "foreground-file-io",
        }
    }

    pub fn is_background(self) -> bool {
        matches!(self, PoolKind::Background | PoolKind::BackgroundFileIo)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Owns the worker pools and hands out task runners.
///
/// Dropping the scheduler joins it. Runners that outlive it keep working as
/// handles but every post fails.
pub struct TaskScheduler {
    pools: Vec<Arc<WorkerPool>>,
    config: Config,
}

impl TaskScheduler {
    /// Creates a scheduler with the default configuration.
    pub fn create() -> Result<Self> {
        Self::new(Config::default())
    }

    /// Starts every pool. Fails if any worker thread cannot be spawned, in
    /// which case the threads already started are joined first.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let mut pools: Vec<Arc<WorkerPool>> = Vec::with_capacity(PoolKind::ALL.len());
        for kind in PoolKind::ALL {
            let threads = if kind.is_background() {
                config.background_worker_threads()
            } else {
                config.foreground_worker_threads()
            };
            // On error `pools` drops here, joining the pools started so far.
            pools.push(Arc::new(WorkerPool::new(kind.name(), threads, &config)?));
        }

        tracing::info!(
            foreground_threads = config.foreground_worker_threads(),
            background_threads = config.background_worker_threads(),
            "task scheduler started"
        );

        Ok(Self { pools, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn pool(&self, kind: PoolKind) -> &Arc<WorkerPool> {
        &self.pools[kind.index()]
    }

    /// Posts a one-off task with `traits` and no ordering relative to other
    /// tasks. Returns false if the scheduler is shutting down.
    #[track_caller]
    pub fn post_task_with_traits<F>(&self, traits: TaskTraits, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let task = Task::new(traits, Location::caller(), f);
        self.pool(PoolKind::for_traits(&traits)).post_task(task, None)
    }

    /// Returns a runner posting tasks with `traits` in `mode`. Sequenced and
    /// single-threaded runners get a fresh sequence.
    pub fn create_task_runner_with_traits(
        &self,
        traits: TaskTraits,
        mode: ExecutionMode,
    ) -> TaskRunner {
        TaskRunner::new(self.pool(PoolKind::for_traits(&traits)).clone(), traits, mode)
    }

    /// Number of worker threads in the pool of `kind`.
    pub fn num_threads(&self, kind: PoolKind) -> usize {
        self.pool(kind).num_threads()
    }

    /// Signals shutdown to every pool and blocks until all their workers have
    /// exited. Tasks already claimed run to completion; what happens to queued
    /// tasks depends on [`Config::join_policy`]. Later calls return at once.
    pub fn join_for_testing(&self) {
        let first_join = !self.pools.iter().all(|pool| pool.is_shut_down());
        if first_join {
            tracing::info!("joining task scheduler");
        }

        for pool in &self.pools {
            pool.begin_shutdown();
        }
        for pool in &self.pools {
            pool.join();
        }

        if first_join {
            tracing::info!("task scheduler joined");
        }
    }

    /// Counters for every pool, in [`PoolKind::ALL`] order.
    pub fn stats(&self) -> Vec<PoolStatsSnapshot> {
        self.pools.iter().map(|pool| pool.stats()).collect()
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("pools", &self.pools)
            .finish()
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.join_for_testing();
    }
}
