use super::panic_handler::PanicHandler;
use super::task::Task;
use super::worker::{self, Worker};
use crate::config::{Config, JoinPolicy};
use crate::error::{Error, Result};
use crate::scheduler::priority::{ReadyQueue, ReadyUnit, SortKey};
use crate::scheduler::sequence::Sequence;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique pool identifier.
pub(crate) type PoolId = u64;

/// Counters kept by each pool.
#[derive(Debug, Default)]
pub(crate) struct PoolStats {
    tasks_posted: AtomicU64,
    tasks_executed: AtomicU64,
    tasks_panicked: AtomicU64,
    tasks_discarded: AtomicU64,
    tasks_rejected: AtomicU64,
}

impl PoolStats {
    pub fn record_executed(&self) {
        self.tasks_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_panicked(&self) {
        self.tasks_panicked.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self, pool: &'static str) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            pool,
            tasks_posted: self.tasks_posted.load(Ordering::Relaxed),
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            tasks_panicked: self.tasks_panicked.load(Ordering::Relaxed),
            tasks_discarded: self.tasks_discarded.load(Ordering::Relaxed),
            tasks_rejected: self.tasks_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a pool's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    pub pool: &'static str,
    /// Tasks accepted for execution.
    pub tasks_posted: u64,
    /// Tasks whose body returned normally.
    pub tasks_executed: u64,
    /// Tasks whose body panicked.
    pub tasks_panicked: u64,
    /// Accepted tasks dropped unrun at join.
    pub tasks_discarded: u64,
    /// Tasks refused because the pool was shutting down.
    pub tasks_rejected: u64,
}

impl PoolStatsSnapshot {
    /// Tasks that ran, successfully or not.
    pub fn tasks_run(&self) -> u64 {
        self.tasks_executed + self.tasks_panicked
    }
}

/// Everything under the pool lock.
#[derive(Debug)]
pub(crate) struct PoolState {
    shared_queue: ReadyQueue,
    /// Private queues of workers that own single-threaded sequences.
    worker_queues: Vec<ReadyQueue>,
    next_sequence_num: u64,
    pub shutdown: bool,
}

impl PoolState {
    fn new(num_threads: usize) -> Self {
        Self {
            shared_queue: ReadyQueue::new(),
            worker_queues: (0..num_threads).map(|_| ReadyQueue::new()).collect(),
            next_sequence_num: 0,
            shutdown: false,
        }
    }

    /// Best unit between the worker's private queue and the shared one.
    pub fn pop_for_worker(&mut self, index: usize) -> Option<ReadyUnit> {
        let private = self.worker_queues[index].peek_key();
        let shared = self.shared_queue.peek_key();
        match (private, shared) {
            (Some(p), Some(s)) if p > s => self.worker_queues[index].pop(),
            (Some(_), None) => self.worker_queues[index].pop(),
            (_, Some(_)) => self.shared_queue.pop(),
            (None, None) => None,
        }
    }

    fn push(&mut self, unit: ReadyUnit, key: SortKey, affinity: Option<usize>) {
        match affinity {
            Some(index) => self.worker_queues[index].push(unit, key),
            None => self.shared_queue.push(unit, key),
        }
    }

    fn take_all(&mut self) -> Vec<ReadyUnit> {
        let mut units = self.shared_queue.take_all();
        for queue in &mut self.worker_queues {
            units.extend(queue.take_all());
        }
        units
    }
}

/// State shared between a pool handle and its worker threads.
#[derive(Debug)]
pub(crate) struct PoolShared {
    pub id: PoolId,
    pub name: &'static str,
    pub state: Mutex<PoolState>,
    pub work_available: Condvar,
    pub panic_handler: PanicHandler,
    pub join_policy: JoinPolicy,
    pub stats: PoolStats,
}

impl PoolShared {
    fn wake(&self, affinity: Option<usize>) {
        match affinity {
            // A condvar cannot target one waiter; wake all so the bound
            // worker is among them.
            Some(_) => {
                self.work_available.notify_all();
            }
            None => {
                self.work_available.notify_one();
            }
        }
    }

    /// Puts a sequence back after one of its tasks ran on worker
    /// `from_worker`.
    pub fn reenqueue_sequence(&self, sequence: Arc<Sequence>, key: SortKey, from_worker: usize) {
        let affinity = sequence.affinity();
        self.state
            .lock()
            .push(ReadyUnit::Sequence(sequence), key, affinity);
        // The bound worker checks its private queue before waiting again.
        if affinity != Some(from_worker) {
            self.wake(affinity);
        }
    }
}

struct WorkerHandle {
    index: usize,
    thread: JoinHandle<()>,
}

/// A fixed set of worker threads pulling from one priority-ordered ready
/// queue, plus one private queue per worker for single-threaded sequences.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Mutex<Vec<WorkerHandle>>,
    num_threads: usize,
    next_affinity: AtomicUsize,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .field("num_threads", &self.num_threads)
            .finish()
    }
}

impl WorkerPool {
    pub fn new(name: &'static str, num_threads: usize, config: &Config) -> Result<Self> {
        if num_threads == 0 {
            return Err(Error::config("need at least 1 thread"));
        }

        let shared = Arc::new(PoolShared {
            id: POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            name,
            state: Mutex::new(PoolState::new(num_threads)),
            work_available: Condvar::new(),
            panic_handler: PanicHandler::new(config.panic_strategy),
            join_policy: config.join_policy,
            stats: PoolStats::default(),
        });

        let pool = Self {
            shared,
            workers: Mutex::new(Vec::with_capacity(num_threads)),
            num_threads,
            next_affinity: AtomicUsize::new(0),
        };

        for index in 0..num_threads {
            let worker = Worker::new(index, pool.shared.clone());
            let mut builder = thread::Builder::new().name(format!(
                "{}-{}-{}",
                config.thread_name_prefix, name, index
            ));

            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            match builder.spawn(move || worker.run()) {
                Ok(thread) => pool.workers.lock().push(WorkerHandle { index, thread }),
                Err(e) => {
                    // Dropping `pool` joins the threads spawned so far.
                    tracing::error!(pool = name, index, error = %e, "failed to spawn worker");
                    return Err(Error::thread_spawn(name, e));
                }
            }
        }

        tracing::debug!(pool = name, num_threads, "worker pool started");
        Ok(pool)
    }

    pub(crate) fn id(&self) -> PoolId {
        self.shared.id
    }

    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Worker for the next single-threaded sequence, round-robin.
    pub(crate) fn next_affinity(&self) -> usize {
        self.next_affinity.fetch_add(1, Ordering::Relaxed) % self.num_threads
    }

    /// Queues `task`, inside `sequence` if given. Returns false and drops the
    /// task if the pool is shutting down.
    pub(crate) fn post_task(&self, mut task: Task, sequence: Option<&Arc<Sequence>>) -> bool {
        let mut state = self.shared.state.lock();
        if state.shutdown {
            drop(state);
            self.shared.stats.tasks_rejected.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(
                pool = self.shared.name,
                posted_from = %task.posted_from,
                "rejected task posted after shutdown"
            );
            drop(task);
            return false;
        }

        task.sequence_num = state.next_sequence_num;
        state.next_sequence_num += 1;

        let affinity = match sequence {
            None => {
                let key = SortKey::of(&task);
                state.push(ReadyUnit::Task(task), key, None);
                Some(None)
            }
            Some(sequence) => match sequence.push_task(task) {
                Some(key) => {
                    let affinity = sequence.affinity();
                    state.push(ReadyUnit::Sequence(sequence.clone()), key, affinity);
                    Some(affinity)
                }
                // Already queued or running; it is picked up from there.
                None => None,
            },
        };
        drop(state);

        self.shared.stats.tasks_posted.fetch_add(1, Ordering::Relaxed);
        if let Some(affinity) = affinity {
            self.shared.wake(affinity);
        }
        true
    }

    /// Stops accepting work and wakes every worker so it can observe it.
    pub(crate) fn begin_shutdown(&self) {
        self.shared.state.lock().shutdown = true;
        self.shared.work_available.notify_all();
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.shared.state.lock().shutdown
    }

    /// Shuts down, waits for every worker to exit and drops whatever is still
    /// queued. Concurrent callers all wait for the workers; later calls are
    /// no-ops.
    pub(crate) fn join(&self) {
        self.begin_shutdown();

        if worker::current_pool() == Some(self.shared.id) {
            tracing::warn!(
                pool = self.shared.name,
                "join called from a worker of this pool; not waiting for workers"
            );
            return;
        }

        let leftovers = {
            let mut workers = self.workers.lock();
            for handle in workers.drain(..) {
                if handle.thread.join().is_err() {
                    tracing::error!(
                        pool = self.shared.name,
                        index = handle.index,
                        "worker thread panicked"
                    );
                }
            }
            self.shared.state.lock().take_all()
        };
        self.discard(leftovers);
    }

    fn discard(&self, units: Vec<ReadyUnit>) {
        let mut discarded = 0u64;
        for unit in units {
            match unit {
                ReadyUnit::Task(task) => {
                    discarded += 1;
                    drop(task);
                }
                ReadyUnit::Sequence(sequence) => {
                    let tasks = sequence.clear();
                    discarded += tasks.len() as u64;
                    drop(tasks);
                }
            }
        }

        if discarded > 0 {
            self.shared
                .stats
                .tasks_discarded
                .fetch_add(discarded, Ordering::Relaxed);
            tracing::debug!(pool = self.shared.name, discarded, "dropped queued tasks at join");
        }
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        self.shared.stats.snapshot(self.shared.name)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.join();
    }
}
