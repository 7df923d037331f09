use super::sequence::Sequence;
use crate::executor::worker;
use crate::executor::{ExecutionMode, Task, TaskTraits, WorkerPool};
use std::panic::Location;
use std::sync::Arc;

/// Handle for posting tasks with one fixed set of traits and one execution
/// mode. Cheap to clone; clones post into the same sequence.
#[derive(Clone)]
pub struct TaskRunner {
    pool: Arc<WorkerPool>,
    traits: TaskTraits,
    mode: ExecutionMode,
    /// `None` for parallel runners.
    sequence: Option<Arc<Sequence>>,
}

impl TaskRunner {
    pub(crate) fn new(pool: Arc<WorkerPool>, traits: TaskTraits, mode: ExecutionMode) -> Self {
        let sequence = match mode {
            ExecutionMode::Parallel => None,
            ExecutionMode::Sequenced => Some(Arc::new(Sequence::new(None))),
            ExecutionMode::SingleThreaded => {
                Some(Arc::new(Sequence::new(Some(pool.next_affinity()))))
            }
        };

        Self {
            pool,
            traits,
            mode,
            sequence,
        }
    }

    /// Posts `f` for execution. Never blocks. Returns false, dropping `f`
    /// unrun, if the scheduler has started shutting down.
    #[track_caller]
    pub fn post_task<F>(&self, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let task = Task::new(self.traits, Location::caller(), f);
        self.pool.post_task(task, self.sequence.as_ref())
    }

    /// Whether the calling thread is running a task of this runner.
    ///
    /// For sequenced and single-threaded runners this holds exactly while a
    /// task of this runner's sequence runs on the calling thread. For parallel
    /// runners it holds on any worker of the pool the runner posts to.
    pub fn runs_tasks_on_current_thread(&self) -> bool {
        match &self.sequence {
            Some(sequence) => worker::running_sequence() == Some(sequence.id()),
            None => worker::current_pool() == Some(self.pool.id()),
        }
    }

    pub fn traits(&self) -> TaskTraits {
        self.traits
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("pool", &self.pool.name())
            .field("traits", &self.traits)
            .field("mode", &self.mode)
            .field("sequence", &self.sequence.as_ref().map(|s| s.id()))
            .finish()
    }
}
