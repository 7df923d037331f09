//! Task representation and execution.

use super::traits::TaskTraits;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global task ID counter
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// A unit of deferred work. Runs at most once; dropping it unrun is how the
/// scheduler discards work at shutdown.
pub(crate) struct Task {
    pub(crate) id: TaskId,
    pub(crate) func: Box<dyn FnOnce() + Send + 'static>,
    pub(crate) traits: TaskTraits,
    pub(crate) posted_from: &'static Location<'static>,
    /// Position in its pool's post order. Assigned by the pool on post.
    pub(crate) sequence_num: u64,
}

impl Task {
    pub fn new<F>(traits: TaskTraits, posted_from: &'static Location<'static>, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Task {
            id: TaskId::next(),
            func: Box::new(f),
            traits,
            posted_from,
            sequence_num: 0,
        }
    }

    /// Execute the task
    pub fn execute(self) {
        (self.func)();
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("traits", &self.traits)
            .field("posted_from", &format_args!("{}", self.posted_from))
            .field("sequence_num", &self.sequence_num)
            .finish()
    }
}
