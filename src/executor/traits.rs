//! Declarative requirements attached to posted tasks.

use crate::platform::ThreadPriority;

/// Priority level for task scheduling, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum TaskPriority {
    /// Work the user will not notice if it is delayed.
    Background = 0,
    /// Work whose result the user will eventually see.
    #[default]
    UserVisible = 1,
    /// Work the user is actively waiting on.
    UserBlocking = 2,
}

impl TaskPriority {
    pub const LOWEST: TaskPriority = TaskPriority::Background;
    pub const HIGHEST: TaskPriority = TaskPriority::UserBlocking;

    /// Every priority, lowest first.
    pub const ALL: [TaskPriority; 3] = [
        TaskPriority::Background,
        TaskPriority::UserVisible,
        TaskPriority::UserBlocking,
    ];

    /// OS thread priority a task of this priority runs at.
    pub fn thread_priority(self) -> ThreadPriority {
        match self {
            TaskPriority::Background => ThreadPriority::Background,
            TaskPriority::UserVisible | TaskPriority::UserBlocking => ThreadPriority::Normal,
        }
    }
}

/// How tasks posted through one runner relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    /// No ordering; tasks may run concurrently on any worker.
    Parallel,
    /// FIFO, one at a time, on any worker.
    Sequenced,
    /// FIFO, one at a time, always on the same worker.
    SingleThreaded,
}

impl ExecutionMode {
    pub const ALL: [ExecutionMode; 3] = [
        ExecutionMode::Parallel,
        ExecutionMode::Sequenced,
        ExecutionMode::SingleThreaded,
    ];
}

/// Requirements of a task: its priority and whether it may block on file I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TaskTraits {
    priority: TaskPriority,
    with_file_io: bool,
}

impl TaskTraits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_file_io(mut self) -> Self {
        self.with_file_io = true;
        self
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn file_io(&self) -> bool {
        self.with_file_io
    }

    /// Every combination of priority and file I/O.
    pub fn all_combinations() -> impl Iterator<Item = TaskTraits> {
        TaskPriority::ALL.into_iter().flat_map(|priority| {
            let traits = TaskTraits::new().with_priority(priority);
            [traits, traits.with_file_io()]
        })
    }
}
