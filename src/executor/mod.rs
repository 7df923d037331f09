//! Task execution infrastructure.
//!
//! This module provides the core task execution primitives: tasks and their
//! traits, the per-task environment guard, worker threads and the worker pool.

pub(crate) mod environment;
pub mod panic_handler;
pub(crate) mod task;
pub mod traits;
pub(crate) mod worker;
pub mod worker_pool;

pub use panic_handler::{PanicHandler, PanicInfo, PanicStrategy};
pub use traits::{ExecutionMode, TaskPriority, TaskTraits};
pub use worker_pool::{PoolStatsSnapshot, WorkerPool};

pub(crate) use task::Task;
