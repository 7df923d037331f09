//! Task routing and ordering.
//!
//! The scheduler picks the worker pool for each task from its traits, keeps
//! sequenced tasks in FIFO [`sequence`]s, and orders ready work by priority
//! and post order.

pub(crate) mod priority;
pub mod sequence;
pub mod task_runner;
pub mod task_scheduler;

pub use sequence::SequenceId;
pub use task_runner::TaskRunner;
pub use task_scheduler::{PoolKind, TaskScheduler};
