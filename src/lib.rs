//! strand - trait-aware task scheduling over shared worker pools
//!
//! Callers post closures annotated with [`TaskTraits`] (priority and whether
//! the task may block on file I/O). A [`TaskScheduler`] routes each task to
//! one of its worker pools and runs it with the thread priority and I/O
//! allowance its traits ask for, reverting both once the task returns.
//!
//! # Quick Start
//!
//! ```no_run
//! use strand::prelude::*;
//!
//! let scheduler = TaskScheduler::create().unwrap();
//!
//! // One-off task, no ordering.
//! scheduler.post_task_with_traits(TaskTraits::new().with_file_io(), || {
//!     strand::platform::assert_io_allowed();
//! });
//!
//! // Tasks posted through a sequenced runner run one at a time, in order.
//! let runner = scheduler.create_task_runner_with_traits(
//!     TaskTraits::new().with_priority(TaskPriority::Background),
//!     ExecutionMode::Sequenced,
//! );
//! for i in 0..3 {
//!     runner.post_task(move || println!("step {}", i));
//! }
//!
//! scheduler.join_for_testing();
//! ```
//!
//! # Execution modes
//!
//! - **Parallel**: tasks run concurrently on any worker of the pool
//! - **Sequenced**: FIFO, never two at once, any worker
//! - **SingleThreaded**: FIFO, never two at once, always the same worker

// Lint configuration
#![warn(missing_debug_implementations)]

// Core modules
pub mod config;
pub mod error;
pub mod executor;
pub mod platform;
pub mod prelude;
pub mod runtime;
pub mod scheduler;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder, JoinPolicy};
pub use error::{Error, Result};
pub use executor::{ExecutionMode, PanicStrategy, PoolStatsSnapshot, TaskPriority, TaskTraits};
pub use runtime::{
    create_task_runner_with_traits, init, init_with_config, post_task_with_traits, shutdown,
};
pub use scheduler::{PoolKind, SequenceId, TaskRunner, TaskScheduler};
