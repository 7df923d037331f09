pub use crate::config::{Config, ConfigBuilder, JoinPolicy};
pub use crate::error::{Error, Result};
pub use crate::executor::{ExecutionMode, PanicStrategy, TaskPriority, TaskTraits};
pub use crate::scheduler::{PoolKind, TaskRunner, TaskScheduler};

pub use crate::{
    create_task_runner_with_traits, init, init_with_config, post_task_with_traits, shutdown,
};
