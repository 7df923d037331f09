use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::{ExecutionMode, TaskTraits};
use crate::scheduler::{TaskRunner, TaskScheduler};
use parking_lot::RwLock;
use std::sync::Arc;

// Process-wide scheduler for the free-function API
static GLOBAL_SCHEDULER: RwLock<Option<Arc<TaskScheduler>>> = RwLock::new(None);

pub fn init() -> Result<()> {
    init_with_config(Config::default())
}

pub fn init_with_config(config: Config) -> Result<()> {
    let mut global = GLOBAL_SCHEDULER.write();

    if global.is_some() {
        return Err(Error::AlreadyInitialized);
    }

    *global = Some(Arc::new(TaskScheduler::new(config)?));
    Ok(())
}

pub(crate) fn current_scheduler() -> Result<Arc<TaskScheduler>> {
    GLOBAL_SCHEDULER
        .read()
        .as_ref()
        .cloned()
        .ok_or(Error::NotInitialized)
}

/// Posts to the global scheduler. See [`TaskScheduler::post_task_with_traits`].
#[track_caller]
pub fn post_task_with_traits<F>(traits: TaskTraits, f: F) -> Result<bool>
where
    F: FnOnce() + Send + 'static,
{
    Ok(current_scheduler()?.post_task_with_traits(traits, f))
}

/// Runner on the global scheduler. See
/// [`TaskScheduler::create_task_runner_with_traits`].
pub fn create_task_runner_with_traits(
    traits: TaskTraits,
    mode: ExecutionMode,
) -> Result<TaskRunner> {
    Ok(current_scheduler()?.create_task_runner_with_traits(traits, mode))
}

/// Joins and removes the global scheduler. No-op if none is installed.
pub fn shutdown() {
    // Join outside the lock so tasks that touch the global API don't deadlock.
    let scheduler = GLOBAL_SCHEDULER.write().take();
    if let Some(scheduler) = scheduler {
        scheduler.join_for_testing();
    }
}
