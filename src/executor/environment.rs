//! Applies a task's traits to the worker thread for the duration of its body.

use super::traits::TaskTraits;
use crate::platform::{self, ThreadPriority};

/// Sets thread priority and the I/O allowance for one task, restoring the
/// previous values when dropped. Restoration also happens while unwinding
/// from a panicking task body.
#[derive(Debug)]
#[must_use = "the environment is reverted as soon as the guard is dropped"]
pub(crate) struct ScopedTaskEnvironment {
    previous_priority: ThreadPriority,
    previous_io_allowed: bool,
}

impl ScopedTaskEnvironment {
    pub(crate) fn enter(traits: &TaskTraits) -> Self {
        let previous_priority =
            platform::set_current_thread_priority(traits.priority().thread_priority());
        let previous_io_allowed = platform::set_io_allowed(traits.file_io());
        Self {
            previous_priority,
            previous_io_allowed,
        }
    }
}

impl Drop for ScopedTaskEnvironment {
    fn drop(&mut self) {
        platform::set_io_allowed(self.previous_io_allowed);
        platform::set_current_thread_priority(self.previous_priority);
    }
}
