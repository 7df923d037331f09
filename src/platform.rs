//! Per-thread execution state: scheduling priority and the I/O allowance.
//!
//! Both values are thread-local. Workers change them around each task body;
//! task bodies only read them.

use std::cell::Cell;

/// Scheduling priority of an OS thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThreadPriority {
    Background,
    #[default]
    Normal,
}

thread_local! {
    static THREAD_PRIORITY: Cell<ThreadPriority> = const { Cell::new(ThreadPriority::Normal) };
    static IO_ALLOWED: Cell<bool> = const { Cell::new(true) };
}

/// Priority last set on the calling thread.
pub fn current_thread_priority() -> ThreadPriority {
    THREAD_PRIORITY.with(Cell::get)
}

/// Sets the calling thread's priority and returns the previous one.
pub fn set_current_thread_priority(priority: ThreadPriority) -> ThreadPriority {
    let previous = THREAD_PRIORITY.with(|p| p.replace(priority));
    if previous != priority {
        os::apply_thread_priority(priority);
    }
    previous
}

/// Whether blocking I/O is permitted on the calling thread.
pub fn io_allowed() -> bool {
    IO_ALLOWED.with(Cell::get)
}

/// Allows or disallows blocking I/O on the calling thread. Returns the
/// previous value.
pub fn set_io_allowed(allowed: bool) -> bool {
    IO_ALLOWED.with(|a| a.replace(allowed))
}

/// Panics if blocking I/O is not allowed on the calling thread.
///
/// Code that performs file or other blocking I/O calls this first so tasks
/// posted without `with_file_io()` fail loudly instead of stalling a pool
/// that is not sized for blocking work.
#[track_caller]
pub fn assert_io_allowed() {
    if !io_allowed() {
        panic!(
            "blocking I/O is not allowed on thread {:?}",
            std::thread::current().name().unwrap_or("<unnamed>")
        );
    }
}

#[cfg(target_os = "linux")]
mod os {
    use super::ThreadPriority;

    const BACKGROUND_NICE: libc::c_int = 10;
    const NORMAL_NICE: libc::c_int = 0;

    pub(super) fn apply_thread_priority(priority: ThreadPriority) {
        let nice = match priority {
            ThreadPriority::Background => BACKGROUND_NICE,
            ThreadPriority::Normal => NORMAL_NICE,
        };

        // SAFETY: gettid has no preconditions; setpriority only touches the
        // calling thread's scheduling attributes.
        let result = unsafe {
            let tid = libc::syscall(libc::SYS_gettid) as libc::id_t;
            libc::setpriority(libc::PRIO_PROCESS, tid, nice)
        };

        // Raising priority back needs CAP_SYS_NICE on most systems.
        if result != 0 {
            tracing::trace!(
                ?priority,
                error = %std::io::Error::last_os_error(),
                "failed to apply OS thread priority"
            );
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod os {
    use super::ThreadPriority;

    pub(super) fn apply_thread_priority(_priority: ThreadPriority) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_on_fresh_thread() {
        std::thread::spawn(|| {
            assert_eq!(current_thread_priority(), ThreadPriority::Normal);
            assert!(io_allowed());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_set_io_allowed_returns_previous() {
        std::thread::spawn(|| {
            assert!(set_io_allowed(false));
            assert!(!io_allowed());
            assert!(!set_io_allowed(true));
            assert!(io_allowed());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_priority_is_thread_local() {
        std::thread::spawn(|| {
            let previous = set_current_thread_priority(ThreadPriority::Background);
            assert_eq!(previous, ThreadPriority::Normal);

            let other = std::thread::spawn(current_thread_priority).join().unwrap();
            assert_eq!(other, ThreadPriority::Normal);
            assert_eq!(current_thread_priority(), ThreadPriority::Background);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_assert_io_allowed_panics_when_disallowed() {
        let result = std::thread::spawn(|| {
            set_io_allowed(false);
            assert_io_allowed();
        })
        .join();
        assert!(result.is_err());
    }
}
