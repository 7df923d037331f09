//! Shared helpers for the integration tests.

#![allow(dead_code)]

use parking_lot::{Condvar, Mutex};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::{Duration, Instant};
use strand::platform::{self, ThreadPriority};
use strand::{ExecutionMode, TaskPriority, TaskRunner, TaskScheduler, TaskTraits};

const WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Panics unless the calling thread has the priority and I/O allowance a task
/// with `traits` should run with.
pub fn verify_task_environment(traits: TaskTraits) {
    let expected = if traits.priority() == TaskPriority::Background {
        ThreadPriority::Background
    } else {
        ThreadPriority::Normal
    };
    assert_eq!(platform::current_thread_priority(), expected);
    assert_eq!(platform::io_allowed(), traits.file_io());
}

/// Every (traits, mode) combination.
pub fn traits_execution_mode_pairs() -> Vec<(TaskTraits, ExecutionMode)> {
    ExecutionMode::ALL
        .into_iter()
        .flat_map(|mode| TaskTraits::all_combinations().map(move |traits| (traits, mode)))
        .collect()
}

pub fn total_panics(scheduler: &TaskScheduler) -> u64 {
    scheduler.stats().iter().map(|s| s.tasks_panicked).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostNestedTask {
    Yes,
    No,
}

#[derive(Debug, Default)]
struct FactoryState {
    num_posted: usize,
    ran: Vec<bool>,
    /// Index of the next task a sequenced runner must run.
    next_in_order: usize,
    running: usize,
    thread: Option<ThreadId>,
    violations: Vec<String>,
}

#[derive(Debug)]
struct Shared {
    runner: TaskRunner,
    mode: ExecutionMode,
    state: Mutex<FactoryState>,
    all_ran: Condvar,
}

/// Posts tasks through one runner and checks, from inside each task, that the
/// runner's execution mode is honoured: FIFO order and mutual exclusion for
/// sequenced runners, one thread for single-threaded runners, and
/// `runs_tasks_on_current_thread()` for all of them.
#[derive(Debug, Clone)]
pub struct TestTaskFactory {
    shared: Arc<Shared>,
}

impl TestTaskFactory {
    pub fn new(runner: TaskRunner, mode: ExecutionMode) -> Self {
        Self {
            shared: Arc::new(Shared {
                runner,
                mode,
                state: Mutex::new(FactoryState::default()),
                all_ran: Condvar::new(),
            }),
        }
    }

    pub fn runner(&self) -> &TaskRunner {
        &self.shared.runner
    }

    /// Posts a checked task that runs `after` once the checks pass. With
    /// `PostNestedTask::Yes` the task posts one more checked task when done.
    pub fn post_task<F>(&self, nested: PostNestedTask, after: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        // Posting under the lock keeps indices in post order.
        let mut state = self.shared.state.lock();
        let index = state.num_posted;
        let factory = self.clone();
        let posted = self
            .shared
            .runner
            .post_task(move || factory.run_task(index, nested, after));
        if posted {
            state.num_posted += 1;
            state.ran.push(false);
        }
        posted
    }

    fn run_task<F: FnOnce()>(&self, index: usize, nested: PostNestedTask, after: F) {
        {
            let mut state = self.shared.state.lock();

            if !self.shared.runner.runs_tasks_on_current_thread() {
                state
                    .violations
                    .push(format!("task {}: runs_tasks_on_current_thread() is false", index));
            }

            if self.shared.mode != ExecutionMode::Parallel {
                if state.running != 0 {
                    state
                        .violations
                        .push(format!("task {}: another task of the sequence is running", index));
                }
                if state.next_in_order != index {
                    let expected = state.next_in_order;
                    state.violations.push(format!(
                        "task {}: ran out of order, expected {}",
                        index, expected
                    ));
                }
                state.next_in_order = index + 1;
            }

            if self.shared.mode == ExecutionMode::SingleThreaded {
                let current = std::thread::current().id();
                match state.thread {
                    None => state.thread = Some(current),
                    Some(thread) if thread != current => state
                        .violations
                        .push(format!("task {}: ran on a different thread", index)),
                    Some(_) => {}
                }
            }

            state.running += 1;
        }

        // Give overlapping tasks a chance to show up.
        std::thread::yield_now();

        let after_result = catch_unwind(AssertUnwindSafe(after));

        if nested == PostNestedTask::Yes {
            self.post_task(PostNestedTask::No, (|| {}) as fn());
        }

        let mut state = self.shared.state.lock();
        state.running -= 1;
        if let Err(payload) = after_result {
            let message = payload
                .downcast_ref::<String>()
                .cloned()
                .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
                .unwrap_or_default();
            state
                .violations
                .push(format!("task {}: check failed: {}", index, message));
        }
        if std::mem::replace(&mut state.ran[index], true) {
            state.violations.push(format!("task {}: ran twice", index));
        }
        self.shared.all_ran.notify_all();
    }

    /// Blocks until every posted task ran, then fails the test on any
    /// recorded violation.
    pub fn wait_for_all_tasks_to_run(&self) {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        let mut state = self.shared.state.lock();
        while state.ran.iter().any(|ran| !ran) {
            if self.shared.all_ran.wait_until(&mut state, deadline).timed_out() {
                panic!(
                    "timed out: {} of {} tasks ran",
                    state.ran.iter().filter(|ran| **ran).count(),
                    state.num_posted
                );
            }
        }
        assert!(state.violations.is_empty(), "{:#?}", state.violations);
    }

    pub fn num_posted(&self) -> usize {
        self.shared.state.lock().num_posted
    }
}
