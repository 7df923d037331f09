// worker thread loop and per-thread worker context
use super::environment::ScopedTaskEnvironment;
use super::task::Task;
use super::worker_pool::{PoolId, PoolShared};
use crate::config::JoinPolicy;
use crate::scheduler::priority::ReadyUnit;
use crate::scheduler::sequence::SequenceId;
use std::cell::Cell;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WorkerTag {
    pool: PoolId,
    index: usize,
}

thread_local! {
    static CURRENT_WORKER: Cell<Option<WorkerTag>> = const { Cell::new(None) };
    static RUNNING_SEQUENCE: Cell<Option<SequenceId>> = const { Cell::new(None) };
}

/// Pool the calling thread works for, if it is a worker.
pub(crate) fn current_pool() -> Option<PoolId> {
    CURRENT_WORKER.with(Cell::get).map(|tag| tag.pool)
}

/// Sequence whose task the calling thread is running right now.
pub(crate) fn running_sequence() -> Option<SequenceId> {
    RUNNING_SEQUENCE.with(Cell::get)
}

/// Records the running sequence for the duration of one task body.
struct RunningSequenceGuard {
    previous: Option<SequenceId>,
}

impl RunningSequenceGuard {
    fn enter(sequence: Option<SequenceId>) -> Self {
        Self {
            previous: RUNNING_SEQUENCE.with(|s| s.replace(sequence)),
        }
    }
}

impl Drop for RunningSequenceGuard {
    fn drop(&mut self) {
        RUNNING_SEQUENCE.with(|s| s.set(self.previous));
    }
}

pub(crate) struct Worker {
    pub index: usize,
    shared: Arc<PoolShared>,
}

impl Worker {
    pub fn new(index: usize, shared: Arc<PoolShared>) -> Self {
        Self { index, shared }
    }

    // main loop
    pub fn run(self) {
        CURRENT_WORKER.with(|w| {
            w.set(Some(WorkerTag {
                pool: self.shared.id,
                index: self.index,
            }))
        });
        tracing::debug!(pool = self.shared.name, index = self.index, "worker started");

        while let Some(unit) = self.next_unit() {
            self.run_unit(unit);
        }

        CURRENT_WORKER.with(|w| w.set(None));
        tracing::debug!(pool = self.shared.name, index = self.index, "worker exiting");
    }

    /// Blocks until there is work for this worker or it should exit.
    fn next_unit(&self) -> Option<ReadyUnit> {
        let mut state = self.shared.state.lock();
        loop {
            if state.shutdown && self.shared.join_policy == JoinPolicy::Discard {
                return None;
            }
            if let Some(unit) = state.pop_for_worker(self.index) {
                return Some(unit);
            }
            if state.shutdown {
                return None;
            }
            self.shared.work_available.wait(&mut state);
        }
    }

    fn run_unit(&self, unit: ReadyUnit) {
        match unit {
            ReadyUnit::Task(task) => self.run_task(task, None),
            ReadyUnit::Sequence(sequence) => {
                let Some(task) = sequence.take_task() else {
                    return;
                };
                self.run_task(task, Some(sequence.id()));
                if let Some(key) = sequence.did_run_task() {
                    self.shared.reenqueue_sequence(sequence, key, self.index);
                }
            }
        }
    }

    fn run_task(&self, task: Task, sequence: Option<SequenceId>) {
        let _running = RunningSequenceGuard::enter(sequence);
        let _env = ScopedTaskEnvironment::enter(&task.traits);

        let posted_from = task.posted_from;
        let result = self
            .shared
            .panic_handler
            .execute(posted_from, move || task.execute());

        match result {
            Ok(()) => self.shared.stats.record_executed(),
            Err(_) => self.shared.stats.record_panicked(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_sequence_guard_nests() {
        std::thread::spawn(|| {
            let outer = crate::scheduler::sequence::Sequence::new(None).id();
            let inner = crate::scheduler::sequence::Sequence::new(None).id();

            assert_eq!(running_sequence(), None);
            {
                let _outer = RunningSequenceGuard::enter(Some(outer));
                assert_eq!(running_sequence(), Some(outer));
                {
                    let _inner = RunningSequenceGuard::enter(Some(inner));
                    assert_eq!(running_sequence(), Some(inner));
                }
                assert_eq!(running_sequence(), Some(outer));
            }
            assert_eq!(running_sequence(), None);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_non_worker_thread_has_no_pool() {
        std::thread::spawn(|| assert_eq!(current_pool(), None))
            .join()
            .unwrap();
    }
}
