//! Ordered task queue that runs one task at a time.
//!
//! A sequence cycles through three states:
//!
//! ```text
//!   Empty --push--> Queued --claim--> Running --done, more tasks--> Queued
//!                                        |
//!                                        +--done, no tasks--> Empty
//! ```
//!
//! Only the `Empty -> Queued` transition (on push) and the `Running -> Queued`
//! transition (on completion) put the sequence into a ready queue, so it is in
//! at most one queue at a time and at most one of its tasks runs at once.

use super::priority::SortKey;
use crate::executor::Task;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

static SEQUENCE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SequenceId(u64);

impl SequenceId {
    fn next() -> Self {
        SequenceId(SEQUENCE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SequenceState {
    Empty,
    Queued,
    Running,
}

#[derive(Debug)]
struct SequenceInner {
    tasks: VecDeque<Task>,
    state: SequenceState,
}

#[derive(Debug)]
pub(crate) struct Sequence {
    id: SequenceId,
    /// Worker this sequence is pinned to, for single-threaded runners.
    affinity: Option<usize>,
    inner: Mutex<SequenceInner>,
}

impl Sequence {
    pub fn new(affinity: Option<usize>) -> Self {
        Self {
            id: SequenceId::next(),
            affinity,
            inner: Mutex::new(SequenceInner {
                tasks: VecDeque::new(),
                state: SequenceState::Empty,
            }),
        }
    }

    pub fn id(&self) -> SequenceId {
        self.id
    }

    pub fn affinity(&self) -> Option<usize> {
        self.affinity
    }

    #[cfg(test)]
    pub fn state(&self) -> SequenceState {
        self.inner.lock().state
    }

    /// Appends a task. Returns the sequence's sort key if it just became ready
    /// and must be put into a ready queue by the caller.
    pub fn push_task(&self, task: Task) -> Option<SortKey> {
        let mut inner = self.inner.lock();
        inner.tasks.push_back(task);
        match inner.state {
            SequenceState::Empty => {
                inner.state = SequenceState::Queued;
                inner.tasks.front().map(SortKey::of)
            }
            SequenceState::Queued | SequenceState::Running => None,
        }
    }

    /// Claims the front task. The caller must be the worker that popped this
    /// sequence from a ready queue.
    pub fn take_task(&self) -> Option<Task> {
        let mut inner = self.inner.lock();
        debug_assert_eq!(inner.state, SequenceState::Queued);
        let task = inner.tasks.pop_front();
        inner.state = if task.is_some() {
            SequenceState::Running
        } else {
            SequenceState::Empty
        };
        task
    }

    /// Marks the claimed task as finished. Returns the sort key of the next
    /// task if the sequence must go back into a ready queue.
    pub fn did_run_task(&self) -> Option<SortKey> {
        let mut inner = self.inner.lock();
        debug_assert_eq!(inner.state, SequenceState::Running);
        match inner.tasks.front().map(SortKey::of) {
            Some(key) => {
                inner.state = SequenceState::Queued;
                Some(key)
            }
            None => {
                inner.state = SequenceState::Empty;
                None
            }
        }
    }

    /// Removes all pending tasks. The caller drops them outside the lock since
    /// their captures may post back into this sequence.
    pub fn clear(&self) -> VecDeque<Task> {
        let mut inner = self.inner.lock();
        if inner.state == SequenceState::Queued {
            inner.state = SequenceState::Empty;
        }
        std::mem::take(&mut inner.tasks)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TaskTraits;
    use std::panic::Location;

    fn numbered(sequence_num: u64) -> Task {
        let mut task = Task::new(TaskTraits::new(), Location::caller(), || {});
        task.sequence_num = sequence_num;
        task
    }

    #[test]
    fn test_first_push_makes_ready() {
        let sequence = Sequence::new(None);
        assert_eq!(sequence.state(), SequenceState::Empty);

        let key = sequence.push_task(numbered(7)).unwrap();
        assert_eq!(key.sequence_num, 7);
        assert_eq!(sequence.state(), SequenceState::Queued);

        assert!(sequence.push_task(numbered(8)).is_none());
        assert_eq!(sequence.len(), 2);
    }

    #[test]
    fn test_run_cycle() {
        let sequence = Sequence::new(None);
        sequence.push_task(numbered(1));
        sequence.push_task(numbered(2));

        let first = sequence.take_task().unwrap();
        assert_eq!(first.sequence_num, 1);
        assert_eq!(sequence.state(), SequenceState::Running);

        let key = sequence.did_run_task().unwrap();
        assert_eq!(key.sequence_num, 2);
        assert_eq!(sequence.state(), SequenceState::Queued);

        let second = sequence.take_task().unwrap();
        assert_eq!(second.sequence_num, 2);
        assert!(sequence.did_run_task().is_none());
        assert_eq!(sequence.state(), SequenceState::Empty);
    }

    #[test]
    fn test_push_while_running_does_not_reschedule() {
        let sequence = Sequence::new(Some(0));
        sequence.push_task(numbered(1));
        let _running = sequence.take_task().unwrap();

        // The running worker re-enqueues on completion; the poster must not.
        assert!(sequence.push_task(numbered(2)).is_none());
        assert_eq!(sequence.did_run_task().unwrap().sequence_num, 2);
        assert_eq!(sequence.affinity(), Some(0));
    }

    #[test]
    fn test_clear() {
        let sequence = Sequence::new(None);
        sequence.push_task(numbered(1));
        sequence.push_task(numbered(2));

        assert_eq!(sequence.clear().len(), 2);
        assert_eq!(sequence.len(), 0);
        assert_eq!(sequence.state(), SequenceState::Empty);
        assert!(sequence.push_task(numbered(3)).is_some());
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(Sequence::new(None).id(), Sequence::new(None).id());
    }
}
