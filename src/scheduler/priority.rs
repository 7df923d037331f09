use super::sequence::Sequence;
use crate::executor::{Task, TaskPriority};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::Arc;

/// Position of a ready unit in a pool's queue. Higher priority wins, then the
/// earlier post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SortKey {
    pub priority: TaskPriority,
    pub sequence_num: u64,
}

impl SortKey {
    pub fn of(task: &Task) -> Self {
        Self {
            priority: task.traits.priority(),
            sequence_num: task.sequence_num,
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence_num.cmp(&self.sequence_num))
    }
}

/// Something a worker can claim: a standalone task or a sequence whose front
/// task is ready.
#[derive(Debug)]
pub(crate) enum ReadyUnit {
    Task(Task),
    Sequence(Arc<Sequence>),
}

#[derive(Debug)]
struct ReadyEntry {
    key: SortKey,
    unit: ReadyUnit,
}

impl PartialEq for ReadyEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ReadyEntry {}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReadyEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.key.cmp(&other.key)
    }
}

/// Max-heap of ready units. Not synchronized: the owning pool guards it with
/// its state lock so that a worker can compare several queues atomically.
#[derive(Debug, Default)]
pub(crate) struct ReadyQueue {
    heap: BinaryHeap<ReadyEntry>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, unit: ReadyUnit, key: SortKey) {
        self.heap.push(ReadyEntry { key, unit });
    }

    pub fn pop(&mut self) -> Option<ReadyUnit> {
        self.heap.pop().map(|entry| entry.unit)
    }

    pub fn peek_key(&self) -> Option<SortKey> {
        self.heap.peek().map(|entry| entry.key)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Removes every unit, in no particular order.
    pub fn take_all(&mut self) -> Vec<ReadyUnit> {
        std::mem::take(&mut self.heap)
            .into_vec()
            .into_iter()
            .map(|entry| entry.unit)
            .collect()
    }
}
