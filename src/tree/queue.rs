use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::distance::DistanceValue;

/// Heap entry ordered by `(priority, seq)`. Distances are only
/// `PartialOrd` (floats), so incomparable priorities collapse to `Equal`
/// and the sequence number decides; a metric never produces NaN under the
/// caller contract.
#[derive(Debug)]
struct Entry<D, I> {
    priority: D,
    seq: u64,
    item: I,
}

impl<D: DistanceValue, I> PartialEq for Entry<D, I> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<D: DistanceValue, I> Eq for Entry<D, I> {}

impl<D: DistanceValue, I> PartialOrd for Entry<D, I> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<D: DistanceValue, I> Ord for Entry<D, I> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .partial_cmp(&other.priority)
            .unwrap_or(Ordering::Equal)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Min-priority queue driving the best-first k-NN frontier. Equal
/// priorities come out in insertion order.
#[derive(Debug)]
pub struct PriorityQueue<D, I> {
    heap: BinaryHeap<Reverse<Entry<D, I>>>,
    seq: u64,
}

impl<D: DistanceValue, I> PriorityQueue<D, I> {
    pub fn new() -> Self {
        PriorityQueue {
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }

    pub fn push(&mut self, priority: D, item: I) {
        self.heap.push(Reverse(Entry {
            priority,
            seq: self.seq,
            item,
        }));
        self.seq += 1;
    }

    /// Pop the entry with the lowest priority, or `None` once drained.
    pub fn pop(&mut self) -> Option<(D, I)> {
        self.heap.pop().map(|Reverse(e)| (e.priority, e.item))
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

impl<D: DistanceValue, I> Default for PriorityQueue<D, I> {
    fn default() -> Self {
        Self::new()
    }
}
