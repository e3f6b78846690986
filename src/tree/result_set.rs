use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::hash::Hash;

use crate::distance::DistanceValue;

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

/// Bounded top-k collector: retains at most `k` live items by lowest
/// priority.
///
/// `discard` only removes from the live membership set; the matching heap
/// entry stays behind as a tombstone and is skipped lazily when it
/// surfaces at the top. The max-heap root is therefore the current k-th
/// best priority whenever `k` live items are held, which is exactly the
/// search cutoff `limit()`.
#[derive(Debug)]
pub struct LimitedSet<D, I> {
    heap: BinaryHeap<Entry<D, I>>,
    live: HashSet<I>,
    k: usize,
    seq: u64,
}

impl<D, I> LimitedSet<D, I>
where
    D: DistanceValue,
    I: Copy + Eq + Hash,
{
    pub fn new(k: usize) -> Self {
        LimitedSet {
            heap: BinaryHeap::new(),
            live: HashSet::new(),
            k,
            seq: 0,
        }
    }

    /// Offer an item. Once `k` items are live, offers worse than the
    /// current limit are ignored; otherwise the single worst live item is
    /// evicted to make room.
    pub fn add(&mut self, priority: D, item: I) {
        if priority > self.limit() {
            return;
        }
        self.live.insert(item);
        self.heap.push(Entry {
            priority,
            seq: self.seq,
            item,
        });
        self.seq += 1;
        if self.live.len() > self.k {
            // limit() pruned tombstones off the top, so the root is live
            if let Some(worst) = self.heap.pop() {
                self.live.remove(&worst.item);
            }
        }
    }

    /// Drop an item from the live set; its heap entry becomes a tombstone.
    pub fn discard(&mut self, item: &I) {
        self.live.remove(item);
    }

    /// Current cutoff: the k-th best live priority, or `INFINITY` while
    /// fewer than `k` live items are held.
    pub fn limit(&mut self) -> D {
        while let Some(top) = self.heap.peek() {
            if self.live.contains(&top.item) {
                break;
            }
            self.heap.pop();
        }
        if self.live.len() < self.k {
            return D::INFINITY;
        }
        match self.heap.peek() {
            Some(top) => top.priority,
            None => D::INFINITY,
        }
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// All live items, in no particular order.
    pub fn into_items(self) -> Vec<I> {
        let live = self.live;
        self.heap
            .into_iter()
            .map(|e| e.item)
            .filter(|item| live.contains(item))
            .collect()
    }

    /// All live items, best (lowest) priority first.
    pub fn into_sorted_items(self) -> Vec<I> {
        let live = self.live;
        let mut entries = self.heap.into_sorted_vec();
        entries.retain(|e| live.contains(&e.item));
        entries.into_iter().map(|e| e.item).collect()
    }
}
