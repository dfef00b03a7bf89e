//! Array-backed binary min-heap keyed by event timestamp
//!
//! Children of index `i` live at `2i + 1` and `2i + 2`. The relative order
//! of events with equal timestamps depends on build order and is not
//! specified.

use super::{key_less, EmptyStoreError, OpCounters, OrderedEventStore};
use crate::event::Event;

/// Instrumented binary min-heap of events
#[derive(Debug, Clone, Default)]
pub struct EventMinHeap {
    heap: Vec<Event>,
    counters: OpCounters,
}

impl EventMinHeap {
    pub fn new() -> Self {
        Self::default()
    }

    fn parent(i: usize) -> usize {
        (i - 1) / 2
    }

    fn left_child(i: usize) -> usize {
        2 * i + 1
    }

    fn right_child(i: usize) -> usize {
        2 * i + 2
    }

    fn less(&mut self, i: usize, j: usize) -> bool {
        self.counters.comparisons += 1;
        key_less(self.heap[i].timestamp, self.heap[j].timestamp)
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.counters.swaps += 1;
        self.heap.swap(i, j);
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = Self::parent(idx);
            if self.less(idx, parent) {
                self.swap(parent, idx);
                idx = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let n = self.heap.len();
        loop {
            let left = Self::left_child(idx);
            let right = Self::right_child(idx);
            let mut smallest = idx;

            if left < n && self.less(left, smallest) {
                smallest = left;
            }
            if right < n && self.less(right, smallest) {
                smallest = right;
            }

            if smallest == idx {
                break;
            }

            self.swap(idx, smallest);
            idx = smallest;
        }
    }

    /// Replace the contents with `events` and heapify in O(n)
    ///
    /// Sifts down from the last parent index back to the root.
    pub fn build(&mut self, events: &[Event]) {
        self.heap.clear();
        self.heap.extend_from_slice(events);
        let n = self.heap.len();
        for i in (0..n / 2).rev() {
            self.sift_down(i);
        }
    }

    /// Insert a single event
    pub fn push(&mut self, event: Event) {
        self.counters.pushes += 1;
        self.heap.push(event);
        self.sift_up(self.heap.len() - 1);
    }

    /// Remove and return the earliest event
    pub fn pop(&mut self) -> Result<Event, EmptyStoreError> {
        let last = self.heap.pop().ok_or(EmptyStoreError)?;
        self.counters.pops += 1;
        if self.heap.is_empty() {
            return Ok(last);
        }
        let root = std::mem::replace(&mut self.heap[0], last);
        self.sift_down(0);
        Ok(root)
    }

    /// Earliest event without removing it
    pub fn peek(&self) -> Option<&Event> {
        self.heap.first()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn counters(&self) -> OpCounters {
        self.counters
    }

    pub fn reset_counters(&mut self) {
        self.counters = OpCounters::default();
    }

    #[cfg(test)]
    fn satisfies_heap_property(&self) -> bool {
        (1..self.heap.len()).all(|i| self.heap[Self::parent(i)].timestamp <= self.heap[i].timestamp)
    }
}

impl OrderedEventStore for EventMinHeap {
    fn load(&mut self, events: &[Event]) {
        if self.heap.is_empty() {
            self.build(events);
        } else {
            for &event in events {
                self.push(event);
            }
        }
    }

    fn pop(&mut self) -> Result<Event, EmptyStoreError> {
        EventMinHeap::pop(self)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn counters(&self) -> OpCounters {
        self.counters
    }

    fn reset_counters(&mut self) {
        EventMinHeap::reset_counters(self)
    }
}
