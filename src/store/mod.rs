//! Ordered event stores
//!
//! Two from-scratch priority structures that turn an unordered event
//! collection into a non-decreasing timestamp sequence:
//! - MinHeap: array-backed binary heap (counts comparisons and swaps)
//! - RbTree: arena-backed red-black tree (counts comparisons and rotations)

pub mod min_heap;
pub mod rb_tree;

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use crate::event::Event;

pub use min_heap::EventMinHeap;
pub use rb_tree::{EventRbTree, InvariantViolation};

/// Returned when popping from a store that holds no events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("pop from an empty event store")]
pub struct EmptyStoreError;

/// Instrumentation counters owned by a single store instance
///
/// Counters only grow; they return to zero through an explicit
/// `reset_counters` call on the owning store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpCounters {
    pub comparisons: u64,
    pub swaps: u64,
    pub rotations: u64,
    pub pushes: u64,
    pub pops: u64,
}

/// Selects which store variant orders the events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    MinHeap,
    RedBlackTree,
}

impl StoreKind {
    /// Create an empty store of this kind
    pub fn create(self) -> Box<dyn OrderedEventStore> {
        match self {
            StoreKind::MinHeap => Box::new(EventMinHeap::new()),
            StoreKind::RedBlackTree => Box::new(EventRbTree::new()),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::MinHeap => write!(f, "min-heap"),
            StoreKind::RedBlackTree => write!(f, "red-black tree"),
        }
    }
}

/// Common interface of the store variants
pub trait OrderedEventStore {
    /// Add an unordered batch of events
    ///
    /// The heap rebuilds itself bottom-up; the tree inserts one by one.
    fn load(&mut self, events: &[Event]);

    /// Remove the earliest remaining event
    fn pop(&mut self) -> Result<Event, EmptyStoreError>;

    /// Number of events currently held
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the instrumentation counters
    fn counters(&self) -> OpCounters;

    fn reset_counters(&mut self);

    /// Pop every remaining event, earliest first
    fn drain_in_order(&mut self) -> Vec<Event> {
        let mut ordered = Vec::with_capacity(self.len());
        while let Ok(event) = self.pop() {
            ordered.push(event);
        }
        ordered
    }
}

/// Order `events` with the selected store variant
///
/// Returns the ordered sequence together with the counters the variant
/// accumulated while building and draining.
///
/// # Example
/// ```
/// use chipify::{order_events, Event, StoreKind};
///
/// let events = [Event::note_off(2.0, 60), Event::note_on(1.0, 60)];
/// let (ordered, counters) = order_events(&events, StoreKind::MinHeap);
/// assert_eq!(ordered[0].timestamp, 1.0);
/// assert!(counters.comparisons > 0);
/// ```
pub fn order_events(events: &[Event], kind: StoreKind) -> (Vec<Event>, OpCounters) {
    let mut store = kind.create();
    store.load(events);
    let ordered = store.drain_in_order();
    (ordered, store.counters())
}

/// Total order on timestamps
///
/// Numbers compare by value, so `-0.0` and `0.0` tie. NaN sorts after every
/// number and ties with itself.
pub fn compare_timestamps(a: f64, b: f64) -> Ordering {
    match a.partial_cmp(&b) {
        Some(ordering) => ordering,
        None => a.is_nan().cmp(&b.is_nan()),
    }
}

pub(crate) fn key_less(a: f64, b: f64) -> bool {
    compare_timestamps(a, b).is_lt()
}
