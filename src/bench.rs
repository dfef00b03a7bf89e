//! Side-by-side timing of the ordering methods
//!
//! Runs the same unordered events through the standard library sort, the
//! min-heap and the red-black tree, each on its own copy, and records the
//! wall-clock time and operation counters of every method.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::event::Event;
use crate::store::{
    compare_timestamps, EventMinHeap, EventRbTree, OpCounters, OrderedEventStore, StoreKind,
};

const TABLE_WIDTH: usize = 58;

/// Timing and counters for one ordering method
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodReport {
    pub elapsed: Duration,
    /// None for the baseline sort, which is not instrumented
    pub counters: Option<OpCounters>,
}

/// Results of one comparison run
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkReport {
    pub event_count: usize,
    pub baseline: MethodReport,
    pub min_heap: MethodReport,
    pub rb_tree: MethodReport,
    /// Whether all three methods produced the same timestamp sequence
    pub orders_agree: bool,
}

/// Report plus the ordered events the stores produced
#[derive(Debug, Clone)]
pub struct Comparison {
    pub report: BenchmarkReport,
    /// Red-black tree output, ties in input order
    pub ordered: Vec<Event>,
    pub heap_ordered: Vec<Event>,
}

impl Comparison {
    /// Output of the given store, ready for synthesis
    pub fn ordered_by(&self, kind: StoreKind) -> &[Event] {
        match kind {
            StoreKind::MinHeap => &self.heap_ordered,
            StoreKind::RedBlackTree => &self.ordered,
        }
    }
}

fn run_baseline(mut events: Vec<Event>) -> (Vec<Event>, MethodReport) {
    let start = Instant::now();
    events.sort_by(|a, b| compare_timestamps(a.timestamp, b.timestamp));
    let elapsed = start.elapsed();
    (
        events,
        MethodReport {
            elapsed,
            counters: None,
        },
    )
}

fn run_store<S: OrderedEventStore>(
    mut store: S,
    events: Vec<Event>,
) -> (Vec<Event>, MethodReport) {
    let start = Instant::now();
    store.load(&events);
    let ordered = store.drain_in_order();
    let elapsed = start.elapsed();
    (
        ordered,
        MethodReport {
            elapsed,
            counters: Some(store.counters()),
        },
    )
}

fn same_timestamps(a: &[Event], b: &[Event]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| compare_timestamps(x.timestamp, y.timestamp).is_eq())
}

fn assemble(
    event_count: usize,
    baseline: (Vec<Event>, MethodReport),
    heap: (Vec<Event>, MethodReport),
    tree: (Vec<Event>, MethodReport),
) -> Comparison {
    let orders_agree =
        same_timestamps(&baseline.0, &heap.0) && same_timestamps(&baseline.0, &tree.0);
    if !orders_agree {
        warn!(event_count, "ordering methods disagree on timestamp sequence");
    }

    let report = BenchmarkReport {
        event_count,
        baseline: baseline.1,
        min_heap: heap.1,
        rb_tree: tree.1,
        orders_agree,
    };
    debug!(?report, "comparison finished");

    Comparison {
        report,
        ordered: tree.0,
        heap_ordered: heap.0,
    }
}

/// Time all three ordering methods one after another
///
/// # Example
/// ```
/// use chipify::bench::run_comparison;
/// use chipify::Event;
///
/// let events = vec![Event::note_on(0.3, 60), Event::note_on(0.1, 62)];
/// let comparison = run_comparison(&events);
/// assert!(comparison.report.orders_agree);
/// assert_eq!(comparison.ordered[0].pitch, 62);
/// ```
pub fn run_comparison(events: &[Event]) -> Comparison {
    let baseline = run_baseline(events.to_vec());
    let heap = run_store(EventMinHeap::new(), events.to_vec());
    let tree = run_store(EventRbTree::new(), events.to_vec());
    assemble(events.len(), baseline, heap, tree)
}

/// Time all three ordering methods on separate threads
///
/// Each thread owns its copy and its store, so nothing is shared.
pub fn run_comparison_parallel(events: &[Event]) -> Comparison {
    let (baseline, heap, tree) = std::thread::scope(|scope| {
        let baseline = scope.spawn(|| run_baseline(events.to_vec()));
        let heap = scope.spawn(|| run_store(EventMinHeap::new(), events.to_vec()));
        let tree = scope.spawn(|| run_store(EventRbTree::new(), events.to_vec()));
        (join(baseline), join(heap), join(tree))
    });
    assemble(events.len(), baseline, heap, tree)
}

fn join<T>(handle: std::thread::ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn centered(text: &str, fill: char) -> String {
    let len = text.chars().count();
    if len >= TABLE_WIDTH {
        return text.to_string();
    }
    let left = (TABLE_WIDTH - len) / 2;
    let right = TABLE_WIDTH - len - left;
    format!(
        "{}{}{}",
        fill.to_string().repeat(left),
        text,
        fill.to_string().repeat(right)
    )
}

/// Surround lines of text with a box drawn from line characters
pub fn bordered(text: &str) -> String {
    let width = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
    let mut out = Vec::new();
    out.push(format!("┌{}┐", "─".repeat(width)));
    for line in text.lines() {
        let pad = width - line.chars().count();
        out.push(format!("│{}{}│", line, " ".repeat(pad)));
    }
    out.push(format!("└{}┘", "─".repeat(width)));
    out.join("\n")
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heap = self.min_heap.counters.unwrap_or_default();
        let tree = self.rb_tree.counters.unwrap_or_default();

        let lines = [
            centered(" Data Structure Comparison ", '='),
            centered(&format!("Number of Events: {}", self.event_count), ' '),
            centered(" slice::sort_by (standard library) ", '-'),
            centered(&format!("Runtime: {:.2} ms", millis(self.baseline.elapsed)), ' '),
            centered(" Min-Heap ", '-'),
            centered(&format!("Runtime: {:.2} ms", millis(self.min_heap.elapsed)), ' '),
            centered(&format!("# comparisons: {}", heap.comparisons), ' '),
            centered(&format!("# swaps: {}", heap.swaps), ' '),
            centered(" Red-Black Tree ", '-'),
            centered(&format!("Runtime: {:.2} ms", millis(self.rb_tree.elapsed)), ' '),
            centered(&format!("# comparisons: {}", tree.comparisons), ' '),
            centered(&format!("# rotations: {}", tree.rotations), ' '),
        ];
        write!(f, "{}", bordered(&lines.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{expand_notes, NoteSpan};
    use crate::store::order_events;

    fn sample_events() -> Vec<Event> {
        let mut rng = fastrand::Rng::with_seed(5);
        let notes: Vec<NoteSpan> = (0..300)
            .map(|_| {
                let start = rng.u32(0..400) as f64 * 0.05;
                NoteSpan::new(start, start + 0.05 * rng.u32(1..20) as f64, rng.u8(40..90))
            })
            .collect();
        expand_notes(&notes)
    }

    #[test]
    fn test_methods_agree() {
        let events = sample_events();
        let comparison = run_comparison(&events);
        let report = &comparison.report;

        assert!(report.orders_agree);
        assert_eq!(report.event_count, 600);
        assert!(report.baseline.counters.is_none());
        assert_eq!(comparison.ordered.len(), 600);

        let heap = report.min_heap.counters.unwrap();
        let tree = report.rb_tree.counters.unwrap();
        assert!(heap.comparisons > 0 && heap.swaps > 0);
        assert_eq!(heap.rotations, 0);
        assert!(tree.comparisons > 0 && tree.rotations > 0);
        assert_eq!(tree.swaps, 0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let events = sample_events();
        let sequential = run_comparison(&events);
        let parallel = run_comparison_parallel(&events);

        assert!(parallel.report.orders_agree);
        assert_eq!(sequential.ordered, parallel.ordered);
        // counters are deterministic; timings are not
        assert_eq!(sequential.report.min_heap.counters, parallel.report.min_heap.counters);
        assert_eq!(sequential.report.rb_tree.counters, parallel.report.rb_tree.counters);
    }

    #[test]
    fn test_ordered_by_store() {
        let events = sample_events();
        let comparison = run_comparison(&events);

        let (heap, _) = order_events(&events, StoreKind::MinHeap);
        let (tree, _) = order_events(&events, StoreKind::RedBlackTree);
        assert_eq!(comparison.ordered_by(StoreKind::MinHeap), heap.as_slice());
        assert_eq!(comparison.ordered_by(StoreKind::RedBlackTree), tree.as_slice());
    }

    #[test]
    fn test_input_left_untouched() {
        let events = vec![Event::note_on(2.0, 1), Event::note_on(1.0, 2)];
        let before = events.clone();
        run_comparison(&events);
        assert_eq!(events, before);
    }

    #[test]
    fn test_empty_input() {
        let comparison = run_comparison(&[]);
        assert!(comparison.report.orders_agree);
        assert!(comparison.ordered.is_empty());
        assert_eq!(comparison.report.min_heap.counters, Some(OpCounters::default()));
    }

    #[test]
    fn test_report_table() {
        let comparison = run_comparison(&sample_events());
        let table = comparison.report.to_string();

        assert!(table.starts_with('┌'));
        assert!(table.ends_with('┘'));
        assert!(table.contains("Number of Events: 600"));
        assert!(table.contains("# rotations:"));
        // every row has the same visible width
        let widths: Vec<usize> = table.lines().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_bordered() {
        assert_eq!(bordered("ab\nc"), "┌──┐\n│ab│\n│c │\n└──┘");
    }
}
