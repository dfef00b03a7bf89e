//! Square-wave resynthesis of transcribed note events
//!
//! Note triples from an external pitch predictor are expanded into note
//! on/off events, put into time order by one of two instrumented
//! structures (binary min-heap or red-black tree), and rendered into a
//! normalized "8-bit" square-wave buffer.

pub mod bench;
pub mod event;
pub mod pipeline;
pub mod store;
pub mod wav;

pub use event::{expand_notes, Event, EventKind, NoteSpan};
pub use store::{order_events, EmptyStoreError, OpCounters, OrderedEventStore, StoreKind};
