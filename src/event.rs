//! Note events and their expansion from note triples

/// Whether an event starts or stops a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NoteOn,
    NoteOff,
}

/// A timestamped note on/off occurrence
///
/// Timestamps are in seconds unless the caller consistently uses another
/// unit. Events carry no identity beyond their fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub timestamp: f64,
    pub kind: EventKind,
    /// MIDI note number (69 = A4)
    pub pitch: u8,
}

impl Event {
    pub fn new(timestamp: f64, kind: EventKind, pitch: u8) -> Self {
        Self {
            timestamp,
            kind,
            pitch,
        }
    }

    pub fn note_on(timestamp: f64, pitch: u8) -> Self {
        Self::new(timestamp, EventKind::NoteOn, pitch)
    }

    pub fn note_off(timestamp: f64, pitch: u8) -> Self {
        Self::new(timestamp, EventKind::NoteOff, pitch)
    }
}

/// A detected note as delivered by the pitch predictor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteSpan {
    pub start: f64,
    pub end: f64,
    pub pitch: u8,
}

impl NoteSpan {
    pub fn new(start: f64, end: f64, pitch: u8) -> Self {
        Self { start, end, pitch }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Expand note triples into an unordered event list
///
/// Each note yields a NoteOn at its start followed by a NoteOff at its end.
///
/// # Example
/// ```
/// use chipify::{expand_notes, EventKind, NoteSpan};
///
/// let events = expand_notes(&[NoteSpan::new(0.5, 1.0, 60)]);
/// assert_eq!(events.len(), 2);
/// assert_eq!(events[0].kind, EventKind::NoteOn);
/// assert_eq!(events[1].timestamp, 1.0);
/// ```
pub fn expand_notes(notes: &[NoteSpan]) -> Vec<Event> {
    let mut events = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        events.push(Event::note_on(note.start, note.pitch));
        events.push(Event::note_off(note.end, note.pitch));
    }
    events
}

/// Drop notes shorter than `min_duration` seconds
pub fn filter_short_notes(notes: &[NoteSpan], min_duration: f64) -> Vec<NoteSpan> {
    notes
        .iter()
        .copied()
        .filter(|n| n.duration() >= min_duration)
        .collect()
}
