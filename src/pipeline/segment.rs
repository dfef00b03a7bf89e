//! Frame-wise pitch track to note segmentation
//!
//! A pitch tracker reports one estimate per analysis frame, or nothing for
//! unvoiced frames. Consecutive voiced frames that round to the same
//! semitone become one note.

use crate::event::{filter_short_notes, NoteSpan};

/// Default shortest note kept, in seconds
pub const MIN_NOTE_DURATION: f64 = 0.05;

/// Fractional MIDI note number of a frequency in Hz
pub fn hz_to_midi(freq: f64) -> f64 {
    69.0 + 12.0 * (freq / 440.0).log2()
}

fn to_pitch(midi: f64) -> Option<u8> {
    let rounded = midi.round();
    (rounded.is_finite() && (0.0..=127.0).contains(&rounded)).then(|| rounded as u8)
}

/// Split a pitch track into notes
///
/// # Arguments
/// * `frames` - Fractional MIDI pitch per frame, `None` when unvoiced
/// * `times` - Start time of each frame in seconds
/// * `min_duration` - Notes shorter than this are dropped
///
/// A note closes on an unvoiced frame or a pitch change; a note still open
/// after the last frame closes at the last frame time. Frames outside the
/// MIDI range count as unvoiced.
pub fn segment_pitch_track(
    frames: &[Option<f64>],
    times: &[f64],
    min_duration: f64,
) -> Vec<NoteSpan> {
    let mut notes = Vec::new();
    let mut current: Option<(u8, f64)> = None;

    for (frame, &t) in frames.iter().zip(times) {
        let pitch = frame.and_then(to_pitch);
        match (current, pitch) {
            (Some((open, start)), Some(p)) if p != open => {
                notes.push(NoteSpan::new(start, t, open));
                current = Some((p, t));
            }
            (Some((open, start)), None) => {
                notes.push(NoteSpan::new(start, t, open));
                current = None;
            }
            (None, Some(p)) => current = Some((p, t)),
            _ => {}
        }
    }

    let last_time = times[..frames.len().min(times.len())].last();
    if let (Some((open, start)), Some(&last)) = (current, last_time) {
        notes.push(NoteSpan::new(start, last, open));
    }

    filter_short_notes(&notes, min_duration)
}
