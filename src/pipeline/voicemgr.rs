//! Active voice bookkeeping for square-wave synthesis
//!
//! Tracks which pitches are sounding and the running phase of each, so
//! that consecutive chunks join without a click at the seam.

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use crate::event::{Event, EventKind};

/// Frequency of a MIDI note in Hz (A4 = 69 = 440 Hz)
pub fn note_frequency(pitch: u8) -> f64 {
    440.0 * 2f64.powf((pitch as f64 - 69.0) / 12.0)
}

/// Unit square wave: the sign of `sin(x)`, zero exactly on a zero crossing
pub fn square(x: f64) -> f64 {
    let s = x.sin();
    if s > 0.0 {
        1.0
    } else if s < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Pitch → phase map of the currently sounding notes
///
/// Voices are kept in pitch order so that mixing always sums in the same
/// order and repeated renders are bit-identical.
#[derive(Debug, Clone)]
pub struct VoiceManager {
    active_voices: BTreeMap<u8, f64>,
    amplitude: f64,
    sample_rate: f64,
}

impl VoiceManager {
    /// Create an empty voice manager
    ///
    /// # Arguments
    /// * `amplitude` - Per-voice square wave amplitude
    /// * `sample_rate` - Sample rate in Hz (must be positive)
    pub fn new(amplitude: f32, sample_rate: u32) -> Self {
        Self {
            active_voices: BTreeMap::new(),
            amplitude: amplitude as f64,
            sample_rate: sample_rate as f64,
        }
    }

    /// Apply a note event
    ///
    /// NoteOn for an already sounding pitch keeps its phase. NoteOff for a
    /// silent pitch does nothing.
    pub fn handle_event(&mut self, event: &Event) {
        match event.kind {
            EventKind::NoteOn => {
                self.active_voices.entry(event.pitch).or_insert(0.0);
            }
            EventKind::NoteOff => {
                self.active_voices.remove(&event.pitch);
            }
        }
    }

    /// Append `num_samples` mixed samples to `out` and advance every phase
    pub fn render_chunk(&mut self, num_samples: usize, out: &mut Vec<f32>) {
        let start = out.len();
        out.resize(start + num_samples, 0.0);

        if self.active_voices.is_empty() {
            return;
        }

        let chunk = &mut out[start..];
        for (k, sample) in chunk.iter_mut().enumerate() {
            let t = k as f64 / self.sample_rate;
            let mut mix = 0.0;
            for (&pitch, &phase) in &self.active_voices {
                let freq = note_frequency(pitch);
                mix += square(TAU * freq * t + phase) * self.amplitude;
            }
            *sample = mix as f32;
        }

        let elapsed = num_samples as f64 / self.sample_rate;
        for (&pitch, phase) in self.active_voices.iter_mut() {
            let freq = note_frequency(pitch);
            *phase = (*phase + TAU * freq * elapsed).rem_euclid(TAU);
        }
    }

    /// Current phase of a sounding pitch in radians
    pub fn phase(&self, pitch: u8) -> Option<f64> {
        self.active_voices.get(&pitch).copied()
    }

    pub fn has_active_voices(&self) -> bool {
        !self.active_voices.is_empty()
    }

    pub fn voice_count(&self) -> usize {
        self.active_voices.len()
    }

    /// Silence every voice immediately
    pub fn clear(&mut self) {
        self.active_voices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_manager() -> VoiceManager {
        VoiceManager::new(0.5, 8000)
    }

    #[test]
    fn test_note_frequency() {
        assert_eq!(note_frequency(69), 440.0);
        assert!((note_frequency(81) - 880.0).abs() < 1e-9);
        assert!((note_frequency(57) - 220.0).abs() < 1e-9);
        // middle C
        assert!((note_frequency(60) - 261.6256).abs() < 1e-3);
    }

    #[test]
    fn test_square_sign() {
        assert_eq!(square(0.0), 0.0);
        assert_eq!(square(std::f64::consts::FRAC_PI_2), 1.0);
        assert_eq!(square(-std::f64::consts::FRAC_PI_2), -1.0);
    }

    #[test]
    fn test_duplicate_note_keeps_phase() {
        let mut mgr = create_test_manager();
        mgr.handle_event(&Event::note_on(0.0, 69));
        let mut out = Vec::new();
        mgr.render_chunk(3, &mut out);
        let phase = mgr.phase(69).unwrap();
        assert!(phase > 0.0);

        mgr.handle_event(&Event::note_on(0.0, 69));
        assert_eq!(mgr.voice_count(), 1);
        assert_eq!(mgr.phase(69), Some(phase));
    }

    #[test]
    fn test_release_of_silent_pitch_is_noop() {
        let mut mgr = create_test_manager();
        mgr.handle_event(&Event::note_on(0.0, 60));
        mgr.handle_event(&Event::note_off(0.0, 72));
        assert_eq!(mgr.voice_count(), 1);

        mgr.handle_event(&Event::note_off(0.0, 60));
        assert!(!mgr.has_active_voices());
    }

    #[test]
    fn test_silent_chunk() {
        let mut mgr = create_test_manager();
        let mut out = vec![1.0];
        mgr.render_chunk(16, &mut out);
        assert_eq!(out.len(), 17);
        assert!(out[1..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_polyphony_sums_voices() {
        let mut mgr = create_test_manager();
        for pitch in [60, 64, 67] {
            mgr.handle_event(&Event::note_on(0.0, pitch));
        }
        assert_eq!(mgr.voice_count(), 3);

        let mut out = Vec::new();
        mgr.render_chunk(256, &mut out);
        let peak = out.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.5 && peak <= 1.5);
    }

    #[test]
    fn test_phase_wraps() {
        let mut mgr = create_test_manager();
        mgr.handle_event(&Event::note_on(0.0, 100));
        let mut out = Vec::new();
        for _ in 0..50 {
            mgr.render_chunk(97, &mut out);
            let phase = mgr.phase(100).unwrap();
            assert!((0.0..TAU).contains(&phase));
        }
    }

    #[test]
    fn test_clear() {
        let mut mgr = create_test_manager();
        mgr.handle_event(&Event::note_on(0.0, 60));
        mgr.handle_event(&Event::note_on(0.0, 61));
        mgr.clear();
        assert_eq!(mgr.voice_count(), 0);
    }
}
