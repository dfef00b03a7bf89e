//! Event-driven square-wave synthesizer
//!
//! Walks a time-ordered event list. Every gap between consecutive events is
//! rendered as one chunk with the voices active during that gap, then the
//! event is applied. The finished buffer is peak-normalized.

use thiserror::Error;
use tracing::debug;

use crate::event::Event;
use crate::pipeline::voicemgr::VoiceManager;
use crate::wav::MAX_SAMPLES;

/// Synthesis errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthError {
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),
    #[error("render needs {0} samples, more than a WAV file can hold")]
    TooManySamples(usize),
}

/// Synthesizer settings
#[derive(Debug, Clone)]
pub struct SynthConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Amplitude of each voice before normalization
    pub voice_amplitude: f32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            voice_amplitude: 0.5,
        }
    }
}

/// Renders ordered note events into a normalized sample buffer
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    config: SynthConfig,
}

impl Synthesizer {
    pub fn new(config: SynthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Render `events`, which must be in non-decreasing timestamp order
    ///
    /// Time advances by whole samples, so each chunk length is exact and the
    /// next gap is measured from where the previous chunk really ended.
    /// Empty input gives an empty buffer. A render longer than
    /// [`MAX_SAMPLES`] fails before anything is allocated for it.
    pub fn render(&self, events: &[Event]) -> Result<Vec<f32>, SynthError> {
        let sample_rate = self.config.sample_rate;
        if sample_rate == 0 {
            return Err(SynthError::InvalidSampleRate(sample_rate));
        }
        let sr = sample_rate as f64;

        let mut voices = VoiceManager::new(self.config.voice_amplitude, sample_rate);
        let mut buffer = Vec::new();
        let mut current_time = 0.0f64;

        for event in events {
            let duration = event.timestamp - current_time;
            if duration > 0.0 && duration.is_finite() {
                // saturates for huge gaps, caught by the limit below
                let num_samples = (duration * sr).floor() as usize;
                if num_samples > 0 {
                    let total = buffer.len().saturating_add(num_samples);
                    if total > MAX_SAMPLES {
                        return Err(SynthError::TooManySamples(total));
                    }
                    buffer
                        .try_reserve(num_samples)
                        .map_err(|_| SynthError::TooManySamples(total))?;
                    voices.render_chunk(num_samples, &mut buffer);
                    current_time += num_samples as f64 / sr;
                }
            }
            voices.handle_event(event);
        }

        let peak = normalize(&mut buffer);
        debug!(
            events = events.len(),
            samples = buffer.len(),
            peak,
            "synthesis finished"
        );
        Ok(buffer)
    }
}

/// Render ordered events at `sample_rate` with the default voice amplitude
///
/// # Example
/// ```
/// use chipify::pipeline::synth::synthesize;
/// use chipify::Event;
///
/// let events = [Event::note_on(0.0, 69), Event::note_off(1.0, 69)];
/// let samples = synthesize(&events, 8).unwrap();
/// assert_eq!(samples.len(), 8);
/// ```
pub fn synthesize(events: &[Event], sample_rate: u32) -> Result<Vec<f32>, SynthError> {
    Synthesizer::new(SynthConfig {
        sample_rate,
        ..Default::default()
    })
    .render(events)
}

/// Divide by the peak absolute sample, leaving silence untouched
///
/// Returns the peak found before scaling.
pub fn normalize(buffer: &mut [f32]) -> f32 {
    let peak = buffer.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if peak > 0.0 {
        for sample in buffer.iter_mut() {
            *sample /= peak;
        }
    }
    peak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{expand_notes, NoteSpan};
    use crate::store::{order_events, StoreKind};

    fn peak(buffer: &[f32]) -> f32 {
        buffer.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn test_single_note_one_second_at_8hz() {
        let events = [Event::note_on(0.0, 69), Event::note_off(1.0, 69)];
        let samples = synthesize(&events, 8).unwrap();

        assert_eq!(samples.len(), 8);
        assert_eq!(samples[0], 0.0); // sin(0)
        assert_eq!(peak(&samples), 1.0);
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_empty_events() {
        let samples = synthesize(&[], 44100).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_invalid_sample_rate() {
        let events = [Event::note_on(0.0, 69)];
        assert_eq!(synthesize(&events, 0), Err(SynthError::InvalidSampleRate(0)));
    }

    #[test]
    fn test_huge_gap_is_rejected() {
        let notes = crate::pipeline::parse_note_list("0 1e300 69").unwrap();
        let (ordered, _) = order_events(&expand_notes(&notes), StoreKind::RedBlackTree);

        assert_eq!(
            synthesize(&ordered, 8),
            Err(SynthError::TooManySamples(usize::MAX))
        );
    }

    #[test]
    fn test_render_past_wav_limit_is_rejected() {
        // one second over the limit, split over two gaps
        let sample_rate = 8000;
        let seconds = (MAX_SAMPLES / sample_rate as usize + 1) as f64;
        let events = [
            Event::note_on(0.0, 69),
            Event::note_off(1.0, 69),
            Event::note_on(seconds, 69),
        ];
        assert!(matches!(
            synthesize(&events, sample_rate),
            Err(SynthError::TooManySamples(_))
        ));
    }

    #[test]
    fn test_leading_gap_is_silent() {
        let events = [Event::note_on(0.5, 69), Event::note_off(1.0, 69)];
        let samples = synthesize(&events, 100).unwrap();

        assert_eq!(samples.len(), 100);
        assert!(samples[..50].iter().all(|&s| s == 0.0));
        assert_eq!(peak(&samples[50..]), 1.0);
    }

    #[test]
    fn test_silence_is_not_normalized() {
        // notes of zero length produce only silent gaps
        let events = [
            Event::note_on(0.0, 60),
            Event::note_off(0.0, 60),
            Event::note_on(0.25, 62),
            Event::note_off(0.25, 62),
        ];
        let samples = synthesize(&events, 16).unwrap();
        assert_eq!(samples.len(), 4);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_sample_count_tracks_whole_samples() {
        // 3.5 samples round down to 3; the half sample left over goes into
        // the next gap
        let events = [
            Event::note_on(0.0, 69),
            Event::note_off(0.4375, 72),
            Event::note_off(1.0, 69),
        ];
        let samples = synthesize(&events, 8).unwrap();
        assert_eq!(samples.len(), 8);
    }

    #[test]
    fn test_render_is_deterministic() {
        let mut rng = fastrand::Rng::with_seed(99);
        let notes: Vec<NoteSpan> = (0..40)
            .map(|_| {
                let start = rng.f64() * 2.0;
                NoteSpan::new(start, start + rng.f64(), rng.u8(48..84))
            })
            .collect();
        let (ordered, _) = order_events(&expand_notes(&notes), StoreKind::RedBlackTree);

        let synth = Synthesizer::new(SynthConfig {
            sample_rate: 8000,
            ..Default::default()
        });
        let first = synth.render(&ordered).unwrap();
        let second = synth.render(&ordered).unwrap();

        assert!(!first.is_empty());
        let first_bits: Vec<u32> = first.iter().map(|s| s.to_bits()).collect();
        let second_bits: Vec<u32> = second.iter().map(|s| s.to_bits()).collect();
        assert_eq!(first_bits, second_bits);
    }

    #[test]
    fn test_phase_continuous_across_chunks() {
        let sample_rate = 8000;
        let whole = [Event::note_on(0.0, 70), Event::note_off(1.0, 70)];
        // releases of a silent pitch split the same note into four chunks
        let split = [
            Event::note_on(0.0, 70),
            Event::note_off(0.25, 40),
            Event::note_off(0.5, 40),
            Event::note_off(0.75, 40),
            Event::note_off(1.0, 70),
        ];

        let a = synthesize(&whole, sample_rate).unwrap();
        let b = synthesize(&split, sample_rate).unwrap();
        assert_eq!(a.len(), b.len());

        // rounding may flip a sample that sits right on an edge, nothing more
        let mismatches = a.iter().zip(&b).filter(|(x, y)| x != y).count();
        assert!(mismatches <= 3, "{} samples differ", mismatches);

        for seam in [2000, 4000, 6000] {
            let jump = (b[seam] - b[seam - 1]).abs();
            let expected = (a[seam] - a[seam - 1]).abs();
            assert_eq!(jump, expected, "discontinuity at sample {}", seam);
        }
    }

    #[test]
    fn test_normalized_range() {
        let notes = [
            NoteSpan::new(0.0, 0.5, 60),
            NoteSpan::new(0.1, 0.4, 64),
            NoteSpan::new(0.2, 0.3, 67),
        ];
        let (ordered, _) = order_events(&expand_notes(&notes), StoreKind::MinHeap);
        let samples = synthesize(&ordered, 22050).unwrap();

        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert_eq!(peak(&samples), 1.0);
    }

    #[test]
    fn test_normalize_returns_peak() {
        let mut buffer = vec![0.25, -0.5, 0.1];
        assert_eq!(normalize(&mut buffer), 0.5);
        assert_eq!(buffer, vec![0.5, -1.0, 0.2]);

        let mut silent = vec![0.0; 4];
        assert_eq!(normalize(&mut silent), 0.0);
        assert_eq!(silent, vec![0.0; 4]);
    }
}
