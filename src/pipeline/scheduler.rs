//! Pipeline orchestrator
//!
//! Takes detected notes through event expansion, ordering and synthesis,
//! and optionally writes the result to a WAV file.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::event::{expand_notes, filter_short_notes, Event, NoteSpan};
use crate::pipeline::synth::{SynthConfig, SynthError, Synthesizer};
use crate::store::{order_events, OpCounters, StoreKind};
use crate::wav::write_wav_16bit;

/// Output sample rates the converter offers
pub const SUPPORTED_SAMPLE_RATES: [u32; 3] = [22050, 44100, 48000];

/// Configuration for the conversion pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Structure used to put events in time order
    pub store: StoreKind,
    /// Square wave amplitude per voice before normalization
    pub voice_amplitude: f32,
    /// Notes shorter than this (seconds) are dropped before synthesis
    pub min_note_duration: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            store: StoreKind::RedBlackTree,
            voice_amplitude: 0.5,
            min_note_duration: 0.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Synth(#[from] SynthError),
    #[error("failed to write WAV file: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of converting a note list
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Normalized samples at the configured rate
    pub samples: Vec<f32>,
    /// Counters of the store that ordered the events
    pub counters: OpCounters,
    pub event_count: usize,
}

/// Note list to square-wave audio converter
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    synth: Synthesizer,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let synth = Synthesizer::new(SynthConfig {
            sample_rate: config.sample_rate,
            voice_amplitude: config.voice_amplitude,
        });
        Self { config, synth }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Drop short notes and expand the rest into unordered events
    pub fn prepare_events(&self, notes: &[NoteSpan]) -> Vec<Event> {
        let kept = filter_short_notes(notes, self.config.min_note_duration);
        if kept.len() < notes.len() {
            debug!(dropped = notes.len() - kept.len(), "dropped short notes");
        }
        expand_notes(&kept)
    }

    /// Expand, order and render `notes`
    pub fn convert(&self, notes: &[NoteSpan]) -> Result<Conversion, PipelineError> {
        let events = self.prepare_events(notes);
        let (ordered, counters) = order_events(&events, self.config.store);
        info!(
            events = ordered.len(),
            store = %self.config.store,
            comparisons = counters.comparisons,
            "ordered events"
        );

        let samples = self.render_ordered(&ordered)?;
        Ok(Conversion {
            samples,
            counters,
            event_count: ordered.len(),
        })
    }

    /// Render events that are already in time order, e.g. the output of a
    /// benchmark run
    pub fn render_ordered(&self, ordered: &[Event]) -> Result<Vec<f32>, PipelineError> {
        let samples = self.synth.render(ordered)?;
        info!(
            samples = samples.len(),
            sample_rate = self.config.sample_rate,
            "rendered audio"
        );
        Ok(samples)
    }

    /// Write rendered samples as a 16-bit WAV file at the configured rate
    pub fn write_wav(
        &self,
        samples: &[f32],
        output_path: impl AsRef<Path>,
    ) -> Result<(), PipelineError> {
        let output_path = output_path.as_ref();
        write_wav_16bit(output_path, samples, self.config.sample_rate)?;
        info!(path = %output_path.display(), "wrote WAV file");
        Ok(())
    }

    /// Convert `notes` and write the result as a 16-bit WAV file
    pub fn convert_to_wav(
        &self,
        notes: &[NoteSpan],
        output_path: impl AsRef<Path>,
    ) -> Result<Conversion, PipelineError> {
        let conversion = self.convert(notes)?;
        self.write_wav(&conversion.samples, output_path)?;
        Ok(conversion)
    }
}
