//! Audio conversion pipeline
//!
//! Provides the path from detected notes to square-wave audio:
//! - Parser: Read note lists from text
//! - Segment: Turn frame-wise pitch tracks into notes
//! - VoiceManager: Active pitches and their running phases
//! - Synth: Event-driven square-wave rendering and normalization
//! - Scheduler: Expansion, ordering and synthesis orchestrator

pub mod parser;
pub mod scheduler;
pub mod segment;
pub mod synth;
pub mod voicemgr;

pub use parser::{parse_note_list, ParseError, PitchClass};
pub use scheduler::{Conversion, Pipeline, PipelineConfig, PipelineError, SUPPORTED_SAMPLE_RATES};
pub use segment::{hz_to_midi, segment_pitch_track, MIN_NOTE_DURATION};
pub use synth::{synthesize, SynthConfig, SynthError, Synthesizer};
pub use voicemgr::VoiceManager;
