//! WAV file writer utility
//!
//! Encodes mono 16-bit PCM. The sample rate only goes into the header.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

const NUM_CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const HEADER_LEN: u32 = 44;
const BYTES_PER_SAMPLE: u32 = (BITS_PER_SAMPLE / 8) as u32;

/// Most samples whose data chunk still fits the 32-bit RIFF size fields
pub const MAX_SAMPLES: usize = ((u32::MAX - HEADER_LEN) / BYTES_PER_SAMPLE) as usize;

/// Convert a sample in [-1.0, 1.0] to i16, clamping anything outside
///
/// -1.0 maps to i16::MIN and 1.0 to i16::MAX.
pub fn to_pcm16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped >= 0.0 {
        (clamped * i16::MAX as f32) as i16
    } else {
        (clamped * -(i16::MIN as f32)) as i16
    }
}

/// Encode a complete WAV stream into `writer`
pub fn encode_wav_16bit<W: Write>(
    writer: &mut W,
    samples: &[f32],
    sample_rate: u32,
) -> io::Result<()> {
    if samples.len() > MAX_SAMPLES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "too many samples for a WAV file",
        ));
    }
    let byte_rate = sample_rate * NUM_CHANNELS as u32 * BYTES_PER_SAMPLE;
    let block_align = NUM_CHANNELS * BYTES_PER_SAMPLE as u16;
    let data_size = samples.len() as u32 * BYTES_PER_SAMPLE;
    let riff_size = HEADER_LEN - 8 + data_size;

    // RIFF chunk
    writer.write_all(b"RIFF")?;
    writer.write_all(&riff_size.to_le_bytes())?;
    writer.write_all(b"WAVE")?;

    // fmt subchunk
    writer.write_all(b"fmt ")?;
    writer.write_all(&16u32.to_le_bytes())?;
    writer.write_all(&1u16.to_le_bytes())?; // PCM
    writer.write_all(&NUM_CHANNELS.to_le_bytes())?;
    writer.write_all(&sample_rate.to_le_bytes())?;
    writer.write_all(&byte_rate.to_le_bytes())?;
    writer.write_all(&block_align.to_le_bytes())?;
    writer.write_all(&BITS_PER_SAMPLE.to_le_bytes())?;

    // data subchunk
    writer.write_all(b"data")?;
    writer.write_all(&data_size.to_le_bytes())?;
    for &sample in samples {
        writer.write_all(&to_pcm16(sample).to_le_bytes())?;
    }

    Ok(())
}

/// Write a 16-bit PCM mono WAV file
///
/// # Example
/// ```
/// use chipify::wav::write_wav_16bit;
///
/// let path = std::env::temp_dir().join("chipify_doc_silence.wav");
/// let samples = vec![0.0f32; 8000]; // 1 second of silence at 8kHz
/// write_wav_16bit(&path, &samples, 8000).unwrap();
/// # std::fs::remove_file(&path).unwrap();
/// ```
pub fn write_wav_16bit(
    path: impl AsRef<Path>,
    samples: &[f32],
    sample_rate: u32,
) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    encode_wav_16bit(&mut writer, samples, sample_rate)?;
    writer.flush()
}
