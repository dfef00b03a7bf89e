//! Parser for note list files
//!
//! Format, one note per line:
//! <start_seconds> <end_seconds> <pitch>   # comment
//!
//! Fields are separated by whitespace and/or commas. Pitch is either a MIDI
//! note number (0-127) or a note name:
//! - Pitch classes: c, d, e, f, g, a, b
//! - Sharps: c#, d#, f#, g#, a#
//! - Octaves: -1 to 9 (a4 = 69, c4 = 60)

use std::str::FromStr;

use thiserror::Error;

use crate::event::NoteSpan;

/// Pitch classes with support for black keys (sharps only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// Convert pitch class to semitone number (C=0, C#=1, D=2, ...)
    pub fn semitone(&self) -> u8 {
        match self {
            PitchClass::C => 0,
            PitchClass::CSharp => 1,
            PitchClass::D => 2,
            PitchClass::DSharp => 3,
            PitchClass::E => 4,
            PitchClass::F => 5,
            PitchClass::FSharp => 6,
            PitchClass::G => 7,
            PitchClass::GSharp => 8,
            PitchClass::A => 9,
            PitchClass::ASharp => 10,
            PitchClass::B => 11,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown pitch class: {0}")]
pub struct UnknownPitchClass(pub String);

impl FromStr for PitchClass {
    type Err = UnknownPitchClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "c" => Ok(PitchClass::C),
            "c#" => Ok(PitchClass::CSharp),
            "d" => Ok(PitchClass::D),
            "d#" => Ok(PitchClass::DSharp),
            "e" => Ok(PitchClass::E),
            "f" => Ok(PitchClass::F),
            "f#" => Ok(PitchClass::FSharp),
            "g" => Ok(PitchClass::G),
            "g#" => Ok(PitchClass::GSharp),
            "a" => Ok(PitchClass::A),
            "a#" => Ok(PitchClass::ASharp),
            "b" => Ok(PitchClass::B),
            _ => Err(UnknownPitchClass(s.to_string())),
        }
    }
}

/// Parse errors, each tagged with its 1-based line number
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("line {line}: expected `<start> <end> <pitch>`, got {text:?}")]
    InvalidLine { line: usize, text: String },
    #[error("line {line}: invalid time {text:?}")]
    InvalidTime { line: usize, text: String },
    #[error("line {line}: invalid pitch {text:?}")]
    InvalidPitch { line: usize, text: String },
    #[error("line {line}: note ends at {end} before it starts at {start}")]
    EndBeforeStart { line: usize, start: f64, end: f64 },
}

/// Parse a pitch given as a MIDI number or a note name such as `c#4`
pub fn parse_pitch(s: &str) -> Option<u8> {
    let s = s.trim();
    if let Ok(number) = s.parse::<u8>() {
        return (number <= 127).then_some(number);
    }

    let class_len = if s.get(1..2) == Some("#") { 2 } else { 1 };
    let class_str = s.get(..class_len)?;
    let pitch_class = PitchClass::from_str(class_str).ok()?;
    let octave: i32 = s.get(class_len..)?.parse().ok()?;

    let midi = 12 * (octave + 1) + pitch_class.semitone() as i32;
    u8::try_from(midi).ok().filter(|&m| m <= 127)
}

fn parse_time(s: &str, line: usize) -> Result<f64, ParseError> {
    s.parse::<f64>()
        .ok()
        .filter(|t| t.is_finite() && *t >= 0.0)
        .ok_or_else(|| ParseError::InvalidTime {
            line,
            text: s.to_string(),
        })
}

/// Cut a trailing comment, which starts at whitespace followed by '#'
///
/// A '#' right after a letter is a sharp ("c#4") and stays.
fn strip_comment(text: &str) -> &str {
    let end = text
        .char_indices()
        .zip(text.chars().skip(1))
        .find(|&((_, c), next)| c.is_whitespace() && next == '#')
        .map_or(text.len(), |((i, _), _)| i);
    &text[..end]
}

/// Parse a single note line
///
/// Returns `Ok(None)` for blank and comment-only lines.
pub fn parse_line(text: &str, line: usize) -> Result<Option<NoteSpan>, ParseError> {
    let content = strip_comment(text).trim();
    if content.is_empty() || content.starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = content
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|f| !f.is_empty())
        .collect();
    if fields.len() != 3 {
        return Err(ParseError::InvalidLine {
            line,
            text: content.to_string(),
        });
    }

    let start = parse_time(fields[0], line)?;
    let end = parse_time(fields[1], line)?;
    let pitch = parse_pitch(fields[2]).ok_or_else(|| ParseError::InvalidPitch {
        line,
        text: fields[2].to_string(),
    })?;

    if end < start {
        return Err(ParseError::EndBeforeStart { line, start, end });
    }

    Ok(Some(NoteSpan::new(start, end, pitch)))
}

/// Parse a full note list
///
/// Notes are returned in file order; no sorting is done here.
pub fn parse_note_list(text: &str) -> Result<Vec<NoteSpan>, ParseError> {
    let mut notes = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if let Some(note) = parse_line(line, idx + 1)? {
            notes.push(note);
        }
    }
    Ok(notes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pitch_class() {
        assert_eq!(PitchClass::from_str("c").unwrap(), PitchClass::C);
        assert_eq!(PitchClass::from_str("c#").unwrap(), PitchClass::CSharp);
        assert_eq!(PitchClass::from_str("C#").unwrap(), PitchClass::CSharp);
        assert_eq!(PitchClass::from_str("a#").unwrap(), PitchClass::ASharp);
        assert!(PitchClass::from_str("h").is_err());
    }

    #[test]
    fn test_parse_pitch() {
        assert_eq!(parse_pitch("69"), Some(69));
        assert_eq!(parse_pitch("a4"), Some(69));
        assert_eq!(parse_pitch("c4"), Some(60));
        assert_eq!(parse_pitch("C#5"), Some(73));
        assert_eq!(parse_pitch("c-1"), Some(0));
        assert_eq!(parse_pitch("g9"), Some(127));
        assert_eq!(parse_pitch("a9"), None);
        assert_eq!(parse_pitch("128"), None);
        assert_eq!(parse_pitch("x4"), None);
        assert_eq!(parse_pitch("c"), None);
    }

    #[test]
    fn test_parse_line() {
        let note = parse_line("0.5 1.25 a4", 1).unwrap().unwrap();
        assert_eq!(note, NoteSpan::new(0.5, 1.25, 69));

        let note = parse_line("0, 2, 60  # held C", 1).unwrap().unwrap();
        assert_eq!(note, NoteSpan::new(0.0, 2.0, 60));

        let note = parse_line("1.0 1.5 c#4 # sharp survives", 1).unwrap().unwrap();
        assert_eq!(note.pitch, 61);

        let note = parse_line("0 1 60\t# tab before the comment", 1).unwrap().unwrap();
        assert_eq!((note.start, note.end, note.pitch), (0.0, 1.0, 60));

        assert_eq!(strip_comment("0 1 c#4\t#x"), "0 1 c#4");
        assert_eq!(parse_line("   ", 1).unwrap(), None);
        assert_eq!(parse_line("# whole line", 1).unwrap(), None);
    }

    #[test]
    fn test_parse_note_list() {
        let text = r#"
# start end pitch
0.0 0.5 c4
0.5 1.0 e4

1.0 2.0 67   # long G
        "#;

        let notes = parse_note_list(text).unwrap();
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[0].pitch, 60);
        assert_eq!(notes[1].pitch, 64);
        assert_eq!(notes[2], NoteSpan::new(1.0, 2.0, 67));
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let err = parse_note_list("0 1 60\n0 1\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidLine { line: 2, .. }));

        let err = parse_note_list("abc 1 60").unwrap_err();
        assert!(matches!(err, ParseError::InvalidTime { line: 1, .. }));

        let err = parse_note_list("0 -1 60").unwrap_err();
        assert!(matches!(err, ParseError::InvalidTime { line: 1, .. }));

        let err = parse_note_list("\n\n0 1 h4").unwrap_err();
        assert!(matches!(err, ParseError::InvalidPitch { line: 3, .. }));

        let err = parse_note_list("2 1 60").unwrap_err();
        assert_eq!(
            err,
            ParseError::EndBeforeStart {
                line: 1,
                start: 2.0,
                end: 1.0
            }
        );
        assert_eq!(err.to_string(), "line 1: note ends at 1 before it starts at 2");
    }

    #[test]
    fn test_zero_length_note_is_allowed() {
        let notes = parse_note_list("1 1 60").unwrap();
        assert_eq!(notes[0].duration(), 0.0);
    }
}
