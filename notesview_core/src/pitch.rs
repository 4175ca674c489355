// Pitch model: note-string parsing, canonical formatting, enharmonics, and
// chromatic index arithmetic.
//
// A `Pitch` is a `(PitchClass, octave)` pair. `PitchClass` has exactly 12
// variants named by their sharp spelling, so `"Db4"` and `"C#4"` parse to the
// same value and compare equal. Display spelling is a separate concern,
// carried by `SpelledNote` (a canonical pitch plus a `Spelling`), and never
// participates in equality.
//
// The note-string grammar is `[A-Ga-g]` + optional `#` / `b` + a decimal
// octave (an optional leading `-` allows MIDI's octave -1). Only the 17
// conventional spellings are accepted; `E#`, `B#`, `Cb`, `Fb` are rejected.
//
// Absolute index is `octave * 12 + chromatic index` (C4 = 48). It is used for
// interval arithmetic in `generator.rs` and for range spans in `config.rs`.
// MIDI numbering (C4 = 60) lives in `input.rs`.
//
// Everything here is pure; only `Pitch::from_str` can fail.

use crate::error::NoteParseError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The 12 chromatic pitch classes, named by their sharp spelling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
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
    /// All pitch classes in chromatic order starting from C.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Chromatic index within the octave (C = 0, B = 11).
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Pitch class for an index, wrapping modulo 12.
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(12) as usize]
    }

    /// Canonical (sharp or natural) name.
    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    /// Flat spelling of a black-key class; `None` for naturals.
    pub fn flat_name(self) -> Option<&'static str> {
        match self {
            PitchClass::CSharp => Some("Db"),
            PitchClass::DSharp => Some("Eb"),
            PitchClass::FSharp => Some("Gb"),
            PitchClass::GSharp => Some("Ab"),
            PitchClass::ASharp => Some("Bb"),
            _ => None,
        }
    }

    /// True for the five classes that have both a sharp and a flat spelling.
    pub fn is_black_key(self) -> bool {
        self.flat_name().is_some()
    }

    /// Parse a bare pitch-class name (`"C#"`, `"db"`, `"A"`).
    fn from_name(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        let letter = chars.next()?.to_ascii_uppercase();
        let natural = match letter {
            'C' => PitchClass::C,
            'D' => PitchClass::D,
            'E' => PitchClass::E,
            'F' => PitchClass::F,
            'G' => PitchClass::G,
            'A' => PitchClass::A,
            'B' => PitchClass::B,
            _ => return None,
        };
        match (chars.next(), chars.next()) {
            (None, _) => Some(natural),
            (Some('#'), None) => {
                let raised = Self::from_index(natural.index() as i32 + 1);
                raised.is_black_key().then_some(raised)
            }
            (Some('b' | 'B'), None) => {
                let lowered = Self::from_index(natural.index() as i32 - 1);
                lowered.is_black_key().then_some(lowered)
            }
            _ => None,
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Flat spelling for a sharp name (`"C#"` -> `"Db"`). `None` for naturals
/// and for anything that is not a sharp name.
pub fn enharmonic_flat(name: &str) -> Option<&'static str> {
    match name {
        "C#" => Some("Db"),
        "D#" => Some("Eb"),
        "F#" => Some("Gb"),
        "G#" => Some("Ab"),
        "A#" => Some("Bb"),
        _ => None,
    }
}

/// Sharp spelling for a flat name (`"Db"` -> `"C#"`).
pub fn enharmonic_sharp(name: &str) -> Option<&'static str> {
    match name {
        "Db" => Some("C#"),
        "Eb" => Some("D#"),
        "Gb" => Some("F#"),
        "Ab" => Some("G#"),
        "Bb" => Some("A#"),
        _ => None,
    }
}

/// An absolute pitch. Ordering follows `absolute_index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub class: PitchClass,
    pub octave: i8,
}

impl Pitch {
    pub const fn new(class: PitchClass, octave: i8) -> Self {
        Self { class, octave }
    }

    /// Parse a note string. Same as `str::parse::<Pitch>()`.
    pub fn parse(s: &str) -> Result<Self, NoteParseError> {
        s.parse()
    }

    /// `octave * 12 + chromatic index`.
    pub fn absolute_index(self) -> i32 {
        self.octave as i32 * 12 + self.class.index() as i32
    }

    /// Inverse of `absolute_index`. `None` if the octave leaves `i8`.
    pub fn from_absolute_index(index: i32) -> Option<Self> {
        let octave = i8::try_from(index.div_euclid(12)).ok()?;
        Some(Self::new(PitchClass::from_index(index), octave))
    }

    /// The pitch `semitones` above (or below, if negative) this one.
    pub fn transpose(self, semitones: i32) -> Option<Self> {
        Self::from_absolute_index(self.absolute_index() + semitones)
    }
}

impl PartialOrd for Pitch {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pitch {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.absolute_index().cmp(&other.absolute_index())
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.class.name(), self.octave)
    }
}

impl FromStr for Pitch {
    type Err = NoteParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(NoteParseError::Empty);
        }
        if !trimmed
            .chars()
            .next()
            .is_some_and(|c| matches!(c.to_ascii_uppercase(), 'A'..='G'))
        {
            return Err(NoteParseError::MissingLetter(trimmed.to_string()));
        }

        // The name is the letter plus an optional accidental; the octave is
        // whatever follows.
        let name_len = match trimmed.as_bytes().get(1) {
            Some(b'#' | b'b' | b'B') => 2,
            _ => 1,
        };
        let (name, octave_str) = trimmed.split_at(name_len);

        let class = PitchClass::from_name(name)
            .ok_or_else(|| NoteParseError::UnsupportedSpelling(trimmed.to_string()))?;

        if octave_str.is_empty() || octave_str == "-" {
            return Err(NoteParseError::MissingOctave(trimmed.to_string()));
        }
        let digits = octave_str.strip_prefix('-').unwrap_or(octave_str);
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NoteParseError::InvalidOctave(trimmed.to_string()));
        }
        let octave: i8 = octave_str
            .parse()
            .map_err(|_| NoteParseError::InvalidOctave(trimmed.to_string()))?;

        Ok(Self::new(class, octave))
    }
}

impl Serialize for Pitch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pitch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Normalize any accepted spelling to the canonical note string.
pub fn canonicalize(note: &str) -> Option<String> {
    note.parse::<Pitch>().ok().map(|p| p.to_string())
}

/// How a pitch is written for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Spelling {
    Natural,
    Sharp,
    Flat,
}

/// A canonical pitch together with the spelling chosen for display.
///
/// Equality of the underlying `pitch` is what judging uses; `spelling` is
/// cosmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpelledNote {
    pub pitch: Pitch,
    pub spelling: Spelling,
}

impl SpelledNote {
    /// Spell a pitch with its canonical name (natural or sharp).
    pub fn canonical(pitch: Pitch) -> Self {
        let spelling = if pitch.class.is_black_key() {
            Spelling::Sharp
        } else {
            Spelling::Natural
        };
        Self { pitch, spelling }
    }

    /// Spell a black-key pitch with its flat name. Naturals stay natural.
    pub fn flat(pitch: Pitch) -> Self {
        if pitch.class.is_black_key() {
            Self {
                pitch,
                spelling: Spelling::Flat,
            }
        } else {
            Self::canonical(pitch)
        }
    }
}

impl fmt::Display for SpelledNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.spelling {
            Spelling::Flat => self.pitch.class.flat_name().unwrap_or(self.pitch.class.name()),
            Spelling::Natural | Spelling::Sharp => self.pitch.class.name(),
        };
        write!(f, "{}{}", name, self.pitch.octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Pitch {
        s.parse().unwrap()
    }

    #[test]
    fn parses_naturals_sharps_and_flats() {
        assert_eq!(p("C4"), Pitch::new(PitchClass::C, 4));
        assert_eq!(p("C#4"), Pitch::new(PitchClass::CSharp, 4));
        assert_eq!(p("Db4"), Pitch::new(PitchClass::CSharp, 4));
        assert_eq!(p("Bb3"), Pitch::new(PitchClass::ASharp, 3));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(p("db4"), p("Db4"));
        assert_eq!(p("DB4"), p("C#4"));
        assert_eq!(p("g5"), p("G5"));
        assert_eq!(p("  a3 "), p("A3"));
    }

    #[test]
    fn spelling_variants_format_identically() {
        for s in ["db4", "Db4", "C#4", "c#4"] {
            assert_eq!(p(s).to_string(), "C#4");
            assert_eq!(canonicalize(s).as_deref(), Some("C#4"));
        }
    }

    #[test]
    fn format_parse_roundtrip_for_all_classes() {
        for class in PitchClass::ALL {
            for octave in -1..=8 {
                let pitch = Pitch::new(class, octave);
                assert_eq!(p(&pitch.to_string()), pitch);
            }
        }
    }

    #[test]
    fn rejects_malformed_strings() {
        assert_eq!(Pitch::parse(""), Err(NoteParseError::Empty));
        assert!(matches!(Pitch::parse("H4"), Err(NoteParseError::MissingLetter(_))));
        assert!(matches!(Pitch::parse("4C"), Err(NoteParseError::MissingLetter(_))));
        assert!(matches!(Pitch::parse("C"), Err(NoteParseError::MissingOctave(_))));
        assert!(matches!(Pitch::parse("C#"), Err(NoteParseError::MissingOctave(_))));
        assert!(matches!(Pitch::parse("Cx4"), Err(NoteParseError::InvalidOctave(_))));
        assert!(matches!(Pitch::parse("C4.5"), Err(NoteParseError::InvalidOctave(_))));
        assert!(matches!(Pitch::parse("C999"), Err(NoteParseError::InvalidOctave(_))));
    }

    #[test]
    fn rejects_unconventional_spellings() {
        for s in ["E#4", "B#3", "Cb4", "Fb2"] {
            assert!(
                matches!(Pitch::parse(s), Err(NoteParseError::UnsupportedSpelling(_))),
                "{s} should be rejected"
            );
        }
    }

    #[test]
    fn negative_octave_parses() {
        assert_eq!(p("C-1"), Pitch::new(PitchClass::C, -1));
        assert_eq!(Pitch::new(PitchClass::G, -1).to_string(), "G-1");
    }

    #[test]
    fn absolute_index_arithmetic() {
        assert_eq!(p("C0").absolute_index(), 0);
        assert_eq!(p("C4").absolute_index(), 48);
        assert_eq!(p("B3").absolute_index() + 1, p("C4").absolute_index());
        assert_eq!(Pitch::from_absolute_index(49), Some(p("C#4")));
        assert_eq!(Pitch::from_absolute_index(-1), Some(p("B-1")));
        assert_eq!(p("A4").transpose(3), Some(p("C5")));
        assert_eq!(p("C4").transpose(-1), Some(p("B3")));
    }

    #[test]
    fn ordering_follows_absolute_index() {
        assert!(p("B3") < p("C4"));
        assert!(p("Db4") < p("D4"));
    }

    #[test]
    fn enharmonic_lookups() {
        assert_eq!(enharmonic_flat("C#"), Some("Db"));
        assert_eq!(enharmonic_sharp("Bb"), Some("A#"));
        assert_eq!(enharmonic_flat("C"), None);
        assert_eq!(enharmonic_sharp("E"), None);
        for class in PitchClass::ALL {
            if let Some(flat) = enharmonic_flat(class.name()) {
                assert_eq!(enharmonic_sharp(flat), Some(class.name()));
            }
        }
    }

    #[test]
    fn spelled_note_display() {
        assert_eq!(SpelledNote::flat(p("C#4")).to_string(), "Db4");
        assert_eq!(SpelledNote::flat(p("E4")).to_string(), "E4");
        assert_eq!(SpelledNote::canonical(p("Gb2")).to_string(), "F#2");
        assert_eq!(SpelledNote::flat(p("C#4")).pitch, SpelledNote::canonical(p("C#4")).pitch);
    }

    #[test]
    fn pitch_serializes_as_string() {
        let json = serde_json::to_string(&p("Eb5")).unwrap();
        assert_eq!(json, "\"D#5\"");
        let back: Pitch = serde_json::from_str("\"eb5\"").unwrap();
        assert_eq!(back, p("D#5"));
        assert!(serde_json::from_str::<Pitch>("\"Q9\"").is_err());
    }
}
