// Correctness checking: does a submitted note set answer the round?
//
// Two modes (`OctaveMode`):
// - `Exact`: position-by-position; octaves must match and pitch classes
//   must be equal or enharmonic. Because `Pitch` stores the canonical class,
//   enharmonic respellings already compare equal.
// - `IgnoreOctave`: multiset comparison of pitch classes with octaves
//   stripped. Input order is irrelevant, multiplicities must match.
//
// `check_notes` is the string-facing entry point used on raw note strings;
// any unparsable note makes the answer "no match" instead of an error.
// The session judges typed pitches through `pitches_match` directly.

use crate::pitch::{Pitch, PitchClass};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OctaveMode {
    Exact,
    IgnoreOctave,
}

impl OctaveMode {
    pub fn from_ignore_octave(ignore_octave: bool) -> Self {
        if ignore_octave {
            OctaveMode::IgnoreOctave
        } else {
            OctaveMode::Exact
        }
    }
}

/// Compare two typed note lists.
pub fn pitches_match(expected: &[Pitch], actual: &[Pitch], mode: OctaveMode) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    match mode {
        OctaveMode::Exact => expected.iter().zip(actual).all(|(e, a)| e == a),
        OctaveMode::IgnoreOctave => class_counts(expected) == class_counts(actual),
    }
}

/// Compare two lists of note strings. Malformed strings never match.
pub fn check_notes<E, A>(expected: &[E], actual: &[A], mode: OctaveMode) -> bool
where
    E: AsRef<str>,
    A: AsRef<str>,
{
    if expected.len() != actual.len() {
        return false;
    }
    let (Some(expected), Some(actual)) = (parse_all(expected), parse_all(actual)) else {
        return false;
    };
    pitches_match(&expected, &actual, mode)
}

fn parse_all<S: AsRef<str>>(notes: &[S]) -> Option<Vec<Pitch>> {
    notes.iter().map(|n| n.as_ref().parse().ok()).collect()
}

fn class_counts(notes: &[Pitch]) -> BTreeMap<PitchClass, usize> {
    let mut counts = BTreeMap::new();
    for note in notes {
        *counts.entry(note.class).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_mode_accepts_enharmonic_respelling() {
        assert!(check_notes(
            &["C#4", "E4", "G#4"],
            &["Db4", "E4", "Ab4"],
            OctaveMode::Exact
        ));
        assert!(check_notes(&["Bb3"], &["a#3"], OctaveMode::Exact));
    }

    #[test]
    fn exact_mode_requires_matching_octave_and_order() {
        assert!(!check_notes(&["C4"], &["C5"], OctaveMode::Exact));
        assert!(!check_notes(&["C4", "E4"], &["E4", "C4"], OctaveMode::Exact));
    }

    #[test]
    fn ignore_octave_is_order_and_octave_insensitive() {
        assert!(check_notes(
            &["C4", "E4", "G4"],
            &["G2", "C6", "E3"],
            OctaveMode::IgnoreOctave
        ));
        assert!(check_notes(&["F#4", "A4"], &["A1", "Gb5"], OctaveMode::IgnoreOctave));
    }

    #[test]
    fn ignore_octave_respects_multiplicity() {
        // C4 + C5 is an octave: two Cs. C + G has different classes.
        assert!(check_notes(&["C4", "C5"], &["C3", "C4"], OctaveMode::IgnoreOctave));
        assert!(!check_notes(&["C4", "C5"], &["C4", "G4"], OctaveMode::IgnoreOctave));
        assert!(!check_notes(
            &["C4", "E4", "E5"],
            &["C4", "C5", "E4"],
            OctaveMode::IgnoreOctave
        ));
    }

    #[test]
    fn length_mismatch_fails() {
        assert!(!check_notes(&["C4", "E4"], &["C4"], OctaveMode::IgnoreOctave));
        assert!(!check_notes::<&str, &str>(&[], &["C4"], OctaveMode::Exact));
    }

    #[test]
    fn empty_lists_match() {
        assert!(pitches_match(&[], &[], OctaveMode::Exact));
    }

    #[test]
    fn malformed_notes_never_match() {
        assert!(!check_notes(&["C4"], &["X4"], OctaveMode::Exact));
        assert!(!check_notes(&["garbage"], &["garbage"], OctaveMode::IgnoreOctave));
    }

    #[test]
    fn octave_mode_from_flag() {
        assert_eq!(OctaveMode::from_ignore_octave(true), OctaveMode::IgnoreOctave);
        assert_eq!(OctaveMode::from_ignore_octave(false), OctaveMode::Exact);
    }
}
