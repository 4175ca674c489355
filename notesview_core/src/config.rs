// Data-driven trainer configuration.
//
// All tunable practice parameters live in `TrainerConfig`, loadable from
// JSON. The engine reads difficulty tiers, clef ranges, timing constants,
// and the review-interval table from here rather than hardcoding them, so
// drills can be rebalanced without recompiling. `TrainerConfig::default()`
// carries the shipped values.
//
// Difficulty tiers (`DifficultyTable`) are static records: note count per
// round, time limit, base score, combo multiplier. Clef ranges
// (`ClefRanges`) give, per clef, the standard span that keeps notes on or
// near the staff, a wider extended span, and the octave span used when the
// extended range is active. `range_for(mode, clef)` turns these into the
// `RangeConfig` the question generator consumes.
//
// See also: `generator.rs` (consumes `RangeConfig` + `DifficultyTier`),
// `memory.rs` (consumes `review_intervals_ms`), `session.rs` (owns the
// config and reads timing values).
//
// **Critical constraint: determinism.** Config values feed directly into
// generation and scheduling; identical configs plus identical seeds give
// identical practice sessions.

use crate::error::ConfigError;
use crate::pitch::{Pitch, PitchClass};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ---------------------------------------------------------------------------
// Difficulty tiers
// ---------------------------------------------------------------------------

/// Identifier of a difficulty tier. Also the key of the high-score map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyId {
    Beginner,
    Intermediate,
    Advanced,
    Master,
}

impl DifficultyId {
    pub const ALL: [DifficultyId; 4] = [
        DifficultyId::Beginner,
        DifficultyId::Intermediate,
        DifficultyId::Advanced,
        DifficultyId::Master,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DifficultyId::Beginner => "beginner",
            DifficultyId::Intermediate => "intermediate",
            DifficultyId::Advanced => "advanced",
            DifficultyId::Master => "master",
        }
    }

    /// Case-insensitive lookup by id.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for DifficultyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One difficulty tier. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyTier {
    pub id: DifficultyId,
    pub name: String,
    pub description: String,
    /// Notes per round: 1 single note, 2 interval, 3 triad, 4 seventh chord.
    pub note_count: usize,
    /// Seconds allowed per round before it times out.
    pub time_limit_secs: u32,
    /// Score for a correct answer before speed bonus and combo boost.
    pub base_score: i64,
    /// Displayed multiplier. Scoring itself uses the linear combo boost in
    /// `scoring.rs`.
    pub combo_multiplier: f64,
}

impl DifficultyTier {
    pub fn time_limit_ms(&self) -> u64 {
        self.time_limit_secs as u64 * 1000
    }
}

/// The fixed set of four tiers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyTable {
    pub beginner: DifficultyTier,
    pub intermediate: DifficultyTier,
    pub advanced: DifficultyTier,
    pub master: DifficultyTier,
}

impl DifficultyTable {
    pub fn get(&self, id: DifficultyId) -> &DifficultyTier {
        match id {
            DifficultyId::Beginner => &self.beginner,
            DifficultyId::Intermediate => &self.intermediate,
            DifficultyId::Advanced => &self.advanced,
            DifficultyId::Master => &self.master,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &DifficultyTier> {
        [&self.beginner, &self.intermediate, &self.advanced, &self.master].into_iter()
    }
}

impl Default for DifficultyTable {
    fn default() -> Self {
        fn tier(
            id: DifficultyId,
            name: &str,
            description: &str,
            note_count: usize,
            time_limit_secs: u32,
            base_score: i64,
            combo_multiplier: f64,
        ) -> DifficultyTier {
            DifficultyTier {
                id,
                name: name.into(),
                description: description.into(),
                note_count,
                time_limit_secs,
                base_score,
                combo_multiplier,
            }
        }

        Self {
            beginner: tier(
                DifficultyId::Beginner,
                "Single notes",
                "Name one note",
                1,
                12,
                100,
                1.1,
            ),
            intermediate: tier(
                DifficultyId::Intermediate,
                "Intervals",
                "Play a two-note interval",
                2,
                9,
                150,
                1.2,
            ),
            advanced: tier(
                DifficultyId::Advanced,
                "Triads",
                "Play a three-note triad",
                3,
                7,
                200,
                1.3,
            ),
            master: tier(
                DifficultyId::Master,
                "Seventh chords",
                "Play a four-note seventh chord",
                4,
                5,
                300,
                1.5,
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Clefs and ranges
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clef {
    Treble,
    Bass,
    Alto,
    Tenor,
}

impl Clef {
    pub const ALL: [Clef; 4] = [Clef::Treble, Clef::Bass, Clef::Alto, Clef::Tenor];

    pub fn as_str(self) -> &'static str {
        match self {
            Clef::Treble => "treble",
            Clef::Bass => "bass",
            Clef::Alto => "alto",
            Clef::Tenor => "tenor",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Clef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard range keeps notes within a couple of ledger lines; extended
/// range allows many more.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeMode {
    #[default]
    Standard,
    Extended,
}

impl RangeMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(RangeMode::Standard),
            "extended" => Some(RangeMode::Extended),
            _ => None,
        }
    }
}

/// Inclusive octave span.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OctaveRange {
    pub min: i8,
    pub max: i8,
}

impl OctaveRange {
    pub const fn new(min: i8, max: i8) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, octave: i8) -> bool {
        (self.min..=self.max).contains(&octave)
    }
}

impl Default for OctaveRange {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

/// Inclusive chromatic span between two pitches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSpan {
    pub low: Pitch,
    pub high: Pitch,
}

impl NoteSpan {
    pub const fn new(low: Pitch, high: Pitch) -> Self {
        Self { low, high }
    }

    /// Every pitch in the span, ascending, in canonical spelling.
    pub fn notes(&self) -> Vec<Pitch> {
        let (lo, hi) = if self.low <= self.high {
            (self.low, self.high)
        } else {
            (self.high, self.low)
        };
        (lo.absolute_index()..=hi.absolute_index())
            .filter_map(Pitch::from_absolute_index)
            .collect()
    }
}

/// Ranges for one clef.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClefRange {
    pub standard: NoteSpan,
    pub extended: NoteSpan,
    pub extended_octaves: OctaveRange,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClefRanges {
    pub treble: ClefRange,
    pub bass: ClefRange,
    pub alto: ClefRange,
    pub tenor: ClefRange,
}

impl ClefRanges {
    pub fn get(&self, clef: Clef) -> &ClefRange {
        match clef {
            Clef::Treble => &self.treble,
            Clef::Bass => &self.bass,
            Clef::Alto => &self.alto,
            Clef::Tenor => &self.tenor,
        }
    }

    fn iter(&self) -> impl Iterator<Item = (Clef, &ClefRange)> {
        Clef::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

impl Default for ClefRanges {
    fn default() -> Self {
        use PitchClass::*;
        let span = |lc, lo, hc, ho| NoteSpan::new(Pitch::new(lc, lo), Pitch::new(hc, ho));
        Self {
            treble: ClefRange {
                standard: span(A, 3, C, 6),
                extended: span(A, 2, D, 7),
                extended_octaves: OctaveRange::new(3, 6),
            },
            bass: ClefRange {
                standard: span(C, 2, E, 4),
                extended: span(C, 1, E, 5),
                extended_octaves: OctaveRange::new(1, 4),
            },
            alto: ClefRange {
                standard: span(B, 2, D, 5),
                extended: span(B, 1, E, 6),
                extended_octaves: OctaveRange::new(2, 5),
            },
            tenor: ClefRange {
                standard: span(G, 2, C, 5),
                extended: span(G, 1, E, 6),
                extended_octaves: OctaveRange::new(2, 5),
            },
        }
    }
}

/// The legal targets for one round: an explicit note list plus the octave
/// span used for free random picks.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeConfig {
    pub allowed_notes: Vec<Pitch>,
    pub octave_range: OctaveRange,
}

impl RangeConfig {
    /// Membership test: the explicit list when non-empty, otherwise the
    /// octave span.
    pub fn contains(&self, pitch: Pitch) -> bool {
        if self.allowed_notes.is_empty() {
            self.octave_range.contains(pitch.octave)
        } else {
            self.allowed_notes.contains(&pitch)
        }
    }
}

/// Octave bounds of a note list; `4..=4` for an empty list.
pub fn octave_bounds(notes: &[Pitch]) -> OctaveRange {
    let min = notes.iter().map(|p| p.octave).min();
    let max = notes.iter().map(|p| p.octave).max();
    match (min, max) {
        (Some(min), Some(max)) => OctaveRange::new(min, max),
        _ => OctaveRange::default(),
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub difficulties: DifficultyTable,
    pub clef_ranges: ClefRanges,
    /// Key presses closer together than this form one chord.
    pub chord_window_ms: u64,
    /// Pause between a verdict and the next round.
    pub advance_delay_ms: u64,
    /// Chance the base note is drawn from the scheduler's due notes.
    pub focus_probability: f64,
    /// Generation attempts before accepting a repeat of the previous round.
    pub repeat_avoidance_attempts: u32,
    /// Fraction of the tier's base score lost on a wrong answer.
    pub wrong_penalty_ratio: f64,
    /// Spaced-repetition interval per stage, shortest first.
    pub review_intervals_ms: Vec<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            difficulties: DifficultyTable::default(),
            clef_ranges: ClefRanges::default(),
            chord_window_ms: 220,
            advance_delay_ms: 500,
            focus_probability: 0.1,
            repeat_avoidance_attempts: 10,
            wrong_penalty_ratio: 0.5,
            // 1 min, 5 min, 30 min, 6 h, 24 h
            review_intervals_ms: vec![60_000, 300_000, 1_800_000, 21_600_000, 86_400_000],
        }
    }
}

impl TrainerConfig {
    /// Parse and validate a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn tier(&self, id: DifficultyId) -> &DifficultyTier {
        self.difficulties.get(id)
    }

    /// Legal notes and octave span for a clef in the given range mode.
    pub fn range_for(&self, mode: RangeMode, clef: Clef) -> RangeConfig {
        let range = self.clef_ranges.get(clef);
        match mode {
            RangeMode::Standard => {
                let allowed_notes = range.standard.notes();
                let octave_range = octave_bounds(&allowed_notes);
                RangeConfig {
                    allowed_notes,
                    octave_range,
                }
            }
            RangeMode::Extended => RangeConfig {
                allowed_notes: range.extended.notes(),
                octave_range: range.extended_octaves,
            },
        }
    }

    /// Reject configs the engine cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for tier in self.difficulties.iter() {
            if !(1..=4).contains(&tier.note_count) {
                return Err(ConfigError::Invalid(format!(
                    "tier {} has note_count {}, expected 1..=4",
                    tier.id, tier.note_count
                )));
            }
            if tier.time_limit_secs == 0 {
                return Err(ConfigError::Invalid(format!(
                    "tier {} has a zero time limit",
                    tier.id
                )));
            }
        }
        for id in DifficultyId::ALL {
            if self.difficulties.get(id).id != id {
                return Err(ConfigError::Invalid(format!(
                    "difficulty slot {id} holds tier {}",
                    self.difficulties.get(id).id
                )));
            }
        }
        let widest = self
            .difficulties
            .iter()
            .map(|tier| tier.note_count)
            .max()
            .unwrap_or(1);
        for (clef, range) in self.clef_ranges.iter() {
            for (label, span) in [("standard", range.standard), ("extended", range.extended)] {
                if span.low > span.high {
                    return Err(ConfigError::Invalid(format!(
                        "{clef} {label} range is inverted: {} > {}",
                        span.low, span.high
                    )));
                }
            }
            if range.extended_octaves.min > range.extended_octaves.max {
                return Err(ConfigError::Invalid(format!(
                    "{clef} extended octave span is inverted"
                )));
            }
            // Chord rounds need that many distinct pitches in every range.
            for (label, span) in [("standard", range.standard), ("extended", range.extended)] {
                let available = span.notes().len();
                if available < widest {
                    return Err(ConfigError::Invalid(format!(
                        "{clef} {label} range holds {available} notes, a tier needs {widest}"
                    )));
                }
            }
        }
        if self.review_intervals_ms.is_empty() {
            return Err(ConfigError::Invalid("review_intervals_ms is empty".into()));
        }
        if self.review_intervals_ms.windows(2).any(|w| w[0] > w[1]) {
            return Err(ConfigError::Invalid(
                "review_intervals_ms must be non-decreasing".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.focus_probability) {
            return Err(ConfigError::Invalid(format!(
                "focus_probability {} outside [0, 1]",
                self.focus_probability
            )));
        }
        Ok(())
    }
}
