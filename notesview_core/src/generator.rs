// Question generation: the target notes for one round.
//
// Pipeline for `generate`:
//   1. Sanitize inputs: the allowed list is deduplicated, focus notes are
//      deduplicated and filtered to the allowed set.
//   2. Base pitch. With probability `focus_probability` (and a non-empty
//      focus set) pick uniformly from the focus notes. Otherwise draw a
//      random pitch class and an octave within `octave_range`; if that pitch
//      is not allowed, replace it with a uniform pick from the allowed list.
//   3. Expand by the tier's note count: single note, base + interval
//      (1..=12 semitones), triad, or seventh chord rooted on the base.
//   4. If any expanded note leaves the allowed set, replace the whole set
//      with a sample from the allowed pool (shuffled, base note first,
//      cycling if the pool is smaller than the note count).
//   5. Spell each note for display: black keys get the sharp or flat name
//      with equal probability.
//
// `generate_avoiding_repeat` wraps this with bounded retries so the same
// canonical note sequence is not asked twice in a row.
//
// All randomness comes through `RandomSource`, so tests drive every branch
// with a fixed seed or scripted values.

use crate::config::{DifficultyTier, OctaveRange, RangeConfig};
use crate::pitch::{Pitch, PitchClass, SpelledNote};
use notesview_prng::RandomSource;
use std::collections::BTreeSet;
use tracing::debug;

/// Interval sizes for two-note rounds: minor second through octave.
pub const INTERVALS: [i32; 12] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];

/// Triad shapes as semitone offsets from the root.
pub const TRIADS: [[i32; 3]; 4] = [
    [0, 4, 7], // major
    [0, 3, 7], // minor
    [0, 3, 6], // diminished
    [0, 4, 8], // augmented
];

/// Seventh-chord shapes as semitone offsets from the root.
pub const SEVENTHS: [[i32; 4]; 5] = [
    [0, 4, 7, 11], // major seventh
    [0, 3, 7, 10], // minor seventh
    [0, 4, 7, 10], // dominant seventh
    [0, 3, 6, 10], // half-diminished
    [0, 3, 6, 9],  // diminished seventh
];

/// Default chance of drawing the base note from the focus set when the
/// caller does not say otherwise.
pub const DEFAULT_FOCUS_PROBABILITY: f64 = 0.7;

/// Constraints for one generation call.
#[derive(Clone, Debug)]
pub struct GeneratorOptions<'a> {
    /// Legal targets. Empty means unconstrained.
    pub allowed_notes: &'a [Pitch],
    /// Octave span for free random picks.
    pub octave_range: OctaveRange,
    /// Notes the scheduler wants drilled.
    pub focus_notes: &'a [Pitch],
    pub focus_probability: f64,
}

impl<'a> GeneratorOptions<'a> {
    /// Options drawn from a clef range, with no focus set.
    pub fn from_range(range: &'a RangeConfig) -> Self {
        Self {
            allowed_notes: &range.allowed_notes,
            octave_range: range.octave_range,
            focus_notes: &[],
            focus_probability: DEFAULT_FOCUS_PROBABILITY,
        }
    }

    pub fn with_focus(mut self, focus_notes: &'a [Pitch], focus_probability: f64) -> Self {
        self.focus_notes = focus_notes;
        self.focus_probability = focus_probability;
        self
    }
}

/// Generate `tier.note_count` notes for one round.
pub fn generate<R: RandomSource>(
    tier: &DifficultyTier,
    opts: &GeneratorOptions<'_>,
    rng: &mut R,
) -> Vec<SpelledNote> {
    let allowed = dedup(opts.allowed_notes);
    let allowed_set: BTreeSet<Pitch> = allowed.iter().copied().collect();
    let focus: Vec<Pitch> = dedup(opts.focus_notes)
        .into_iter()
        .filter(|p| allowed_set.is_empty() || allowed_set.contains(p))
        .collect();

    let base = pick_base(&allowed, &allowed_set, &focus, opts, rng);
    let count = tier.note_count.max(1);

    let candidates = expand(base, count, rng);
    let notes = match candidates {
        Some(notes) if allowed_set.is_empty() || notes.iter().all(|n| allowed_set.contains(n)) => {
            notes
        }
        _ => {
            debug!(%base, count, "chord leaves allowed range, sampling from pool");
            sample_allowed(&allowed, count, base, rng)
        }
    };

    notes.into_iter().map(|p| spell_for_display(p, rng)).collect()
}

/// `generate`, retried up to `max_attempts` times while the result repeats
/// `previous` note for note. Returns the last attempt if every retry repeats.
pub fn generate_avoiding_repeat<R: RandomSource>(
    tier: &DifficultyTier,
    opts: &GeneratorOptions<'_>,
    previous: &[Pitch],
    max_attempts: u32,
    rng: &mut R,
) -> Vec<SpelledNote> {
    let mut attempts = 0;
    loop {
        let notes = generate(tier, opts, rng);
        attempts += 1;
        let repeats = !previous.is_empty()
            && notes.len() == previous.len()
            && notes.iter().zip(previous).all(|(n, p)| n.pitch == *p);
        if !repeats || attempts >= max_attempts.max(1) {
            if repeats {
                debug!(attempts, "accepting repeated question");
            }
            return notes;
        }
    }
}

fn dedup(notes: &[Pitch]) -> Vec<Pitch> {
    let mut seen = BTreeSet::new();
    notes.iter().copied().filter(|p| seen.insert(*p)).collect()
}

fn pick_base<R: RandomSource>(
    allowed: &[Pitch],
    allowed_set: &BTreeSet<Pitch>,
    focus: &[Pitch],
    opts: &GeneratorOptions<'_>,
    rng: &mut R,
) -> Pitch {
    if !focus.is_empty() && rng.random_bool(opts.focus_probability) {
        if let Some(p) = rng.choose(focus) {
            return *p;
        }
    }

    let class = PitchClass::ALL[rng.range_usize(0, PitchClass::ALL.len())];
    let range = opts.octave_range;
    let (lo, hi) = (range.min.min(range.max), range.min.max(range.max));
    let octave = rng.range_i32_inclusive(lo as i32, hi as i32) as i8;
    let candidate = Pitch::new(class, octave);

    if allowed_set.is_empty() || allowed_set.contains(&candidate) {
        return candidate;
    }
    rng.choose(allowed).copied().unwrap_or(candidate)
}

/// Build the raw note set around `base`. `None` if a note leaves the
/// representable octave range.
fn expand<R: RandomSource>(base: Pitch, count: usize, rng: &mut R) -> Option<Vec<Pitch>> {
    let offsets: Vec<i32> = match count {
        1 => vec![0],
        2 => vec![0, INTERVALS[rng.range_usize(0, INTERVALS.len())]],
        3 => TRIADS[rng.range_usize(0, TRIADS.len())].to_vec(),
        4 => SEVENTHS[rng.range_usize(0, SEVENTHS.len())].to_vec(),
        // Validated configs never get here; fall through to pool sampling.
        _ => return None,
    };
    offsets.into_iter().map(|o| base.transpose(o)).collect()
}

/// Draw up to `count` distinct notes from the allowed pool with `base`
/// forced first. A pool smaller than `count` yields a shorter chord.
fn sample_allowed<R: RandomSource>(
    allowed: &[Pitch],
    count: usize,
    base: Pitch,
    rng: &mut R,
) -> Vec<Pitch> {
    let mut pool: Vec<Pitch> = allowed.iter().copied().filter(|p| *p != base).collect();
    rng.shuffle(&mut pool);
    pool.insert(0, base);
    pool.truncate(count);
    pool
}

fn spell_for_display<R: RandomSource>(pitch: Pitch, rng: &mut R) -> SpelledNote {
    if pitch.class.is_black_key() && rng.random_bool(0.5) {
        SpelledNote::flat(pitch)
    } else {
        SpelledNote::canonical(pitch)
    }
}
