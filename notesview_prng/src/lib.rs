// Deterministic, portable pseudo-random number generation for practice rounds.
//
// Two pieces live here:
// - `RandomSource`: the trait every random decision in `notesview_core`
//   goes through (base-note choice, interval/chord shape, fallback shuffles,
//   display spelling). Only `next_u64` is required; all derived draws are
//   provided methods so any source produces them identically.
// - `PracticeRng`: xoshiro256++ (Blackman & Vigna, 2019) seeded through
//   SplitMix64. Hand-rolled so a seed reproduces the same question stream on
//   every platform, which is what makes generator and session tests exact.
//
// Tests elsewhere implement `RandomSource` with scripted values to force
// specific branches (focus pick, chord overflow fallback, repeat retries).
//
// **Critical constraint: determinism.** Given the same prior state, every
// method must return the same value regardless of platform or optimization
// level. No floating point in the core generator, no OS entropy here.

use serde::{Deserialize, Serialize};

/// A source of uniformly distributed 64-bit words plus the derived draws the
/// question generator needs.
pub trait RandomSource {
    /// Next raw 64-bit value.
    fn next_u64(&mut self) -> u64;

    /// Uniform `f64` in [0, 1), built from the upper 53 bits.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in `[low, high)` by rejection sampling (no modulo bias).
    ///
    /// Panics if `low >= high`.
    fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Uniform `usize` in `[low, high)`.
    fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Uniform `i32` in `[low, high]`, inclusive on both ends.
    ///
    /// Panics if `low > high`.
    fn range_i32_inclusive(&mut self, low: i32, high: i32) -> i32 {
        assert!(low <= high, "range_i32_inclusive: low must be <= high");
        let span = (high as i64 - low as i64) as u64 + 1;
        (low as i64 + self.range_u64(0, span) as i64) as i32
    }

    /// `true` with probability `p`. `p <= 0.0` never fires, `p >= 1.0` always does.
    fn random_bool(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick one element uniformly. `None` on an empty slice.
    fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.range_usize(0, items.len());
        items.get(idx)
    }

    /// In-place Fisher-Yates shuffle.
    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.range_usize(0, i + 1);
            items.swap(i, j);
        }
    }
}

/// Xoshiro256++ generator owned by a practice session.
///
/// The session seeds one of these at construction; the CLI seeds from the
/// clock unless `--seed` is given, tests always pass a fixed seed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PracticeRng {
    s: [u64; 4],
}

impl PracticeRng {
    /// Create a generator from a `u64` seed, expanded to 256 bits with
    /// SplitMix64. Equal seeds give equal streams.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }
}

impl RandomSource for PracticeRng {
    fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }
}

/// SplitMix64 step, used only for seeding.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
