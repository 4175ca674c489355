// Spaced-repetition scheduler: per (note, clef) review state.
//
// Each entry is keyed `"<note>@<clef>"` (e.g. `"C#4@treble"`). Keys written
// by this crate always use the canonical note spelling, so `Db4` and `C#4`
// share one entry. Keys without an `@` are legacy entries from before
// clef tracking; they match every clef filter and are never rewritten.
//
// Stage machine, with N = number of review intervals:
// - correct: `stage = min(stage + 1, N - 1)`, `next_due = now + interval[stage]`
// - wrong:   `stage = 0`,                   `next_due = now + interval[0]`
// `correct` / `wrong` counters increment on every attempt and never reset.
//
// Queries:
// - `due_notes(limit, clef, now)`: entries with `next_due <= now` (a missing
//   `next_due` counts as due), ordered by `next_due` ascending then `wrong`
//   descending, truncated to `limit`. When nothing is due, falls back to the
//   `limit` entries with the highest wrong counts. Returns bare note strings.
// - `summary(clef, now)`: the full due list plus every entry with `wrong > 0`
//   ordered by success rate ascending then `wrong` descending.
//
// The map is a `BTreeMap` so iteration (and therefore tie order in the
// queries above) is deterministic. Persistence lives in `profile.rs`; the
// on-disk field names match the legacy camelCase layout.

use crate::config::Clef;
use crate::pitch::Pitch;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Review state for one (note, clef) pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryEntry {
    pub correct: u32,
    pub wrong: u32,
    pub stage: usize,
    /// Absent in some legacy records; treated as already due.
    pub next_due: Option<u64>,
    pub last_reviewed: u64,
}

impl MemoryEntry {
    /// Fraction of attempts answered correctly; 0 with no attempts.
    pub fn success_rate(&self) -> f64 {
        let total = u64::from(self.correct) + u64::from(self.wrong);
        if total == 0 {
            0.0
        } else {
            self.correct as f64 / total as f64
        }
    }

    fn is_due(&self, now_ms: u64) -> bool {
        self.next_due.is_none_or(|due| due <= now_ms)
    }
}

/// Split a memory key into its note part and optional clef tag. A tag that
/// names no known clef matches only the unfiltered queries.
pub fn parse_memory_key(key: &str) -> (&str, Option<&str>) {
    match key.split_once('@') {
        Some((note, clef)) => (note, Some(clef)),
        None => (key, None),
    }
}

pub fn memory_key(pitch: Pitch, clef: Clef) -> String {
    format!("{pitch}@{clef}")
}

/// One row of a `MemorySummary`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryReport {
    pub note: String,
    /// `None` for legacy entries.
    pub clef: Option<String>,
    pub correct: u32,
    pub wrong: u32,
    pub stage: usize,
    pub next_due: Option<u64>,
    pub success_rate: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySummary {
    pub due: Vec<MemoryReport>,
    pub challenging: Vec<MemoryReport>,
}

/// The full review map plus the interval table that drives it.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryCurve {
    entries: BTreeMap<String, MemoryEntry>,
    intervals_ms: Vec<u64>,
}

impl MemoryCurve {
    /// An empty curve. `intervals_ms` must be non-empty (enforced by
    /// `TrainerConfig::validate`); an empty table schedules everything as
    /// immediately due.
    pub fn new(intervals_ms: Vec<u64>) -> Self {
        Self::from_entries(BTreeMap::new(), intervals_ms)
    }

    pub fn from_entries(entries: BTreeMap<String, MemoryEntry>, intervals_ms: Vec<u64>) -> Self {
        Self {
            entries,
            intervals_ms,
        }
    }

    pub fn entries(&self) -> &BTreeMap<String, MemoryEntry> {
        &self.entries
    }

    pub fn get(&self, pitch: Pitch, clef: Clef) -> Option<&MemoryEntry> {
        self.entries.get(&memory_key(pitch, clef))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn max_stage(&self) -> usize {
        self.intervals_ms.len().saturating_sub(1)
    }

    fn interval(&self, stage: usize) -> u64 {
        self.intervals_ms.get(stage).copied().unwrap_or(0)
    }

    /// Record one attempt at a round. Every distinct note in `notes` gets the
    /// same verdict; duplicates within one round count once.
    pub fn record(&mut self, notes: &[Pitch], correct: bool, clef: Clef, now_ms: u64) {
        let unique: BTreeSet<Pitch> = notes.iter().copied().collect();
        let max_stage = self.max_stage();
        for pitch in unique {
            let key = memory_key(pitch, clef);
            let mut entry = self.entries.remove(&key).unwrap_or_else(|| MemoryEntry {
                next_due: Some(now_ms),
                ..MemoryEntry::default()
            });
            // Counts come from stored profiles and may sit at the type limit.
            if correct {
                entry.correct = entry.correct.saturating_add(1);
                entry.stage = entry.stage.saturating_add(1).min(max_stage);
            } else {
                entry.wrong = entry.wrong.saturating_add(1);
                entry.stage = 0;
            }
            entry.next_due = Some(now_ms.saturating_add(self.interval(entry.stage)));
            entry.last_reviewed = now_ms;
            self.entries.insert(key, entry);
        }
    }

    /// Entries matching `clef` (all entries when `None`). Legacy untagged
    /// entries match every clef.
    fn filtered(&self, clef: Option<Clef>) -> impl Iterator<Item = (&str, &MemoryEntry)> {
        self.entries.iter().filter_map(move |(key, entry)| {
            let (_, tag) = parse_memory_key(key);
            let keep = match (clef, tag) {
                (None, _) | (_, None) => true,
                (Some(c), Some(t)) => c.as_str() == t,
            };
            keep.then_some((key.as_str(), entry))
        })
    }

    fn due_sorted(&self, clef: Option<Clef>, now_ms: u64) -> Vec<(&str, &MemoryEntry)> {
        let mut due: Vec<_> = self
            .filtered(clef)
            .filter(|(_, e)| e.is_due(now_ms))
            .collect();
        due.sort_by(|(_, a), (_, b)| {
            a.next_due
                .unwrap_or(0)
                .cmp(&b.next_due.unwrap_or(0))
                .then_with(|| b.wrong.cmp(&a.wrong))
        });
        due
    }

    /// Notes to prioritize next, as bare note strings.
    pub fn due_notes(&self, limit: usize, clef: Option<Clef>, now_ms: u64) -> Vec<String> {
        let due = self.due_sorted(clef, now_ms);
        let picked = if due.is_empty() {
            let mut troubled: Vec<_> = self
                .filtered(clef)
                .filter(|(_, e)| e.wrong > 0)
                .collect();
            troubled.sort_by(|(_, a), (_, b)| b.wrong.cmp(&a.wrong));
            troubled
        } else {
            due
        };
        picked
            .into_iter()
            .take(limit)
            .map(|(key, _)| parse_memory_key(key).0.to_string())
            .collect()
    }

    pub fn summary(&self, clef: Option<Clef>, now_ms: u64) -> MemorySummary {
        let due = self
            .due_sorted(clef, now_ms)
            .into_iter()
            .map(|(key, e)| report(key, e))
            .collect();

        let mut challenging: Vec<_> = self
            .filtered(clef)
            .filter(|(_, e)| e.wrong > 0)
            .collect();
        challenging.sort_by(|(_, a), (_, b)| {
            compare_success_rate(a, b).then_with(|| b.wrong.cmp(&a.wrong))
        });
        let challenging = challenging.into_iter().map(|(key, e)| report(key, e)).collect();

        MemorySummary { due, challenging }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Exact comparison of `correct / (correct + wrong)` by cross-multiplication.
/// Entries with no attempts rank as rate 0.
fn compare_success_rate(a: &MemoryEntry, b: &MemoryEntry) -> Ordering {
    let ta = u128::from(a.correct) + u128::from(a.wrong);
    let tb = u128::from(b.correct) + u128::from(b.wrong);
    match (ta, tb) {
        (0, 0) => Ordering::Equal,
        (0, _) => 0.cmp(&b.correct),
        (_, 0) => a.correct.cmp(&0),
        _ => (u128::from(a.correct) * tb).cmp(&(u128::from(b.correct) * ta)),
    }
}

fn report(key: &str, entry: &MemoryEntry) -> MemoryReport {
    let (note, clef) = parse_memory_key(key);
    MemoryReport {
        note: note.to_string(),
        clef: clef.map(str::to_string),
        correct: entry.correct,
        wrong: entry.wrong,
        stage: entry.stage,
        next_due: entry.next_due,
        success_rate: entry.success_rate(),
    }
}
