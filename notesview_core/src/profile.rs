// Persisted learner profile: high scores, lifetime stats, memory curve.
//
// Everything here is keyed into a `Store` under three fixed keys. Field
// names on disk are camelCase to stay readable by older profiles.
//
// Loading is forgiving: a missing key yields the default record, and a
// stored value that fails to read or deserialize is logged and replaced by
// the default, so a damaged profile never blocks practice. Saving returns
// `Result<(), StoreError>`; the session logs failures and reports them as
// `persisted: false` instead of aborting.
//
// `LifetimeStats::merge_session` is the end-of-session merge: counters add,
// the average response time is re-weighted by note count, and the best
// combo is kept.

use crate::config::DifficultyId;
use crate::error::StoreError;
use crate::memory::{MemoryCurve, MemoryEntry};
use crate::store::Store;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

pub const HIGH_SCORES_KEY: &str = "notesview_high_scores";
pub const USER_STATS_KEY: &str = "notesview_user_stats";
pub const MEMORY_CURVE_KEY: &str = "notesview_memory_curve";

/// Keys wiped by a history clear.
pub const PROFILE_KEYS: [&str; 3] = [HIGH_SCORES_KEY, USER_STATS_KEY, MEMORY_CURVE_KEY];

// ---------------------------------------------------------------------------
// High scores
// ---------------------------------------------------------------------------

/// Best session score per difficulty tier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighScores(BTreeMap<DifficultyId, i64>);

impl HighScores {
    /// Stored best for a tier; 0 when none recorded.
    pub fn get(&self, id: DifficultyId) -> i64 {
        self.0.get(&id).copied().unwrap_or(0)
    }

    /// Record `score` if it beats the stored best. Returns whether it did.
    pub fn offer(&mut self, id: DifficultyId, score: i64) -> bool {
        if score > self.get(id) {
            self.0.insert(id, score);
            true
        } else {
            false
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (DifficultyId, i64)> + '_ {
        self.0.iter().map(|(id, score)| (*id, *score))
    }
}

// ---------------------------------------------------------------------------
// Session tally and lifetime stats
// ---------------------------------------------------------------------------

/// Counters for the session in progress.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTally {
    pub rounds: u64,
    pub correct_rounds: u64,
    pub best_combo: u32,
    pub total_response_ms: u64,
}

impl SessionTally {
    pub fn record(&mut self, correct: bool, response_ms: u64, combo_after: u32) {
        self.rounds += 1;
        if correct {
            self.correct_rounds += 1;
        }
        self.best_combo = self.best_combo.max(combo_after);
        self.total_response_ms += response_ms;
    }

    /// Mean response time per round; 0 with no rounds.
    pub fn average_response_ms(&self) -> f64 {
        if self.rounds == 0 {
            0.0
        } else {
            self.total_response_ms as f64 / self.rounds as f64
        }
    }

    /// Fraction of rounds answered correctly; 0 with no rounds.
    pub fn accuracy(&self) -> f64 {
        if self.rounds == 0 {
            0.0
        } else {
            self.correct_rounds as f64 / self.rounds as f64
        }
    }
}

/// Cumulative totals across all sessions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LifetimeStats {
    pub total_games: u64,
    pub total_score: i64,
    pub correct_notes: u64,
    pub total_notes: u64,
    /// Weighted mean response time in milliseconds.
    pub average_time: f64,
    pub highest_combo: u32,
}

impl LifetimeStats {
    /// Fold one finished session into the totals.
    pub fn merge_session(&mut self, tally: &SessionTally, session_score: i64) {
        let combined = self.total_notes + tally.rounds;
        let accumulated = self.average_time * self.total_notes as f64
            + tally.average_response_ms() * tally.rounds as f64;
        self.average_time = if combined > 0 {
            accumulated / combined as f64
        } else {
            0.0
        };
        self.total_games += 1;
        self.total_score += session_score;
        self.correct_notes += tally.correct_rounds;
        self.total_notes = combined;
        self.highest_combo = self.highest_combo.max(tally.best_combo);
    }

    pub fn accuracy(&self) -> f64 {
        if self.total_notes == 0 {
            0.0
        } else {
            self.correct_notes as f64 / self.total_notes as f64
        }
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

fn load_or_default<T: DeserializeOwned + Default>(store: &dyn Store, key: &str) -> T {
    let value = match store.get(key) {
        Ok(Some(value)) => value,
        Ok(None) => return T::default(),
        Err(e) => {
            warn!(key, error = %e, "failed to read profile value, using default");
            return T::default();
        }
    };
    match serde_json::from_value(value) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(key, error = %e, "malformed profile value, using default");
            T::default()
        }
    }
}

fn save<T: Serialize>(store: &mut dyn Store, key: &str, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_value(value).map_err(|source| StoreError::Serialize {
        key: key.to_string(),
        source,
    })?;
    store.set(key, json)
}

pub fn load_high_scores(store: &dyn Store) -> HighScores {
    load_or_default(store, HIGH_SCORES_KEY)
}

pub fn save_high_scores(store: &mut dyn Store, scores: &HighScores) -> Result<(), StoreError> {
    save(store, HIGH_SCORES_KEY, scores)
}

pub fn load_lifetime_stats(store: &dyn Store) -> LifetimeStats {
    load_or_default(store, USER_STATS_KEY)
}

pub fn save_lifetime_stats(store: &mut dyn Store, stats: &LifetimeStats) -> Result<(), StoreError> {
    save(store, USER_STATS_KEY, stats)
}

/// Load the memory map. Individual malformed entries are skipped rather than
/// discarding the whole map.
pub fn load_memory(store: &dyn Store, intervals_ms: Vec<u64>) -> MemoryCurve {
    let raw: BTreeMap<String, serde_json::Value> = load_or_default(store, MEMORY_CURVE_KEY);
    let mut entries = BTreeMap::new();
    for (key, value) in raw {
        match serde_json::from_value::<MemoryEntry>(value) {
            Ok(entry) => {
                entries.insert(key, entry);
            }
            Err(e) => warn!(key = %key, error = %e, "skipping malformed memory entry"),
        }
    }
    MemoryCurve::from_entries(entries, intervals_ms)
}

pub fn save_memory(store: &mut dyn Store, memory: &MemoryCurve) -> Result<(), StoreError> {
    save(store, MEMORY_CURVE_KEY, memory.entries())
}

/// Remove every profile key. Attempts all keys and returns the first error.
pub fn clear_profile(store: &mut dyn Store) -> Result<(), StoreError> {
    let mut first_err = None;
    for key in PROFILE_KEYS {
        if let Err(e) = store.remove(key) {
            warn!(key, error = %e, "failed to remove profile key");
            first_err = first_err.or(Some(e));
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Clef;
    use crate::pitch::Pitch;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn high_score_only_improves() {
        let mut scores = HighScores::default();
        assert_eq!(scores.get(DifficultyId::Beginner), 0);
        assert!(!scores.offer(DifficultyId::Beginner, 0));
        assert!(!scores.offer(DifficultyId::Beginner, -50));
        assert!(scores.offer(DifficultyId::Beginner, 400));
        assert!(!scores.offer(DifficultyId::Beginner, 300));
        assert!(scores.offer(DifficultyId::Beginner, 401));
        assert_eq!(scores.get(DifficultyId::Beginner), 401);
        assert_eq!(scores.get(DifficultyId::Master), 0);
    }

    #[test]
    fn high_scores_serialize_as_plain_map() {
        let mut scores = HighScores::default();
        scores.offer(DifficultyId::Advanced, 1200);
        assert_eq!(serde_json::to_value(&scores).unwrap(), json!({"advanced": 1200}));
    }

    #[test]
    fn merge_weights_average_by_note_count() {
        let mut stats = LifetimeStats {
            total_games: 1,
            total_score: 500,
            correct_notes: 8,
            total_notes: 10,
            average_time: 2_000.0,
            highest_combo: 6,
        };
        let tally = SessionTally {
            rounds: 30,
            correct_rounds: 20,
            best_combo: 4,
            total_response_ms: 30 * 1_000,
        };
        stats.merge_session(&tally, 900);
        assert_eq!(stats.total_games, 2);
        assert_eq!(stats.total_score, 1_400);
        assert_eq!(stats.correct_notes, 28);
        assert_eq!(stats.total_notes, 40);
        // (2000*10 + 1000*30) / 40
        assert!((stats.average_time - 1_250.0).abs() < 1e-9);
        assert_eq!(stats.highest_combo, 6);
    }

    #[test]
    fn merging_empty_session_counts_a_game() {
        let mut stats = LifetimeStats::default();
        stats.merge_session(&SessionTally::default(), 0);
        assert_eq!(stats.total_games, 1);
        assert_eq!(stats.average_time, 0.0);
    }

    #[test]
    fn tally_derived_values() {
        let mut tally = SessionTally::default();
        tally.record(true, 1_000, 1);
        tally.record(true, 3_000, 2);
        tally.record(false, 2_000, 0);
        assert_eq!(tally.rounds, 3);
        assert_eq!(tally.best_combo, 2);
        assert!((tally.average_response_ms() - 2_000.0).abs() < 1e-9);
        assert!((tally.accuracy() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn profile_roundtrip_through_store() {
        let mut store = MemoryStore::new();
        let mut scores = HighScores::default();
        scores.offer(DifficultyId::Master, 3_000);
        save_high_scores(&mut store, &scores).unwrap();
        assert_eq!(load_high_scores(&store), scores);

        let stats = LifetimeStats {
            total_games: 4,
            ..Default::default()
        };
        save_lifetime_stats(&mut store, &stats).unwrap();
        assert_eq!(load_lifetime_stats(&store), stats);

        let mut memory = MemoryCurve::new(vec![60_000]);
        memory.record(&["A4".parse::<Pitch>().unwrap()], false, Clef::Treble, 5);
        save_memory(&mut store, &memory).unwrap();
        assert_eq!(load_memory(&store, vec![60_000]), memory);
    }

    #[test]
    fn partial_stats_fill_in_defaults() {
        let mut store = MemoryStore::new();
        store.set(USER_STATS_KEY, json!({"totalGames": 7, "highestCombo": 12})).unwrap();
        let stats = load_lifetime_stats(&store);
        assert_eq!(stats.total_games, 7);
        assert_eq!(stats.highest_combo, 12);
        assert_eq!(stats.total_notes, 0);
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let mut store = MemoryStore::new();
        store.set(HIGH_SCORES_KEY, json!("not a map")).unwrap();
        store.set(USER_STATS_KEY, json!([1, 2, 3])).unwrap();
        assert_eq!(load_high_scores(&store), HighScores::default());
        assert_eq!(load_lifetime_stats(&store), LifetimeStats::default());
    }

    #[test]
    fn malformed_memory_entries_are_skipped() {
        let mut store = MemoryStore::new();
        store
            .set(
                MEMORY_CURVE_KEY,
                json!({
                    "C4@treble": {
                        "correct": 1,
                        "wrong": 2,
                        "stage": 0,
                        "nextDue": 10,
                        "lastReviewed": 5
                    },
                    "D4": {"wrong": 1},
                    "E4@bass": "garbage"
                }),
            )
            .unwrap();
        let memory = load_memory(&store, vec![60_000]);
        assert_eq!(memory.len(), 2);
        assert!(memory.entries().contains_key("C4@treble"));
        assert_eq!(memory.entries()["D4"].next_due, None);
    }

    #[test]
    fn clear_removes_all_keys() {
        let mut store = MemoryStore::new();
        for key in PROFILE_KEYS {
            store.set(key, json!({})).unwrap();
        }
        store.set("unrelated", json!(1)).unwrap();
        clear_profile(&mut store).unwrap();
        assert_eq!(store.len(), 1);
    }
}
