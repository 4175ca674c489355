// Chord aggregation: turns discrete key presses into one chord submission.
//
// Multi-note rounds cannot be judged per key press; the player presses
// several keys in quick succession and the buffer decides when those presses
// form a chord. On every `submit(pitch, at_ms)`:
//   1. Entries older than the chord window (`at_ms - t > window`) are dropped.
//   2. The pitch is upserted: a re-press replaces the old timestamp.
//   3. The buffer is ordered by press time. If it holds at least `note_count`
//      entries, the most recent `note_count` are a complete chord when they
//      are distinct and their first-to-last span is within the window.
//
// A complete chord is returned in press order together with the time of the
// last press (used as the answer time). The buffer is not cleared on
// completion; the session clears it when the round resolves.
//
// Single-note rounds bypass this buffer entirely (see `session.rs`).
//
// Pitches are compared canonically, so `C#4` then `Db4` counts as a re-press
// of the same key rather than two notes.

use crate::pitch::Pitch;

/// A complete chord produced by the buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChordSubmission {
    /// Distinct pitches, oldest press first.
    pub notes: Vec<Pitch>,
    /// Timestamp of the most recent press in the chord.
    pub completed_at_ms: u64,
}

#[derive(Clone, Debug)]
pub struct ChordBuffer {
    entries: Vec<(Pitch, u64)>,
    window_ms: u64,
}

impl ChordBuffer {
    pub fn new(window_ms: u64) -> Self {
        Self {
            entries: Vec::new(),
            window_ms,
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Record a key press. Returns a submission once the latest `note_count`
    /// presses form a chord.
    pub fn submit(
        &mut self,
        pitch: Pitch,
        at_ms: u64,
        note_count: usize,
    ) -> Option<ChordSubmission> {
        let window = self.window_ms;
        self.entries.retain(|&(_, t)| at_ms.saturating_sub(t) <= window);

        match self.entries.iter_mut().find(|(p, _)| *p == pitch) {
            Some(entry) => entry.1 = at_ms,
            None => self.entries.push((pitch, at_ms)),
        }
        // Stable sort keeps insertion order among equal timestamps.
        self.entries.sort_by_key(|&(_, t)| t);

        if note_count == 0 || self.entries.len() < note_count {
            return None;
        }
        let recent = &self.entries[self.entries.len() - note_count..];
        let first = recent[0].1;
        let last = recent[recent.len() - 1].1;
        // Upsert keeps pitches unique, so the distinctness check reduces to
        // the length check above; only the span remains.
        if last - first > window {
            return None;
        }
        Some(ChordSubmission {
            notes: recent.iter().map(|&(p, _)| p).collect(),
            completed_at_ms: last,
        })
    }

    /// Pitches currently held in the buffer, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = Pitch> + '_ {
        self.entries.iter().map(|&(p, _)| p)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
