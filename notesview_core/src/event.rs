// Session events: the internal timer queue and the observable output stream.
//
// The session is event-driven on a single millisecond timeline. Timers
// (round timeout, advance to the next round) are entries in a priority queue
// ordered by `(at_ms, sequence)`; `PracticeSession::step` pops them in order
// interleaved with incoming commands. Nothing waits or sleeps inside the
// engine.
//
// This file defines two related but distinct concepts:
// - `ScheduledEvent`: internal timers in the priority queue.
// - `SessionEvent`: what happened, emitted as output for the front end
//   (render the new round, flash correct/wrong, show the final score).
//
// Timers carry the serial of the round that armed them. A timer whose round
// has since been resolved or replaced is ignored when it fires, and
// `StartPractice` / `EndPractice` clear the queue outright.
//
// See also: `session.rs` for the loop that consumes both.
//
// **Critical constraint: determinism.** Two timers at the same millisecond
// fire in scheduling order; the `(at_ms, sequence)` key is a total order.

use crate::config::{Clef, DifficultyId};
use crate::pitch::{Pitch, SpelledNote};
use crate::profile::{LifetimeStats, SessionTally};
use crate::scoring::Grade;
use crate::session::Settings;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

// ---------------------------------------------------------------------------
// Internal scheduled events (priority queue)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub at_ms: u64,
    /// Tiebreak within one millisecond; lower fires first.
    pub sequence: u64,
    pub kind: ScheduledEventKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduledEventKind {
    /// The round's time limit ran out.
    RoundTimeout { serial: u64 },
    /// The post-verdict pause is over; generate the next round.
    AdvanceRound { serial: u64 },
}

// Min-heap on (at_ms, sequence): BinaryHeap is a max-heap, so reverse.
impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.at_ms == other.at_ms && self.sequence == other.sequence
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at_ms
            .cmp(&self.at_ms)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
    next_sequence: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at_ms: u64, kind: ScheduledEventKind) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(ScheduledEvent {
            at_ms,
            sequence,
            kind,
        });
    }

    /// Time of the earliest pending timer.
    pub fn peek_time(&self) -> Option<u64> {
        self.heap.peek().map(|e| e.at_ms)
    }

    /// Pop the earliest timer if it is due at or before `now_ms`.
    pub fn pop_if_ready(&mut self, now_ms: u64) -> Option<ScheduledEvent> {
        if self.heap.peek().is_some_and(|e| e.at_ms <= now_ms) {
            self.heap.pop()
        } else {
            None
        }
    }

    /// Drop every pending timer.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Observable events (output)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub time_ms: u64,
    pub kind: SessionEventKind,
}

/// How a round ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    Correct,
    Wrong,
    Timeout,
}

impl RoundOutcome {
    pub fn is_correct(self) -> bool {
        self == RoundOutcome::Correct
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SessionEventKind {
    /// A new round is on screen.
    RoundStarted {
        round_id: u64,
        notes: Vec<SpelledNote>,
        clef: Clef,
        time_limit_ms: u64,
    },
    /// A verdict was reached. `persisted` is false when the memory curve
    /// could not be saved.
    RoundResolved {
        round_id: u64,
        outcome: RoundOutcome,
        /// The notes submitted; empty on timeout.
        answer: Vec<Pitch>,
        response_ms: u64,
        score_delta: i64,
        score: i64,
        combo: u32,
        persisted: bool,
    },
    PracticeEnded {
        difficulty: DifficultyId,
        score: i64,
        grade: Grade,
        tally: SessionTally,
        high_score_improved: bool,
        lifetime: LifetimeStats,
        persisted: bool,
    },
    HistoryCleared {
        persisted: bool,
    },
    SettingsChanged {
        settings: Settings,
    },
    /// A command that is not valid in the current phase.
    CommandRejected {
        reason: String,
    },
}
