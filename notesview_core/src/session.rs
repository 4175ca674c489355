// Practice session state machine and its command/timer loop.
//
// `PracticeSession` owns everything one learner's practice needs: settings,
// the current round, running score and combo, the chord buffer, the memory
// curve, the persisted profile, the timer queue, and the PRNG. It is driven
// purely by `step(commands, target_ms)`, a function
// `(state, commands) -> (new state, events)`; there is no system clock and
// no hidden timer thread.
//
// ## Phases
//
//   Idle --StartPractice--> Active --verdict--> Resolved --delay--> Active ...
//     ^                                                              |
//     +---------------------------EndPractice------------------------+
//
// - Idle: no round. Difficulty may change. Notes are ignored.
// - Active: a round is on screen, its timeout armed, input accepted.
// - Resolved: a verdict was reached; the advance timer is pending and
//   further notes are ignored, so each round yields exactly one verdict.
//
// ## Round lifecycle
//
// `begin_round` asks the memory curve for due notes (limit = the tier's note
// count, filtered to the active clef and range) and passes them as focus
// notes to the generator, avoiding an exact repeat of the previous round.
// It arms `RoundTimeout` at `start + time limit`.
//
// Input while Active: single-note tiers judge each press immediately; chord
// tiers feed the `ChordBuffer` and judge once it reports a complete chord.
// The response time is measured from round start to the (last) press.
//
// `resolve` records the outcome in the memory curve (and saves it), applies
// the score delta (`calculate_score` on a correct answer, minus the wrong
// penalty otherwise), updates the combo and session tally, clears the chord
// buffer, refreshes the memory summary, enters Resolved, and arms
// `AdvanceRound` after the configured delay. A timeout resolves as wrong
// with the response time equal to the time limit.
//
// Timers carry the round serial that armed them; a timer whose round is no
// longer the live one is dropped. Start and end both clear the queue.
//
// ## Persistence
//
// Store failures never interrupt practice: they are logged and reported as
// `persisted: false` on the emitted event, and in-memory state carries on.
//
// See also: `command.rs` (inputs), `event.rs` (timers and outputs),
// `profile.rs` (what is persisted and how).

use crate::chord_input::ChordBuffer;
use crate::command::{PracticeAction, PracticeCommand};
use crate::config::{Clef, DifficultyId, RangeConfig, RangeMode, TrainerConfig};
use crate::error::StoreError;
use crate::event::{EventQueue, RoundOutcome, ScheduledEventKind, SessionEvent, SessionEventKind};
use crate::generator::{GeneratorOptions, generate_avoiding_repeat};
use crate::input::NoteInput;
use crate::judge::{OctaveMode, pitches_match};
use crate::memory::{MemoryCurve, MemorySummary};
use crate::pitch::{Pitch, SpelledNote};
use crate::profile::{self, HighScores, LifetimeStats, SessionTally};
use crate::scoring::{calculate_score, score_grade, wrong_penalty};
use crate::store::Store;
use notesview_prng::PracticeRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Learner-chosen options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub difficulty: DifficultyId,
    pub clef: Clef,
    pub range_mode: RangeMode,
    /// Judge by pitch class only.
    pub ignore_octave: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: DifficultyId::Beginner,
            clef: Clef::Treble,
            range_mode: RangeMode::Standard,
            ignore_octave: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Active,
    Resolved,
}

/// The question currently on screen.
#[derive(Clone, Debug, PartialEq)]
pub struct Round {
    /// Display counter; restarts at 1 after a history clear.
    pub id: u64,
    /// Never reused; timers refer to rounds by serial.
    serial: u64,
    pub notes: Vec<SpelledNote>,
    pub clef: Clef,
    pub started_at_ms: u64,
    pub time_limit_ms: u64,
}

impl Round {
    pub fn pitches(&self) -> Vec<Pitch> {
        self.notes.iter().map(|n| n.pitch).collect()
    }
}

/// The result of processing commands and advancing the session clock.
pub struct StepResult {
    pub events: Vec<SessionEvent>,
}

pub struct PracticeSession<S: Store> {
    now_ms: u64,
    rng: PracticeRng,
    config: TrainerConfig,
    store: S,
    settings: Settings,
    phase: Phase,
    round: Option<Round>,
    previous_targets: Vec<Pitch>,
    round_counter: u64,
    next_serial: u64,
    score: i64,
    combo: u32,
    tally: SessionTally,
    chord: ChordBuffer,
    memory: MemoryCurve,
    high_scores: HighScores,
    lifetime: LifetimeStats,
    summary: MemorySummary,
    last_result: Option<RoundOutcome>,
    event_queue: EventQueue,
}

impl<S: Store> PracticeSession<S> {
    /// Create an idle session, loading the profile from `store`.
    pub fn new(seed: u64, config: TrainerConfig, store: S, now_ms: u64) -> Self {
        let high_scores = profile::load_high_scores(&store);
        let lifetime = profile::load_lifetime_stats(&store);
        let memory = profile::load_memory(&store, config.review_intervals_ms.clone());
        let settings = Settings::default();
        let summary = memory.summary(Some(settings.clef), now_ms);
        let chord = ChordBuffer::new(config.chord_window_ms);
        debug!(entries = memory.len(), "profile loaded");

        Self {
            now_ms,
            rng: PracticeRng::new(seed),
            config,
            store,
            settings,
            phase: Phase::Idle,
            round: None,
            previous_targets: Vec::new(),
            round_counter: 0,
            next_serial: 0,
            score: 0,
            combo: 0,
            tally: SessionTally::default(),
            chord,
            memory,
            high_scores,
            lifetime,
            summary,
            last_result: None,
            event_queue: EventQueue::new(),
        }
    }

    /// Apply a batch of commands and advance the clock to `target_ms`,
    /// firing every timer due along the way.
    ///
    /// Commands must be sorted by time. Commands stamped after `target_ms`
    /// are ignored (caller error); commands stamped before the session clock
    /// apply at the current time.
    pub fn step(&mut self, commands: &[PracticeCommand], target_ms: u64) -> StepResult {
        let mut events = Vec::new();
        let mut cmd_idx = 0;

        loop {
            let next_timer = self.event_queue.peek_time().filter(|&t| t <= target_ms);
            let next_cmd = commands
                .get(cmd_idx)
                .filter(|c| c.time_ms <= target_ms)
                .map(|c| c.time_ms);

            let next = match (next_timer, next_cmd) {
                (Some(t), Some(c)) => t.min(c),
                (Some(t), None) | (None, Some(t)) => t,
                (None, None) => break,
            };
            self.now_ms = self.now_ms.max(next);

            // Commands first, then timers due at this instant.
            let now = self.now_ms;
            while let Some(cmd) = commands.get(cmd_idx).filter(|c| c.time_ms <= now) {
                cmd_idx += 1;
                self.apply_command(cmd, &mut events);
            }
            while let Some(timer) = self.event_queue.pop_if_ready(self.now_ms) {
                self.process_timer(timer.kind, &mut events);
            }
        }

        self.now_ms = self.now_ms.max(target_ms);
        StepResult { events }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// The live round, if practicing.
    pub fn current_round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    /// Rounds generated since the last history clear.
    pub fn round_counter(&self) -> u64 {
        self.round_counter
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn tally(&self) -> &SessionTally {
        &self.tally
    }

    /// Verdict of the most recent round, for correct/wrong feedback.
    pub fn last_result(&self) -> Option<RoundOutcome> {
        self.last_result
    }

    pub fn high_scores(&self) -> &HighScores {
        &self.high_scores
    }

    pub fn lifetime_stats(&self) -> &LifetimeStats {
        &self.lifetime
    }

    pub fn memory(&self) -> &MemoryCurve {
        &self.memory
    }

    pub fn memory_summary(&self) -> &MemorySummary {
        &self.summary
    }

    /// Time remaining on the active round's clock.
    pub fn time_left_ms(&self) -> Option<u64> {
        match (&self.round, self.phase) {
            (Some(round), Phase::Active) => {
                Some((round.started_at_ms + round.time_limit_ms).saturating_sub(self.now_ms))
            }
            _ => None,
        }
    }

    /// When the next timer fires; the caller should step by then.
    pub fn next_wakeup(&self) -> Option<u64> {
        self.event_queue.peek_time()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    fn apply_command(&mut self, cmd: &PracticeCommand, events: &mut Vec<SessionEvent>) {
        match &cmd.action {
            PracticeAction::SetDifficulty { difficulty } => {
                if self.phase != Phase::Idle {
                    self.reject("difficulty can only change while idle", events);
                    return;
                }
                self.settings.difficulty = *difficulty;
                self.settings_changed(events);
            }
            PracticeAction::SetClef { clef } => {
                self.settings.clef = *clef;
                if self.phase == Phase::Idle {
                    self.refresh_summary(*clef);
                }
                self.settings_changed(events);
            }
            PracticeAction::SetRangeMode { mode } => {
                self.settings.range_mode = *mode;
                self.settings_changed(events);
            }
            PracticeAction::SetIgnoreOctave { ignore } => {
                self.settings.ignore_octave = *ignore;
                self.settings_changed(events);
            }
            PracticeAction::StartPractice => self.start_practice(events),
            PracticeAction::Note { input } => self.handle_note(*input, events),
            PracticeAction::EndPractice => self.end_practice(events),
            PracticeAction::ClearHistory => self.clear_history(events),
        }
    }

    fn emit(&self, events: &mut Vec<SessionEvent>, kind: SessionEventKind) {
        events.push(SessionEvent {
            time_ms: self.now_ms,
            kind,
        });
    }

    fn reject(&self, reason: &str, events: &mut Vec<SessionEvent>) {
        debug!(reason, "command rejected");
        self.emit(
            events,
            SessionEventKind::CommandRejected {
                reason: reason.to_string(),
            },
        );
    }

    fn settings_changed(&self, events: &mut Vec<SessionEvent>) {
        self.emit(
            events,
            SessionEventKind::SettingsChanged {
                settings: self.settings,
            },
        );
    }

    fn start_practice(&mut self, events: &mut Vec<SessionEvent>) {
        self.event_queue.clear();
        self.chord.clear();
        self.score = 0;
        self.combo = 0;
        self.tally = SessionTally::default();
        self.last_result = None;
        self.refresh_summary(self.settings.clef);
        info!(
            difficulty = %self.settings.difficulty,
            clef = %self.settings.clef,
            "practice started"
        );
        self.begin_round(events);
    }

    fn handle_note(&mut self, input: NoteInput, events: &mut Vec<SessionEvent>) {
        if self.phase != Phase::Active {
            debug!(pitch = %input.pitch, "note outside an active round ignored");
            return;
        }
        let Some(round) = self.round.as_ref() else {
            return;
        };
        let note_count = round.notes.len();
        let started = round.started_at_ms;
        debug!(
            pitch = %input.pitch,
            source = ?input.source,
            velocity = input.velocity,
            "note input"
        );

        if note_count <= 1 {
            let response_ms = self.now_ms.saturating_sub(started);
            self.judge(vec![input.pitch], response_ms, events);
        } else if let Some(chord) = self.chord.submit(input.pitch, self.now_ms, note_count) {
            let response_ms = chord.completed_at_ms.saturating_sub(started);
            self.judge(chord.notes, response_ms, events);
        }
    }

    fn end_practice(&mut self, events: &mut Vec<SessionEvent>) {
        if self.phase == Phase::Idle {
            self.reject("no practice in progress", events);
            return;
        }
        self.event_queue.clear();
        self.chord.clear();
        self.round = None;
        self.phase = Phase::Idle;

        let difficulty = self.settings.difficulty;
        let high_score_improved = self.high_scores.offer(difficulty, self.score);
        let mut persisted = true;
        if high_score_improved {
            persisted &= stored(
                "high scores",
                profile::save_high_scores(&mut self.store, &self.high_scores),
            );
        }
        self.lifetime.merge_session(&self.tally, self.score);
        persisted &= stored(
            "lifetime stats",
            profile::save_lifetime_stats(&mut self.store, &self.lifetime),
        );
        self.refresh_summary(self.settings.clef);

        let grade = score_grade(self.score);
        info!(
            %difficulty,
            score = self.score,
            ?grade,
            rounds = self.tally.rounds,
            correct = self.tally.correct_rounds,
            high_score_improved,
            "practice ended"
        );
        self.emit(
            events,
            SessionEventKind::PracticeEnded {
                difficulty,
                score: self.score,
                grade,
                tally: self.tally.clone(),
                high_score_improved,
                lifetime: self.lifetime.clone(),
                persisted,
            },
        );
    }

    fn clear_history(&mut self, events: &mut Vec<SessionEvent>) {
        let persisted = stored("profile clear", profile::clear_profile(&mut self.store));
        self.high_scores = HighScores::default();
        self.lifetime = LifetimeStats::default();
        self.memory.clear();
        self.round_counter = 0;
        let clef = self.round.as_ref().map_or(self.settings.clef, |r| r.clef);
        self.refresh_summary(clef);
        info!(persisted, "practice history cleared");
        self.emit(events, SessionEventKind::HistoryCleared { persisted });
    }

    // -----------------------------------------------------------------------
    // Rounds
    // -----------------------------------------------------------------------

    fn process_timer(&mut self, kind: ScheduledEventKind, events: &mut Vec<SessionEvent>) {
        match kind {
            ScheduledEventKind::RoundTimeout { serial } => {
                if self.phase != Phase::Active {
                    return;
                }
                let Some(limit) = self
                    .round
                    .as_ref()
                    .filter(|r| r.serial == serial)
                    .map(|r| r.time_limit_ms)
                else {
                    return;
                };
                debug!(serial, "round timed out");
                self.resolve(RoundOutcome::Timeout, Vec::new(), limit, events);
            }
            ScheduledEventKind::AdvanceRound { serial } => {
                let live = self.phase == Phase::Resolved
                    && self.round.as_ref().is_some_and(|r| r.serial == serial);
                if live {
                    self.begin_round(events);
                }
            }
        }
    }

    /// Generate and publish the next round, then enter Active.
    fn begin_round(&mut self, events: &mut Vec<SessionEvent>) {
        let settings = self.settings;
        let range = self.config.range_for(settings.range_mode, settings.clef);
        let tier = self.config.tier(settings.difficulty);
        let focus = self.focus_notes(tier.note_count, settings.clef, &range);
        let opts =
            GeneratorOptions::from_range(&range).with_focus(&focus, self.config.focus_probability);
        let notes = generate_avoiding_repeat(
            tier,
            &opts,
            &self.previous_targets,
            self.config.repeat_avoidance_attempts,
            &mut self.rng,
        );
        // A zero limit would let timeouts re-arm at the same instant forever.
        let time_limit_ms = tier.time_limit_ms().max(1);

        self.round_counter += 1;
        self.next_serial += 1;
        let round = Round {
            id: self.round_counter,
            serial: self.next_serial,
            notes,
            clef: settings.clef,
            started_at_ms: self.now_ms,
            time_limit_ms,
        };
        self.previous_targets = round.pitches();
        self.chord.clear();
        self.event_queue.schedule(
            self.now_ms + time_limit_ms,
            ScheduledEventKind::RoundTimeout {
                serial: round.serial,
            },
        );
        debug!(
            round_id = round.id,
            notes = %format_notes(&round.notes),
            clef = %round.clef,
            focus = focus.len(),
            "round started"
        );
        self.emit(
            events,
            SessionEventKind::RoundStarted {
                round_id: round.id,
                notes: round.notes.clone(),
                clef: round.clef,
                time_limit_ms,
            },
        );
        self.round = Some(round);
        self.phase = Phase::Active;
    }

    /// Due notes for the clef, parsed and restricted to the range. Legacy or
    /// damaged keys that do not parse are skipped.
    fn focus_notes(&self, limit: usize, clef: Clef, range: &RangeConfig) -> Vec<Pitch> {
        self.memory
            .due_notes(usize::MAX, Some(clef), self.now_ms)
            .into_iter()
            .filter_map(|note| match note.parse::<Pitch>() {
                Ok(pitch) => Some(pitch),
                Err(e) => {
                    warn!(%note, error = %e, "skipping unparsable memory note");
                    None
                }
            })
            .filter(|pitch| range.contains(*pitch))
            .take(limit)
            .collect()
    }

    fn judge(&mut self, answer: Vec<Pitch>, response_ms: u64, events: &mut Vec<SessionEvent>) {
        let Some(round) = self.round.as_ref() else {
            return;
        };
        let mode = OctaveMode::from_ignore_octave(self.settings.ignore_octave);
        let outcome = if pitches_match(&round.pitches(), &answer, mode) {
            RoundOutcome::Correct
        } else {
            RoundOutcome::Wrong
        };
        self.resolve(outcome, answer, response_ms, events);
    }

    fn resolve(
        &mut self,
        outcome: RoundOutcome,
        answer: Vec<Pitch>,
        response_ms: u64,
        events: &mut Vec<SessionEvent>,
    ) {
        let Some(round) = self.round.as_ref() else {
            return;
        };
        let (round_id, serial, clef, time_limit_ms) =
            (round.id, round.serial, round.clef, round.time_limit_ms);
        let targets = round.pitches();
        let correct = outcome.is_correct();

        self.memory.record(&targets, correct, clef, self.now_ms);
        let persisted = stored(
            "memory curve",
            profile::save_memory(&mut self.store, &self.memory),
        );

        let base_score = self.config.tier(self.settings.difficulty).base_score;
        let score_delta = if correct {
            calculate_score(response_ms, time_limit_ms, true, self.combo, base_score)
        } else {
            -wrong_penalty(base_score, self.config.wrong_penalty_ratio)
        };
        self.combo = if correct { self.combo + 1 } else { 0 };
        self.score += score_delta;
        self.tally.record(correct, response_ms, self.combo);
        self.last_result = Some(outcome);

        self.chord.clear();
        self.phase = Phase::Resolved;
        self.summary = self.memory.summary(Some(clef), self.now_ms);
        self.event_queue.schedule(
            self.now_ms + self.config.advance_delay_ms,
            ScheduledEventKind::AdvanceRound { serial },
        );

        debug!(
            round_id,
            ?outcome,
            response_ms,
            score_delta,
            score = self.score,
            combo = self.combo,
            "round resolved"
        );
        self.emit(
            events,
            SessionEventKind::RoundResolved {
                round_id,
                outcome,
                answer,
                response_ms,
                score_delta,
                score: self.score,
                combo: self.combo,
                persisted,
            },
        );
    }

    fn refresh_summary(&mut self, clef: Clef) {
        self.summary = self.memory.summary(Some(clef), self.now_ms);
    }
}

/// Log a store failure; true when the write went through.
fn stored(what: &str, result: Result<(), StoreError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(what, error = %e, "failed to persist profile data");
            false
        }
    }
}

/// Space-separated display form, e.g. `"C4 Eb4 G4"`.
pub fn format_notes(notes: &[SpelledNote]) -> String {
    notes
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputSource;
    use crate::store::MemoryStore;
    use serde_json::Value;

    /// Reads nothing, refuses every write.
    struct ReadOnlyStore;

    impl Store for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<Value>, StoreError> {
            Ok(None)
        }

        fn set(&mut self, key: &str, _value: Value) -> Result<(), StoreError> {
            Err(StoreError::Unavailable(format!("read-only store, key {key}")))
        }

        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable(format!("read-only store, key {key}")))
        }
    }

    fn at(time_ms: u64, action: PracticeAction) -> PracticeCommand {
        PracticeCommand::new(time_ms, action)
    }

    fn press(pitch: Pitch) -> PracticeAction {
        PracticeAction::Note {
            input: NoteInput::new(pitch, InputSource::VirtualPiano),
        }
    }

    fn target<S: Store>(session: &PracticeSession<S>) -> Pitch {
        session.current_round().unwrap().pitches()[0]
    }

    fn resolved(events: &[SessionEvent]) -> Vec<(RoundOutcome, i64)> {
        events
            .iter()
            .filter_map(|e| match &e.kind {
                SessionEventKind::RoundResolved {
                    outcome,
                    score_delta,
                    ..
                } => Some((*outcome, *score_delta)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn new_session_is_idle() {
        let s = PracticeSession::new(1, TrainerConfig::default(), MemoryStore::new(), 0);
        assert_eq!(s.phase(), Phase::Idle);
        assert!(s.current_round().is_none());
        assert_eq!(s.next_wakeup(), None);
        assert_eq!(s.settings(), Settings::default());
        assert!(s.settings().ignore_octave);
    }

    #[test]
    fn start_arms_timeout_for_tier_limit() {
        let mut s = PracticeSession::new(1, TrainerConfig::default(), MemoryStore::new(), 0);
        let r = s.step(&[at(500, PracticeAction::StartPractice)], 500);
        assert_eq!(s.phase(), Phase::Active);
        assert_eq!(s.next_wakeup(), Some(12_500));
        assert_eq!(s.time_left_ms(), Some(12_000));
        assert!(matches!(
            r.events[0].kind,
            SessionEventKind::RoundStarted {
                round_id: 1,
                time_limit_ms: 12_000,
                ..
            }
        ));
    }

    #[test]
    fn notes_while_resolved_are_ignored() {
        let mut s = PracticeSession::new(2, TrainerConfig::default(), MemoryStore::new(), 0);
        s.step(&[at(0, PracticeAction::StartPractice)], 0);
        let t = target(&s);
        let r = s.step(&[at(100, press(t)), at(200, press(t)), at(300, press(t))], 300);
        assert_eq!(resolved(&r.events).len(), 1);
        assert_eq!(s.phase(), Phase::Resolved);
        assert_eq!(s.combo(), 1);
    }

    #[test]
    fn stale_timeout_of_answered_round_is_dropped() {
        let mut s = PracticeSession::new(3, TrainerConfig::default(), MemoryStore::new(), 0);
        s.step(&[at(0, PracticeAction::StartPractice)], 0);
        let t = target(&s);
        // Round 1 answered at 100; its timeout (12_000) stays queued.
        s.step(&[at(100, press(t))], 100);
        // Round 2 starts at 600, times out at 12_600.
        let r = s.step(&[], 12_000);
        assert!(resolved(&r.events).is_empty());
        assert_eq!(s.current_round().unwrap().id, 2);
        let r = s.step(&[], 12_600);
        assert_eq!(resolved(&r.events), vec![(RoundOutcome::Timeout, -50)]);
    }

    #[test]
    fn difficulty_locked_while_practicing() {
        let mut s = PracticeSession::new(4, TrainerConfig::default(), MemoryStore::new(), 0);
        s.step(&[at(0, PracticeAction::StartPractice)], 0);
        let r = s.step(
            &[at(
                10,
                PracticeAction::SetDifficulty {
                    difficulty: DifficultyId::Master,
                },
            )],
            10,
        );
        assert!(matches!(
            r.events[0].kind,
            SessionEventKind::CommandRejected { .. }
        ));
        assert_eq!(s.settings().difficulty, DifficultyId::Beginner);
    }

    #[test]
    fn clef_change_applies_to_next_round() {
        let mut s = PracticeSession::new(5, TrainerConfig::default(), MemoryStore::new(), 0);
        s.step(&[at(0, PracticeAction::StartPractice)], 0);
        let t = target(&s);
        s.step(
            &[
                at(10, PracticeAction::SetClef { clef: Clef::Bass }),
                at(20, press(t)),
            ],
            20,
        );
        assert_eq!(s.current_round().unwrap().clef, Clef::Treble);
        s.step(&[], 520);
        let round = s.current_round().unwrap();
        assert_eq!(round.clef, Clef::Bass);
        let bass = TrainerConfig::default().range_for(RangeMode::Standard, Clef::Bass);
        assert!(bass.contains(round.pitches()[0]));
    }

    #[test]
    fn store_failures_are_reported_not_fatal() {
        let mut s = PracticeSession::new(6, TrainerConfig::default(), ReadOnlyStore, 0);
        s.step(&[at(0, PracticeAction::StartPractice)], 0);
        let t = target(&s);
        let r = s.step(&[at(0, press(t))], 0);
        match &r.events[0].kind {
            SessionEventKind::RoundResolved {
                persisted, score, ..
            } => {
                assert!(!persisted);
                assert_eq!(*score, 200);
            }
            other => panic!("unexpected event {other:?}"),
        }
        let r = s.step(&[at(100, PracticeAction::EndPractice)], 100);
        match &r.events[0].kind {
            SessionEventKind::PracticeEnded {
                persisted,
                high_score_improved,
                ..
            } => {
                assert!(!persisted);
                assert!(high_score_improved);
            }
            other => panic!("unexpected event {other:?}"),
        }
        // In-memory state still moved on.
        assert_eq!(s.high_scores().get(DifficultyId::Beginner), 200);
        let r = s.step(&[at(200, PracticeAction::ClearHistory)], 200);
        assert_eq!(
            r.events[0].kind,
            SessionEventKind::HistoryCleared { persisted: false }
        );
    }

    #[test]
    fn end_while_idle_is_rejected() {
        let mut s = PracticeSession::new(7, TrainerConfig::default(), MemoryStore::new(), 0);
        let r = s.step(&[at(0, PracticeAction::EndPractice)], 0);
        assert!(matches!(
            r.events[0].kind,
            SessionEventKind::CommandRejected { .. }
        ));
        assert_eq!(s.lifetime_stats().total_games, 0);
    }

    #[test]
    fn late_commands_apply_at_current_time() {
        let mut s = PracticeSession::new(8, TrainerConfig::default(), MemoryStore::new(), 1_000);
        let r = s.step(&[at(10, PracticeAction::StartPractice)], 1_000);
        assert_eq!(r.events[0].time_ms, 1_000);
        assert_eq!(s.current_round().unwrap().started_at_ms, 1_000);
    }

    #[test]
    fn future_commands_are_not_applied() {
        let mut s = PracticeSession::new(9, TrainerConfig::default(), MemoryStore::new(), 0);
        let r = s.step(&[at(5_000, PracticeAction::StartPractice)], 1_000);
        assert!(r.events.is_empty());
        assert_eq!(s.now_ms(), 1_000);
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn same_seed_same_rounds() {
        let run = || {
            let mut s = PracticeSession::new(77, TrainerConfig::default(), MemoryStore::new(), 0);
            let mut seen = Vec::new();
            s.step(&[at(0, PracticeAction::StartPractice)], 0);
            for i in 0..20u64 {
                seen.push(s.current_round().unwrap().notes.clone());
                // Let every round time out; timeouts are at 12s, advances 0.5s later.
                s.step(&[], (i + 1) * 12_500);
            }
            seen
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn format_notes_joins_display_names() {
        let notes = [
            SpelledNote::canonical("C4".parse().unwrap()),
            SpelledNote::flat("D#4".parse().unwrap()),
        ];
        assert_eq!(format_notes(&notes), "C4 Eb4");
    }
}
