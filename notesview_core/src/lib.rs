// notesview_core - music-notation practice engine.
//
// This crate contains everything a sight-reading trainer needs below the
// rendering layer: the pitch model, difficulty and range configuration,
// question generation, chord input aggregation, judging and scoring, the
// spaced-repetition memory curve, profile persistence, and the practice
// session state machine that ties them together. It draws nothing and reads
// no clock; front ends (the `notesview` CLI, or a GUI) feed it commands and
// render the events it emits.
//
// Module overview:
// - `pitch.rs`:       PitchClass, Pitch, enharmonic spelling, note-name parsing.
// - `config.rs`:      TrainerConfig: difficulty tiers, clef ranges, timings.
// - `generator.rs`:   Random questions (single notes, intervals, triads, sevenths).
// - `chord_input.rs`: ChordBuffer, groups near-simultaneous presses into a chord.
// - `judge.rs`:       Correctness check, exact or octave-insensitive.
// - `scoring.rs`:     Round score, wrong penalty, grades, achievements.
// - `memory.rs`:      MemoryCurve, per-note spaced-repetition scheduling.
// - `store.rs`:       Store trait with in-memory and JSON-file backends.
// - `profile.rs`:     High scores, lifetime stats, memory curve persistence.
// - `input.rs`:       Keyboard and MIDI input normalized to NoteInput.
// - `command.rs`:     PracticeCommand / PracticeAction, all session inputs.
// - `event.rs`:       EventQueue (timers) + observable SessionEvents.
// - `session.rs`:     PracticeSession, the step loop and round lifecycle.
// - `error.rs`:       Error types for parsing, storage, and configuration.
// - `prng`:           Re-exported from `notesview_prng`.
//
// **Critical constraint: determinism.** A session is a pure function of its
// seed, its config, the stored profile, and the timestamped commands it
// receives. Use `BTreeMap` for ordered collections.

pub mod chord_input;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod generator;
pub mod input;
pub mod judge;
pub mod memory;
pub mod pitch;
pub use notesview_prng as prng;
pub mod profile;
pub mod scoring;
pub mod session;
pub mod store;
