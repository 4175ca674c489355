// Commands that drive a practice session.
//
// Every external input to the engine (settings, start/end, key presses,
// history clear) arrives as a `PracticeCommand` stamped with the caller's
// clock. The session is a function `(state, commands, target time) ->
// (new state, events)`; commands are the only input besides elapsed time.
//
// The flow for a key press in the CLI:
//   stdin line -> `KeyboardMapper` / note parser -> `PracticeAction::Note`
//   -> `PracticeSession::step()` in `session.rs`.
//
// Actions:
// - `SetDifficulty` - only accepted while idle.
// - `SetClef`, `SetRangeMode`, `SetIgnoreOctave` - take effect from the next
//   generated round (judging mode applies immediately).
// - `StartPractice` - (re)start: reset score and combo, generate a round.
// - `Note` - one normalized key press; ignored unless a round is active.
// - `EndPractice` - stop, persist high score and lifetime stats.
// - `ClearHistory` - wipe high scores, lifetime stats, and memory.
//
// See also: `session.rs` for `apply_command()`, `event.rs` for the output.

use crate::config::{Clef, DifficultyId, RangeMode};
use crate::input::NoteInput;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PracticeCommand {
    /// Caller's clock, milliseconds.
    pub time_ms: u64,
    pub action: PracticeAction,
}

impl PracticeCommand {
    pub fn new(time_ms: u64, action: PracticeAction) -> Self {
        Self { time_ms, action }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PracticeAction {
    SetDifficulty { difficulty: DifficultyId },
    SetClef { clef: Clef },
    SetRangeMode { mode: RangeMode },
    SetIgnoreOctave { ignore: bool },
    StartPractice,
    Note { input: NoteInput },
    EndPractice,
    ClearHistory,
}
