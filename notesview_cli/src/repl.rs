// Line-oriented input and event rendering for the terminal front end.
//
// Each stdin line is either a meta command (leading `:`) or a list of notes.
// Notes may be written as note names with an octave (`C4`, `Eb5`, `F#3`) or
// as computer-keyboard keys in the "Logic Pro" layout (`a s d ...`, with a
// trailing `#` for the sharp modifier and `z` / `x` to shift octave). All
// notes on one line share a timestamp, so `C4 E4 G4` arrives as a chord.
//
// Meta commands:
//   :start  :end  :clear  :quit
//   :difficulty <beginner|intermediate|advanced|master>
//   :clef <treble|bass|alto|tenor>
//   :range <standard|extended>
//   :ignore-octave <on|off>
//   :midi <hex bytes>        e.g. `:midi 90 3c 64` for a note-on of C4
//   :summary [json]
//   :help

use anyhow::{Context, Result, bail};
use notesview_core::command::PracticeAction;
use notesview_core::config::{Clef, DifficultyId, RangeMode};
use notesview_core::event::{RoundOutcome, SessionEvent, SessionEventKind};
use notesview_core::input::{InputSource, KeyboardMapper, MidiNoteEvent, NoteInput, decode_midi};
use notesview_core::memory::{MemoryReport, MemorySummary};
use notesview_core::pitch::Pitch;
use notesview_core::profile::{HighScores, LifetimeStats};
use notesview_core::scoring::achievement_for;
use notesview_core::session::format_notes;
use std::fmt::Write;

pub const HELP: &str = "\
notes:    C4 Eb4 G4 | keys a w s e d f t g y h u j (z/x octave, a# for sharp)
commands: :start :end :clear :quit :help
          :difficulty <name> :clef <name> :range <standard|extended>
          :ignore-octave <on|off> :midi <hex bytes> :summary [json]";

/// What one input line asks for.
#[derive(Debug, PartialEq)]
pub enum LineCommand {
    /// Session actions, all stamped with the time the line arrived.
    Actions(Vec<PracticeAction>),
    Summary { json: bool },
    Help,
    Quit,
}

pub fn parse_line(line: &str, keyboard: &mut KeyboardMapper) -> Result<LineCommand> {
    let line = line.trim();
    match line.strip_prefix(':') {
        Some(meta) => parse_meta(meta),
        None => parse_notes(line, keyboard).map(LineCommand::Actions),
    }
}

fn parse_meta(meta: &str) -> Result<LineCommand> {
    let mut words = meta.split_whitespace();
    let name = words.next().unwrap_or_default();
    let arg = words.next();
    let action = match (name, arg) {
        ("start", _) => PracticeAction::StartPractice,
        ("end", _) => PracticeAction::EndPractice,
        ("clear", _) => PracticeAction::ClearHistory,
        ("quit" | "q", _) => return Ok(LineCommand::Quit),
        ("help" | "h", _) => return Ok(LineCommand::Help),
        ("summary", arg) => {
            return Ok(LineCommand::Summary {
                json: arg == Some("json"),
            });
        }
        ("difficulty", Some(arg)) => PracticeAction::SetDifficulty {
            difficulty: DifficultyId::from_name(arg)
                .with_context(|| format!("unknown difficulty {arg:?}"))?,
        },
        ("clef", Some(arg)) => PracticeAction::SetClef {
            clef: Clef::from_name(arg).with_context(|| format!("unknown clef {arg:?}"))?,
        },
        ("range", Some(arg)) => PracticeAction::SetRangeMode {
            mode: RangeMode::from_name(arg).with_context(|| format!("unknown range {arg:?}"))?,
        },
        ("ignore-octave", Some("on")) => PracticeAction::SetIgnoreOctave { ignore: true },
        ("ignore-octave", Some("off")) => PracticeAction::SetIgnoreOctave { ignore: false },
        ("midi", Some(_)) => {
            let bytes = meta
                .split_whitespace()
                .skip(1)
                .map(|b| u8::from_str_radix(b, 16).with_context(|| format!("bad hex byte {b:?}")))
                .collect::<Result<Vec<u8>>>()?;
            return match decode_midi(&bytes) {
                Some(MidiNoteEvent::On { input, .. }) => {
                    Ok(LineCommand::Actions(vec![PracticeAction::Note { input }]))
                }
                Some(MidiNoteEvent::Off { .. }) => Ok(LineCommand::Actions(Vec::new())),
                None => bail!("not a MIDI note message"),
            };
        }
        _ => bail!("unknown command :{meta} (try :help)"),
    };
    Ok(LineCommand::Actions(vec![action]))
}

fn parse_notes(line: &str, keyboard: &mut KeyboardMapper) -> Result<Vec<PracticeAction>> {
    let mut actions = Vec::new();
    for token in line.split_whitespace() {
        if let Ok(pitch) = token.parse::<Pitch>() {
            actions.push(PracticeAction::Note {
                input: NoteInput::new(pitch, InputSource::VirtualPiano),
            });
            continue;
        }
        let (key, sharp) = match token.chars().collect::<Vec<_>>().as_slice() {
            [key] => (*key, false),
            [key, '#'] => (*key, true),
            _ => bail!("not a note or key: {token:?}"),
        };
        let before = keyboard.octave();
        match keyboard.press(key, sharp) {
            Some(input) => actions.push(PracticeAction::Note { input }),
            None if keyboard.octave() != before || matches!(key, 'z' | 'x' | 'Z' | 'X') => {}
            None => bail!("unmapped key {key:?}"),
        }
    }
    Ok(actions)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn describe(event: &SessionEvent) -> String {
    match &event.kind {
        SessionEventKind::RoundStarted {
            round_id,
            notes,
            clef,
            time_limit_ms,
        } => format!(
            "round {round_id} ({clef}, {}s): {}",
            time_limit_ms / 1000,
            format_notes(notes)
        ),
        SessionEventKind::RoundResolved {
            outcome,
            answer,
            response_ms,
            score_delta,
            score,
            combo,
            persisted,
            ..
        } => {
            let verdict = match outcome {
                RoundOutcome::Correct => "correct",
                RoundOutcome::Wrong => "wrong",
                RoundOutcome::Timeout => "time's up",
            };
            let mut line = format!(
                "{verdict} {score_delta:+} = {score}, combo {combo}, {:.2}s",
                *response_ms as f64 / 1000.0
            );
            if *outcome == RoundOutcome::Wrong {
                let played: Vec<String> = answer.iter().map(Pitch::to_string).collect();
                let _ = write!(line, " (played {})", played.join(" "));
            }
            if !persisted {
                line.push_str(" [memory not saved]");
            }
            line
        }
        SessionEventKind::PracticeEnded {
            difficulty,
            score,
            grade,
            tally,
            high_score_improved,
            persisted,
            ..
        } => {
            let mut line = format!(
                "{difficulty} over: {score} points, grade {grade:?}, \
                 {}/{} correct ({:.0}%), best combo {}",
                tally.correct_rounds,
                tally.rounds,
                tally.accuracy() * 100.0,
                tally.best_combo
            );
            if *high_score_improved {
                line.push_str(", new high score!");
            }
            if !persisted {
                line.push_str(" [profile not saved]");
            }
            line
        }
        SessionEventKind::HistoryCleared { persisted: true } => "history cleared".to_string(),
        SessionEventKind::HistoryCleared { persisted: false } => {
            "history cleared in memory only; the profile store refused".to_string()
        }
        SessionEventKind::SettingsChanged { settings } => format!(
            "difficulty {}, clef {}, range {:?}, ignore octave {}",
            settings.difficulty,
            settings.clef,
            settings.range_mode,
            if settings.ignore_octave { "on" } else { "off" }
        ),
        SessionEventKind::CommandRejected { reason } => format!("rejected: {reason}"),
    }
}

fn report_line(report: &MemoryReport) -> String {
    format!(
        "  {:<5} {:>3} ok {:>3} missed  {:>3.0}%",
        report.note,
        report.correct,
        report.wrong,
        report.success_rate * 100.0
    )
}

/// Multi-line profile overview for `:summary`.
pub fn describe_profile(
    summary: &MemorySummary,
    high_scores: &HighScores,
    lifetime: &LifetimeStats,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} games, {} points, {:.0}% accuracy, avg {:.2}s, best combo {} ({:?})",
        lifetime.total_games,
        lifetime.total_score,
        lifetime.accuracy() * 100.0,
        lifetime.average_time / 1000.0,
        lifetime.highest_combo,
        achievement_for(lifetime.total_score)
    );
    for (id, score) in high_scores.iter() {
        let _ = writeln!(out, "high score {id}: {score}");
    }
    let _ = writeln!(out, "due for review: {}", summary.due.len());
    for report in summary.due.iter().take(5) {
        let _ = writeln!(out, "{}", report_line(report));
    }
    let _ = writeln!(out, "most missed:");
    for report in summary.challenging.iter().take(5) {
        let _ = writeln!(out, "{}", report_line(report));
    }
    out
}
