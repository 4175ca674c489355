// CLI entry point for the Notesview sight-reading trainer.
//
// Runs a practice session in the terminal: rounds are printed as note
// names, answers are typed as note names or computer-keyboard keys (see
// `repl.rs` for the line syntax). The engine itself reads no clock, so this
// loop supplies wall-clock milliseconds: each input line is stepped at the
// time it arrived, and between lines the loop sleeps on stdin until the
// session's next timer (`next_wakeup`) and then steps to it.
//
// The profile (high scores, lifetime stats, memory curve) is kept as JSON
// files under `--data-dir`, or only in memory with `--ephemeral`.
//
// Usage:
//   notesview [OPTIONS]
//     --config <PATH>        Trainer config JSON (default: built in)
//     --seed <N>             PRNG seed (default: current time)
//     --data-dir <DIR>       Profile directory (default: .notesview)
//     --ephemeral            Do not read or write a profile
//     --difficulty <NAME>    Starting difficulty (default: beginner)
//     --clef <NAME>          Starting clef (default: treble)
//     --print-config         Print the effective config as JSON and exit
//
// Log verbosity follows `RUST_LOG` (default `notesview=info`, which also
// covers `notesview_core`); logs go to stderr so they do not interleave with
// the practice output.

mod repl;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use notesview_core::command::{PracticeAction, PracticeCommand};
use notesview_core::config::{Clef, DifficultyId, TrainerConfig};
use notesview_core::input::KeyboardMapper;
use notesview_core::session::{Phase, PracticeSession, StepResult};
use notesview_core::store::{JsonFileStore, MemoryStore, Store};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use repl::{HELP, LineCommand, describe, describe_profile, parse_line};

/// Filter used when `RUST_LOG` is unset. Target directives match by prefix,
/// so `notesview` covers this binary and `notesview_core`.
const DEFAULT_LOG_FILTER: &str = "notesview=info";

/// How long to block on stdin when no timer is pending.
const IDLE_POLL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "notesview")]
#[command(about = "Sight-reading practice in the terminal")]
#[command(version)]
struct Args {
    /// Trainer config JSON; built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// PRNG seed; derived from the clock when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Directory holding the saved profile
    #[arg(long, default_value = ".notesview")]
    data_dir: PathBuf,

    /// Keep the profile in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Starting difficulty
    #[arg(long, default_value = "beginner")]
    difficulty: String,

    /// Starting clef
    #[arg(long, default_value = "treble")]
    clef: String,

    /// Print the effective config as JSON and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TrainerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrainerConfig::default(),
    };
    if args.print_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    let difficulty = DifficultyId::from_name(&args.difficulty)
        .with_context(|| format!("unknown difficulty {:?}", args.difficulty))?;
    let clef =
        Clef::from_name(&args.clef).with_context(|| format!("unknown clef {:?}", args.clef))?;
    let setup = [
        PracticeAction::SetDifficulty { difficulty },
        PracticeAction::SetClef { clef },
    ];
    let seed = args.seed.unwrap_or_else(now_ms);
    info!(seed, "starting notesview");

    if args.ephemeral {
        info!("ephemeral profile, nothing will be saved");
        let session = PracticeSession::new(seed, config, MemoryStore::new(), now_ms());
        run(session, &setup)
    } else {
        let store = JsonFileStore::open(args.data_dir.clone())
            .with_context(|| format!("opening profile in {}", args.data_dir.display()))?;
        info!(dir = %args.data_dir.display(), "profile store opened");
        let session = PracticeSession::new(seed, config, store, now_ms());
        run(session, &setup)
    }
}

fn run<S: Store>(mut session: PracticeSession<S>, setup: &[PracticeAction]) -> Result<()> {
    let lines = spawn_stdin_reader();
    let mut keyboard = KeyboardMapper::default();

    let now = now_ms();
    let commands: Vec<_> = setup
        .iter()
        .cloned()
        .map(|action| PracticeCommand::new(now, action))
        .collect();
    print_events(&session.step(&commands, now));
    println!("{HELP}");
    println!("type :start to begin");

    loop {
        let wait = match session.next_wakeup() {
            Some(at) => Duration::from_millis(at.saturating_sub(now_ms())),
            None => IDLE_POLL,
        };
        let line = match lines.recv_timeout(wait) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => {
                print_events(&session.step(&[], now_ms()));
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let now = now_ms();
        match parse_line(&line, &mut keyboard) {
            Ok(LineCommand::Actions(actions)) => {
                let commands: Vec<_> = actions
                    .into_iter()
                    .map(|action| PracticeCommand::new(now, action))
                    .collect();
                print_events(&session.step(&commands, now));
            }
            Ok(LineCommand::Summary { json }) => {
                print_events(&session.step(&[], now));
                if json {
                    println!("{}", serde_json::to_string_pretty(session.memory_summary())?);
                } else {
                    print!(
                        "{}",
                        describe_profile(
                            session.memory_summary(),
                            session.high_scores(),
                            session.lifetime_stats()
                        )
                    );
                }
            }
            Ok(LineCommand::Help) => println!("{HELP}"),
            Ok(LineCommand::Quit) => break,
            Err(e) => println!("{e:#}"),
        }
    }

    // Quitting mid-practice still records the session.
    if session.phase() != Phase::Idle {
        let now = now_ms();
        let end = [PracticeCommand::new(now, PracticeAction::EndPractice)];
        print_events(&session.step(&end, now));
    }
    Ok(())
}

fn print_events(result: &StepResult) {
    for event in &result.events {
        println!("{}", describe(event));
    }
}

/// Forward stdin lines over a channel so the main loop can wait on input
/// and timers at once. The channel disconnects at EOF.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Wall-clock milliseconds. Memory-curve due times are persisted, so they
/// must be comparable across runs.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
