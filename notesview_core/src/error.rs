// Error types for the practice engine.
//
// Three concerns, three enums:
// - `NoteParseError`: a note string that is not `<letter>[#|b]<octave>`.
//   Inside the round pipeline these are downgraded to "skip / no match"
//   (see `generator.rs`, `judge.rs`, `session.rs`); they only surface as
//   hard errors from `Pitch::from_str` and config loading.
// - `StoreError`: a profile store could not read or write a key. The
//   session logs these and reports `persisted: false` on its output events.
// - `ConfigError`: a `TrainerConfig` failed to load or validate.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NoteParseError {
    #[error("empty note string")]
    Empty,

    #[error("note {0:?} does not start with a letter A-G")]
    MissingLetter(String),

    #[error("note {0:?} uses an unsupported spelling")]
    UnsupportedSpelling(String),

    #[error("note {0:?} has no octave number")]
    MissingOctave(String),

    #[error("note {0:?} has an invalid octave")]
    InvalidOctave(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error for key {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
