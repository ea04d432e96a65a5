//! Error types
//!
//! Lookups that miss (unknown car id, pad index) are not errors; they return
//! `None` or a zero value instead.

use thiserror::Error;

use crate::sim::GameMode;

/// Error raised by host callback logic, carried through untouched
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Arena construction, precondition and callback failures
#[derive(Error, Debug)]
pub enum ArenaError {
    #[error("tick rate {0} is outside the supported range [15, 120]")]
    InvalidTickRate(f32),

    #[error("{operation} is not supported in game mode {mode:?}")]
    UnsupportedInGameMode {
        operation: &'static str,
        mode: GameMode,
    },

    #[error("arena at index {index} appears more than once in the batch")]
    DuplicateArena { index: usize },

    #[error("batch element at index {index} is not an arena")]
    UnexpectedType { index: usize },

    #[error("arena at index {index} was poisoned by a panic in another thread")]
    PoisonedArena { index: usize },

    #[error("step called from inside an event callback")]
    ReentrantStep,

    #[error("expected {expected} dropshot tiles, got {actual}")]
    InvalidTileCount { expected: usize, actual: usize },

    /// Error returned by a registered event callback
    #[error(transparent)]
    Callback(BoxError),
}

impl ArenaError {
    /// The host error, if this came from a callback
    pub fn callback_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            ArenaError::Callback(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Configuration file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Binary game-state decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("buffer too short: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("unknown game mode tag {0}")]
    InvalidGameMode(u8),

    #[error("unknown team tag {0}")]
    InvalidTeam(u8),

    #[error("unknown dropshot tile state {0}")]
    InvalidTileState(u8),
}
