use thiserror::Error;

use crate::engine::physics::body::BodyId;

/// Errors surfaced to the collaborators of the engine.
///
/// Degenerate geometry inside a tick is never reported here; it is clamped
/// and skipped in place.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no room at ({x:.1}, {y:.1}): an existing body occupies that point")]
    Occupied { x: f64, y: f64 },

    #[error("no room at ({x:.1}, {y:.1}): too close to another body")]
    TooClose { x: f64, y: f64 },

    #[error("body {id:?} cannot be moved that close to the attractor")]
    TooCloseToAttractor { id: BodyId },

    #[error("no body with id {0:?} in this cell")]
    UnknownBody(BodyId),

    #[error("unknown shot class `{0}`")]
    UnknownShotClass(String),

    #[error("invalid body state: {0}")]
    InvalidBodyState(String),

    #[error("unknown sound module `{0}`")]
    UnknownSoundModule(String),

    #[error("invalid time division `{0}`")]
    InvalidTimeDivision(String),

    #[error("sequence index {0} is out of range")]
    SequenceOutOfRange(usize),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
