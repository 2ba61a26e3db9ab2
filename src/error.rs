//! Error taxonomy for the engine's control plane.

use thiserror::Error;

/// Errors that can occur when driving the game engine.
///
/// Empty entry sets at end time and repeated end-of-phase calls are not
/// errors: the former yields a terminal result with no winner, the latter is
/// absorbed idempotently by returning the cached outcome. Every variant here
/// is recoverable and local to one session.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Operation referenced a session that has no active game.
    #[error("not found: {0}")]
    NotFound(String),
    /// Malformed start parameters, rejected before any state mutation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
