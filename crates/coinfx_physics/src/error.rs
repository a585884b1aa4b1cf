//! Error types for the physics world

use thiserror::Error;

use crate::world::BodyId;

/// Error type for physics operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("degenerate shape: {0}")]
    DegenerateShape(String),

    #[error("unknown body {0:?}")]
    UnknownBody(BodyId),
}

/// Result type alias for physics operations
pub type Result<T> = std::result::Result<T, PhysicsError>;
