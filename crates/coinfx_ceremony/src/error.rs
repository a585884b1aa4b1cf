//! Error types for the ceremony model

use thiserror::Error;

use crate::envelope::EnvelopeId;
use crate::leftovers::TransferId;
use crate::wizard::Step;

/// Error type for ceremony operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CeremonyError {
    #[error("unknown envelope {0}")]
    UnknownEnvelope(EnvelopeId),

    #[error("envelope {0} has nothing left to drag")]
    NotDraggable(EnvelopeId),

    #[error("envelope {0} does not accept drops")]
    NotDropTarget(EnvelopeId),

    #[error("savings envelope {0} is blocked while the allocation dips into savings")]
    AllocationBlocked(EnvelopeId),

    #[error("transfer {0:?} has already settled")]
    AlreadySettled(TransferId),

    #[error("unknown transfer {0:?}")]
    UnknownTransfer(TransferId),

    #[error("allocation run has already completed")]
    RunComplete,

    #[error("operation needs the {expected:?} step, ceremony is at {actual:?}")]
    WrongStep { expected: Step, actual: Step },
}

/// Result type alias for ceremony operations
pub type Result<T> = std::result::Result<T, CeremonyError>;
