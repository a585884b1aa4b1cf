//! coinfx Ceremony
//!
//! Interaction choreography and model of the budget reload wizard.
//!
//! # Features
//!
//! - **Envelopes**: spending and savings envelopes with history statistics
//! - **Drag Gesture**: elastic pull, pop, zip and orbiting token with creak haptics
//! - **Coin Transfers**: fixed-step tokens attracted into a target with pulse and bounce
//! - **Leftovers**: planned transfers that settle exactly once
//! - **Allocation**: income/savings split, auto-fill and a staggered transfer plan
//! - **Wizard**: `Debrief → Leftovers → Allocation → Complete`
//!
//! Haptics are a host trait ([`Haptics`]); nothing here talks to a device.

pub mod allocation;
pub mod badge;
pub mod drop_targets;
pub mod envelope;
pub mod error;
pub mod gesture;
pub mod haptics;
pub mod leftovers;
pub mod sparks;
pub mod transfer;
pub mod wizard;

pub use allocation::{
    AllocationBoard, AllocationPlan, AllocationRun, CompletionSummary, PlannedTransfer, Progress,
    ADJUST_STEP, COMPLETE_DELAY_MS,
};
pub use badge::{BadgePose, FloatingBadge};
pub use drop_targets::DropTargets;
pub use envelope::{
    demo_income, demo_savings, demo_spending, DebriefCard, Envelope, EnvelopeId, EnvelopeKind,
    RoundSummary, SpendingStats, DEMO_DEBRIEF, DEMO_ROUND,
};
pub use error::{CeremonyError, Result};
pub use gesture::{
    BoxPose, Deformation, DragGesture, DropOutcome, GestureConfig, GestureEvent, TokenPhase,
    TokenPose,
};
pub use haptics::{Creak, Haptics, NoHaptics, RecordingHaptics};
pub use leftovers::{LeftoverDecision, LeftoverEnvelope, Leftovers, PendingTransfer, TransferId};
pub use sparks::{Spark, SparkField};
pub use transfer::{allocation_coins, CoinTransfer, TokenState, TransferConfig};
pub use wizard::{Ceremony, Step};
