//! coinfx Animation System
//!
//! Time-driven particles, easing, keyframes, springs, phase timelines and the
//! frame driver that runs animations against a host's frame signal.
//!
//! # Features
//!
//! - **Particles**: pure functions of elapsed time, birth delay, duration and easing
//! - **Motion Paths**: inward spirals and burst-then-spiral paths
//! - **Keyframes**: sampled keyframe animations and a tween sequence builder
//! - **Springs**: RK4-integrated springs for secondary motion
//! - **Phase Timelines**: forward-only phase state machines
//! - **Driver**: frame loops with resource gating, single completion and idempotent cancel

pub mod driver;
pub mod easing;
pub mod motion;
pub mod particle;
pub mod spring;
pub mod timeline;
pub mod values;

pub use driver::{
    Animation, AnimationHost, AnimationId, CompletedList, FrameLoop, FrameOutcome, LoopState,
};
pub use easing::Easing;
pub use motion::{BurstPhase, BurstSpiral, BurstSpiralTiming, Pose, SpiralPath};
pub use particle::{
    Activity, FadeEnvelope, Particle, ParticleSample, ParticleState, ParticleSystem,
};
pub use spring::{Spring, Spring2, SpringConfig};
pub use timeline::{Phase, PhaseTimeline, Stage, TimelineError};
pub use values::{
    FloatAnimation, Interpolate, KeyframeSequence, OffsetScale, OffsetScaleAnimation,
    TypedKeyframe, TypedKeyframeAnimation,
};
