//! coinfx Physics
//!
//! A thin rigid-body layer over rapier2d sized for decorative effects:
//! pixel coordinates, fixed 60 Hz steps, removable boundaries and ramped
//! spawning.

pub mod body;
pub mod error;
pub mod spawner;
pub mod world;

pub use body::{BodyDesc, BodyKind, BodyShape, Material};
pub use error::{PhysicsError, Result};
pub use spawner::{RampSpawner, SpawnRamp};
pub use world::{BodyId, BodyView, PhysicsConfig, PhysicsWorld, FIXED_TIMESTEP};
