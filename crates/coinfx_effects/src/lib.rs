//! coinfx Effects
//!
//! Decorative coin, card and shard animations built on the particle
//! integrator and the rigid-body world. Every effect implements
//! [`Animation`](coinfx_animation::Animation) and is driven by a
//! [`FrameLoop`](coinfx_animation::FrameLoop).
//!
//! # Effects
//!
//! - **Coin drain**: thousands of coins spiral into the center
//! - **Coin stream**: coins burst from a source and spiral into a target
//! - **Coin piles**: physics coins fill a box, hold, then fall or float away
//! - **Card deal**: a shuffled deck is dealt, held, and swept off screen
//! - **Shard explosion**: a triangle mesh blows apart from the center
//! - **Title intro**: keyframed pop, pulse and exit of a title sprite
//!
//! # Example
//!
//! ```ignore
//! use coinfx_animation::FrameLoop;
//! use coinfx_core::{ImageId, RecordingContext, Size};
//! use coinfx_effects::{CoinDrain, DrainConfig, ImageHandle};
//!
//! let viewport = Size::new(412.0, 915.0);
//! let coin = ImageHandle::loading(ImageId(1));
//! let mut frame_loop = FrameLoop::new(CoinDrain::new(DrainConfig::default(), viewport, coin.clone(), 7))
//!     .on_complete(|| println!("drained"));
//!
//! coin.mark_ready(Size::new(128.0, 128.0));
//! frame_loop.notify_ready();
//!
//! let mut surface = RecordingContext::new(viewport);
//! frame_loop.frame(0.0, &mut surface);
//! ```

pub mod cards;
pub mod catalog;
pub mod config;
pub mod drain;
pub mod error;
pub mod pile;
pub mod renderer;
pub mod resource;
pub mod shards;
pub mod stream;
pub mod title;

pub use cards::{shuffled_deck, standard_deck, Card, CardDeal, CardDealConfig, CardFace, Suit};
pub use catalog::EffectKind;
pub use config::{EffectConfig, EffectsConfig, Range, Sanitizer};
pub use drain::{CoinDrain, DrainConfig};
pub use error::{ConfigError, EffectError, Result};
pub use pile::{CoinPile, PileConfig, PileDirection};
pub use renderer::{CoinImage, Picture, RenderStats, Renderer, Sprite, Visual};
pub use resource::{ImageHandle, ImageStatus};
pub use shards::{Shard, ShardConfig, ShardExplosion};
pub use stream::{CoinStream, StreamConfig};
pub use title::{TitleConfig, TitleIntro};
