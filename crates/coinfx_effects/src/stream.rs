//! Coin stream
//!
//! A handful of coins burst out of a source point, then spiral into a target
//! point. Used to show money moving from one place on screen to another.

use std::f32::consts::PI;

use coinfx_animation::{Activity, Animation, BurstSpiral, BurstSpiralTiming, Easing, Particle, ParticleSystem};
use coinfx_core::{DrawContext, Point};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EffectConfig, Range, Sanitizer};
use crate::error::ConfigError;
use crate::renderer::{CoinImage, Renderer, Sprite};
use crate::resource::ImageHandle;

/// Coin stream settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub count: usize,
    /// How far coins fly out of the source before turning, in pixels
    pub burst_radius: Range,
    /// Radians swept while spiralling into the target
    pub spiral_rotation: Range,
    /// Seconds
    pub duration: Range,
    /// Seconds
    pub delay: Range,
    /// Edge length in pixels
    pub size: Range,
    pub timing: BurstSpiralTiming,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            count: 25,
            burst_radius: Range::new(30.0, 80.0),
            spiral_rotation: Range::new(PI * 0.8, PI * 1.2),
            duration: Range::new(0.8, 1.2),
            delay: Range::new(0.0, 0.3),
            size: Range::new(24.0, 48.0),
            timing: BurstSpiralTiming::default(),
        }
    }
}

impl EffectConfig for StreamConfig {
    fn sanitize(self) -> (Self, Vec<ConfigError>) {
        let mut s = Sanitizer::new();
        let config = Self {
            count: s.count("stream.count", self.count),
            burst_radius: s.range("stream.burst_radius", self.burst_radius),
            spiral_rotation: s.range("stream.spiral_rotation", self.spiral_rotation),
            duration: s.time_range("stream.duration", self.duration),
            delay: s.time_range("stream.delay", self.delay),
            size: s.range("stream.size", self.size),
            timing: BurstSpiralTiming {
                boundary: s.within("stream.timing.boundary", self.timing.boundary, 0.0, 1.0),
                spiral_fade_out: s.within(
                    "stream.timing.spiral_fade_out",
                    self.timing.spiral_fade_out,
                    0.0,
                    1.0,
                ),
                spiral_shrink: s.within(
                    "stream.timing.spiral_shrink",
                    self.timing.spiral_shrink,
                    0.0,
                    1.0,
                ),
            },
        };
        (config, s.finish())
    }
}

/// Coins bursting from `source` and spiralling into `target`
pub struct CoinStream {
    source: Point,
    target: Point,
    image: ImageHandle,
    system: ParticleSystem<BurstSpiral>,
    activity: Activity,
    renderer: Renderer,
}

impl CoinStream {
    pub fn new(
        config: StreamConfig,
        source: Point,
        target: Point,
        image: ImageHandle,
        seed: u64,
    ) -> Self {
        let (config, _) = config.sanitize();
        let mut rng = StdRng::seed_from_u64(seed);

        let mut system = ParticleSystem::with_capacity(config.count);
        for _ in 0..config.count {
            let path = BurstSpiral {
                source,
                target,
                burst_angle: Range::new(0.0, PI * 2.0).sample(&mut rng),
                burst_radius: config.burst_radius.sample(&mut rng),
                spiral_rotation: config.spiral_rotation.sample(&mut rng),
                size: config.size.sample(&mut rng),
                timing: config.timing,
            };
            // Each half eases itself
            let particle = Particle::new(
                config.delay.sample(&mut rng),
                config.duration.sample(&mut rng),
                Easing::Linear,
            );
            system.push(particle, path);
        }
        debug!(
            count = config.count,
            distance = source.distance(target),
            "coin stream created"
        );

        Self {
            source,
            target,
            image,
            activity: system.activity(),
            system,
            renderer: Renderer::unbounded(),
        }
    }

    pub fn source(&self) -> Point {
        self.source
    }

    pub fn target(&self) -> Point {
        self.target
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }
}

impl Animation for CoinStream {
    fn name(&self) -> &str {
        "coin_stream"
    }

    fn is_ready(&self) -> bool {
        self.image.is_ready()
    }

    fn update(&mut self, elapsed: f32) -> bool {
        self.activity = self.system.update(elapsed);
        self.activity.is_active()
    }

    fn render(&self, ctx: &mut dyn DrawContext) {
        let image = self.image.id();
        self.renderer.render(
            ctx,
            self.system.visible().map(|(sample, path)| {
                let pose = path.pose(sample);
                Sprite::new(pose.position, CoinImage::new(image, pose.size))
                    .with_opacity(pose.opacity)
            }),
        );
    }

    fn release(&mut self) {
        self.system.clear();
    }
}
