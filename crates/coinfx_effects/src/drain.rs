//! Coin drain
//!
//! Thousands of coins start on a wide ring around the surface center and
//! spiral inwards, shrinking as they accelerate, until they vanish in the
//! middle.

use std::f32::consts::PI;

use coinfx_animation::{Activity, Animation, Easing, FadeEnvelope, Particle, ParticleSystem, SpiralPath};
use coinfx_core::{DrawContext, Point, Size};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EffectConfig, Range, Sanitizer};
use crate::error::ConfigError;
use crate::renderer::{CoinImage, Renderer, Sprite};
use crate::resource::ImageHandle;

/// Coin drain settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrainConfig {
    pub count: usize,
    /// Distance from the center at birth, in pixels
    pub start_radius: Range,
    /// Radians swept on the way in
    pub rotation: Range,
    /// Seconds
    pub duration: Range,
    /// Seconds before a coin starts moving
    pub delay: Range,
    /// Edge length at birth, in pixels
    pub size: Range,
    /// Fraction of the size lost by the center
    pub shrink: f32,
    pub easing: Easing,
    pub fade: FadeEnvelope,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            count: 2000,
            start_radius: Range::new(800.0, 1000.0),
            rotation: Range::new(PI / 2.0, PI / 2.0 + 0.3),
            duration: Range::new(1.4, 2.2),
            delay: Range::new(0.0, 0.6),
            size: Range::new(120.0, 200.0),
            shrink: 0.8,
            easing: Easing::EaseIn,
            fade: FadeEnvelope::default(),
        }
    }
}

impl EffectConfig for DrainConfig {
    fn sanitize(self) -> (Self, Vec<ConfigError>) {
        let mut s = Sanitizer::new();
        let config = Self {
            count: s.count("drain.count", self.count),
            start_radius: s.range("drain.start_radius", self.start_radius),
            rotation: s.range("drain.rotation", self.rotation),
            duration: s.time_range("drain.duration", self.duration),
            delay: s.time_range("drain.delay", self.delay),
            size: s.range("drain.size", self.size),
            shrink: s.within("drain.shrink", self.shrink, 0.0, 1.0),
            easing: self.easing,
            fade: FadeEnvelope::new(
                s.time("drain.fade.fade_in", self.fade.fade_in),
                s.within("drain.fade.fade_out", self.fade.fade_out, 0.0, 1.0),
            ),
        };
        (config, s.finish())
    }
}

/// Coins spiralling into the center of the surface
pub struct CoinDrain {
    fade: FadeEnvelope,
    image: ImageHandle,
    system: ParticleSystem<SpiralPath>,
    activity: Activity,
    renderer: Renderer,
}

impl CoinDrain {
    pub fn new(config: DrainConfig, viewport: Size, image: ImageHandle, seed: u64) -> Self {
        let (config, _) = config.sanitize();
        let mut rng = StdRng::seed_from_u64(seed);
        let center = viewport.center();

        let mut system = ParticleSystem::with_capacity(config.count);
        for _ in 0..config.count {
            let path = SpiralPath {
                center,
                start_angle: Range::new(0.0, PI * 2.0).sample(&mut rng),
                start_radius: config.start_radius.sample(&mut rng),
                rotation: config.rotation.sample(&mut rng),
                size: config.size.sample(&mut rng),
                shrink: config.shrink,
            };
            let particle = Particle::new(
                config.delay.sample(&mut rng),
                config.duration.sample(&mut rng),
                config.easing,
            );
            system.push(particle, path);
        }
        debug!(count = config.count, "coin drain created");

        Self {
            fade: config.fade,
            image,
            activity: system.activity(),
            system,
            renderer: Renderer::unbounded(),
        }
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    /// Where the coins converge
    pub fn center(&self) -> Option<Point> {
        self.system.particles().next().map(|(_, path)| path.center)
    }
}

impl Animation for CoinDrain {
    fn name(&self) -> &str {
        "coin_drain"
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
                let pose = path.pose(sample, &self.fade);
                Sprite::new(pose.position, CoinImage::new(image, pose.size))
                    .with_opacity(pose.opacity)
            }),
        );
    }

    fn release(&mut self) {
        self.system.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinfx_animation::FrameLoop;
    use coinfx_core::{ImageId, RecordingContext};
    use std::cell::Cell;
    use std::rc::Rc;

    const VIEWPORT: Size = Size::new(412.0, 915.0);

    fn coin() -> ImageHandle {
        ImageHandle::ready(ImageId(1), Size::new(128.0, 128.0))
    }

    fn small() -> DrainConfig {
        DrainConfig {
            count: 40,
            ..DrainConfig::default()
        }
    }

    #[test]
    fn test_runs_to_completion_within_longest_life() {
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        let drain = CoinDrain::new(small(), VIEWPORT, coin(), 9);
        let mut frame_loop = FrameLoop::new(drain).on_complete(move || counter.set(counter.get() + 1));
        let mut ctx = RecordingContext::new(VIEWPORT);

        let mut frame = 0;
        while frame_loop.wants_frame() && frame < 600 {
            frame_loop.frame(frame as f64 * 1000.0 / 60.0, &mut ctx);
            frame += 1;
        }

        assert_eq!(fired.get(), 1);
        // delay max 0.6 + duration max 2.2, plus the frame that observes it
        assert!(frame_loop.elapsed() <= 2.8 + 1.0 / 60.0 + 1e-3);
        assert_eq!(ctx.opacity_depth(), 0);
    }

    #[test]
    fn test_nothing_drawn_before_first_birth() {
        let config = DrainConfig {
            count: 10,
            delay: Range::new(0.5, 0.6),
            ..DrainConfig::default()
        };
        let mut drain = CoinDrain::new(config, VIEWPORT, coin(), 1);
        let mut ctx = RecordingContext::new(VIEWPORT);

        assert!(drain.update(0.4));
        drain.render(&mut ctx);
        assert_eq!(ctx.draw_call_count(), 0);
        assert_eq!(drain.activity().pending, 10);
    }

    #[test]
    fn test_coins_converge_on_center() {
        let config = DrainConfig {
            count: 1,
            delay: Range::fixed(0.0),
            duration: Range::fixed(1.0),
            ..DrainConfig::default()
        };
        let mut drain = CoinDrain::new(config, VIEWPORT, coin(), 5);
        assert_eq!(drain.center(), Some(Point::new(206.0, 457.5)));

        drain.update(0.99);
        let (sample, path) = drain.system.visible().next().unwrap();
        let pose = path.pose(sample, &FadeEnvelope::default());
        assert!(pose.position.distance(Point::new(206.0, 457.5)) < 0.02 * 1000.0);
        assert!(pose.opacity < 0.1);
    }

    #[test]
    fn test_waits_for_image() {
        let image = ImageHandle::loading(ImageId(2));
        let drain = CoinDrain::new(small(), VIEWPORT, image.clone(), 3);
        let mut frame_loop = FrameLoop::new(drain);
        assert!(!frame_loop.wants_frame());

        image.mark_ready(Size::new(64.0, 64.0));
        assert!(frame_loop.notify_ready());
    }

    #[test]
    fn test_empty_drain_completes_immediately() {
        let config = DrainConfig {
            count: 0,
            ..DrainConfig::default()
        };
        let mut drain = CoinDrain::new(config, VIEWPORT, coin(), 3);
        assert!(!drain.update(0.0));
    }

    #[test]
    fn test_default_config_is_clean() {
        assert!(DrainConfig::default().validate().is_empty());

        let broken = DrainConfig {
            size: Range::new(200.0, 120.0),
            shrink: 1.5,
            ..DrainConfig::default()
        };
        let (fixed, findings) = broken.sanitize();
        assert_eq!(findings.len(), 2);
        assert_eq!(fixed.size, Range::new(120.0, 200.0));
        assert_eq!(fixed.shrink, 1.0);
    }
}
