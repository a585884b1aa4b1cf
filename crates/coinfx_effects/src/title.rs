//! Title intro
//!
//! The title sprite pops in with an overshoot, settles, pulses a few times and
//! shrinks away. Runs alongside the coin drain.

use coinfx_animation::{Animation, Easing, FloatAnimation, KeyframeSequence};
use coinfx_core::{DrawContext, Point, Size};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EffectConfig, Sanitizer};
use crate::error::ConfigError;
use crate::renderer::{Picture, Renderer, Sprite};
use crate::resource::ImageHandle;

/// Title intro timing, in seconds
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleConfig {
    pub delay: f32,
    /// Drawn width in pixels; height follows the image aspect ratio
    pub width: f32,
    pub pop_scale: f32,
    pub pop_seconds: f32,
    pub pop_overshoot: f32,
    pub settle_seconds: f32,
    pub pulse_scale: f32,
    pub pulse_seconds: f32,
    /// Extra half-pulses after the first
    pub pulse_repeat: u32,
    pub exit_delay: f32,
    pub exit_seconds: f32,
    pub exit_overshoot: f32,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            delay: 0.8,
            width: 300.0,
            pop_scale: 1.15,
            pop_seconds: 0.5,
            pop_overshoot: 3.0,
            settle_seconds: 0.3,
            pulse_scale: 1.05,
            pulse_seconds: 0.25,
            pulse_repeat: 3,
            exit_delay: 0.2,
            exit_seconds: 0.4,
            exit_overshoot: 2.0,
        }
    }
}

impl EffectConfig for TitleConfig {
    fn sanitize(self) -> (Self, Vec<ConfigError>) {
        let mut s = Sanitizer::new();
        let config = Self {
            delay: s.time("title.delay", self.delay),
            width: s.time("title.width", self.width),
            pop_scale: s.finite("title.pop_scale", self.pop_scale, 1.15),
            pop_seconds: s.time("title.pop_seconds", self.pop_seconds),
            pop_overshoot: s.time("title.pop_overshoot", self.pop_overshoot),
            settle_seconds: s.time("title.settle_seconds", self.settle_seconds),
            pulse_scale: s.finite("title.pulse_scale", self.pulse_scale, 1.05),
            pulse_seconds: s.time("title.pulse_seconds", self.pulse_seconds),
            pulse_repeat: self.pulse_repeat,
            exit_delay: s.time("title.exit_delay", self.exit_delay),
            exit_seconds: s.time("title.exit_seconds", self.exit_seconds),
            exit_overshoot: s.time("title.exit_overshoot", self.exit_overshoot),
        };
        (config, s.finish())
    }
}

/// Keyframed title sprite at the center of the surface
pub struct TitleIntro {
    image: ImageHandle,
    width: f32,
    center: Point,
    scale: FloatAnimation,
    opacity: FloatAnimation,
    elapsed: f32,
    renderer: Renderer,
}

impl TitleIntro {
    pub fn new(config: TitleConfig, viewport: Size, image: ImageHandle) -> Self {
        let (c, _) = config.sanitize();

        let scale = KeyframeSequence::new(0.0)
            .wait(c.delay)
            .to(c.pop_scale, c.pop_seconds, Easing::BackOut(c.pop_overshoot))
            .to(1.0, c.settle_seconds, Easing::EaseOutQuad)
            .yoyo(c.pulse_scale, c.pulse_seconds, Easing::EaseInOutSine, c.pulse_repeat)
            .wait(c.exit_delay)
            .to(0.0, c.exit_seconds, Easing::BackIn(c.exit_overshoot));

        // Opacity shares the pop and exit tweens and holds in between
        let opacity = KeyframeSequence::new(0.0)
            .wait(c.delay)
            .to(1.0, c.pop_seconds, Easing::BackOut(c.pop_overshoot))
            .wait(scale.duration() - c.delay - c.pop_seconds - c.exit_seconds)
            .to(0.0, c.exit_seconds, Easing::BackIn(c.exit_overshoot));

        let scale = scale.build();
        debug!(duration = scale.duration(), "title intro created");
        Self {
            image,
            width: c.width,
            center: viewport.center(),
            opacity: opacity.build().with_duration(scale.duration()),
            scale,
            elapsed: 0.0,
            renderer: Renderer::unbounded(),
        }
    }

    /// Total length in seconds
    pub fn duration(&self) -> f32 {
        self.scale.duration()
    }

    pub fn scale_at(&self, elapsed: f32) -> f32 {
        self.scale.sample(elapsed).unwrap_or(0.0)
    }

    pub fn opacity_at(&self, elapsed: f32) -> f32 {
        self.opacity.sample(elapsed).unwrap_or(0.0).clamp(0.0, 1.0)
    }
}

impl Animation for TitleIntro {
    fn name(&self) -> &str {
        "title_intro"
    }

    fn is_ready(&self) -> bool {
        self.image.is_ready()
    }

    fn update(&mut self, elapsed: f32) -> bool {
        self.elapsed = elapsed;
        !self.scale.is_finished(elapsed)
    }

    fn render(&self, ctx: &mut dyn DrawContext) {
        let Ok(natural) = self.image.size() else {
            return;
        };
        let height = if natural.width > 0.0 {
            self.width * natural.height / natural.width
        } else {
            self.width
        };
        let picture = Picture {
            image: self.image.id(),
            size: Size::new(self.width, height),
        };
        self.renderer.render(
            ctx,
            [Sprite::new(self.center, picture)
                .with_scale(self.scale_at(self.elapsed))
                .with_opacity(self.opacity_at(self.elapsed))],
        );
    }
}
