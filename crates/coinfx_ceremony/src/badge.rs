//! Floating `+$N` badge shown over a drop target when a transfer starts

use coinfx_animation::{Easing, FloatAnimation, KeyframeSequence};
use coinfx_core::{
    Color, DrawContext, DrawContextExt, FontWeight, Point, TextAlign, TextBaseline, TextStyle,
    Transform,
};

const APPEAR: f32 = 0.3;
const LINGER: f32 = 0.6;
const FADE: f32 = 0.8;

/// Badge position, opacity and scale at one instant
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BadgePose {
    pub position: Point,
    pub opacity: f32,
    pub scale: f32,
}

/// Pops up with an overshoot, lingers, then drifts up and fades
#[derive(Clone, Debug)]
pub struct FloatingBadge {
    text: String,
    anchor: Point,
    started: f32,
    opacity: FloatAnimation,
    rise: FloatAnimation,
    scale: FloatAnimation,
}

impl FloatingBadge {
    /// Badge for `amount` dollars anchored at `anchor`, starting at `started` seconds
    pub fn new(amount: f64, anchor: Point, started: f32) -> Self {
        let pop = Easing::BackOut(2.0);
        Self {
            text: format!("+${:.0}", amount),
            anchor,
            started,
            opacity: KeyframeSequence::new(0.0)
                .to(1.0, APPEAR, pop)
                .wait(LINGER)
                .to(0.0, FADE, Easing::EaseOutQuad)
                .build(),
            rise: KeyframeSequence::new(0.0)
                .to(-20.0, APPEAR, pop)
                .wait(LINGER)
                .to(-60.0, FADE, Easing::EaseOutQuad)
                .build(),
            scale: KeyframeSequence::new(0.8)
                .to(1.0, APPEAR, pop)
                .wait(LINGER + FADE)
                .build(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn duration(&self) -> f32 {
        self.opacity.duration()
    }

    pub fn is_finished(&self, elapsed: f32) -> bool {
        self.opacity.is_finished(elapsed - self.started)
    }

    pub fn sample(&self, elapsed: f32) -> BadgePose {
        let local = elapsed - self.started;
        let rise = self.rise.sample(local).unwrap_or(0.0);
        BadgePose {
            position: Point::new(self.anchor.x, self.anchor.y + rise),
            opacity: self.opacity.sample(local).unwrap_or(0.0).clamp(0.0, 1.0),
            scale: self.scale.sample(local).unwrap_or(1.0),
        }
    }

    pub fn render(&self, ctx: &mut dyn DrawContext, elapsed: f32) {
        let pose = self.sample(elapsed);
        if pose.opacity <= 0.0 {
            return;
        }
        let style = TextStyle::new(18.0)
            .with_weight(FontWeight::Bold)
            .with_color(Color::from_hex(0x2E7D32))
            .with_align(TextAlign::Center)
            .with_baseline(TextBaseline::Middle);
        let transform = Transform::translate(pose.position.x, pose.position.y)
            .then(&Transform::uniform_scale(pose.scale));
        ctx.with_transform(transform, |ctx| {
            ctx.with_opacity(pose.opacity, |ctx| {
                ctx.draw_text(&self.text, Point::ZERO, &style)
            })
        });
    }
}
