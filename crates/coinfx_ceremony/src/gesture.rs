//! Drag-to-transfer gesture
//!
//! Pressing an envelope and pulling stretches it towards the pointer with a
//! rubber-band falloff while the device creaks. Past the pop distance a token
//! pops out of the envelope, the envelope snaps back with a damped wobble and
//! the token zips to the pointer, then orbits it loosely until release. Letting
//! go over a drop target yields a [`DropOutcome`]; anywhere else the envelope
//! springs back to rest and nothing happens.
//!
//! The gesture is stepped once per host frame with [`DragGesture::frame`];
//! pointer input arrives between frames through [`DragGesture::move_to`].

use coinfx_animation::{OffsetScale, OffsetScaleAnimation, Spring2, SpringConfig};
use coinfx_core::{
    Color, DrawContext, DrawContextExt, FontWeight, Point, Rect, TextAlign, TextBaseline,
    TextStyle, Transform, Vec2,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::drop_targets::DropTargets;
use crate::envelope::EnvelopeId;
use crate::haptics::{Creak, Haptics};
use crate::sparks::SparkField;

/// Gesture tuning
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Furthest the envelope follows the pointer, in pixels
    pub drag_limit: f32,
    /// Pointer distance at which the token pops free
    pub pop_distance: f32,
    pub stretch: f32,
    pub squash: f32,
    /// Fraction of the remaining distance the token covers per frame while zipping
    pub zip_speed: f32,
    /// Zipping ends within this many pixels of the pointer
    pub zip_snap: f32,
    pub orbit_launch: f32,
    pub orbit_pull: f32,
    /// Total width of the random velocity kick per frame
    pub orbit_wander: f32,
    pub orbit_damping: f32,
    /// Beyond this distance the token is pushed back towards the pointer
    pub orbit_leash: f32,
    pub orbit_push: f32,
    /// Degrees of rotation per pixel of speed
    pub orbit_spin: f32,
    pub token_scale: f32,
    pub token_radius: f32,
    pub wobble: f32,
    pub trail_interval_ms: f64,
    pub snap_back_ms: f32,
    pub pop_buzz_ms: u32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            drag_limit: 20.0,
            pop_distance: 80.0,
            stretch: 0.25,
            squash: 0.12,
            zip_speed: 0.35,
            zip_snap: 2.0,
            orbit_launch: 3.0,
            orbit_pull: 0.15,
            orbit_wander: 0.3,
            orbit_damping: 0.94,
            orbit_leash: 40.0,
            orbit_push: 0.1,
            orbit_spin: 3.0,
            token_scale: 0.7,
            token_radius: 20.0,
            wobble: 0.08,
            trail_interval_ms: 40.0,
            snap_back_ms: 700.0,
            pop_buzz_ms: 40,
        }
    }
}

// ============================================================================
// Deformation
// ============================================================================

/// Shape of the envelope while it is being pulled
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Deformation {
    /// Translation towards the pointer
    pub offset: Vec2,
    /// Direction of the pull in radians
    pub angle: f32,
    /// Scale along the pull direction
    pub stretch: f32,
    /// Scale across the pull direction
    pub squash: f32,
    /// Pull distance relative to the pop distance, 0..=1
    pub tension: f32,
}

impl Deformation {
    pub const REST: Deformation = Deformation {
        offset: Vec2::ZERO,
        angle: 0.0,
        stretch: 1.0,
        squash: 1.0,
        tension: 0.0,
    };

    /// Rubber-band response to a pointer displacement
    pub fn for_pull(pull: Vec2, config: &GestureConfig) -> Self {
        let distance = pull.length();
        let limit = config.drag_limit;
        let factor = limit * (1.0 - (-distance / (limit * 4.0)).exp());
        let angle = pull.y.atan2(pull.x);
        let tension = if config.pop_distance > 0.0 {
            (distance / config.pop_distance).min(1.0)
        } else {
            1.0
        };
        Self {
            offset: Vec2::from_angle(angle) * factor,
            angle,
            stretch: 1.0 + tension * config.stretch,
            squash: 1.0 - tension * config.squash,
            tension,
        }
    }

    /// Transform applied around the envelope center
    pub fn transform(&self) -> Transform {
        Transform::translate(self.offset.x, self.offset.y)
            .then(&Transform::rotate(self.angle))
            .then(&Transform::scale(self.stretch, self.squash))
            .then(&Transform::rotate(-self.angle))
    }
}

/// Damped wobble played on the envelope when the token pops out
fn snap_back(offset: Vec2, duration_ms: f32) -> OffsetScaleAnimation {
    let at = |k: f32, scale: f32| OffsetScale::new(offset * k, scale);
    OffsetScaleAnimation::new(duration_ms / 1000.0)
        .at(0.0, at(1.0, 1.0))
        .at(0.12, at(-2.0, 0.85))
        .at(0.28, at(1.0, 1.1))
        .at(0.44, at(-0.4, 0.93))
        .at(0.60, at(0.15, 1.03))
        .at(0.78, at(-0.05, 0.99))
        .at(1.0, OffsetScale::REST)
}

// ============================================================================
// Gesture
// ============================================================================

/// Where the popped token is in its life
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenPhase {
    /// Still inside the envelope
    Held,
    /// Travelling from the envelope center to the pointer
    Zipping,
    /// Orbiting the pointer
    Free,
    /// Pointer released
    Dead,
}

/// What a pointer move changed
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureEvent {
    /// The envelope was pulled further or relaxed
    Stretched(Deformation),
    /// The token popped out of the envelope
    Popped { at: Point },
    /// The drop target under the pointer changed
    HoverChanged(Option<EnvelopeId>),
    Moved,
}

/// A release over a drop target
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DropOutcome {
    pub source: EnvelopeId,
    pub target: EnvelopeId,
    pub at: Point,
}

/// Pose of the free token
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TokenPose {
    pub position: Point,
    pub scale: f32,
    /// Degrees
    pub rotation: f32,
}

/// Envelope pose: pulled, wobbling after the pop, or springing back
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoxPose {
    Pulled(Deformation),
    Settling(OffsetScale),
}

impl BoxPose {
    pub fn transform(&self) -> Transform {
        match self {
            BoxPose::Pulled(deformation) => deformation.transform(),
            BoxPose::Settling(pose) => Transform::translate(pose.offset.x, pose.offset.y)
                .then(&Transform::uniform_scale(pose.scale)),
        }
    }
}

/// One press-drag-release on an envelope
pub struct DragGesture {
    config: GestureConfig,
    source: EnvelopeId,
    press: Point,
    box_center: Point,
    pointer: Point,
    phase: TokenPhase,
    deformation: Deformation,
    snap_back: Option<(OffsetScaleAnimation, f64)>,
    spring: Option<Spring2>,
    token: Point,
    velocity: Vec2,
    rotation: f32,
    hover: Option<EnvelopeId>,
    creak: Creak,
    sparks: SparkField,
    last_trail_ms: f64,
    last_frame_ms: Option<f64>,
    rng: StdRng,
}

impl DragGesture {
    /// Start dragging `source`, whose envelope occupies `envelope`
    pub fn press(
        config: GestureConfig,
        source: EnvelopeId,
        envelope: Rect,
        pointer: Point,
        seed: u64,
    ) -> Self {
        debug!(%source, "drag started");
        Self {
            config,
            source,
            press: pointer,
            box_center: envelope.center(),
            pointer,
            phase: TokenPhase::Held,
            deformation: Deformation::REST,
            snap_back: None,
            spring: None,
            token: envelope.center(),
            velocity: Vec2::ZERO,
            rotation: 0.0,
            hover: None,
            creak: Creak::default(),
            sparks: SparkField::default(),
            last_trail_ms: f64::NEG_INFINITY,
            last_frame_ms: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn source(&self) -> EnvelopeId {
        self.source
    }

    pub fn phase(&self) -> TokenPhase {
        self.phase
    }

    /// Drop target currently under the pointer
    pub fn hover(&self) -> Option<EnvelopeId> {
        self.hover
    }

    pub fn sparks(&self) -> &SparkField {
        &self.sparks
    }

    /// Pointer moved to `pointer`
    pub fn move_to(
        &mut self,
        pointer: Point,
        now_ms: f64,
        targets: &DropTargets,
        haptics: &mut dyn Haptics,
    ) -> GestureEvent {
        self.pointer = pointer;
        match self.phase {
            TokenPhase::Held => self.pull(pointer, now_ms, haptics),
            TokenPhase::Zipping | TokenPhase::Free => {
                let hover = targets.hit(pointer);
                if hover != self.hover {
                    trace!(?hover, "drop target hover");
                    self.hover = hover;
                    GestureEvent::HoverChanged(hover)
                } else {
                    GestureEvent::Moved
                }
            }
            TokenPhase::Dead => GestureEvent::Moved,
        }
    }

    fn pull(&mut self, pointer: Point, now_ms: f64, haptics: &mut dyn Haptics) -> GestureEvent {
        let pull = pointer - self.press;
        let distance = pull.length();
        self.deformation = Deformation::for_pull(pull, &self.config);

        let pop = self.config.pop_distance;
        let creak_tension = (distance - pop * 0.2).max(0.0) / (pop * 0.8);
        self.creak.tick(creak_tension.min(1.0), now_ms, haptics);

        if distance < pop {
            return GestureEvent::Stretched(self.deformation);
        }

        debug!(source = %self.source, distance, "token popped");
        self.phase = TokenPhase::Zipping;
        self.snap_back = Some((
            snap_back(self.deformation.offset, self.config.snap_back_ms),
            now_ms,
        ));
        self.deformation = Deformation::REST;
        self.token = self.box_center;
        self.sparks.emit_burst(&mut self.rng, self.box_center, now_ms);
        haptics.vibrate(self.config.pop_buzz_ms);
        GestureEvent::Popped {
            at: self.box_center,
        }
    }

    /// Step the token, the envelope and the sparks by one frame
    pub fn frame(&mut self, now_ms: f64) {
        let dt = self
            .last_frame_ms
            .map(|last| ((now_ms - last) / 1000.0) as f32)
            .unwrap_or(0.0)
            .max(0.0);
        self.last_frame_ms = Some(now_ms);

        if let Some((animation, started)) = &self.snap_back {
            if animation.is_finished(((now_ms - started) / 1000.0) as f32) {
                self.snap_back = None;
            }
        }
        if let Some(spring) = &mut self.spring {
            spring.step(dt);
            if spring.is_settled() {
                self.spring = None;
            }
        }

        match self.phase {
            TokenPhase::Zipping => self.zip(),
            TokenPhase::Free => {
                self.orbit();
                if now_ms - self.last_trail_ms >= self.config.trail_interval_ms {
                    self.sparks.emit_trail(&mut self.rng, self.token, now_ms);
                    self.last_trail_ms = now_ms;
                }
            }
            TokenPhase::Held | TokenPhase::Dead => {}
        }

        self.sparks.update(now_ms);
    }

    fn zip(&mut self) {
        self.token = self.token.lerp(self.pointer, self.config.zip_speed);
        if self.token.distance(self.pointer) < self.config.zip_snap {
            self.token = self.pointer;
            let angle = self.rng.random::<f32>() * std::f32::consts::TAU;
            self.velocity = Vec2::from_angle(angle) * self.config.orbit_launch;
            self.phase = TokenPhase::Free;
            trace!("token free");
        }
    }

    fn orbit(&mut self) {
        let c = &self.config;
        let toward = self.pointer - self.token;
        let distance = toward.length();

        if distance > 1.0 {
            let pull = c.orbit_pull * (distance / 20.0).min(1.5);
            self.velocity += toward * (pull / distance);
        }
        self.velocity += Vec2::new(
            (self.rng.random::<f32>() - 0.5) * c.orbit_wander,
            (self.rng.random::<f32>() - 0.5) * c.orbit_wander,
        );
        self.velocity = self.velocity * c.orbit_damping;
        self.token += self.velocity;

        if distance > c.orbit_leash {
            let push = (distance - c.orbit_leash) * c.orbit_push;
            let away = self.token - self.pointer;
            self.token = self.token - away * (push / distance);
        }

        self.rotation += self.velocity.length() * c.orbit_spin;
    }

    /// Pointer released; returns the drop if the token was over a target
    pub fn release(&mut self, now_ms: f64) -> Option<DropOutcome> {
        let popped = matches!(self.phase, TokenPhase::Zipping | TokenPhase::Free);
        let outcome = match (popped, self.hover) {
            (true, Some(target)) => Some(DropOutcome {
                source: self.source,
                target,
                at: self.pointer,
            }),
            _ => None,
        };

        if self.phase == TokenPhase::Held && self.deformation != Deformation::REST {
            let mut spring = Spring2::new(SpringConfig::release(), self.deformation.offset);
            spring.set_target(Vec2::ZERO);
            self.spring = Some(spring);
        }
        self.deformation = Deformation::REST;
        self.phase = TokenPhase::Dead;
        self.velocity = Vec2::ZERO;
        self.hover = None;
        self.creak.reset();
        self.last_frame_ms.get_or_insert(now_ms);

        debug!(source = %self.source, dropped = outcome.is_some(), "drag released");
        outcome
    }

    /// Envelope pose at `now_ms`
    pub fn box_pose(&self, now_ms: f64) -> BoxPose {
        if let Some((animation, started)) = &self.snap_back {
            let pose = animation
                .sample(((now_ms - started) / 1000.0) as f32)
                .unwrap_or(OffsetScale::REST);
            return BoxPose::Settling(pose);
        }
        if let Some(spring) = &self.spring {
            return BoxPose::Settling(OffsetScale::new(spring.value(), 1.0));
        }
        BoxPose::Pulled(self.deformation)
    }

    /// The token, while it is out of the envelope
    pub fn token(&self) -> Option<TokenPose> {
        match self.phase {
            TokenPhase::Held | TokenPhase::Dead => None,
            TokenPhase::Zipping => Some(TokenPose {
                position: self.token,
                scale: self.config.token_scale,
                rotation: 0.0,
            }),
            TokenPhase::Free => Some(TokenPose {
                position: self.token,
                scale: self.config.token_scale
                    * (1.0 + (self.rotation * 0.1).sin() * self.config.wobble),
                rotation: self.rotation,
            }),
        }
    }

    /// Whether anything still moves: the token, the envelope or sparks
    pub fn is_active(&self) -> bool {
        self.phase != TokenPhase::Dead
            || self.snap_back.is_some()
            || self.spring.is_some()
            || !self.sparks.is_empty()
    }

    /// Draw the token and the sparks; envelopes are drawn by the host
    pub fn render(&self, ctx: &mut dyn DrawContext) {
        self.sparks.render(ctx);
        if let Some(pose) = self.token() {
            draw_token(ctx, pose, self.config.token_radius);
        }
    }
}

/// Gold coin with a dollar sign, centered on the pose
pub(crate) fn draw_token(ctx: &mut dyn DrawContext, pose: TokenPose, radius: f32) {
    let transform = Transform::placed(pose.position, pose.rotation.to_radians())
        .then(&Transform::uniform_scale(pose.scale));
    ctx.with_transform(transform, |ctx| {
        ctx.fill_circle(Point::ZERO, radius, Color::from_hex(0xFFC107).into());
        ctx.draw_text(
            "$",
            Point::ZERO,
            &TextStyle::new(radius)
                .with_weight(FontWeight::Bold)
                .with_color(Color::from_hex(0x8D6E00))
                .with_align(TextAlign::Center)
                .with_baseline(TextBaseline::Middle),
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haptics::RecordingHaptics;
    use coinfx_core::{RecordingContext, Size};

    const FRAME_MS: f64 = 1000.0 / 60.0;

    fn envelope() -> Rect {
        Rect::new(0.0, 0.0, 80.0, 80.0)
    }

    fn targets() -> DropTargets {
        let mut targets = DropTargets::new();
        targets.set(EnvelopeId(101), Rect::new(200.0, 0.0, 100.0, 100.0));
        targets
    }

    fn pressed() -> DragGesture {
        DragGesture::press(
            GestureConfig::default(),
            EnvelopeId(1),
            envelope(),
            Point::new(40.0, 40.0),
            11,
        )
    }

    /// Drag along +x to `distance` pixels from the press point
    fn drag(
        gesture: &mut DragGesture,
        distance: f32,
        now_ms: f64,
        haptics: &mut RecordingHaptics,
    ) -> GestureEvent {
        gesture.move_to(Point::new(40.0 + distance, 40.0), now_ms, &targets(), haptics)
    }

    #[test]
    fn test_rubber_band_deformation() {
        let config = GestureConfig::default();
        let at_pop = Deformation::for_pull(Vec2::new(80.0, 0.0), &config);
        assert!((at_pop.offset.x - 20.0 * (1.0 - (-1.0f32).exp())).abs() < 1e-4);
        assert_eq!(at_pop.tension, 1.0);
        assert!((at_pop.stretch - 1.25).abs() < 1e-6);
        assert!((at_pop.squash - 0.88).abs() < 1e-6);

        // Never past the drag limit
        let far = Deformation::for_pull(Vec2::new(0.0, 5000.0), &config);
        assert!(far.offset.length() <= 20.0);
        assert_eq!(Deformation::for_pull(Vec2::ZERO, &config).offset, Vec2::ZERO);
    }

    #[test]
    fn test_creaks_then_pops() {
        let mut gesture = pressed();
        let mut haptics = RecordingHaptics::new();

        // Below 20% of the pop distance: no creak
        assert!(matches!(
            drag(&mut gesture, 10.0, 0.0, &mut haptics),
            GestureEvent::Stretched(_)
        ));
        assert!(haptics.pulses().is_empty());

        let mut now = 0.0;
        for step in 0..40 {
            now += 10.0;
            drag(&mut gesture, 20.0 + step as f32 * 1.5, now, &mut haptics);
        }
        assert!(!haptics.pulses().is_empty());
        assert!(haptics.pulses().iter().all(|ms| (8..=16).contains(ms)));
        assert_eq!(gesture.phase(), TokenPhase::Held);

        let event = drag(&mut gesture, 80.0, now + 10.0, &mut haptics);
        assert_eq!(event, GestureEvent::Popped { at: Point::new(40.0, 40.0) });
        assert_eq!(haptics.pulses().last(), Some(&40));
        assert_eq!(gesture.phase(), TokenPhase::Zipping);
        assert_eq!(gesture.sparks().len(), 5);
        assert!(matches!(gesture.box_pose(now + 10.0), BoxPose::Settling(_)));
    }

    #[test]
    fn test_zip_then_orbit_near_pointer() {
        let mut gesture = pressed();
        let mut haptics = RecordingHaptics::new();
        drag(&mut gesture, 90.0, 0.0, &mut haptics);

        let mut now = 0.0;
        for _ in 0..30 {
            now += FRAME_MS;
            gesture.frame(now);
        }
        assert_eq!(gesture.phase(), TokenPhase::Free);

        for _ in 0..600 {
            now += FRAME_MS;
            gesture.frame(now);
            let token = gesture.token().unwrap();
            assert!(token.position.distance(Point::new(130.0, 40.0)) < 80.0);
            assert!(token.scale > 0.6 && token.scale < 0.8);
        }
        // Snap-back has finished; trail sparks keep coming while free
        assert_eq!(gesture.box_pose(now), BoxPose::Pulled(Deformation::REST));
        assert!(!gesture.sparks().is_empty());
    }

    #[test]
    fn test_drop_on_target() {
        let mut gesture = pressed();
        let mut haptics = RecordingHaptics::new();
        drag(&mut gesture, 90.0, 0.0, &mut haptics);

        let event = gesture.move_to(Point::new(250.0, 50.0), 20.0, &targets(), &mut haptics);
        assert_eq!(event, GestureEvent::HoverChanged(Some(EnvelopeId(101))));

        let outcome = gesture.release(30.0);
        assert_eq!(
            outcome,
            Some(DropOutcome {
                source: EnvelopeId(1),
                target: EnvelopeId(101),
                at: Point::new(250.0, 50.0),
            })
        );
        assert_eq!(gesture.phase(), TokenPhase::Dead);
        assert!(gesture.token().is_none());
    }

    #[test]
    fn test_release_before_pop_springs_back() {
        let mut gesture = pressed();
        let mut haptics = RecordingHaptics::new();
        drag(&mut gesture, 60.0, 0.0, &mut haptics);
        assert_eq!(gesture.release(10.0), None);
        assert!(matches!(gesture.box_pose(10.0), BoxPose::Settling(_)));

        let mut now = 10.0;
        while gesture.is_active() && now < 5000.0 {
            now += FRAME_MS;
            gesture.frame(now);
        }
        assert!(!gesture.is_active());
        assert_eq!(gesture.box_pose(now), BoxPose::Pulled(Deformation::REST));
    }

    #[test]
    fn test_render_token_and_sparks() {
        let mut gesture = pressed();
        let mut haptics = RecordingHaptics::new();
        drag(&mut gesture, 90.0, 0.0, &mut haptics);
        gesture.frame(FRAME_MS);

        let mut ctx = RecordingContext::new(Size::new(400.0, 400.0));
        gesture.render(&mut ctx);
        // Five burst sparks, the coin and its label
        assert_eq!(ctx.draw_call_count(), 7);
        assert_eq!(ctx.transform_depth(), 0);
    }
}
