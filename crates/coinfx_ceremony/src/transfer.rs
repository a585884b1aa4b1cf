//! Coin transfer
//!
//! Tokens burst out of the source envelope one after another, are pulled into
//! the target by an inverse-square attraction and vanish when they come close.
//! Every landing pulses the target a little harder; the last one adds a bounce.
//!
//! Each token carries its own [`TokenState`]. The transfer as a whole is active
//! until every token is absorbed and the target has finished bouncing, so a
//! [`FrameLoop`](coinfx_animation::FrameLoop) completion callback fires exactly
//! once, after the last landing.

use std::f32::consts::TAU;

use coinfx_animation::{Animation, Easing, FloatAnimation};
use coinfx_core::{DrawContext, DrawContextExt, Point, Size, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::badge::FloatingBadge;
use crate::gesture::{draw_token, TokenPose};
use crate::haptics::Haptics;
use crate::sparks::SparkField;

/// Transfers are simulated in fixed 60 Hz steps
const STEP_SECONDS: f32 = 1.0 / 60.0;

/// Steps run per frame at most after a stall
const MAX_CATCH_UP: u32 = 4;

const TOKEN_RADIUS: f32 = 14.0;

/// Transfer tuning; velocities and forces are per 60 Hz step
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub count: usize,
    pub emit_speed: f32,
    /// Width of the random angle added to each evenly spaced launch direction
    pub launch_spread: f32,
    /// Added to the launch velocity's y component
    pub launch_lift: f32,
    /// Width of the random spin, degrees per step
    pub spin: f32,
    pub stagger_ms: f32,
    /// Wait before the first launch
    pub delay_ms: f32,
    pub gravity: f32,
    /// Inverse-square boost: force is `gravity * max(1, attraction / d²)`
    pub attraction: f32,
    /// Constant pull towards the target
    pub pull: f32,
    pub drag: f32,
    pub absorb_radius: f32,
    /// Velocity kept after bouncing off a viewport edge; `None` lets tokens leave
    pub wall_bounce: Option<f32>,
    pub wall_margin: f32,
    /// Scale gained per step until the token is full size
    pub grow: f32,
    /// Tokens shrink within this distance of the target
    pub approach: f32,
    pub min_scale: f32,
    pub trail_every: u32,
    pub trail_speed: f32,
    pub trail_distance: f32,
    pub pulse_base: f32,
    pub pulse_gain: f32,
    pub pulse_ms: f32,
    pub bounce_delay_ms: f32,
    pub bounce_ms: f32,
    /// Scales between the rest keys of the final bounce
    pub bounce_keys: [f32; 3],
    /// Source envelope deflate; `None` leaves the source alone
    pub deflate_ms: Option<f32>,
    pub start_buzz: Option<u32>,
    pub land_buzz: u32,
    pub final_buzz: u32,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self::leftover()
    }
}

impl TransferConfig {
    /// Dragging a leftover balance onto income or savings
    pub fn leftover() -> Self {
        Self {
            count: 5,
            emit_speed: 2.0,
            launch_spread: 0.6,
            launch_lift: 0.0,
            spin: 3.0,
            stagger_ms: 80.0,
            delay_ms: 0.0,
            gravity: 0.08,
            attraction: 8000.0,
            pull: 0.25,
            drag: 0.98,
            absorb_radius: 45.0,
            wall_bounce: Some(0.6),
            wall_margin: 16.0,
            grow: 0.08,
            approach: 60.0,
            min_scale: 0.3,
            trail_every: 6,
            trail_speed: 3.0,
            trail_distance: 60.0,
            pulse_base: 1.04,
            pulse_gain: 0.08,
            pulse_ms: 200.0,
            bounce_delay_ms: 50.0,
            bounce_ms: 350.0,
            bounce_keys: [1.15, 0.96, 1.04],
            deflate_ms: Some(1200.0),
            start_buzz: Some(20),
            land_buzz: 8,
            final_buzz: 25,
        }
    }

    /// Funding an allocated envelope from income or savings
    pub fn allocation(amount: f64, delay_ms: f32) -> Self {
        Self {
            count: allocation_coins(amount),
            emit_speed: 2.5,
            launch_lift: -1.0,
            spin: 4.0,
            stagger_ms: 60.0,
            delay_ms,
            gravity: 0.12,
            attraction: 6000.0,
            pull: 0.0,
            absorb_radius: 40.0,
            wall_bounce: None,
            grow: 0.12,
            approach: 50.0,
            min_scale: 0.4,
            trail_every: 8,
            trail_distance: 50.0,
            pulse_base: 1.03,
            pulse_gain: 0.06,
            pulse_ms: 150.0,
            bounce_delay_ms: 30.0,
            bounce_ms: 300.0,
            bounce_keys: [1.12, 0.97, 1.03],
            deflate_ms: None,
            start_buzz: None,
            land_buzz: 6,
            final_buzz: 20,
            ..Self::leftover()
        }
    }
}

/// Tokens sent for an allocation of `amount` dollars: one per $150, 2 to 4
pub fn allocation_coins(amount: f64) -> usize {
    ((amount / 150.0).floor().max(2.0) as usize).min(4)
}

// ============================================================================
// Tokens
// ============================================================================

/// Life of one transfer token
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenState {
    /// Not launched yet
    Waiting,
    Flying,
    Absorbed,
}

#[derive(Clone, Debug)]
struct Token {
    state: TokenState,
    launch_ms: f32,
    position: Point,
    velocity: Vec2,
    scale: f32,
    rotation: f32,
    spin: f32,
    trail_frame: u32,
}

// ============================================================================
// Transfer
// ============================================================================

/// Tokens flying from one envelope into another
pub struct CoinTransfer {
    config: TransferConfig,
    source: Point,
    target: Point,
    viewport: Size,
    tokens: Vec<Token>,
    landed: usize,
    steps: u32,
    elapsed: f32,
    started: bool,
    all_landed_at: Option<f32>,
    pulse: Option<(FloatAnimation, f32)>,
    bounce: Option<(FloatAnimation, f32)>,
    deflate: Option<FloatAnimation>,
    badge: Option<FloatingBadge>,
    sparks: SparkField,
    haptics: Box<dyn Haptics>,
    rng: StdRng,
}

impl CoinTransfer {
    pub fn new(
        config: TransferConfig,
        source: Point,
        target: Point,
        viewport: Size,
        haptics: Box<dyn Haptics>,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let count = config.count;
        let tokens = (0..count)
            .map(|i| {
                let angle = TAU / count as f32 * i as f32
                    + (rng.random::<f32>() - 0.5) * config.launch_spread;
                let speed = config.emit_speed * (0.8 + rng.random::<f32>() * 0.4);
                let velocity =
                    Vec2::from_angle(angle) * speed + Vec2::new(0.0, config.launch_lift);
                Token {
                    state: TokenState::Waiting,
                    launch_ms: config.delay_ms + i as f32 * config.stagger_ms,
                    position: source,
                    velocity,
                    scale: 0.0,
                    rotation: 0.0,
                    spin: (rng.random::<f32>() - 0.5) * config.spin,
                    trail_frame: 0,
                }
            })
            .collect();

        let deflate = config.deflate_ms.map(|ms| {
            FloatAnimation::new(ms / 1000.0)
                .at(0.0, 1.0)
                .keyframe(0.3, 0.88, Easing::EaseInOut)
                .keyframe(0.7, 0.92, Easing::EaseInOut)
                .keyframe(1.0, 1.0, Easing::EaseInOut)
        });

        debug!(tokens = count, distance = source.distance(target), "transfer created");
        Self {
            config,
            source,
            target,
            viewport,
            tokens,
            landed: 0,
            steps: 0,
            elapsed: 0.0,
            started: false,
            all_landed_at: None,
            pulse: None,
            bounce: None,
            deflate,
            badge: None,
            sparks: SparkField::default(),
            haptics,
            rng,
        }
    }

    /// Show a `+$amount` badge at `anchor` when the transfer starts
    pub fn with_badge(mut self, amount: f64, anchor: Point) -> Self {
        self.badge = Some(FloatingBadge::new(amount, anchor, 0.0));
        self
    }

    pub fn source(&self) -> Point {
        self.source
    }

    pub fn target(&self) -> Point {
        self.target
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn landed(&self) -> usize {
        self.landed
    }

    pub fn launched(&self) -> usize {
        self.tokens
            .iter()
            .filter(|t| t.state != TokenState::Waiting)
            .count()
    }

    pub fn token_states(&self) -> impl Iterator<Item = TokenState> + '_ {
        self.tokens.iter().map(|t| t.state)
    }

    /// Every token has been absorbed
    pub fn is_landed(&self) -> bool {
        self.all_landed_at.is_some()
    }

    pub fn badge(&self) -> Option<&FloatingBadge> {
        self.badge.as_ref()
    }

    /// Scale of the target envelope: landing pulses, then the final bounce
    pub fn target_scale(&self) -> f32 {
        let sample = |(animation, started): &(FloatAnimation, f32)| {
            let local = self.elapsed - started;
            (!animation.is_finished(local)).then(|| animation.sample(local).unwrap_or(1.0))
        };
        self.bounce
            .as_ref()
            .and_then(sample)
            .or_else(|| self.pulse.as_ref().and_then(sample))
            .unwrap_or(1.0)
    }

    /// Scale of the source envelope while it deflates
    pub fn source_scale(&self) -> f32 {
        self.deflate
            .as_ref()
            .and_then(|d| d.sample(self.elapsed))
            .unwrap_or(1.0)
    }

    fn step(&mut self) {
        let now_ms = self.steps as f32 * STEP_SECONDS * 1000.0;
        self.steps += 1;
        let c = &self.config;
        let total = self.tokens.len().max(1) as f32;

        for token in &mut self.tokens {
            if token.state == TokenState::Waiting && now_ms >= token.launch_ms {
                token.state = TokenState::Flying;
            }
            if token.state != TokenState::Flying {
                continue;
            }

            token.scale = (token.scale + c.grow).min(1.0);

            let toward = self.target - token.position;
            let dist_sq = toward.length_squared();
            let dist = dist_sq.sqrt();
            if dist > 0.0 {
                let force = c.gravity * (c.attraction / dist_sq).max(1.0) + c.pull;
                token.velocity += toward * (force / dist);
            }
            token.velocity = token.velocity * c.drag;
            token.position += token.velocity;
            token.rotation += token.spin;

            if let Some(keep) = c.wall_bounce {
                let m = c.wall_margin;
                let (w, h) = (self.viewport.width, self.viewport.height);
                if token.position.x < m {
                    token.position.x = m;
                    token.velocity.x = token.velocity.x.abs() * keep;
                }
                if token.position.x > w - m {
                    token.position.x = w - m;
                    token.velocity.x = -token.velocity.x.abs() * keep;
                }
                if token.position.y < m {
                    token.position.y = m;
                    token.velocity.y = token.velocity.y.abs() * keep;
                }
                if token.position.y > h - m {
                    token.position.y = h - m;
                    token.velocity.y = -token.velocity.y.abs() * keep;
                }
            }

            token.trail_frame += 1;
            if c.trail_every > 0
                && token.trail_frame % c.trail_every == 0
                && token.velocity.length() > c.trail_speed
                && dist > c.trail_distance
            {
                self.sparks.emit_trail(&mut self.rng, token.position, now_ms as f64);
            }

            if dist < c.absorb_radius {
                token.state = TokenState::Absorbed;
                self.landed += 1;
                self.haptics.vibrate(c.land_buzz);

                let peak = c.pulse_base + self.landed as f32 / total * c.pulse_gain;
                trace!(landed = self.landed, peak, "token absorbed");
                self.pulse = Some((pulse(peak, c.pulse_ms), self.elapsed));
            }
        }
    }
}

/// Rest, `peak`, rest with the springy back-out curve
fn pulse(peak: f32, duration_ms: f32) -> FloatAnimation {
    FloatAnimation::new(duration_ms / 1000.0)
        .at(0.0, 1.0)
        .keyframe(0.5, peak, Easing::SPRINGY)
        .keyframe(1.0, 1.0, Easing::SPRINGY)
}

fn bounce(keys: [f32; 3], duration_ms: f32) -> FloatAnimation {
    FloatAnimation::new(duration_ms / 1000.0)
        .at(0.0, 1.0)
        .at(0.25, keys[0])
        .at(0.5, keys[1])
        .at(0.75, keys[2])
        .at(1.0, 1.0)
}

impl Animation for CoinTransfer {
    fn name(&self) -> &str {
        "coin_transfer"
    }

    fn update(&mut self, elapsed: f32) -> bool {
        self.elapsed = elapsed;
        if !self.started {
            self.started = true;
            if let Some(ms) = self.config.start_buzz {
                self.haptics.vibrate(ms);
            }
        }

        let due = (elapsed / STEP_SECONDS).floor() as u32 + 1;
        let mut budget = MAX_CATCH_UP;
        while self.steps < due && budget > 0 {
            self.step();
            budget -= 1;
        }

        if self.all_landed_at.is_none() && self.landed == self.tokens.len() {
            debug!(landed = self.landed, elapsed, "all tokens landed");
            self.all_landed_at = Some(elapsed);
        }
        if let Some(landed_at) = self.all_landed_at {
            let bounce_at = landed_at + self.config.bounce_delay_ms / 1000.0;
            if self.bounce.is_none() && elapsed >= bounce_at {
                self.bounce = Some((
                    bounce(self.config.bounce_keys, self.config.bounce_ms),
                    elapsed,
                ));
                self.haptics.vibrate(self.config.final_buzz);
            }
        }

        self.sparks.update(elapsed as f64 * 1000.0);

        let decorating = self
            .bounce
            .as_ref()
            .map_or(true, |(b, started)| !b.is_finished(elapsed - started))
            || self
                .deflate
                .as_ref()
                .is_some_and(|d| !d.is_finished(elapsed))
            || self.badge.as_ref().is_some_and(|b| !b.is_finished(elapsed))
            || !self.sparks.is_empty();
        !self.is_landed() || decorating
    }

    fn render(&self, ctx: &mut dyn DrawContext) {
        ctx.clear_surface();
        self.sparks.render(ctx);

        for token in &self.tokens {
            if token.state != TokenState::Flying {
                continue;
            }
            let dist = token.position.distance(self.target);
            let approach = (dist / self.config.approach).min(1.0);
            let scale =
                token.scale * (self.config.min_scale + approach * (1.0 - self.config.min_scale));
            let opacity = (dist / 20.0).min(1.0);
            if opacity <= 0.0 || scale <= 0.0 {
                continue;
            }
            let pose = TokenPose {
                position: token.position,
                scale,
                rotation: token.rotation,
            };
            ctx.with_opacity(opacity, |ctx| draw_token(ctx, pose, TOKEN_RADIUS));
        }

        if let Some(badge) = &self.badge {
            badge.render(ctx, self.elapsed);
        }
    }

    fn release(&mut self) {
        self.tokens.clear();
        self.sparks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haptics::RecordingHaptics;
    use coinfx_animation::{FrameLoop, LoopState};
    use coinfx_core::RecordingContext;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const VIEWPORT: Size = Size::new(412.0, 915.0);

    fn transfer(config: TransferConfig, haptics: &Rc<RefCell<RecordingHaptics>>) -> CoinTransfer {
        CoinTransfer::new(
            config,
            Point::new(100.0, 700.0),
            Point::new(300.0, 150.0),
            VIEWPORT,
            Box::new(haptics.clone()),
            21,
        )
    }

    #[test]
    fn test_allocation_coin_count() {
        assert_eq!(allocation_coins(0.0), 2);
        assert_eq!(allocation_coins(299.0), 2);
        assert_eq!(allocation_coins(450.0), 3);
        assert_eq!(allocation_coins(5000.0), 4);
        assert_eq!(TransferConfig::allocation(600.0, 75.0).count, 4);
    }

    #[test]
    fn test_staggered_launch() {
        let haptics = Rc::new(RefCell::new(RecordingHaptics::new()));
        let mut coins = transfer(TransferConfig::leftover(), &haptics);
        let mut t = 0.0;
        while t < 0.1 {
            coins.update(t);
            t += STEP_SECONDS;
        }
        // Launches at 0 ms and 80 ms only
        assert_eq!(coins.launched(), 2);
        assert_eq!(haptics.borrow().pulses().first(), Some(&20));
    }

    #[test]
    fn test_completes_once_after_every_landing() {
        let haptics = Rc::new(RefCell::new(RecordingHaptics::new()));
        let completions = Rc::new(Cell::new(0));

        let coins = transfer(TransferConfig::leftover(), &haptics);
        let mut frame_loop = FrameLoop::new(coins).on_complete({
            let completions = completions.clone();
            move || completions.set(completions.get() + 1)
        });
        let mut ctx = RecordingContext::new(VIEWPORT);

        let mut frame = 0;
        while frame_loop.wants_frame() && frame < 1200 {
            frame_loop.frame(frame as f64 * 1000.0 / 60.0, &mut ctx);
            frame += 1;
        }
        assert_eq!(frame_loop.state(), LoopState::Completed);
        assert_eq!(completions.get(), 1);
        assert_eq!(ctx.transform_depth(), 0);
        assert_eq!(ctx.opacity_depth(), 0);

        let pulses = haptics.borrow().pulses().to_vec();
        assert_eq!(pulses.first(), Some(&20));
        assert_eq!(pulses.iter().filter(|ms| **ms == 8).count(), 5);
        assert_eq!(pulses.last(), Some(&25));
    }

    #[test]
    fn test_balance_moves_only_from_completion() {
        use crate::envelope::EnvelopeId;
        use crate::leftovers::Leftovers;

        let haptics = Rc::new(RefCell::new(RecordingHaptics::new()));
        let leftovers = Rc::new(RefCell::new(Leftovers::demo()));
        let (id, amount) = {
            let mut leftovers = leftovers.borrow_mut();
            let id = leftovers
                .begin_transfer(EnvelopeId(1), EnvelopeId::INCOME)
                .unwrap();
            (id, leftovers.transfer(id).unwrap().amount)
        };
        assert!(amount > 0.0);
        let before = leftovers.borrow().target_balance(EnvelopeId::INCOME).unwrap();

        let mut frame_loop =
            FrameLoop::new(transfer(TransferConfig::leftover(), &haptics)).on_complete({
                let leftovers = leftovers.clone();
                move || {
                    leftovers.borrow_mut().settle(id).unwrap();
                }
            });
        let mut ctx = RecordingContext::new(VIEWPORT);

        let mut frame = 0;
        while frame_loop.wants_frame() && frame < 1200 {
            frame_loop.frame(frame as f64 * 1000.0 / 60.0, &mut ctx);
            let balance = leftovers.borrow().target_balance(EnvelopeId::INCOME).unwrap();
            if frame_loop.state() == LoopState::Completed {
                assert!((balance - (before + amount)).abs() < 1e-9);
            } else {
                assert_eq!(balance, before);
            }
            frame += 1;
        }
        assert_eq!(frame_loop.state(), LoopState::Completed);

        let leftovers = leftovers.borrow();
        assert!(leftovers.transfer(id).unwrap().settled);
        assert!((leftovers.added_to(EnvelopeId::INCOME) - amount).abs() < 1e-9);
        assert!(leftovers.decision().was_transferred(EnvelopeId(1)));
    }

    #[test]
    fn test_tokens_stay_on_screen_and_pulse_grows() {
        let haptics = Rc::new(RefCell::new(RecordingHaptics::new()));
        let mut coins = transfer(TransferConfig::leftover(), &haptics);

        let mut t = 0.0;
        let mut peak = 1.0_f32;
        while !coins.is_landed() && t < 20.0 {
            coins.update(t);
            for token in &coins.tokens {
                assert!(token.position.x >= 16.0 && token.position.x <= VIEWPORT.width - 16.0);
                assert!(token.position.y >= 16.0 && token.position.y <= VIEWPORT.height - 16.0);
            }
            peak = peak.max(coins.target_scale());
            t += STEP_SECONDS;
        }
        assert_eq!(coins.landed(), 5);
        assert!(coins.token_states().all(|s| s == TokenState::Absorbed));
        assert!(peak > 1.04);
        // The source deflates below rest
        assert!(coins.source_scale() <= 1.0);
    }

    #[test]
    fn test_badge_text() {
        let haptics = Rc::new(RefCell::new(RecordingHaptics::new()));
        let coins = transfer(TransferConfig::leftover(), &haptics)
            .with_badge(38.5, Point::new(300.0, 120.0));
        assert_eq!(coins.badge().map(|b| b.text()), Some("+$38"));
    }
}
