//! Coin piles
//!
//! Coins pour into a walled box until it is full, sit for a moment, then the
//! box opens and they all leave the screen. A falling pile fills from the top
//! and drops through the floor; a floating pile fills from the bottom under
//! negative gravity and escapes through the ceiling.

use coinfx_animation::{Animation, Phase, PhaseTimeline, Stage};
use coinfx_core::{Bounds, DrawContext, EdgeInsets, Point, Size, Vec2};
use coinfx_physics::{
    BodyDesc, BodyId, BodyShape, Material, PhysicsConfig, PhysicsWorld, RampSpawner, SpawnRamp,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::config::{EffectConfig, Range, Sanitizer};
use crate::error::ConfigError;
use crate::renderer::{CoinImage, Renderer, Sprite};
use crate::resource::ImageHandle;

/// Thickness of walls, floor and ceiling
const WALL_THICKNESS: f32 = 40.0;

/// Which way the coins go
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PileDirection {
    /// Fill from the top, drop through the floor
    #[default]
    Fall,
    /// Fill from the bottom, rise through the ceiling
    Float,
}

impl PileDirection {
    /// Boundary removed on release
    fn exit(self, viewport: Size) -> (Point, BodyShape) {
        let shape = BodyShape::rect(viewport.width + WALL_THICKNESS * 2.0, WALL_THICKNESS);
        let y = match self {
            PileDirection::Fall => viewport.height + WALL_THICKNESS / 2.0,
            PileDirection::Float => -WALL_THICKNESS / 2.0,
        };
        (Point::new(viewport.width / 2.0, y), shape)
    }

    /// Vertical spawn position for a coin of radius `r`
    fn spawn_y(self, viewport: Size, r: f32, jitter: f32) -> f32 {
        match self {
            PileDirection::Fall => -r * 2.0 - jitter * 80.0,
            PileDirection::Float => viewport.height + r + jitter * 100.0,
        }
    }

    /// Region a coin must be in to keep the release phase going
    fn remaining(self, viewport: Size) -> Bounds {
        match self {
            PileDirection::Fall => Bounds::new(
                f32::NEG_INFINITY,
                f32::NEG_INFINITY,
                f32::INFINITY,
                viewport.height + 200.0,
            ),
            PileDirection::Float => {
                Bounds::new(f32::NEG_INFINITY, -200.0, f32::INFINITY, f32::INFINITY)
            }
        }
    }

    fn cull(self) -> EdgeInsets {
        match self {
            PileDirection::Fall => {
                EdgeInsets::new(f32::INFINITY, f32::INFINITY, f32::INFINITY, 300.0)
            }
            PileDirection::Float => {
                EdgeInsets::new(f32::INFINITY, 300.0, f32::INFINITY, f32::INFINITY)
            }
        }
    }
}

// ============================================================================
// Config
// ============================================================================

/// Coin pile settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PileConfig {
    pub direction: PileDirection,
    pub count: usize,
    /// Largest spawn batch, reached as the pile fills
    pub max_per_tick: usize,
    /// Milliseconds between spawn batches
    pub interval_ms: f32,
    /// Milliseconds the full pile is held before the box opens
    pub hold_ms: f32,
    /// Vertical gravity in gravity units; negative floats upwards
    pub gravity: f32,
    /// Coin collider radius in pixels
    pub radius: Range,
    /// Collider radius divided by the drawn radius
    pub image_inset: f32,
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
    pub air_friction: f32,
}

impl Default for PileConfig {
    fn default() -> Self {
        Self::fall()
    }
}

impl PileConfig {
    /// 150 coins falling under gravity 1.2
    pub fn fall() -> Self {
        Self {
            direction: PileDirection::Fall,
            count: 150,
            max_per_tick: 4,
            interval_ms: 20.0,
            hold_ms: 800.0,
            gravity: 1.2,
            radius: Range::new(22.0, 50.0),
            image_inset: 0.85,
            restitution: 0.3,
            friction: 0.3,
            density: 0.002,
            air_friction: 0.01,
        }
    }

    /// 120 coins floating up under gravity -1.8
    pub fn float() -> Self {
        Self {
            direction: PileDirection::Float,
            count: 120,
            max_per_tick: 3,
            interval_ms: 25.0,
            hold_ms: 1000.0,
            gravity: -1.8,
            restitution: 0.4,
            ..Self::fall()
        }
    }

    pub fn ramp(&self) -> SpawnRamp {
        SpawnRamp::new(self.count, self.max_per_tick, self.interval_ms)
    }

    pub fn material(&self) -> Material {
        Material::default()
            .with_restitution(self.restitution)
            .with_friction(self.friction)
            .with_density(self.density)
            .with_air_friction(self.air_friction)
    }
}

impl EffectConfig for PileConfig {
    fn sanitize(self) -> (Self, Vec<ConfigError>) {
        let mut s = Sanitizer::new();
        let mut radius = s.range("pile.radius", self.radius);
        if radius.min <= 0.0 {
            s.within("pile.radius.min", radius.min, 1.0, f32::MAX);
            radius = Range::new(radius.min.max(1.0), radius.max.max(1.0));
        }
        let config = Self {
            direction: self.direction,
            count: s.count("pile.count", self.count),
            max_per_tick: self.max_per_tick.max(1),
            interval_ms: s.time("pile.interval_ms", self.interval_ms),
            hold_ms: s.time("pile.hold_ms", self.hold_ms),
            gravity: s.finite("pile.gravity", self.gravity, 1.0),
            radius,
            image_inset: s.within("pile.image_inset", self.image_inset, 0.1, 1.0),
            restitution: s.within("pile.restitution", self.restitution, 0.0, 1.0),
            friction: s.within("pile.friction", self.friction, 0.0, 1.0),
            density: s.within("pile.density", self.density, 1e-6, 1.0),
            air_friction: s.within("pile.air_friction", self.air_friction, 0.0, 0.99),
        };
        (config, s.finish())
    }
}

/// A config table where every field is optional
///
/// Lets a config file override a few fields of either preset.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PileTable {
    direction: Option<PileDirection>,
    count: Option<usize>,
    max_per_tick: Option<usize>,
    interval_ms: Option<f32>,
    hold_ms: Option<f32>,
    gravity: Option<f32>,
    radius: Option<Range>,
    image_inset: Option<f32>,
    restitution: Option<f32>,
    friction: Option<f32>,
    density: Option<f32>,
    air_friction: Option<f32>,
}

impl PileTable {
    fn over(self, preset: PileConfig) -> PileConfig {
        PileConfig {
            direction: self.direction.unwrap_or(preset.direction),
            count: self.count.unwrap_or(preset.count),
            max_per_tick: self.max_per_tick.unwrap_or(preset.max_per_tick),
            interval_ms: self.interval_ms.unwrap_or(preset.interval_ms),
            hold_ms: self.hold_ms.unwrap_or(preset.hold_ms),
            gravity: self.gravity.unwrap_or(preset.gravity),
            radius: self.radius.unwrap_or(preset.radius),
            image_inset: self.image_inset.unwrap_or(preset.image_inset),
            restitution: self.restitution.unwrap_or(preset.restitution),
            friction: self.friction.unwrap_or(preset.friction),
            density: self.density.unwrap_or(preset.density),
            air_friction: self.air_friction.unwrap_or(preset.air_friction),
        }
    }
}

/// Deserialize a partial table over the falling preset
pub(crate) fn fall_table<'de, D: Deserializer<'de>>(d: D) -> Result<PileConfig, D::Error> {
    PileTable::deserialize(d).map(|table| table.over(PileConfig::fall()))
}

/// Deserialize a partial table over the floating preset
pub(crate) fn float_table<'de, D: Deserializer<'de>>(d: D) -> Result<PileConfig, D::Error> {
    PileTable::deserialize(d).map(|table| table.over(PileConfig::float()))
}

// ============================================================================
// Effect
// ============================================================================

/// Payload of a coin body
#[derive(Clone, Copy, Debug, PartialEq)]
struct Coin {
    radius: f32,
}

/// A pile of physics coins that fills, holds, and empties
pub struct CoinPile {
    config: PileConfig,
    viewport: Size,
    image: ImageHandle,
    rng: StdRng,
    world: PhysicsWorld<Coin>,
    exit: Option<BodyId>,
    spawner: RampSpawner,
    timeline: PhaseTimeline<Stage>,
    renderer: Renderer,
}

impl CoinPile {
    pub fn new(config: PileConfig, viewport: Size, image: ImageHandle, seed: u64) -> Self {
        let (config, _) = config.sanitize();
        let mut world = PhysicsWorld::new(
            PhysicsConfig::default().with_gravity(Vec2::new(0.0, config.gravity)),
        );

        let side = BodyShape::rect(WALL_THICKNESS, viewport.height * 2.0);
        let walls = [
            BodyDesc::fixed(
                side.clone(),
                Point::new(-WALL_THICKNESS / 2.0, viewport.height / 2.0),
            ),
            BodyDesc::fixed(
                side,
                Point::new(viewport.width + WALL_THICKNESS / 2.0, viewport.height / 2.0),
            ),
        ];
        for wall in walls {
            if let Err(err) = world.add_static(wall) {
                warn!(%err, "pile wall rejected");
            }
        }
        let (exit_position, exit_shape) = config.direction.exit(viewport);
        let exit = match world.add_static(BodyDesc::fixed(exit_shape, exit_position)) {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(%err, "pile exit boundary rejected");
                None
            }
        };

        debug!(direction = ?config.direction, count = config.count, "coin pile created");
        Self {
            spawner: RampSpawner::new(config.ramp()),
            renderer: Renderer::new(config.direction.cull()),
            config,
            viewport,
            image,
            rng: StdRng::seed_from_u64(seed),
            world,
            exit,
            timeline: PhaseTimeline::new(Stage::Spawn, 0.0),
        }
    }

    pub fn stage(&self) -> Stage {
        self.timeline.current()
    }

    pub fn timeline(&self) -> &PhaseTimeline<Stage> {
        &self.timeline
    }

    /// Coins created so far
    pub fn coin_count(&self) -> usize {
        self.world.dynamic_count()
    }

    /// Whether the floor (or ceiling) is still in place
    pub fn is_closed(&self) -> bool {
        self.exit.is_some()
    }

    fn spawn_coin(&mut self) {
        let radius = self.config.radius.sample(&mut self.rng);
        let span = (self.viewport.width - radius * 2.0).max(0.0);
        let x = radius + self.rng.random::<f32>() * span;
        let jitter = self.rng.random::<f32>();
        let y = self.config.direction.spawn_y(self.viewport, radius, jitter);

        let desc = BodyDesc::dynamic(BodyShape::ball(radius), Point::new(x, y))
            .with_material(self.config.material());
        if let Err(err) = self.world.add_body(desc, Coin { radius }) {
            warn!(%err, "coin rejected");
        }
    }

    fn transition(&mut self, next: Stage, now: f32) {
        if let Err(err) = self.timeline.advance(next, now) {
            warn!(%err, "pile phase transition rejected");
        }
    }

    fn open(&mut self) {
        if let Some(exit) = self.exit.take() {
            if let Err(err) = self.world.remove_body(exit) {
                warn!(%err, "exit boundary already gone");
            }
            debug!(direction = ?self.config.direction, "pile opened");
        }
    }
}

impl Animation for CoinPile {
    fn name(&self) -> &str {
        match self.config.direction {
            PileDirection::Fall => "coin_pile_fall",
            PileDirection::Float => "coin_pile_float",
        }
    }

    fn is_ready(&self) -> bool {
        self.image.is_ready()
    }

    fn phase(&self) -> Option<&'static str> {
        Some(self.timeline.current().name())
    }

    fn update(&mut self, elapsed: f32) -> bool {
        if self.timeline.is(Stage::Spawn) {
            let batch = self.spawner.poll(elapsed * 1000.0);
            for _ in 0..batch {
                self.spawn_coin();
            }
            if self.spawner.is_complete() {
                self.transition(Stage::Hold, elapsed);
            }
        }

        if self.timeline.is(Stage::Hold)
            && self.timeline.time_in_phase(elapsed) * 1000.0 > self.config.hold_ms
        {
            self.open();
            self.transition(Stage::Release, elapsed);
        }

        if self.timeline.is(Stage::Release)
            && !self.world.any_within(self.config.direction.remaining(self.viewport))
        {
            self.transition(Stage::End, elapsed);
        }

        self.world.step();
        !self.timeline.is_terminal()
    }

    fn render(&self, ctx: &mut dyn DrawContext) {
        let image = self.image.id();
        let inset = self.config.image_inset;
        self.renderer.render(
            ctx,
            self.world.bodies().map(|body| {
                let diameter = body.payload.radius / inset * 2.0;
                Sprite::new(body.position, CoinImage::new(image, diameter)).with_angle(body.angle)
            }),
        );
    }

    fn release(&mut self) {
        self.world.clear();
        self.exit = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinfx_animation::FrameLoop;
    use coinfx_core::{ImageId, RecordingContext};

    const VIEWPORT: Size = Size::new(412.0, 915.0);

    fn coin() -> ImageHandle {
        ImageHandle::ready(ImageId(1), Size::new(100.0, 100.0))
    }

    fn quick(preset: PileConfig) -> PileConfig {
        PileConfig {
            count: 30,
            hold_ms: 100.0,
            ..preset
        }
    }

    fn run(pile: CoinPile, max_frames: usize) -> (FrameLoop, usize) {
        let mut frame_loop = FrameLoop::new(pile);
        let mut ctx = RecordingContext::new(VIEWPORT);
        let mut frames = 0;
        while frame_loop.wants_frame() && frames < max_frames {
            frame_loop.frame(frames as f64 * 1000.0 / 60.0, &mut ctx);
            frames += 1;
        }
        (frame_loop, frames)
    }

    #[test]
    fn test_falling_pile_phases_in_order() {
        let mut pile = CoinPile::new(quick(PileConfig::fall()), VIEWPORT, coin(), 3);
        let mut t = 0.0;
        let mut seen = vec![pile.stage()];
        while pile.update(t) && t < 30.0 {
            if seen.last() != Some(&pile.stage()) {
                seen.push(pile.stage());
            }
            t += 1.0 / 60.0;
        }
        seen.push(pile.stage());
        seen.dedup();

        assert_eq!(seen, vec![Stage::Spawn, Stage::Hold, Stage::Release, Stage::End]);
        assert_eq!(pile.coin_count(), 30);
        assert!(!pile.is_closed());
        assert!(pile.world.bodies().all(|b| b.position.y >= VIEWPORT.height + 200.0));
    }

    #[test]
    fn test_floating_pile_leaves_through_the_top() {
        let mut pile = CoinPile::new(quick(PileConfig::float()), VIEWPORT, coin(), 4);
        let mut t = 0.0;
        while pile.update(t) && t < 30.0 {
            t += 1.0 / 60.0;
        }
        assert_eq!(pile.stage(), Stage::End);
        assert!(pile.world.bodies().all(|b| b.position.y <= -200.0));
    }

    #[test]
    fn test_floor_stays_for_the_hold() {
        let mut pile = CoinPile::new(quick(PileConfig::fall()), VIEWPORT, coin(), 5);
        let mut t = 0.0;
        while !pile.timeline().is(Stage::Hold) {
            pile.update(t);
            t += 1.0 / 60.0;
        }
        let held_at = pile.timeline().entered_at();
        while pile.stage() == Stage::Hold {
            assert!(pile.is_closed());
            pile.update(t);
            t += 1.0 / 60.0;
        }
        let released_at = pile.timeline().entered_at();
        assert!(released_at - held_at > 0.1);
        assert!(released_at - held_at < 0.1 + 2.0 / 60.0);
        assert!(!pile.is_closed());
    }

    #[test]
    fn test_loop_completes_and_releases_bodies() {
        let pile = CoinPile::new(quick(PileConfig::fall()), VIEWPORT, coin(), 6);
        let (frame_loop, frames) = run(pile, 3000);
        assert!(frames < 3000);
        assert!(!frame_loop.wants_frame());
        assert_eq!(frame_loop.animation().phase(), Some("end"));
    }

    #[test]
    fn test_partial_tables_keep_their_preset() {
        #[derive(Deserialize)]
        struct File {
            #[serde(deserialize_with = "float_table")]
            pile: PileConfig,
        }
        let file: File = toml::from_str("[pile]\ncount = 12\n").unwrap();
        assert_eq!(file.pile.count, 12);
        assert_eq!(file.pile.gravity, -1.8);
        assert_eq!(file.pile.direction, PileDirection::Float);
    }

    #[test]
    fn test_sanitize_repairs_radius() {
        let (config, findings) = PileConfig {
            radius: Range::new(0.0, 10.0),
            hold_ms: -1.0,
            ..PileConfig::fall()
        }
        .sanitize();
        assert_eq!(config.radius, Range::new(1.0, 10.0));
        assert_eq!(config.hold_ms, 0.0);
        assert_eq!(findings.len(), 2);
    }
}
