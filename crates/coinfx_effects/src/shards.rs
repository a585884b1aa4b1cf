//! Shard explosion
//!
//! The whole surface is covered by a jittered triangle mesh. After a short
//! hold every triangle is launched away from the center with some spin, and
//! gravity takes over.

use coinfx_animation::{Animation, Phase, PhaseTimeline, Stage};
use coinfx_core::{
    Bounds, Color, DrawContext, DrawContextExt, EdgeInsets, Path, Point, Size, Stroke, Vec2,
};
use coinfx_physics::{BodyDesc, BodyShape, Material, PhysicsConfig, PhysicsWorld};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{EffectConfig, Range, Sanitizer};
use crate::error::ConfigError;
use crate::renderer::{Renderer, Sprite, Visual};

/// Shard explosion settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardConfig {
    pub columns: usize,
    pub rows: usize,
    /// Interior grid points move up to this fraction of a cell each way
    pub jitter: f32,
    /// Degrees
    pub hue: Range,
    /// 0..1
    pub saturation: Range,
    /// 0..1
    pub lightness: Range,
    pub hold_ms: f32,
    /// Launch speed; multiplied by 60 for pixels per 60 Hz step
    pub speed: Range,
    /// Radians per 60 Hz step
    pub spin: Range,
    /// Gravity once exploded
    pub gravity: f32,
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
    pub air_friction: f32,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            columns: 8,
            rows: 16,
            jitter: 0.3,
            hue: Range::new(200.0, 240.0),
            saturation: Range::new(0.6, 0.8),
            lightness: Range::new(0.4, 0.6),
            hold_ms: 800.0,
            speed: Range::new(0.08, 0.14),
            spin: Range::new(-0.15, 0.15),
            gravity: 0.5,
            restitution: 0.2,
            friction: 0.3,
            density: 0.001,
            air_friction: 0.01,
        }
    }
}

impl EffectConfig for ShardConfig {
    fn sanitize(self) -> (Self, Vec<ConfigError>) {
        let mut s = Sanitizer::new();
        let config = Self {
            columns: s.count("shards.columns", self.columns),
            rows: s.count("shards.rows", self.rows),
            jitter: s.within("shards.jitter", self.jitter, 0.0, 0.45),
            hue: s.range("shards.hue", self.hue),
            saturation: s.range("shards.saturation", self.saturation),
            lightness: s.range("shards.lightness", self.lightness),
            hold_ms: s.time("shards.hold_ms", self.hold_ms),
            speed: s.range("shards.speed", self.speed),
            spin: s.range("shards.spin", self.spin),
            gravity: s.finite("shards.gravity", self.gravity, 0.5),
            restitution: s.within("shards.restitution", self.restitution, 0.0, 1.0),
            friction: s.within("shards.friction", self.friction, 0.0, 1.0),
            density: s.within("shards.density", self.density, 1e-6, 1.0),
            air_friction: s.within("shards.air_friction", self.air_friction, 0.0, 0.99),
        };
        (config, s.finish())
    }
}

/// Grid of jittered points covering `viewport`; border points stay on the edge
fn jittered_grid(config: &ShardConfig, viewport: Size, rng: &mut StdRng) -> Vec<Vec<Point>> {
    let cell_w = viewport.width / config.columns as f32;
    let cell_h = viewport.height / config.rows as f32;
    let jitter = Range::new(-config.jitter, config.jitter);

    (0..=config.rows)
        .map(|row| {
            (0..=config.columns)
                .map(|col| {
                    let dx = if col == 0 || col == config.columns {
                        0.0
                    } else {
                        jitter.sample(rng) * cell_w
                    };
                    let dy = if row == 0 || row == config.rows {
                        0.0
                    } else {
                        jitter.sample(rng) * cell_h
                    };
                    Point::new(col as f32 * cell_w + dx, row as f32 * cell_h + dy)
                })
                .collect()
        })
        .collect()
}

/// Two triangles per grid cell, in world coordinates
fn triangulate(grid: &[Vec<Point>]) -> Vec<[Point; 3]> {
    let mut triangles = Vec::new();
    for pair in grid.windows(2) {
        let (top, bottom) = (&pair[0], &pair[1]);
        for col in 0..top.len().saturating_sub(1) {
            let (tl, tr) = (top[col], top[col + 1]);
            let (bl, br) = (bottom[col], bottom[col + 1]);
            triangles.push([tl, tr, bl]);
            triangles.push([tr, br, bl]);
        }
    }
    triangles
}

/// Payload of a shard body
#[derive(Clone, Debug, PartialEq)]
pub struct Shard {
    pub color: Color,
    /// Vertices relative to the body position
    pub outline: Vec<Point>,
}

impl Visual for Shard {
    fn paint(&self, ctx: &mut dyn DrawContext) {
        let path = Path::polygon(&self.outline, Vec2::ZERO);
        ctx.fill(&path, self.color);
        ctx.stroke(&path, &Stroke::new(1.0), Color::WHITE.with_alpha(0.3));
    }
}

/// A shattered surface that blows apart
pub struct ShardExplosion {
    config: ShardConfig,
    viewport: Size,
    rng: StdRng,
    world: PhysicsWorld<Shard>,
    timeline: PhaseTimeline<Stage>,
    renderer: Renderer,
}

impl ShardExplosion {
    pub fn new(config: ShardConfig, viewport: Size, seed: u64) -> Self {
        let (config, _) = config.sanitize();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut world = PhysicsWorld::new(PhysicsConfig::default().with_gravity(Vec2::ZERO));

        let material = Material::default()
            .with_restitution(config.restitution)
            .with_friction(config.friction)
            .with_density(config.density)
            .with_air_friction(config.air_friction);

        if config.columns > 0 && config.rows > 0 {
            let grid = jittered_grid(&config, viewport, &mut rng);
            for [a, b, c] in triangulate(&grid) {
                let centroid = Point::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0);
                let outline: Vec<Point> = [a, b, c]
                    .iter()
                    .map(|v| Point::new(v.x - centroid.x, v.y - centroid.y))
                    .collect();
                let color = Color::from_hsl(
                    config.hue.sample(&mut rng),
                    config.saturation.sample(&mut rng),
                    config.lightness.sample(&mut rng),
                );
                let desc = BodyDesc::dynamic(BodyShape::polygon(outline.clone()), centroid)
                    .with_material(material);
                if let Err(err) = world.add_body(desc, Shard { color, outline }) {
                    warn!(%err, "shard rejected");
                }
            }
        }
        debug!(shards = world.dynamic_count(), "shard explosion created");

        Self {
            config,
            viewport,
            rng,
            world,
            timeline: PhaseTimeline::new(Stage::Hold, 0.0),
            renderer: Renderer::new(EdgeInsets::new(200.0, 200.0, 200.0, 400.0)),
        }
    }

    pub fn stage(&self) -> Stage {
        self.timeline.current()
    }

    pub fn shard_count(&self) -> usize {
        self.world.dynamic_count()
    }

    fn explode(&mut self) {
        let center = self.viewport.center();
        let launches: Vec<_> = self
            .world
            .bodies()
            .map(|body| (body.id, body.position))
            .collect();

        for (id, position) in launches {
            let away = position - center;
            let direction = if away.length() > 0.0 {
                away.normalize()
            } else {
                Vec2::new(1.0, 0.0)
            };
            let speed = self.config.speed.sample(&mut self.rng) * 60.0;
            let spin = self.config.spin.sample(&mut self.rng);
            if let Err(err) = self.world.set_motion(id, direction * speed, spin) {
                warn!(%err, "shard launch failed");
            }
        }
        self.world.set_gravity(Vec2::new(0.0, self.config.gravity));
        debug!("shards exploded");
    }
}

impl Animation for ShardExplosion {
    fn name(&self) -> &str {
        "shard_explosion"
    }

    fn phase(&self) -> Option<&'static str> {
        Some(self.timeline.current().name())
    }

    fn update(&mut self, elapsed: f32) -> bool {
        if self.timeline.is(Stage::Hold)
            && self.timeline.time_in_phase(elapsed) * 1000.0 > self.config.hold_ms
        {
            self.explode();
            if let Err(err) = self.timeline.advance(Stage::Release, elapsed) {
                warn!(%err, "shard phase transition rejected");
            }
        }

        if self.timeline.is(Stage::Release) {
            let on_screen = Bounds::new(
                -100.0,
                -100.0,
                self.viewport.width + 100.0,
                self.viewport.height + 300.0,
            );
            if !self.world.any_within(on_screen) {
                if let Err(err) = self.timeline.advance(Stage::End, elapsed) {
                    warn!(%err, "shard phase transition rejected");
                }
            }
        }

        self.world.step();
        !self.timeline.is_terminal()
    }

    fn render(&self, ctx: &mut dyn DrawContext) {
        self.renderer.render(
            ctx,
            self.world
                .bodies()
                .map(|body| Sprite::new(body.position, body.payload).with_angle(body.angle)),
        );
    }

    fn release(&mut self) {
        self.world.clear();
    }
}
