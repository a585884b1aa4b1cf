//! Fixed-step physics world over rapier2d
//!
//! Coordinates are surface pixels with y growing downwards, so a positive
//! gravity pulls bodies towards the bottom of the screen. Gravity is given in
//! "gravity units": one unit accelerates a body by [`PhysicsConfig::gravity_unit`]
//! pixels per second squared (1000 by default, the classic 2D engine scale).
//!
//! Every body carries an immutable payload set at creation (a coin radius, a
//! card face, a shard outline). Static bodies carry none.

use coinfx_core::{Bounds, Point, Vec2};
use rapier2d::na::{Point2, Vector2};
use rapier2d::prelude::{
    CCDSolver, Collider, ColliderBuilder, ColliderSet, CoefficientCombineRule, DefaultBroadPhase,
    ImpulseJointSet, IntegrationParameters, IslandManager, MultibodyJointSet, NarrowPhase,
    PhysicsPipeline, QueryPipeline, RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
};
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, warn};

use crate::body::{BodyDesc, BodyKind, BodyShape};
use crate::error::{PhysicsError, Result};

/// Step length used by every effect: one 60 Hz frame
pub const FIXED_TIMESTEP: f32 = 1.0 / 60.0;

new_key_type! {
    /// Handle to a body in a [`PhysicsWorld`]
    pub struct BodyId;
}

/// Global physics settings
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity in gravity units (x, y); y positive is down
    pub gravity: Vec2,
    /// Pixels per second squared for one gravity unit
    pub gravity_unit: f32,
    /// Seconds simulated per step
    pub timestep: f32,
    /// Typical object size in pixels, used to scale engine tolerances
    pub length_unit: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, 1.0),
            gravity_unit: 1000.0,
            timestep: FIXED_TIMESTEP,
            length_unit: 50.0,
        }
    }
}

impl PhysicsConfig {
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }
}

/// Read-only view of a body after the latest step
#[derive(Clone, Copy, Debug)]
pub struct BodyView<'a, P> {
    pub id: BodyId,
    pub position: Point,
    pub angle: f32,
    /// Pixels per 60 Hz step
    pub velocity: Vec2,
    pub payload: &'a P,
}

struct Entry<P> {
    handle: RigidBodyHandle,
    kind: BodyKind,
    payload: Option<P>,
}

/// A 2D rigid-body world stepped at a fixed rate
pub struct PhysicsWorld<P> {
    config: PhysicsConfig,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    gravity: Vector2<f32>,
    entries: SlotMap<BodyId, Entry<P>>,
    steps: u64,
}

impl<P> PhysicsWorld<P> {
    pub fn new(config: PhysicsConfig) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.timestep;
        integration_parameters.length_unit = config.length_unit.max(1.0);

        Self {
            gravity: Self::gravity_vector(&config, config.gravity),
            config,
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            entries: SlotMap::with_key(),
            steps: 0,
        }
    }

    fn gravity_vector(config: &PhysicsConfig, gravity: Vec2) -> Vector2<f32> {
        Vector2::new(
            gravity.x * config.gravity_unit,
            gravity.y * config.gravity_unit,
        )
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Current gravity in gravity units
    pub fn gravity(&self) -> Vec2 {
        self.config.gravity
    }

    /// Replace gravity; takes effect on the next step
    pub fn set_gravity(&mut self, gravity: Vec2) {
        debug!(x = gravity.x, y = gravity.y, "gravity changed");
        self.config.gravity = gravity;
        self.gravity = Self::gravity_vector(&self.config, gravity);
    }

    /// Steps taken so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Advance the simulation by one fixed timestep
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
        self.steps += 1;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bodies
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a dynamic body carrying `payload`
    pub fn add_body(&mut self, desc: BodyDesc, payload: P) -> Result<BodyId> {
        self.insert(desc, Some(payload))
    }

    /// Add a boundary body; it carries no payload and never moves
    pub fn add_static(&mut self, desc: BodyDesc) -> Result<BodyId> {
        self.insert(
            BodyDesc {
                kind: BodyKind::Static,
                ..desc
            },
            None,
        )
    }

    fn insert(&mut self, desc: BodyDesc, payload: Option<P>) -> Result<BodyId> {
        let collider = build_collider(&desc)?;

        let steps_per_second = 1.0 / FIXED_TIMESTEP;
        let builder = match desc.kind {
            BodyKind::Dynamic => {
                let damping = per_step_loss_to_damping(desc.material.air_friction);
                RigidBodyBuilder::dynamic()
                    .linvel(Vector2::new(
                        desc.velocity.x * steps_per_second,
                        desc.velocity.y * steps_per_second,
                    ))
                    .angvel(desc.angular_velocity * steps_per_second)
                    .linear_damping(damping)
                    .angular_damping(damping)
                    .can_sleep(false)
            }
            BodyKind::Static => RigidBodyBuilder::fixed(),
        };
        let body = builder
            .translation(Vector2::new(desc.position.x, desc.position.y))
            .rotation(desc.angle)
            .build();

        let handle = self.rigid_body_set.insert(body);
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);

        Ok(self.entries.insert(Entry {
            handle,
            kind: desc.kind,
            payload,
        }))
    }

    /// Remove a body with its collider, returning its payload
    pub fn remove_body(&mut self, id: BodyId) -> Result<Option<P>> {
        let entry = self
            .entries
            .remove(id)
            .ok_or(PhysicsError::UnknownBody(id))?;
        self.rigid_body_set.remove(
            entry.handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        debug!(?id, kind = ?entry.kind, "body removed");
        Ok(entry.payload)
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of bodies, static ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of bodies carrying a payload
    pub fn dynamic_count(&self) -> usize {
        self.entries.values().filter(|e| e.payload.is_some()).count()
    }

    /// View of one payload-carrying body
    pub fn body(&self, id: BodyId) -> Option<BodyView<'_, P>> {
        let entry = self.entries.get(id)?;
        self.view(id, entry)
    }

    /// Position of any body, boundaries included
    pub fn position(&self, id: BodyId) -> Option<Point> {
        let entry = self.entries.get(id)?;
        let body = self.rigid_body_set.get(entry.handle)?;
        let t = body.translation();
        Some(Point::new(t.x, t.y))
    }

    /// Replace a dynamic body's velocities, given per 60 Hz step
    pub fn set_motion(&mut self, id: BodyId, velocity: Vec2, angular_velocity: f32) -> Result<()> {
        let entry = self.entries.get(id).ok_or(PhysicsError::UnknownBody(id))?;
        let body = self
            .rigid_body_set
            .get_mut(entry.handle)
            .ok_or(PhysicsError::UnknownBody(id))?;
        let steps_per_second = 1.0 / FIXED_TIMESTEP;
        body.set_linvel(
            Vector2::new(velocity.x * steps_per_second, velocity.y * steps_per_second),
            true,
        );
        body.set_angvel(angular_velocity * steps_per_second, true);
        Ok(())
    }

    /// Every payload-carrying body
    pub fn bodies(&self) -> impl Iterator<Item = BodyView<'_, P>> {
        self.entries
            .iter()
            .filter_map(move |(id, entry)| self.view(id, entry))
    }

    /// Whether any payload-carrying body satisfies `predicate`
    pub fn any_body(&self, predicate: impl Fn(&BodyView<'_, P>) -> bool) -> bool {
        self.bodies().any(|view| predicate(&view))
    }

    /// Whether any payload-carrying body's center lies inside `region`
    pub fn any_within(&self, region: Bounds) -> bool {
        self.any_body(|view| region.contains(view.position))
    }

    /// Drop every body and collider
    pub fn clear(&mut self) {
        let ids: Vec<BodyId> = self.entries.keys().collect();
        for id in ids {
            // Keys were just read from the map
            let _ = self.remove_body(id);
        }
        debug!(steps = self.steps, "physics world cleared");
    }

    fn view<'a>(&'a self, id: BodyId, entry: &'a Entry<P>) -> Option<BodyView<'a, P>> {
        let payload = entry.payload.as_ref()?;
        let body = self.rigid_body_set.get(entry.handle)?;
        let t = body.translation();
        let v = body.linvel();
        Some(BodyView {
            id,
            position: Point::new(t.x, t.y),
            angle: body.rotation().angle(),
            velocity: Vec2::new(v.x * FIXED_TIMESTEP, v.y * FIXED_TIMESTEP),
            payload,
        })
    }
}

/// Damping coefficient that loses `loss` of the velocity every 60 Hz step
fn per_step_loss_to_damping(loss: f32) -> f32 {
    let loss = loss.clamp(0.0, 0.99);
    (1.0 / (1.0 - loss) - 1.0) / FIXED_TIMESTEP
}

fn build_collider(desc: &BodyDesc) -> Result<Collider> {
    let finite_positive = |v: f32| v.is_finite() && v > 0.0;

    let builder = match &desc.shape {
        BodyShape::Ball { radius } => {
            if !finite_positive(*radius) {
                return Err(degenerate(format!("ball radius {radius}")));
            }
            ColliderBuilder::ball(*radius)
        }
        BodyShape::Cuboid {
            half_width,
            half_height,
        } => {
            if !finite_positive(*half_width) || !finite_positive(*half_height) {
                return Err(degenerate(format!("cuboid {half_width}x{half_height}")));
            }
            ColliderBuilder::cuboid(*half_width, *half_height)
        }
        BodyShape::RoundCuboid {
            half_width,
            half_height,
            corner_radius,
        } => {
            if !finite_positive(*half_width) || !finite_positive(*half_height) {
                return Err(degenerate(format!("round cuboid {half_width}x{half_height}")));
            }
            // Keep a sliver of core so the rounding never swallows the box
            let border = corner_radius
                .max(0.0)
                .min(half_width.min(*half_height) * 0.9);
            ColliderBuilder::round_cuboid(half_width - border, half_height - border, border)
        }
        BodyShape::ConvexPolygon { points } => {
            if points.len() < 3 {
                return Err(degenerate(format!("polygon with {} points", points.len())));
            }
            let hull: Vec<Point2<f32>> = points.iter().map(|p| Point2::new(p.x, p.y)).collect();
            ColliderBuilder::convex_hull(&hull)
                .ok_or_else(|| degenerate("collinear polygon".to_string()))?
        }
    };

    Ok(builder
        .restitution(desc.material.restitution)
        .friction(desc.material.friction)
        .density(desc.material.density)
        .restitution_combine_rule(CoefficientCombineRule::Max)
        .friction_combine_rule(CoefficientCombineRule::Min)
        .build())
}

fn degenerate(what: String) -> PhysicsError {
    warn!(shape = %what, "rejecting degenerate shape");
    PhysicsError::DegenerateShape(what)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Material;

    fn world(gravity: Vec2) -> PhysicsWorld<u32> {
        PhysicsWorld::new(PhysicsConfig::default().with_gravity(gravity))
    }

    #[test]
    fn test_ball_falls_down_the_screen() {
        let mut w = world(Vec2::new(0.0, 1.0));
        let id = w
            .add_body(BodyDesc::dynamic(BodyShape::ball(20.0), Point::new(100.0, 0.0)), 7)
            .unwrap();
        for _ in 0..30 {
            w.step();
        }
        let view = w.body(id).unwrap();
        assert!(view.position.y > 50.0);
        assert_eq!(*view.payload, 7);
        assert_eq!(w.steps(), 30);
    }

    #[test]
    fn test_floor_holds_until_removed() {
        let mut w = world(Vec2::new(0.0, 1.2));
        let floor = w
            .add_static(BodyDesc::fixed(BodyShape::rect(400.0, 40.0), Point::new(200.0, 520.0)))
            .unwrap();
        let coin = w
            .add_body(
                BodyDesc::dynamic(BodyShape::ball(20.0), Point::new(200.0, 400.0))
                    .with_material(Material::default().with_restitution(0.3)),
                1,
            )
            .unwrap();

        for _ in 0..180 {
            w.step();
        }
        let resting = w.body(coin).unwrap().position.y;
        assert!(resting < 500.0, "coin fell through the floor: {resting}");

        assert_eq!(w.remove_body(floor).unwrap(), None);
        for _ in 0..60 {
            w.step();
        }
        assert!(w.body(coin).unwrap().position.y > 600.0);
        assert_eq!(w.dynamic_count(), 1);
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn test_any_within_and_gravity_change() {
        let mut w = world(Vec2::ZERO);
        w.add_body(BodyDesc::dynamic(BodyShape::ball(5.0), Point::new(50.0, 50.0)), 0)
            .unwrap();
        let screen = Bounds::new(0.0, 0.0, 100.0, 100.0);
        for _ in 0..10 {
            w.step();
        }
        assert!(w.any_within(screen));

        w.set_gravity(Vec2::new(3.0, 2.0));
        for _ in 0..60 {
            w.step();
        }
        assert!(!w.any_within(screen));
        assert_eq!(w.gravity(), Vec2::new(3.0, 2.0));
    }

    #[test]
    fn test_initial_velocity_is_per_step() {
        let mut w = world(Vec2::ZERO);
        let id = w
            .add_body(
                BodyDesc::dynamic(BodyShape::ball(5.0), Point::ZERO)
                    .with_velocity(Vec2::new(2.0, 0.0))
                    .with_material(Material::default().with_air_friction(0.0)),
                0,
            )
            .unwrap();
        for _ in 0..60 {
            w.step();
        }
        let view = w.body(id).unwrap();
        assert!((view.position.x - 120.0).abs() < 1.0);
        assert!((view.velocity.x - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_set_motion() {
        let mut w = world(Vec2::ZERO);
        let id = w
            .add_body(
                BodyDesc::dynamic(BodyShape::ball(5.0), Point::ZERO)
                    .with_material(Material::default().with_air_friction(0.0)),
                0,
            )
            .unwrap();
        w.set_motion(id, Vec2::new(0.0, -3.0), 0.1).unwrap();
        w.step();
        let view = w.body(id).unwrap();
        assert!((view.position.y + 3.0).abs() < 1e-3);
        assert!((view.angle - 0.1).abs() < 1e-3);
    }

    #[test]
    fn test_degenerate_shapes_rejected() {
        let mut w = world(Vec2::ZERO);
        let collinear = BodyShape::polygon(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
        ]);
        assert!(matches!(
            w.add_body(BodyDesc::dynamic(collinear, Point::ZERO), 0),
            Err(PhysicsError::DegenerateShape(_))
        ));
        assert!(w.add_body(BodyDesc::dynamic(BodyShape::ball(0.0), Point::ZERO), 0).is_err());
        assert!(w.is_empty());
    }

    #[test]
    fn test_remove_unknown_and_clear() {
        let mut w = world(Vec2::ZERO);
        let id = w
            .add_body(BodyDesc::dynamic(BodyShape::rect(10.0, 10.0), Point::ZERO), 3)
            .unwrap();
        assert_eq!(w.remove_body(id).unwrap(), Some(3));
        assert_eq!(w.remove_body(id), Err(PhysicsError::UnknownBody(id)));

        for i in 0..5 {
            w.add_body(BodyDesc::dynamic(BodyShape::ball(3.0), Point::new(i as f32 * 10.0, 0.0)), i)
                .unwrap();
        }
        w.clear();
        assert!(w.is_empty());
        assert_eq!(w.bodies().count(), 0);
    }
}
