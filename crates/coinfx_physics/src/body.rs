//! Body descriptions
//!
//! Velocities and air friction are expressed per 60 Hz step, the units the
//! effect constants were tuned in. [`PhysicsWorld`](crate::PhysicsWorld)
//! converts them to per-second values for the engine.

use coinfx_core::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Type of rigid body
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    /// Moves according to gravity and contacts
    #[default]
    Dynamic,
    /// Never moves; walls, floors and ceilings
    Static,
}

/// Collision shape, centered on the body position
#[derive(Clone, Debug, PartialEq)]
pub enum BodyShape {
    Ball { radius: f32 },
    Cuboid { half_width: f32, half_height: f32 },
    /// Rectangle with rounded corners; half extents include the rounding
    RoundCuboid {
        half_width: f32,
        half_height: f32,
        corner_radius: f32,
    },
    /// Convex polygon, vertices relative to the body position
    ConvexPolygon { points: Vec<Point> },
}

impl BodyShape {
    pub fn ball(radius: f32) -> Self {
        BodyShape::Ball { radius }
    }

    /// Rectangle of the given full width and height
    pub fn rect(width: f32, height: f32) -> Self {
        BodyShape::Cuboid {
            half_width: width / 2.0,
            half_height: height / 2.0,
        }
    }

    /// Rounded rectangle of the given full width and height
    pub fn rounded_rect(width: f32, height: f32, corner_radius: f32) -> Self {
        BodyShape::RoundCuboid {
            half_width: width / 2.0,
            half_height: height / 2.0,
            corner_radius,
        }
    }

    pub fn polygon(points: Vec<Point>) -> Self {
        BodyShape::ConvexPolygon { points }
    }
}

/// Contact and air properties
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
    /// Fraction of velocity lost per 60 Hz step
    pub air_friction: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            restitution: 0.0,
            friction: 0.1,
            density: 0.001,
            air_friction: 0.01,
        }
    }
}

impl Material {
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn with_air_friction(mut self, air_friction: f32) -> Self {
        self.air_friction = air_friction;
        self
    }
}

/// Everything needed to create a body
#[derive(Clone, Debug, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub shape: BodyShape,
    pub position: Point,
    pub angle: f32,
    /// Pixels per 60 Hz step
    pub velocity: Vec2,
    /// Radians per 60 Hz step
    pub angular_velocity: f32,
    pub material: Material,
}

impl BodyDesc {
    pub fn dynamic(shape: BodyShape, position: Point) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            shape,
            position,
            angle: 0.0,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            material: Material::default(),
        }
    }

    pub fn fixed(shape: BodyShape, position: Point) -> Self {
        Self {
            kind: BodyKind::Static,
            ..Self::dynamic(shape, position)
        }
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: f32) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }
}
