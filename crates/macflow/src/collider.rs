//! Collider interface and a few analytic shapes.
//!
//! The projection core only ever asks a collider two questions: how far is
//! this point from the surface, and how fast is the surface moving here.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Solid obstacle queried by the boundary solvers.
pub trait Collider: Send + Sync {
    /// Signed distance to the surface. Negative inside the solid.
    fn signed_distance(&self, point: Vec3) -> f32;

    /// Velocity of the solid at `point`. Static colliders keep the default.
    fn velocity_at(&self, _point: Vec3) -> Vec3 {
        Vec3::ZERO
    }
}

/// Solid axis-aligned box, optionally translating at a constant velocity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxCollider {
    pub min: Vec3,
    pub max: Vec3,
    pub velocity: Vec3,
}

impl BoxCollider {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min,
            max,
            velocity: Vec3::ZERO,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }
}

impl Collider for BoxCollider {
    fn signed_distance(&self, point: Vec3) -> f32 {
        let center = 0.5 * (self.min + self.max);
        let half = 0.5 * (self.max - self.min);
        let q = (point - center).abs() - half;

        // Outside: distance to the nearest point on the box
        // Inside: negative distance to the nearest face
        let outside = q.max(Vec3::ZERO).length();
        let inside = q.max_element().min(0.0);
        outside + inside
    }

    fn velocity_at(&self, _point: Vec3) -> Vec3 {
        self.velocity
    }
}

/// Solid sphere.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SphereCollider {
    pub center: Vec3,
    pub radius: f32,
    pub velocity: Vec3,
}

impl SphereCollider {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius,
            velocity: Vec3::ZERO,
        }
    }
}

impl Collider for SphereCollider {
    fn signed_distance(&self, point: Vec3) -> f32 {
        (point - self.center).length() - self.radius
    }

    fn velocity_at(&self, _point: Vec3) -> Vec3 {
        self.velocity
    }
}
