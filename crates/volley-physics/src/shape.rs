//! Collision shapes and bounding boxes.

use serde::{Deserialize, Serialize};
use volley_math::{Mat3, Pose, Vec3};

use crate::error::PhysicsError;

/// Geometry of a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Solid sphere centered on the body origin.
    Sphere {
        /// Radius in meters.
        radius: f64,
    },
    /// Solid box centered on the body origin.
    Cuboid {
        /// Half the edge length along each local axis.
        half_extents: Vec3,
    },
}

impl Shape {
    /// Sphere of the given radius.
    pub fn sphere(radius: f64) -> Result<Self, PhysicsError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(PhysicsError::InvalidShape(format!(
                "sphere radius must be positive and finite, got {radius}"
            )));
        }
        Ok(Shape::Sphere { radius })
    }

    /// Box with the given half extents.
    pub fn cuboid(half_extents: Vec3) -> Result<Self, PhysicsError> {
        if half_extents.iter().any(|h| !h.is_finite() || *h <= 0.0) {
            return Err(PhysicsError::InvalidShape(format!(
                "box half extents must be positive and finite, got ({}, {}, {})",
                half_extents.x, half_extents.y, half_extents.z
            )));
        }
        Ok(Shape::Cuboid { half_extents })
    }

    /// Principal moments of inertia (body frame) for a solid of mass `mass`.
    pub fn principal_inertia(&self, mass: f64) -> Vec3 {
        match self {
            Shape::Sphere { radius } => {
                let i = 0.4 * mass * radius * radius;
                Vec3::new(i, i, i)
            }
            Shape::Cuboid { half_extents: h } => {
                let (x2, y2, z2) = (h.x * h.x, h.y * h.y, h.z * h.z);
                Vec3::new(y2 + z2, x2 + z2, x2 + y2) * (mass / 3.0)
            }
        }
    }

    /// Inverse inertia tensor in the body frame; zero for immovable bodies.
    pub fn inverse_inertia(&self, mass: f64) -> Mat3 {
        if mass <= 0.0 {
            return Mat3::zeros();
        }
        let i = self.principal_inertia(mass);
        Mat3::from_diagonal(&Vec3::new(1.0 / i.x, 1.0 / i.y, 1.0 / i.z))
    }

    /// World-space bounding box of the shape placed at `pose`.
    pub fn aabb(&self, pose: &Pose) -> Aabb {
        match self {
            Shape::Sphere { radius } => {
                Aabb::from_center_half_extents(pose.position, Vec3::repeat(*radius))
            }
            Shape::Cuboid { half_extents } => {
                // Extent of a rotated box along each world axis.
                let rot = pose.rotation_matrix().abs();
                Aabb::from_center_half_extents(pose.position, rot * half_extents)
            }
        }
    }

    /// Human-readable shape name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Sphere { .. } => "sphere",
            Shape::Cuboid { .. } => "cuboid",
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Box spanning `center ± half_extents`.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// True when the two boxes intersect (touching counts).
    pub fn overlaps(&self, other: &Aabb) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && other.min[i] <= self.max[i])
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Center point.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}
