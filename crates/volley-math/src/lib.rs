#![warn(missing_docs)]

//! Math types for the volley physics engine.
//!
//! Thin wrappers around nalgebra providing the value types a rigid-body
//! simulation needs: vectors, unit quaternions, 3x3 matrices and rigid
//! poses.

use nalgebra::{Matrix3, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A unit quaternion representing an orientation.
pub type Quat = UnitQuaternion<f64>;

/// A 3x3 matrix (inertia tensors, rotation matrices).
pub type Mat3 = Matrix3<f64>;

/// A rigid transform: rotation followed by translation.
///
/// Applying a pose to a point `p` gives `orientation * p + position`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Translation component.
    pub position: Vec3,
    /// Rotation component.
    pub orientation: Quat,
}

impl Pose {
    /// Identity pose.
    pub fn identity() -> Self {
        Self {
            position: Vec3::zeros(),
            orientation: Quat::identity(),
        }
    }

    /// Pose from a position and an orientation.
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Pure translation.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::identity(),
        }
    }

    /// Compose: `self` then `other` (other is expressed in self's frame).
    pub fn then(&self, other: &Pose) -> Self {
        Self {
            position: self.position + self.orientation * other.position,
            orientation: self.orientation * other.orientation,
        }
    }

    /// Inverse of this pose.
    pub fn inverse(&self) -> Self {
        let inv = self.orientation.inverse();
        Self {
            position: -(inv * self.position),
            orientation: inv,
        }
    }

    /// Transform a point from local to world coordinates.
    pub fn apply_point(&self, p: &Vec3) -> Vec3 {
        self.orientation * p + self.position
    }

    /// Rotate a direction vector (ignores translation).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        self.orientation * v
    }

    /// Transform a point from world to local coordinates.
    pub fn inverse_apply_point(&self, p: &Vec3) -> Vec3 {
        self.orientation.inverse_transform_vector(&(p - self.position))
    }

    /// Rotate a direction vector from world to local coordinates.
    pub fn inverse_apply_vec(&self, v: &Vec3) -> Vec3 {
        self.orientation.inverse_transform_vector(v)
    }

    /// Rotation matrix of the orientation.
    pub fn rotation_matrix(&self) -> Mat3 {
        self.orientation.to_rotation_matrix().into_inner()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Orientation for a rotation of `angle` radians about `axis`.
///
/// A zero-length axis yields the identity.
pub fn axis_angle(axis: &Vec3, angle: f64) -> Quat {
    match unit_direction(axis) {
        Some(dir) => Quat::from_axis_angle(&dir, angle),
        None => Quat::identity(),
    }
}

/// Advance an orientation by a constant angular velocity over `dt`.
///
/// Uses the exponential map, so the result is always a unit quaternion.
pub fn integrate_orientation(orientation: &Quat, angular_velocity: &Vec3, dt: f64) -> Quat {
    let delta = Quat::from_scaled_axis(angular_velocity * dt);
    let mut q = delta * orientation;
    q.renormalize();
    q
}

/// Rotate an orientation by a small rotation vector (axis * angle).
pub fn rotate_by(orientation: &Quat, rotation: &Vec3) -> Quat {
    integrate_orientation(orientation, rotation, 1.0)
}

/// Two unit vectors perpendicular to `n` and to each other.
///
/// `n` is expected to be normalized.
pub fn orthonormal_basis(n: &Vec3) -> (Vec3, Vec3) {
    let helper = if n.x.abs() < 0.57 {
        Vec3::x()
    } else {
        Vec3::y()
    };
    let t1 = n.cross(&helper).normalize();
    let t2 = n.cross(&t1);
    (t1, t2)
}

/// True when every component is finite.
pub fn is_finite_vec(v: &Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Shortest vector accepted as a direction.
pub const MIN_DIRECTION_LENGTH: f64 = 1e-9;

/// Normalized `v`, or `None` when it is non-finite or shorter than
/// [`MIN_DIRECTION_LENGTH`].
pub fn unit_direction(v: &Vec3) -> Option<Dir3> {
    if !is_finite_vec(v) {
        return None;
    }
    Dir3::try_new(*v, MIN_DIRECTION_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_identity_pose() {
        let pose = Pose::identity();
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert!((pose.apply_point(&p) - p).norm() < 1e-12);
    }

    #[test]
    fn test_translation() {
        let pose = Pose::from_position(Vec3::new(10.0, 20.0, 30.0));
        let result = pose.apply_point(&Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(result, Vec3::new(11.0, 22.0, 33.0), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_z_90() {
        let pose = Pose::new(Vec3::zeros(), axis_angle(&Vec3::z(), PI / 2.0));
        let result = pose.apply_point(&Vec3::new(1.0, 0.0, 0.0));
        assert!(result.x.abs() < 1e-12);
        assert!((result.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_compose_and_inverse() {
        let a = Pose::new(Vec3::new(1.0, 0.0, 0.0), axis_angle(&Vec3::y(), 0.7));
        let b = Pose::new(Vec3::new(0.0, 2.0, -1.0), axis_angle(&Vec3::x(), -0.3));
        let p = Vec3::new(0.4, -0.2, 0.9);

        let composed = a.then(&b);
        assert_relative_eq!(
            composed.apply_point(&p),
            a.apply_point(&b.apply_point(&p)),
            epsilon = 1e-12
        );

        let round_trip = composed.then(&composed.inverse());
        assert_relative_eq!(round_trip.apply_point(&p), p, epsilon = 1e-12);
        let back = composed.inverse_apply_point(&composed.apply_point(&p));
        assert_relative_eq!(back, p, epsilon = 1e-12);
    }

    #[test]
    fn test_integrate_orientation_quarter_turn() {
        let q = integrate_orientation(&Quat::identity(), &Vec3::new(0.0, 0.0, PI / 2.0), 1.0);
        let v = q * Vec3::x();
        assert_relative_eq!(v, Vec3::y(), epsilon = 1e-12);
        assert_relative_eq!(q.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_axis_is_identity() {
        assert_eq!(axis_angle(&Vec3::zeros(), 1.0), Quat::identity());
    }

    #[test]
    fn test_orthonormal_basis() {
        for n in [Vec3::x(), Vec3::y(), Vec3::z(), Vec3::new(1.0, 1.0, 1.0).normalize()] {
            let (t1, t2) = orthonormal_basis(&n);
            assert!(t1.dot(&n).abs() < 1e-12);
            assert!(t2.dot(&n).abs() < 1e-12);
            assert!(t1.dot(&t2).abs() < 1e-12);
            assert_relative_eq!(t1.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(t2.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_finite_check() {
        assert!(is_finite_vec(&Vec3::new(1.0, 2.0, 3.0)));
        assert!(!is_finite_vec(&Vec3::new(f64::NAN, 0.0, 0.0)));
        assert!(!is_finite_vec(&Vec3::new(0.0, f64::INFINITY, 0.0)));
    }

    #[test]
    fn test_unit_direction() {
        let dir = unit_direction(&Vec3::new(0.0, 3.0, 4.0)).unwrap();
        assert_relative_eq!(dir.into_inner(), Vec3::new(0.0, 0.6, 0.8), epsilon = 1e-12);
        assert!(unit_direction(&Vec3::new(1e-12, 0.0, 0.0)).is_none());
        assert!(unit_direction(&Vec3::new(f64::NAN, 1.0, 0.0)).is_none());
        assert!(unit_direction(&Vec3::new(f64::INFINITY, 0.0, 0.0)).is_none());
    }
}
