//! Single rigid bodies.

use volley_math::{integrate_orientation, rotate_by, Mat3, Pose, Quat, Vec3};

use crate::error::{ensure_finite, PhysicsError};
use crate::material::Material;
use crate::shape::{Aabb, Shape};

/// A rigid body with one geometric shape.
///
/// A primitive is pure state: it knows nothing about the scene that owns it.
/// Setters reject non-finite input and leave the body untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    shape: Shape,
    material: Material,
    pose: Pose,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    force: Vec3,
    torque: Vec3,
    inv_inertia_local: Mat3,
}

impl Primitive {
    /// Primitive at the origin with zero velocity.
    pub fn new(shape: Shape, material: Material) -> Self {
        Self {
            inv_inertia_local: shape.inverse_inertia(material.mass()),
            shape,
            material,
            pose: Pose::identity(),
            linear_velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            force: Vec3::zeros(),
            torque: Vec3::zeros(),
        }
    }

    /// Sphere of the given radius.
    pub fn sphere(radius: f64, material: Material) -> Result<Self, PhysicsError> {
        Ok(Self::new(Shape::sphere(radius)?, material))
    }

    /// Box with the given half extents.
    pub fn cuboid(half_extents: Vec3, material: Material) -> Result<Self, PhysicsError> {
        Ok(Self::new(Shape::cuboid(half_extents)?, material))
    }

    /// Builder-style position setter.
    pub fn with_position(mut self, position: Vec3) -> Result<Self, PhysicsError> {
        self.set_position(position)?;
        Ok(self)
    }

    /// Builder-style velocity setter.
    pub fn with_velocity(mut self, velocity: Vec3) -> Result<Self, PhysicsError> {
        self.set_velocity(velocity)?;
        Ok(self)
    }

    /// Geometry.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Material snapshot.
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// True when the body never moves.
    pub fn is_static(&self) -> bool {
        self.material.is_static()
    }

    /// World position of the body center.
    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    /// Move the body.
    pub fn set_position(&mut self, position: Vec3) -> Result<(), PhysicsError> {
        ensure_finite(&position, "position")?;
        self.pose.position = position;
        Ok(())
    }

    /// World orientation.
    pub fn orientation(&self) -> Quat {
        self.pose.orientation
    }

    /// Rotate the body.
    pub fn set_orientation(&mut self, orientation: Quat) -> Result<(), PhysicsError> {
        if !orientation.coords.iter().all(|c| c.is_finite()) {
            return Err(PhysicsError::NonFinite {
                what: "orientation",
            });
        }
        self.pose.orientation = orientation;
        Ok(())
    }

    /// Full world pose.
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Set position and orientation at once.
    pub fn set_pose(&mut self, pose: Pose) -> Result<(), PhysicsError> {
        ensure_finite(&pose.position, "position")?;
        self.set_orientation(pose.orientation)?;
        self.pose.position = pose.position;
        Ok(())
    }

    /// Linear velocity.
    pub fn velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    /// Set the linear velocity.
    pub fn set_velocity(&mut self, velocity: Vec3) -> Result<(), PhysicsError> {
        ensure_finite(&velocity, "velocity")?;
        self.linear_velocity = velocity;
        Ok(())
    }

    /// Angular velocity (world frame, rad/s).
    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    /// Set the angular velocity (world frame, rad/s).
    pub fn set_angular_velocity(&mut self, angular_velocity: Vec3) -> Result<(), PhysicsError> {
        ensure_finite(&angular_velocity, "angular velocity")?;
        self.angular_velocity = angular_velocity;
        Ok(())
    }

    /// Accumulate a force through the center of mass until the next step.
    pub fn apply_force(&mut self, force: Vec3) -> Result<(), PhysicsError> {
        ensure_finite(&force, "force")?;
        self.force += force;
        Ok(())
    }

    /// Accumulate a torque until the next step.
    pub fn apply_torque(&mut self, torque: Vec3) -> Result<(), PhysicsError> {
        ensure_finite(&torque, "torque")?;
        self.torque += torque;
        Ok(())
    }

    /// Accumulate a force applied at a world point.
    pub fn apply_force_at_point(&mut self, force: Vec3, point: Vec3) -> Result<(), PhysicsError> {
        ensure_finite(&force, "force")?;
        ensure_finite(&point, "application point")?;
        self.force += force;
        self.torque += (point - self.pose.position).cross(&force);
        Ok(())
    }

    /// Pending force for the next step.
    pub fn pending_force(&self) -> Vec3 {
        self.force
    }

    /// Pending torque for the next step.
    pub fn pending_torque(&self) -> Vec3 {
        self.torque
    }

    /// `1 / mass`, zero for immovable bodies.
    pub fn inverse_mass(&self) -> f64 {
        self.material.inverse_mass()
    }

    /// Inverse inertia tensor in world coordinates.
    pub fn inverse_inertia_world(&self) -> Mat3 {
        let r = self.pose.rotation_matrix();
        r * self.inv_inertia_local * r.transpose()
    }

    /// Velocity of the material point currently at world position `point`.
    pub fn velocity_at_point(&self, point: &Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(&(point - self.pose.position))
    }

    /// Instantaneous change of momentum at a world point.
    ///
    /// Ignored by immovable bodies.
    pub fn apply_impulse(&mut self, impulse: Vec3, point: Vec3) {
        if self.is_static() {
            return;
        }
        self.linear_velocity += impulse * self.inverse_mass();
        let r = point - self.pose.position;
        self.angular_velocity += self.inverse_inertia_world() * r.cross(&impulse);
    }

    /// Instantaneous change of angular momentum.
    pub fn apply_angular_impulse(&mut self, impulse: Vec3) {
        if self.is_static() {
            return;
        }
        self.angular_velocity += self.inverse_inertia_world() * impulse;
    }

    /// World-space bounding box.
    pub fn aabb(&self) -> Aabb {
        self.shape.aabb(&self.pose)
    }

    /// Translational plus rotational kinetic energy.
    pub fn kinetic_energy(&self) -> f64 {
        if self.is_static() {
            return 0.0;
        }
        let m = self.material.mass();
        let r = self.pose.rotation_matrix();
        let local_omega = r.transpose() * self.angular_velocity;
        let inertia = self.shape.principal_inertia(m);
        0.5 * m * self.linear_velocity.norm_squared()
            + 0.5 * local_omega.component_mul(&inertia).dot(&local_omega)
    }

    /// Semi-implicit Euler: velocities from forces, then pose from the new
    /// velocities. Clears the pending force and torque.
    pub(crate) fn integrate(&mut self, gravity: &Vec3, dt: f64) {
        if self.is_static() {
            self.clear_forces();
            return;
        }
        let inv_mass = self.inverse_mass();
        let force = self.force + gravity * self.material.mass();
        self.linear_velocity += force * (inv_mass * dt);
        self.angular_velocity += self.inverse_inertia_world() * self.torque * dt;
        self.clear_forces();

        self.pose.position += self.linear_velocity * dt;
        self.pose.orientation =
            integrate_orientation(&self.pose.orientation, &self.angular_velocity, dt);
    }

    /// Positional correction used by the joint and contact solvers.
    pub(crate) fn shift(&mut self, translation: Vec3, rotation: Vec3) {
        if self.is_static() {
            return;
        }
        self.pose.position += translation;
        if rotation.norm_squared() > 0.0 {
            self.pose.orientation = rotate_by(&self.pose.orientation, &rotation);
        }
    }

    /// Place the body without validation; callers guarantee finite input.
    pub(crate) fn place(&mut self, pose: Pose) {
        self.pose = pose;
    }

    fn clear_forces(&mut self) {
        self.force = Vec3::zeros();
        self.torque = Vec3::zeros();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ball() -> Primitive {
        Primitive::sphere(0.5, Material::new(2.0)).unwrap()
    }

    #[test]
    fn test_setters_reject_non_finite() {
        let mut b = ball();
        b.set_position(Vec3::new(1.0, 2.0, 3.0)).unwrap();
        let err = b.set_position(Vec3::new(f64::NAN, 0.0, 0.0)).unwrap_err();
        assert_eq!(err, PhysicsError::NonFinite { what: "position" });
        assert_eq!(b.position(), Vec3::new(1.0, 2.0, 3.0));

        assert!(b.set_velocity(Vec3::new(0.0, f64::INFINITY, 0.0)).is_err());
        assert_eq!(b.velocity(), Vec3::zeros());
    }

    #[test]
    fn test_impulse_through_center() {
        let mut b = ball();
        b.apply_impulse(Vec3::new(4.0, 0.0, 0.0), b.position());
        assert_relative_eq!(b.velocity(), Vec3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
        assert_eq!(b.angular_velocity(), Vec3::zeros());
    }

    #[test]
    fn test_offset_impulse_spins() {
        let mut b = ball();
        b.apply_impulse(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.5, 0.0));
        // r x J = (0, .5, 0) x (1, 0, 0) = (0, 0, -.5); I = .2
        assert_relative_eq!(b.angular_velocity(), Vec3::new(0.0, 0.0, -2.5), epsilon = 1e-12);
    }

    #[test]
    fn test_static_ignores_impulses_and_gravity() {
        let mut ground = Primitive::cuboid(Vec3::new(5.0, 0.5, 5.0), Material::fixed()).unwrap();
        ground.apply_impulse(Vec3::new(0.0, 100.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        ground.apply_force(Vec3::new(10.0, 0.0, 0.0)).unwrap();
        ground.integrate(&Vec3::new(0.0, -9.81, 0.0), 0.1);
        assert_eq!(ground.velocity(), Vec3::zeros());
        assert_eq!(ground.position(), Vec3::zeros());
        assert_eq!(ground.pending_force(), Vec3::zeros());
    }

    #[test]
    fn test_integrate_semi_implicit() {
        let mut b = ball();
        let g = Vec3::new(0.0, -10.0, 0.0);
        b.integrate(&g, 0.1);
        // v = g dt, x = v dt (uses the updated velocity)
        assert_relative_eq!(b.velocity().y, -1.0, epsilon = 1e-12);
        assert_relative_eq!(b.position().y, -0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_force_at_point_adds_torque() {
        let mut b = ball();
        b.apply_force_at_point(Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0))
            .unwrap();
        assert_relative_eq!(b.pending_torque(), Vec3::new(0.0, -1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_kinetic_energy() {
        let mut b = ball();
        b.set_velocity(Vec3::new(3.0, 0.0, 0.0)).unwrap();
        b.set_angular_velocity(Vec3::new(0.0, 0.0, 10.0)).unwrap();
        // 0.5*2*9 + 0.5*0.2*100
        assert_relative_eq!(b.kinetic_energy(), 19.0, epsilon = 1e-12);
    }
}
