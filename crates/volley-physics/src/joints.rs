//! Revolute joints between parts of a composite object.

use std::f64::consts::PI;

use tracing::debug;
use volley_math::{orthonormal_basis, unit_direction, Quat, Vec3};

use crate::body::Primitive;
use crate::composite::PartId;
use crate::error::{ensure_finite, ensure_finite_scalar, PhysicsError};

/// Effective masses below this are treated as "both bodies immovable".
const MIN_EFFECTIVE_MASS: f64 = 1e-12;

/// Velocity servo state of a joint.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum JointMotor {
    /// No motor: the joint rotates freely about its axis.
    #[default]
    Disabled,
    /// Drive the relative angular speed toward `target_speed`.
    Velocity {
        /// Target relative speed (rad/s).
        target_speed: f64,
        /// Largest torque the motor may apply (Nm).
        max_torque: f64,
    },
}

impl JointMotor {
    /// True while the motor drives the joint.
    pub fn is_active(&self) -> bool {
        matches!(self, JointMotor::Velocity { .. })
    }
}

/// One-axis rotational constraint between two parts.
///
/// The anchor and axis are captured in world space at creation and stored in
/// each part's local frame, so both follow the parts as they move.
#[derive(Debug, Clone, PartialEq)]
pub struct RevoluteJoint {
    body_a: PartId,
    body_b: PartId,
    local_anchor_a: Vec3,
    local_anchor_b: Vec3,
    local_axis_a: Vec3,
    local_axis_b: Vec3,
    /// Orientation of B relative to A at creation.
    reference: Quat,
    motor: JointMotor,
    /// Motor impulse accumulated during the current step.
    motor_impulse: f64,
}

impl RevoluteJoint {
    /// Capture a joint from the current poses of both parts.
    pub(crate) fn new(
        body_a: PartId,
        body_b: PartId,
        a: &Primitive,
        b: &Primitive,
        anchor: Vec3,
        axis: Vec3,
    ) -> Result<Self, PhysicsError> {
        if body_a == body_b {
            return Err(PhysicsError::SamePart(body_a));
        }
        ensure_finite(&anchor, "joint anchor")?;
        let axis = unit_direction(&axis)
            .ok_or(PhysicsError::DegenerateAxis)?
            .into_inner();

        Ok(Self {
            body_a,
            body_b,
            local_anchor_a: a.pose().inverse_apply_point(&anchor),
            local_anchor_b: b.pose().inverse_apply_point(&anchor),
            local_axis_a: a.pose().inverse_apply_vec(&axis),
            local_axis_b: b.pose().inverse_apply_vec(&axis),
            reference: a.orientation().inverse() * b.orientation(),
            motor: JointMotor::Disabled,
            motor_impulse: 0.0,
        })
    }

    /// First connected part.
    pub fn body_a(&self) -> PartId {
        self.body_a
    }

    /// Second connected part.
    pub fn body_b(&self) -> PartId {
        self.body_b
    }

    /// Current motor state.
    pub fn motor(&self) -> JointMotor {
        self.motor
    }

    /// Activate the velocity servo. A `max_torque` of zero disables it.
    pub fn set_motor(&mut self, target_speed: f64, max_torque: f64) -> Result<(), PhysicsError> {
        ensure_finite_scalar(target_speed, "motor target speed")?;
        ensure_finite_scalar(max_torque, "motor max torque")?;
        let max_torque = max_torque.abs();
        self.motor = if max_torque > 0.0 {
            JointMotor::Velocity {
                target_speed,
                max_torque,
            }
        } else {
            JointMotor::Disabled
        };
        debug!(motor = ?self.motor, "joint motor updated");
        Ok(())
    }

    /// Return to a free hinge.
    pub fn disable_motor(&mut self) {
        self.motor = JointMotor::Disabled;
    }

    /// Anchor as seen from each part, in world coordinates.
    pub fn world_anchors(&self, a: &Primitive, b: &Primitive) -> (Vec3, Vec3) {
        (
            a.pose().apply_point(&self.local_anchor_a),
            b.pose().apply_point(&self.local_anchor_b),
        )
    }

    /// Distance between the two world anchors.
    pub fn anchor_error(&self, a: &Primitive, b: &Primitive) -> f64 {
        let (pa, pb) = self.world_anchors(a, b);
        (pb - pa).norm()
    }

    /// Joint axis in world coordinates, carried by part A.
    pub fn world_axis(&self, a: &Primitive) -> Vec3 {
        a.pose().apply_vec(&self.local_axis_a)
    }

    /// Angular velocity of B relative to A projected on the joint axis.
    pub fn relative_speed(&self, a: &Primitive, b: &Primitive) -> f64 {
        (b.angular_velocity() - a.angular_velocity()).dot(&self.world_axis(a))
    }

    /// Rotation of B relative to A about the axis since creation, in
    /// `(-pi, pi]`.
    pub fn relative_angle(&self, a: &Primitive, b: &Primitive) -> f64 {
        let current = a.orientation().inverse() * b.orientation();
        let delta = current * self.reference.inverse();
        let twist = delta.imag().dot(&self.local_axis_a);
        let mut angle = 2.0 * twist.atan2(delta.w);
        if angle > PI {
            angle -= 2.0 * PI;
        } else if angle <= -PI {
            angle += 2.0 * PI;
        }
        angle
    }

    pub(crate) fn begin_step(&mut self) {
        self.motor_impulse = 0.0;
    }

    /// One velocity iteration: motor row, point constraint, then the two
    /// angular rows perpendicular to the axis.
    pub(crate) fn solve_velocity(&mut self, a: &mut Primitive, b: &mut Primitive, dt: f64) {
        let axis = self.world_axis(a);
        let inv_ia = a.inverse_inertia_world();
        let inv_ib = b.inverse_inertia_world();

        if let JointMotor::Velocity {
            target_speed,
            max_torque,
        } = self.motor
        {
            let k = axis.dot(&(inv_ia * axis)) + axis.dot(&(inv_ib * axis));
            if k > MIN_EFFECTIVE_MASS {
                let error = target_speed - self.relative_speed(a, b);
                let max_impulse = max_torque * dt;
                let total = (self.motor_impulse + error / k).clamp(-max_impulse, max_impulse);
                let lambda = total - self.motor_impulse;
                self.motor_impulse = total;
                b.apply_angular_impulse(axis * lambda);
                a.apply_angular_impulse(-axis * lambda);
            }
        }

        // Point constraint: the anchor must move identically on both parts.
        let (pa, pb) = self.world_anchors(a, b);
        let ra = pa - a.position();
        let rb = pb - b.position();
        if let Some(k_inv) = point_mass_matrix(a, b, &ra, &rb).try_inverse() {
            let rel = b.velocity_at_point(&pb) - a.velocity_at_point(&pa);
            let impulse = k_inv * (-rel);
            b.apply_impulse(impulse, pb);
            a.apply_impulse(-impulse, pa);
        }

        // Angular rows: no relative rotation off the hinge axis.
        let (t1, t2) = orthonormal_basis(&axis);
        for t in [t1, t2] {
            let k = t.dot(&(inv_ia * t)) + t.dot(&(inv_ib * t));
            if k <= MIN_EFFECTIVE_MASS {
                continue;
            }
            let rel = (b.angular_velocity() - a.angular_velocity()).dot(&t);
            let lambda = -rel / k;
            b.apply_angular_impulse(t * lambda);
            a.apply_angular_impulse(-t * lambda);
        }
    }

    /// One position iteration: pull the anchors together and realign the
    /// axes (non-linear Gauss-Seidel).
    pub(crate) fn solve_position(&self, a: &mut Primitive, b: &mut Primitive) {
        let (pa, pb) = self.world_anchors(a, b);
        let ra = pa - a.position();
        let rb = pb - b.position();
        let inv_ia = a.inverse_inertia_world();
        let inv_ib = b.inverse_inertia_world();

        if let Some(k_inv) = point_mass_matrix(a, b, &ra, &rb).try_inverse() {
            let lambda = k_inv * (pa - pb);
            b.shift(lambda * b.inverse_mass(), inv_ib * rb.cross(&lambda));
            a.shift(-lambda * a.inverse_mass(), -(inv_ia * ra.cross(&lambda)));
        }

        let axis_a = self.world_axis(a);
        let axis_b = b.pose().apply_vec(&self.local_axis_b);
        let error = axis_a.cross(&axis_b);
        let inv_ia = a.inverse_inertia_world();
        let inv_ib = b.inverse_inertia_world();
        let (t1, t2) = orthonormal_basis(&axis_a);
        for t in [t1, t2] {
            let k = t.dot(&(inv_ia * t)) + t.dot(&(inv_ib * t));
            if k <= MIN_EFFECTIVE_MASS {
                continue;
            }
            let lambda = -error.dot(&t) / k;
            b.shift(Vec3::zeros(), inv_ib * t * lambda);
            a.shift(Vec3::zeros(), -(inv_ia * t * lambda));
        }
    }
}

/// Effective mass matrix of a point constraint with lever arms `ra`, `rb`.
fn point_mass_matrix(a: &Primitive, b: &Primitive, ra: &Vec3, rb: &Vec3) -> volley_math::Mat3 {
    let skew_a = ra.cross_matrix();
    let skew_b = rb.cross_matrix();
    volley_math::Mat3::identity() * (a.inverse_mass() + b.inverse_mass())
        - skew_a * a.inverse_inertia_world() * skew_a
        - skew_b * b.inverse_inertia_world() * skew_b
}
