//! Multi-part bodies connected by revolute joints.

use std::fmt;

use tracing::debug;
use volley_math::{Pose, Quat, Vec3};

use crate::body::Primitive;
use crate::error::{ensure_finite, PhysicsError};
use crate::joints::{JointMotor, RevoluteJoint};
use crate::material::Material;
use crate::shape::{Aabb, Shape};

/// Index of a part inside its composite object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartId(pub usize);

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a joint inside its composite object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointId(pub usize);

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A primitive owned by a composite object.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    body: Primitive,
    parent: Option<PartId>,
    local_pose: Pose,
}

impl Part {
    /// The rigid body of this part.
    pub fn body(&self) -> &Primitive {
        &self.body
    }

    /// Mutable access to the rigid body.
    pub fn body_mut(&mut self) -> &mut Primitive {
        &mut self.body
    }

    /// Parent part, `None` for the root.
    pub fn parent(&self) -> Option<PartId> {
        self.parent
    }

    /// Pose relative to the parent (or the composite origin for the root)
    /// at the time the part was added.
    pub fn local_pose(&self) -> &Pose {
        &self.local_pose
    }
}

/// A set of parts linked by joints, moved as one unit in the scene.
///
/// Parts and joints live in insertion-ordered arenas; ids are never reused.
/// Contacts between parts of the same composite are not generated.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeObject {
    material: Material,
    origin: Pose,
    parts: Vec<Part>,
    joints: Vec<RevoluteJoint>,
}

impl CompositeObject {
    /// Empty composite whose parts default to `material`.
    pub fn new(material: Material) -> Self {
        Self {
            material,
            origin: Pose::identity(),
            parts: Vec::new(),
            joints: Vec::new(),
        }
    }

    /// Builder-style [`CompositeObject::set_origin`].
    pub fn with_origin(mut self, origin: Pose) -> Result<Self, PhysicsError> {
        self.set_origin(origin)?;
        Ok(self)
    }

    /// Default material of new parts.
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Composite origin in world coordinates.
    pub fn origin(&self) -> &Pose {
        &self.origin
    }

    /// Move the composite so that its origin lands on `origin`.
    ///
    /// Every part is carried rigidly, including its velocities.
    pub fn set_origin(&mut self, origin: Pose) -> Result<(), PhysicsError> {
        ensure_finite(&origin.position, "composite origin")?;
        if !origin.orientation.coords.iter().all(|c| c.is_finite()) {
            return Err(PhysicsError::NonFinite {
                what: "composite orientation",
            });
        }
        let delta = origin.then(&self.origin.inverse());
        for part in &mut self.parts {
            let body = &mut part.body;
            let pose = delta.then(body.pose());
            let v = delta.apply_vec(&body.velocity());
            let w = delta.apply_vec(&body.angular_velocity());
            body.place(pose);
            body.set_velocity(v)?;
            body.set_angular_velocity(w)?;
        }
        self.origin = origin;
        Ok(())
    }

    /// Add a part using the composite material.
    ///
    /// The world pose is `parent ∘ local`. The first part is the root and is
    /// placed relative to the origin; its `parent` argument is ignored.
    pub fn add_part(
        &mut self,
        shape: Shape,
        local_position: Vec3,
        local_orientation: Quat,
        parent: PartId,
    ) -> Result<PartId, PhysicsError> {
        let material = self.material;
        self.add_part_with_material(shape, material, local_position, local_orientation, parent)
    }

    /// Add a part with its own material.
    pub fn add_part_with_material(
        &mut self,
        shape: Shape,
        material: Material,
        local_position: Vec3,
        local_orientation: Quat,
        parent: PartId,
    ) -> Result<PartId, PhysicsError> {
        ensure_finite(&local_position, "part position")?;
        if !local_orientation.coords.iter().all(|c| c.is_finite()) {
            return Err(PhysicsError::NonFinite {
                what: "part orientation",
            });
        }
        let local_pose = Pose::new(local_position, local_orientation);

        let (parent, world) = if self.parts.is_empty() {
            (None, self.origin.then(&local_pose))
        } else {
            let parent_part = self.part(parent).ok_or(PhysicsError::InvalidPart {
                id: parent,
                count: self.parts.len(),
            })?;
            (Some(parent), parent_part.body.pose().then(&local_pose))
        };

        let mut body = Primitive::new(shape, material);
        body.place(world);

        let id = PartId(self.parts.len());
        debug!(part = %id, kind = shape.kind(), mass = material.mass(), "added part");
        self.parts.push(Part {
            body,
            parent,
            local_pose,
        });
        Ok(id)
    }

    /// Hinge parts `a` and `b` about `axis` through the world point
    /// `anchor`, both taken from the current part poses.
    pub fn add_revolute_joint(
        &mut self,
        a: PartId,
        b: PartId,
        anchor: Vec3,
        axis: Vec3,
    ) -> Result<JointId, PhysicsError> {
        let count = self.parts.len();
        let part_a = self.part(a).ok_or(PhysicsError::InvalidPart { id: a, count })?;
        let part_b = self.part(b).ok_or(PhysicsError::InvalidPart { id: b, count })?;
        let joint = RevoluteJoint::new(a, b, &part_a.body, &part_b.body, anchor, axis)?;

        let id = JointId(self.joints.len());
        debug!(joint = %id, body_a = %a, body_b = %b, "added revolute joint");
        self.joints.push(joint);
        Ok(id)
    }

    /// Handle to configure and query a joint, `None` for unknown ids.
    pub fn get_revolute_joint(&mut self, id: JointId) -> Option<RevoluteJointMut<'_>> {
        let joint = self.joints.get_mut(id.0)?;
        Some(RevoluteJointMut {
            id,
            joint,
            parts: &self.parts,
        })
    }

    /// Read-only joint lookup.
    pub fn revolute_joint(&self, id: JointId) -> Option<&RevoluteJoint> {
        self.joints.get(id.0)
    }

    /// All joints in creation order.
    pub fn joints(&self) -> &[RevoluteJoint] {
        &self.joints
    }

    /// Part lookup.
    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id.0)
    }

    /// Mutable part lookup.
    pub fn part_mut(&mut self, id: PartId) -> Option<&mut Part> {
        self.parts.get_mut(id.0)
    }

    /// All parts in creation order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True when no part has been added yet.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Sum of part masses.
    pub fn total_mass(&self) -> f64 {
        self.parts.iter().map(|p| p.body.material().mass()).sum()
    }

    /// Mass-weighted center of the parts.
    ///
    /// Falls back to the plain average of part positions when every part is
    /// immovable, and to the origin when the composite is empty.
    pub fn center_of_mass(&self) -> Vec3 {
        if self.parts.is_empty() {
            return self.origin.position;
        }
        let total = self.total_mass();
        if total <= 0.0 {
            let sum: Vec3 = self.parts.iter().map(|p| p.body.position()).sum();
            return sum / self.parts.len() as f64;
        }
        self.parts
            .iter()
            .map(|p| p.body.position() * p.body.material().mass())
            .sum::<Vec3>()
            / total
    }

    /// Union of the part bounding boxes, `None` when empty.
    pub fn aabb(&self) -> Option<Aabb> {
        self.parts
            .iter()
            .map(|p| p.body.aabb())
            .reduce(|acc, b| acc.union(&b))
    }

    pub(crate) fn bodies(&self) -> impl Iterator<Item = &Primitive> {
        self.parts.iter().map(|p| &p.body)
    }

    pub(crate) fn bodies_mut(&mut self) -> impl Iterator<Item = &mut Primitive> {
        self.parts.iter_mut().map(|p| &mut p.body)
    }

    pub(crate) fn integrate(&mut self, gravity: &Vec3, dt: f64) {
        for part in &mut self.parts {
            part.body.integrate(gravity, dt);
        }
    }

    /// Joint velocity iterations for one step.
    pub(crate) fn solve_joints_velocity(&mut self, dt: f64, iterations: usize) {
        if self.joints.is_empty() {
            return;
        }
        for joint in &mut self.joints {
            joint.begin_step();
        }
        for _ in 0..iterations {
            for joint in &mut self.joints {
                let (a, b) = pair_mut(&mut self.parts, joint.body_a(), joint.body_b());
                joint.solve_velocity(a, b, dt);
            }
        }
    }

    /// Joint position iterations.
    pub(crate) fn solve_joints_position(&mut self, iterations: usize) {
        for _ in 0..iterations {
            for joint in &self.joints {
                let (a, b) = pair_mut(&mut self.parts, joint.body_a(), joint.body_b());
                joint.solve_position(a, b);
            }
        }
    }

    /// Largest anchor separation over all joints.
    pub fn max_anchor_error(&self) -> f64 {
        self.joints
            .iter()
            .map(|j| j.anchor_error(&self.parts[j.body_a().0].body, &self.parts[j.body_b().0].body))
            .fold(0.0, f64::max)
    }
}

/// Two distinct parts borrowed mutably at once.
fn pair_mut(parts: &mut [Part], a: PartId, b: PartId) -> (&mut Primitive, &mut Primitive) {
    debug_assert_ne!(a, b);
    if a.0 < b.0 {
        let (lo, hi) = parts.split_at_mut(b.0);
        (&mut lo[a.0].body, &mut hi[0].body)
    } else {
        let (lo, hi) = parts.split_at_mut(a.0);
        (&mut hi[0].body, &mut lo[b.0].body)
    }
}

/// Mutable view of one joint together with the parts it connects.
pub struct RevoluteJointMut<'a> {
    id: JointId,
    joint: &'a mut RevoluteJoint,
    parts: &'a [Part],
}

impl RevoluteJointMut<'_> {
    /// Joint id.
    pub fn id(&self) -> JointId {
        self.id
    }

    /// Start driving the joint toward `target_speed` (rad/s) with at most
    /// `max_torque`. A zero torque disables the motor.
    pub fn set_motor(&mut self, target_speed: f64, max_torque: f64) -> Result<(), PhysicsError> {
        self.joint.set_motor(target_speed, max_torque)
    }

    /// Turn the motor off.
    pub fn disable_motor(&mut self) {
        self.joint.disable_motor();
    }

    /// Current motor state.
    pub fn motor(&self) -> JointMotor {
        self.joint.motor()
    }

    /// Angular speed of B relative to A about the world axis.
    pub fn relative_speed(&self) -> f64 {
        let (a, b) = self.bodies();
        self.joint.relative_speed(a, b)
    }

    /// Rotation of B relative to A about the axis since creation.
    pub fn relative_angle(&self) -> f64 {
        let (a, b) = self.bodies();
        self.joint.relative_angle(a, b)
    }

    /// Distance between the anchor as carried by each part.
    pub fn anchor_error(&self) -> f64 {
        let (a, b) = self.bodies();
        self.joint.anchor_error(a, b)
    }

    /// The underlying joint.
    pub fn joint(&self) -> &RevoluteJoint {
        &*self.joint
    }

    fn bodies(&self) -> (&Primitive, &Primitive) {
        (
            &self.parts[self.joint.body_a().0].body,
            &self.parts[self.joint.body_b().0].body,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use volley_math::axis_angle;

    fn cube() -> Shape {
        Shape::cuboid(Vec3::new(0.5, 0.5, 0.5)).unwrap()
    }

    fn pendulum() -> CompositeObject {
        let mut c = CompositeObject::new(Material::new(1.0));
        let root = c.add_part(cube(), Vec3::zeros(), Quat::identity(), PartId(0)).unwrap();
        c.add_part(cube(), Vec3::new(1.0, 0.0, 0.0), Quat::identity(), root).unwrap();
        c
    }

    #[test]
    fn test_part_ids_are_sequential() {
        let c = pendulum();
        assert_eq!(c.len(), 2);
        assert_eq!(c.part(PartId(0)).unwrap().parent(), None);
        assert_eq!(c.part(PartId(1)).unwrap().parent(), Some(PartId(0)));
        assert!(c.part(PartId(2)).is_none());
    }

    #[test]
    fn test_child_pose_composes_with_parent() {
        let mut c = CompositeObject::new(Material::new(1.0))
            .with_origin(Pose::from_position(Vec3::new(0.0, 2.0, 0.0)))
            .unwrap();
        let root = c
            .add_part(
                cube(),
                Vec3::zeros(),
                axis_angle(&Vec3::z(), std::f64::consts::FRAC_PI_2),
                PartId(7),
            )
            .unwrap();
        let child = c.add_part(cube(), Vec3::new(1.0, 0.0, 0.0), Quat::identity(), root).unwrap();
        let p = c.part(child).unwrap().body().position();
        assert_relative_eq!(p, Vec3::new(0.0, 3.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut c = pendulum();
        let err = c.add_part(cube(), Vec3::zeros(), Quat::identity(), PartId(9)).unwrap_err();
        assert_eq!(err, PhysicsError::InvalidPart { id: PartId(9), count: 2 });
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_joint_validation() {
        let mut c = pendulum();
        assert_eq!(
            c.add_revolute_joint(PartId(0), PartId(5), Vec3::zeros(), Vec3::z()).unwrap_err(),
            PhysicsError::InvalidPart { id: PartId(5), count: 2 }
        );
        assert_eq!(
            c.add_revolute_joint(PartId(0), PartId(0), Vec3::zeros(), Vec3::z()).unwrap_err(),
            PhysicsError::SamePart(PartId(0))
        );
        assert_eq!(
            c.add_revolute_joint(PartId(0), PartId(1), Vec3::zeros(), Vec3::zeros()).unwrap_err(),
            PhysicsError::DegenerateAxis
        );
        let id = c
            .add_revolute_joint(PartId(0), PartId(1), Vec3::new(0.5, 0.0, 0.0), Vec3::z())
            .unwrap();
        assert_eq!(id, JointId(0));
        assert!(c.get_revolute_joint(JointId(1)).is_none());
    }

    #[test]
    fn test_joint_handle() {
        let mut c = pendulum();
        let id = c
            .add_revolute_joint(PartId(0), PartId(1), Vec3::new(0.5, 0.0, 0.0), Vec3::z())
            .unwrap();
        let mut handle = c.get_revolute_joint(id).unwrap();
        handle.set_motor(1.5, 20.0).unwrap();
        assert!(handle.motor().is_active());
        assert_eq!(handle.relative_speed(), 0.0);
        assert!(handle.anchor_error() < 1e-12);
        handle.disable_motor();
        assert_eq!(c.revolute_joint(id).unwrap().motor(), JointMotor::Disabled);
    }

    #[test]
    fn test_set_origin_moves_rigidly() {
        let mut c = pendulum();
        c.part_mut(PartId(1))
            .unwrap()
            .body_mut()
            .set_velocity(Vec3::new(1.0, 0.0, 0.0))
            .unwrap();
        let turned = axis_angle(&Vec3::y(), std::f64::consts::PI);
        c.set_origin(Pose::new(Vec3::new(0.0, 5.0, 0.0), turned))
            .unwrap();
        let child = c.part(PartId(1)).unwrap().body();
        assert_relative_eq!(child.position(), Vec3::new(-1.0, 5.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(child.velocity(), Vec3::new(-1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_mass_properties() {
        let mut c = CompositeObject::new(Material::new(1.0));
        let root = c.add_part(cube(), Vec3::zeros(), Quat::identity(), PartId(0)).unwrap();
        c.add_part_with_material(
            cube(),
            Material::new(3.0),
            Vec3::new(2.0, 0.0, 0.0),
            Quat::identity(),
            root,
        )
        .unwrap();
        assert_relative_eq!(c.total_mass(), 4.0);
        assert_relative_eq!(c.center_of_mass(), Vec3::new(1.5, 0.0, 0.0), epsilon = 1e-12);
        let aabb = c.aabb().unwrap();
        assert_relative_eq!(aabb.min.x, -0.5);
        assert_relative_eq!(aabb.max.x, 2.5);
    }

    #[test]
    fn test_joint_solver_keeps_anchor() {
        let mut c = CompositeObject::new(Material::fixed());
        let root = c.add_part(cube(), Vec3::zeros(), Quat::identity(), PartId(0)).unwrap();
        let arm = c
            .add_part_with_material(
                cube(),
                Material::new(1.0),
                Vec3::new(1.0, 0.0, 0.0),
                Quat::identity(),
                root,
            )
            .unwrap();
        c.add_revolute_joint(root, arm, Vec3::new(0.5, 0.0, 0.0), Vec3::z())
            .unwrap();
        let gravity = Vec3::new(0.0, -9.81, 0.0);
        let dt = 1.0 / 60.0;
        for _ in 0..30 {
            c.integrate(&gravity, dt);
            c.solve_joints_velocity(dt, 8);
            c.solve_joints_position(8);
            assert!(c.max_anchor_error() < 1e-3);
        }
        // The arm swung down around the hinge.
        assert!(c.part(arm).unwrap().body().position().y < -0.1);
    }
}
