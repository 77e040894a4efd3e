//! The simulated scene and its fixed-order time step.

use std::fmt;

use tracing::{debug, trace, warn};
use volley_math::Vec3;

use crate::body::Primitive;
use crate::collision::{find_contacts, ContactManifold, PairContact};
use crate::composite::{CompositeObject, PartId};
use crate::config::{SceneConfig, SolverConfig};
use crate::contact::ContactSolver;
use crate::error::{ensure_finite, PhysicsError};

/// Index of a free primitive in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub usize);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a composite object in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeId(pub usize);

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Any rigid body of a scene: a free primitive or a composite part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyRef {
    /// A free primitive.
    Primitive(BodyId),
    /// A part of a composite object.
    Part(CompositeId, PartId),
}

/// A contact found during the last step.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    /// First body; the normal points away from it.
    pub a: BodyRef,
    /// Second body.
    pub b: BodyRef,
    /// Geometry of the contact at detection time.
    pub manifold: ContactManifold,
}

/// A collection of rigid bodies advanced together in time.
///
/// Bodies are never removed, so ids stay valid for the lifetime of the
/// scene. Stepping is deterministic: the same scene stepped with the same
/// `dt` sequence always produces the same trajectory.
///
/// # Example
///
/// ```
/// use volley_physics::{Material, Primitive, Scene};
/// use volley_math::Vec3;
///
/// let mut scene = Scene::new();
/// let ball = Primitive::sphere(0.5, Material::new(1.0)).unwrap()
///     .with_position(Vec3::new(0.0, 5.0, 0.0)).unwrap();
/// let id = scene.add_primitive(ball);
/// scene.step(1.0 / 60.0);
/// assert!(scene.primitive(id).unwrap().position().y < 5.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scene {
    config: SceneConfig,
    primitives: Vec<Primitive>,
    composites: Vec<CompositeObject>,
    contacts: Vec<Contact>,
    time: f64,
    step_count: u64,
}

impl Scene {
    /// Empty scene with Earth gravity and default solver settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty scene with the given configuration.
    pub fn with_config(config: SceneConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Replace the solver settings.
    pub fn set_solver_config(&mut self, solver: SolverConfig) -> Result<(), PhysicsError> {
        solver.validate()?;
        self.config.solver = solver;
        Ok(())
    }

    /// Gravity acceleration.
    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    /// Change gravity; non-finite values are rejected.
    pub fn set_gravity(&mut self, gravity: Vec3) -> Result<(), PhysicsError> {
        ensure_finite(&gravity, "gravity")?;
        self.config.gravity = gravity;
        Ok(())
    }

    /// Add a free primitive.
    pub fn add_primitive(&mut self, primitive: Primitive) -> BodyId {
        let id = BodyId(self.primitives.len());
        debug!(
            body = %id,
            kind = primitive.shape().kind(),
            mass = primitive.material().mass(),
            "added primitive"
        );
        self.primitives.push(primitive);
        id
    }

    /// Add a composite object.
    pub fn add_composite_object(&mut self, composite: CompositeObject) -> CompositeId {
        let id = CompositeId(self.composites.len());
        debug!(
            composite = %id,
            parts = composite.len(),
            joints = composite.joints().len(),
            "added composite object"
        );
        self.composites.push(composite);
        id
    }

    /// Free primitive lookup.
    pub fn primitive(&self, id: BodyId) -> Option<&Primitive> {
        self.primitives.get(id.0)
    }

    /// Mutable free primitive lookup.
    pub fn primitive_mut(&mut self, id: BodyId) -> Option<&mut Primitive> {
        self.primitives.get_mut(id.0)
    }

    /// All free primitives in insertion order.
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Composite lookup.
    pub fn composite(&self, id: CompositeId) -> Option<&CompositeObject> {
        self.composites.get(id.0)
    }

    /// Mutable composite lookup.
    pub fn composite_mut(&mut self, id: CompositeId) -> Option<&mut CompositeObject> {
        self.composites.get_mut(id.0)
    }

    /// All composites in insertion order.
    pub fn composites(&self) -> &[CompositeObject] {
        &self.composites
    }

    /// Resolve any body reference.
    pub fn body(&self, body: BodyRef) -> Option<&Primitive> {
        match body {
            BodyRef::Primitive(id) => self.primitive(id),
            BodyRef::Part(c, p) => self.composite(c)?.part(p).map(|part| part.body()),
        }
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of accepted calls to [`Scene::step`].
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Contacts detected during the last sub-step.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Total kinetic energy of every body.
    pub fn kinetic_energy(&self) -> f64 {
        self.primitives
            .iter()
            .chain(self.composites.iter().flat_map(|c| c.bodies()))
            .map(Primitive::kinetic_energy)
            .sum()
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// A non-finite or non-positive `dt` is logged and ignored; stepping
    /// never fails.
    pub fn step(&mut self, dt: f64) {
        if !dt.is_finite() || dt <= 0.0 {
            warn!(dt, "ignoring invalid time step");
            return;
        }
        let substeps = self.config.solver.substeps.max(1);
        let h = dt / substeps as f64;
        for _ in 0..substeps {
            self.substep(h);
        }
        self.time += dt;
        self.step_count += 1;
    }

    fn substep(&mut self, dt: f64) {
        let gravity = self.config.gravity;
        let solver = &self.config.solver;

        // Forces and integration, then joints inside each composite.
        for body in &mut self.primitives {
            body.integrate(&gravity, dt);
        }
        for composite in &mut self.composites {
            composite.integrate(&gravity, dt);
            composite.solve_joints_velocity(dt, solver.velocity_iterations);
            composite.solve_joints_position(solver.position_iterations);
        }

        let (refs, pairs) = self.detect();

        let mut bodies: Vec<&mut Primitive> = self
            .primitives
            .iter_mut()
            .chain(self.composites.iter_mut().flat_map(|c| c.bodies_mut()))
            .collect();
        let mut contacts = ContactSolver::prepare(&pairs, &bodies, solver);
        contacts.solve_velocity(&mut bodies, solver.contact_iterations);
        contacts.correct_positions(&mut bodies, solver);
        trace!(pairs = contacts.len(), bodies = bodies.len(), "resolved contacts");
        drop(bodies);

        // Contact correction may pull joints apart; project them back.
        for composite in &mut self.composites {
            if composite.max_anchor_error() > solver.joint_slop {
                composite.solve_joints_position(solver.position_iterations);
            }
        }

        self.contacts = pairs
            .into_iter()
            .map(|p| Contact {
                a: refs[p.a],
                b: refs[p.b],
                manifold: p.manifold,
            })
            .collect();
    }

    /// Broad and narrow phase over every body, primitives first.
    fn detect(&self) -> (Vec<BodyRef>, Vec<PairContact>) {
        let mut refs = Vec::new();
        let mut groups = Vec::new();
        let mut bodies = Vec::new();
        for (i, body) in self.primitives.iter().enumerate() {
            refs.push(BodyRef::Primitive(BodyId(i)));
            groups.push(None);
            bodies.push(body);
        }
        for (ci, composite) in self.composites.iter().enumerate() {
            for (pi, body) in composite.bodies().enumerate() {
                refs.push(BodyRef::Part(CompositeId(ci), PartId(pi)));
                groups.push(Some(ci));
                bodies.push(body);
            }
        }
        let pairs = find_contacts(&bodies, &groups);
        (refs, pairs)
    }
}
