#![warn(missing_docs)]

//! Rigid-body physics for small robotics scenes.
//!
//! A [`Scene`] holds free [`Primitive`] bodies (spheres and boxes) and
//! [`CompositeObject`]s, multi-part bodies whose parts are hinged together
//! by [`RevoluteJoint`]s with optional velocity motors. Each call to
//! [`Scene::step`] integrates gravity and applied forces, solves the
//! joints, detects contacts and resolves them with sequential impulses.
//!
//! # Features
//!
//! - Semi-implicit Euler integration with exact quaternion updates
//! - Sphere and oriented-box collision (SAT for box pairs)
//! - Restitution, Coulomb friction and penetration correction
//! - Revolute joints with torque-limited velocity motors
//! - TOML-loadable solver configuration
//!
//! # Example
//!
//! ```
//! use volley_math::{Quat, Vec3};
//! use volley_physics::{CompositeObject, Material, PartId, Scene, Shape};
//!
//! let mut car = CompositeObject::new(Material::new(2.0));
//! let chassis = car
//!     .add_part(
//!         Shape::cuboid(Vec3::new(1.0, 0.25, 0.5)).unwrap(),
//!         Vec3::new(0.0, 1.0, 0.0),
//!         Quat::identity(),
//!         PartId(0),
//!     )
//!     .unwrap();
//! let wheel = car
//!     .add_part(
//!         Shape::sphere(0.3).unwrap(),
//!         Vec3::new(0.8, -0.3, 0.7),
//!         Quat::identity(),
//!         chassis,
//!     )
//!     .unwrap();
//! let axle = car
//!     .add_revolute_joint(chassis, wheel, Vec3::new(0.8, 0.7, 0.7), Vec3::z())
//!     .unwrap();
//! car.get_revolute_joint(axle).unwrap().set_motor(5.0, 10.0).unwrap();
//!
//! let mut scene = Scene::new();
//! let car = scene.add_composite_object(car);
//! scene.step(1.0 / 60.0);
//! assert!(scene.composite(car).unwrap().max_anchor_error() < 1e-3);
//! ```

mod body;
pub mod collision;
mod composite;
mod config;
mod contact;
mod error;
mod joints;
mod material;
mod scene;
mod shape;

pub use body::Primitive;
pub use collision::{collide, ContactManifold, ContactPoint};
pub use composite::{CompositeObject, JointId, Part, PartId, RevoluteJointMut};
pub use config::{earth_gravity, SceneConfig, SolverConfig};
pub use error::PhysicsError;
pub use joints::{JointMotor, RevoluteJoint};
pub use material::{combine_friction, combine_restitution, Material};
pub use scene::{BodyId, BodyRef, CompositeId, Contact, Scene};
pub use shape::{Aabb, Shape};
