//! Constant-velocity motion without gravity.
//!
//! Run with: cargo run -p volley-physics --example kinematics

use volley_math::Vec3;
use volley_physics::{Material, Primitive, Scene};

fn main() -> Result<(), volley_physics::PhysicsError> {
    println!("--- Kinematics (constant velocity) ---");

    let mut scene = Scene::new();
    scene.set_gravity(Vec3::zeros())?;

    let id = scene.add_primitive(
        Primitive::sphere(0.5, Material::new(1.0))?
            .with_position(Vec3::new(0.0, 10.0, 0.0))?
            .with_velocity(Vec3::new(1.0, 0.0, 0.0))?,
    );

    let dt = 1.0 / 60.0;
    for i in 0..300 {
        scene.step(dt);
        if i % 30 == 0 {
            if let Some(body) = scene.primitive(id) {
                let p = body.position();
                println!("t = {:5.2}s | pos ({:6.2}, {:6.2}, {:6.2})", scene.time(), p.x, p.y, p.z);
            }
        }
    }
    Ok(())
}
