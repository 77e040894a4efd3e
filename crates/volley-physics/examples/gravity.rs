//! Drop a bouncy sphere onto a static ground box and log its motion.
//!
//! Run with: cargo run -p volley-physics --example gravity

use volley_math::Vec3;
use volley_physics::{Material, Primitive, Scene};

fn main() -> Result<(), volley_physics::PhysicsError> {
    println!("--- Gravity and ground collision ---");

    let mut scene = Scene::new();

    let ball_material = Material::new(1.0).with_restitution(0.8);
    let ground_material = Material::fixed().with_restitution(0.5);

    let ball = scene.add_primitive(
        Primitive::sphere(0.5, ball_material)?.with_position(Vec3::new(0.0, 5.0, 0.0))?,
    );
    // Top face at y = 0.
    scene.add_primitive(
        Primitive::cuboid(Vec3::new(10.0, 0.5, 10.0), ground_material)?
            .with_position(Vec3::new(0.0, -0.5, 0.0))?,
    );

    let dt = 1.0 / 60.0;
    for i in 0..300 {
        scene.step(dt);
        if i % 30 == 0 {
            if let Some(body) = scene.primitive(ball) {
                let p = body.position();
                let v = body.velocity();
                println!(
                    "t={:5.2}s pos=({:.2}, {:.2}, {:.2}) vel=({:.2}, {:.2}, {:.2}) contacts={}",
                    scene.time(),
                    p.x,
                    p.y,
                    p.z,
                    v.x,
                    v.y,
                    v.z,
                    scene.contacts().len()
                );
            }
        }
    }
    Ok(())
}
