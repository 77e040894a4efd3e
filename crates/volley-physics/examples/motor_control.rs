//! A small car whose front wheels are driven by joint motors.
//!
//! Run with: cargo run -p volley-physics --example motor_control

use volley_math::{Quat, Vec3};
use volley_physics::{CompositeObject, Material, PartId, PhysicsError, Primitive, Scene, Shape};

const WHEEL_RADIUS: f64 = 0.4;

fn build_car() -> Result<(CompositeObject, Vec<volley_physics::JointId>), PhysicsError> {
    let body = Material::new(10.0).with_friction(0.8);
    let wheel = Material::new(1.0).with_friction(0.8).with_restitution(0.1);
    let mut car = CompositeObject::new(body);

    let chassis = car.add_part(
        Shape::cuboid(Vec3::new(1.0, 0.25, 2.0))?,
        Vec3::new(0.0, 0.8, 0.0),
        Quat::identity(),
        PartId(0),
    )?;

    // Axles run along X; wheels sit just outside the chassis.
    let mut axles = Vec::new();
    for (x, z) in [(-1.3, 1.5), (1.3, 1.5), (-1.3, -1.5), (1.3, -1.5)] {
        let offset = Vec3::new(x, WHEEL_RADIUS - 0.8, z);
        let shape = Shape::sphere(WHEEL_RADIUS)?;
        let part = car.add_part_with_material(shape, wheel, offset, Quat::identity(), chassis)?;
        let anchor = Vec3::new(x, WHEEL_RADIUS, z);
        axles.push(car.add_revolute_joint(chassis, part, anchor, Vec3::x())?);
    }
    Ok((car, axles))
}

fn main() -> Result<(), PhysicsError> {
    let mut scene = Scene::new();
    scene.add_primitive(
        Primitive::cuboid(Vec3::new(50.0, 1.0, 50.0), Material::fixed().with_friction(1.0))?
            .with_position(Vec3::new(0.0, -1.0, 0.0))?,
    );

    let (car, axles) = build_car()?;
    let car = scene.add_composite_object(car);

    let target_speed = 4.0;
    let max_torque = 50.0;
    if let Some(c) = scene.composite_mut(car) {
        // Front-wheel drive; the rear wheels are passive hinges.
        for axle in &axles[..2] {
            if let Some(mut joint) = c.get_revolute_joint(*axle) {
                joint.set_motor(target_speed, max_torque)?;
            }
        }
    }
    println!("Motor target {target_speed:.2} rad/s, max torque {max_torque:.1} Nm");

    let dt = 1.0 / 60.0;
    for i in 0..180 {
        scene.step(dt);
        if i % 10 != 0 {
            continue;
        }
        let Some(c) = scene.composite_mut(car) else {
            break;
        };
        let com = c.center_of_mass();
        let anchor_error = c.max_anchor_error();
        if let Some(joint) = c.get_revolute_joint(axles[0]) {
            println!(
                "step {i:03} | wheel speed {:6.2} rad/s | car z {:6.2} | anchor error {:.1e}",
                joint.relative_speed(),
                com.z,
                anchor_error
            );
        }
    }
    Ok(())
}
