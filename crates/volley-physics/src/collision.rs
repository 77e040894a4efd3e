//! Collision detection: broad phase over bounding boxes, narrow phase per
//! shape pair.

use volley_math::{Pose, Vec3};

use crate::body::Primitive;
use crate::shape::{Aabb, Shape};

/// Separation below which two centers are treated as coincident.
const CENTER_EPSILON: f64 = 1e-9;

/// Slack used when testing whether a box vertex lies inside another box.
const VERTEX_SLACK: f64 = 1e-6;

/// One point of contact between two shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// World position of the contact.
    pub position: Vec3,
    /// Penetration depth at this point (>= 0).
    pub depth: f64,
}

/// Result of a narrow-phase test between shapes A and B.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactManifold {
    /// Unit normal pointing from A towards B.
    pub normal: Vec3,
    /// Largest penetration depth of the manifold.
    pub depth: f64,
    /// Contact points (at least one).
    pub points: Vec<ContactPoint>,
}

impl ContactManifold {
    fn single(normal: Vec3, depth: f64, position: Vec3) -> Self {
        Self {
            normal,
            depth,
            points: vec![ContactPoint { position, depth }],
        }
    }

    fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        self
    }
}

/// Test two placed shapes for overlap.
///
/// Returns `None` when the shapes are separated.
pub fn collide(
    shape_a: &Shape,
    pose_a: &Pose,
    shape_b: &Shape,
    pose_b: &Pose,
) -> Option<ContactManifold> {
    match (shape_a, shape_b) {
        (Shape::Sphere { radius: ra }, Shape::Sphere { radius: rb }) => {
            sphere_sphere(&pose_a.position, *ra, &pose_b.position, *rb)
        }
        (Shape::Sphere { radius }, Shape::Cuboid { half_extents }) => {
            sphere_cuboid(&pose_a.position, *radius, pose_b, half_extents)
        }
        (Shape::Cuboid { half_extents }, Shape::Sphere { radius }) => {
            sphere_cuboid(&pose_b.position, *radius, pose_a, half_extents)
                .map(ContactManifold::flipped)
        }
        (Shape::Cuboid { half_extents: ha }, Shape::Cuboid { half_extents: hb }) => {
            cuboid_cuboid(pose_a, ha, pose_b, hb)
        }
    }
}

/// Sphere against sphere: center distance against summed radii.
pub fn sphere_sphere(
    center_a: &Vec3,
    radius_a: f64,
    center_b: &Vec3,
    radius_b: f64,
) -> Option<ContactManifold> {
    let delta = center_b - center_a;
    let radii = radius_a + radius_b;
    let dist_sq = delta.norm_squared();
    if dist_sq >= radii * radii {
        return None;
    }
    let dist = dist_sq.sqrt();
    // Coincident centers: push apart along +Y.
    let normal = if dist > CENTER_EPSILON {
        delta / dist
    } else {
        Vec3::y()
    };
    let depth = radii - dist;
    let position = center_a + normal * (radius_a - 0.5 * depth);
    Some(ContactManifold::single(normal, depth, position))
}

/// Sphere (A) against an oriented box (B).
pub fn sphere_cuboid(
    center: &Vec3,
    radius: f64,
    box_pose: &Pose,
    half_extents: &Vec3,
) -> Option<ContactManifold> {
    let local = box_pose.inverse_apply_point(center);
    let clamped = Vec3::new(
        local.x.clamp(-half_extents.x, half_extents.x),
        local.y.clamp(-half_extents.y, half_extents.y),
        local.z.clamp(-half_extents.z, half_extents.z),
    );

    if clamped != local {
        let closest = box_pose.apply_point(&clamped);
        let delta = closest - center;
        let dist_sq = delta.norm_squared();
        if dist_sq >= radius * radius {
            return None;
        }
        let dist = dist_sq.sqrt();
        let normal = if dist > CENTER_EPSILON {
            delta / dist
        } else {
            -box_pose.apply_vec(&(local - clamped)).normalize()
        };
        return Some(ContactManifold::single(normal, radius - dist, closest));
    }

    // Center inside the box: leave through the nearest face.
    let mut axis = 0;
    let mut gap = f64::INFINITY;
    for i in 0..3 {
        let g = half_extents[i] - local[i].abs();
        if g < gap {
            gap = g;
            axis = i;
        }
    }
    let sign = if local[axis] < 0.0 { -1.0 } else { 1.0 };
    let mut face_normal = Vec3::zeros();
    face_normal[axis] = sign;
    let mut face_point = local;
    face_point[axis] = sign * half_extents[axis];

    let normal = -box_pose.apply_vec(&face_normal);
    Some(ContactManifold::single(normal, radius + gap, box_pose.apply_point(&face_point)))
}

/// Oriented box against oriented box using the separating axis test.
pub fn cuboid_cuboid(
    pose_a: &Pose,
    half_a: &Vec3,
    pose_b: &Pose,
    half_b: &Vec3,
) -> Option<ContactManifold> {
    let rot_a = pose_a.rotation_matrix();
    let rot_b = pose_b.rotation_matrix();
    let axes_a: [Vec3; 3] = std::array::from_fn(|i| rot_a.column(i).into_owned());
    let axes_b: [Vec3; 3] = std::array::from_fn(|i| rot_b.column(i).into_owned());
    let d = pose_b.position - pose_a.position;

    let project = |axes: &[Vec3; 3], half: &Vec3, l: &Vec3| -> f64 {
        (0..3).map(|i| half[i] * axes[i].dot(l).abs()).sum()
    };

    let mut best_axis = Vec3::zeros();
    let mut best_overlap = f64::INFINITY;

    // Face axes first.
    for l in axes_a.iter().chain(axes_b.iter()) {
        let overlap =
            project(&axes_a, half_a, l) + project(&axes_b, half_b, l) - d.dot(l).abs();
        if overlap < 0.0 {
            return None;
        }
        if overlap < best_overlap {
            best_overlap = overlap;
            best_axis = *l;
        }
    }

    // Edge-edge axes only win when clearly shallower than the best face.
    let face_overlap = best_overlap;
    for ea in &axes_a {
        for eb in &axes_b {
            let cross = ea.cross(eb);
            let len = cross.norm();
            if len < 1e-6 {
                continue;
            }
            let l = cross / len;
            let overlap =
                project(&axes_a, half_a, &l) + project(&axes_b, half_b, &l) - d.dot(&l).abs();
            if overlap < 0.0 {
                return None;
            }
            if overlap < best_overlap && overlap < 0.95 * face_overlap {
                best_overlap = overlap;
                best_axis = l;
            }
        }
    }

    let normal = if d.dot(&best_axis) < 0.0 { -best_axis } else { best_axis };
    let reach_a = project(&axes_a, half_a, &normal);
    let reach_b = project(&axes_b, half_b, &normal);
    let front_a = pose_a.position.dot(&normal) + reach_a;
    let back_b = pose_b.position.dot(&normal) - reach_b;

    let mut points = Vec::new();
    for v in corners(pose_b, half_b) {
        if contains(pose_a, half_a, &v) {
            let depth = front_a - v.dot(&normal);
            if depth >= 0.0 {
                points.push(ContactPoint { position: v, depth });
            }
        }
    }
    for v in corners(pose_a, half_a) {
        if contains(pose_b, half_b, &v) {
            let depth = v.dot(&normal) - back_b;
            if depth >= 0.0 {
                points.push(ContactPoint { position: v, depth });
            }
        }
    }
    if points.is_empty() {
        let support_a = support(pose_a, half_a, &normal);
        let support_b = support(pose_b, half_b, &-normal);
        points.push(ContactPoint {
            position: (support_a + support_b) * 0.5,
            depth: best_overlap,
        });
    }

    Some(ContactManifold {
        normal,
        depth: best_overlap,
        points,
    })
}

fn corners(pose: &Pose, half: &Vec3) -> [Vec3; 8] {
    let mut out = [Vec3::zeros(); 8];
    for (i, corner) in out.iter_mut().enumerate() {
        let local = Vec3::new(
            if i & 1 == 0 { -half.x } else { half.x },
            if i & 2 == 0 { -half.y } else { half.y },
            if i & 4 == 0 { -half.z } else { half.z },
        );
        *corner = pose.apply_point(&local);
    }
    out
}

fn contains(pose: &Pose, half: &Vec3, point: &Vec3) -> bool {
    let local = pose.inverse_apply_point(point);
    (0..3).all(|i| local[i].abs() <= half[i] + VERTEX_SLACK)
}

fn support(pose: &Pose, half: &Vec3, direction: &Vec3) -> Vec3 {
    let local_dir = pose.inverse_apply_vec(direction);
    let local = Vec3::new(
        half.x.copysign(local_dir.x),
        half.y.copysign(local_dir.y),
        half.z.copysign(local_dir.z),
    );
    pose.apply_point(&local)
}

/// Overlapping pair found by [`find_contacts`]; indices into the body list.
#[derive(Debug, Clone)]
pub(crate) struct PairContact {
    pub a: usize,
    pub b: usize,
    pub manifold: ContactManifold,
}

/// Brute-force broad phase followed by the narrow phase.
///
/// `groups[i]` is the composite a body belongs to, if any. Bodies of the same
/// composite never collide with each other, and static pairs are skipped.
/// Composites are first tested as one aggregate box.
pub(crate) fn find_contacts(bodies: &[&Primitive], groups: &[Option<usize>]) -> Vec<PairContact> {
    let boxes: Vec<Aabb> = bodies.iter().map(|b| b.aabb()).collect();

    let group_count = groups.iter().flatten().map(|g| g + 1).max().unwrap_or(0);
    let mut group_boxes: Vec<Option<Aabb>> = vec![None; group_count];
    for (aabb, group) in boxes.iter().zip(groups) {
        if let Some(g) = group {
            group_boxes[*g] = Some(match group_boxes[*g] {
                Some(existing) => existing.union(aabb),
                None => *aabb,
            });
        }
    }
    let aggregate = |i: usize| -> Aabb {
        groups[i]
            .and_then(|g| group_boxes[g])
            .unwrap_or(boxes[i])
    };

    let mut contacts = Vec::new();
    for i in 0..bodies.len() {
        for j in (i + 1)..bodies.len() {
            if bodies[i].is_static() && bodies[j].is_static() {
                continue;
            }
            if groups[i].is_some() && groups[i] == groups[j] {
                continue;
            }
            if !aggregate(i).overlaps(&aggregate(j)) || !boxes[i].overlaps(&boxes[j]) {
                continue;
            }
            let (a, b) = (bodies[i], bodies[j]);
            if let Some(manifold) = collide(a.shape(), a.pose(), b.shape(), b.pose()) {
                contacts.push(PairContact { a: i, b: j, manifold });
            }
        }
    }
    contacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use approx::assert_relative_eq;
    use volley_math::axis_angle;

    fn ground_half() -> Vec3 {
        Vec3::new(10.0, 0.5, 10.0)
    }

    #[test]
    fn test_sphere_sphere_overlap() {
        let m = sphere_sphere(&Vec3::zeros(), 1.0, &Vec3::new(1.5, 0.0, 0.0), 1.0).unwrap();
        assert_relative_eq!(m.normal, Vec3::x(), epsilon = 1e-12);
        assert_relative_eq!(m.depth, 0.5, epsilon = 1e-12);
        assert_relative_eq!(m.points[0].position.x, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_sphere_separated() {
        assert!(sphere_sphere(&Vec3::zeros(), 1.0, &Vec3::new(2.5, 0.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn test_sphere_sphere_coincident() {
        let m = sphere_sphere(&Vec3::zeros(), 1.0, &Vec3::zeros(), 0.5).unwrap();
        assert_eq!(m.normal, Vec3::y());
        assert_relative_eq!(m.depth, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_resting_on_box() {
        let ground = Pose::from_position(Vec3::new(0.0, -0.5, 0.0));
        let m = sphere_cuboid(&Vec3::new(0.3, 0.4, 0.0), 0.5, &ground, &ground_half()).unwrap();
        // Normal points from the sphere into the ground.
        assert_relative_eq!(m.normal, -Vec3::y(), epsilon = 1e-12);
        assert_relative_eq!(m.depth, 0.1, epsilon = 1e-12);
        assert_relative_eq!(m.points[0].position, Vec3::new(0.3, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_center_inside_box() {
        let ground = Pose::from_position(Vec3::new(0.0, -0.5, 0.0));
        let m = sphere_cuboid(&Vec3::new(0.0, -0.2, 0.0), 0.5, &ground, &ground_half()).unwrap();
        assert_relative_eq!(m.normal, -Vec3::y(), epsilon = 1e-12);
        assert_relative_eq!(m.depth, 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_near_rotated_box() {
        let pose = Pose::new(Vec3::zeros(), axis_angle(&Vec3::z(), std::f64::consts::FRAC_PI_4));
        let half = Vec3::new(1.0, 1.0, 1.0);
        // Corner of the rotated box points along +X at distance sqrt(2).
        assert!(sphere_cuboid(&Vec3::new(1.8, 0.0, 0.0), 0.3, &pose, &half).is_none());
        let m = sphere_cuboid(&Vec3::new(1.6, 0.0, 0.0), 0.3, &pose, &half).unwrap();
        assert_relative_eq!(m.normal, -Vec3::x(), epsilon = 1e-9);
    }

    #[test]
    fn test_box_sphere_flips_normal() {
        let sphere = Shape::sphere(0.5).unwrap();
        let ground = Shape::cuboid(Vec3::new(10.0, 0.5, 10.0)).unwrap();
        let ground_pose = Pose::from_position(Vec3::new(0.0, -0.5, 0.0));
        let ball_pose = Pose::from_position(Vec3::new(0.0, 0.4, 0.0));
        let m = collide(&ground, &ground_pose, &sphere, &ball_pose).unwrap();
        assert_relative_eq!(m.normal, Vec3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_box_on_box_face_contact() {
        let ground = Pose::from_position(Vec3::new(0.0, -0.5, 0.0));
        let crate_pose = Pose::from_position(Vec3::new(0.0, 0.45, 0.0));
        let m = cuboid_cuboid(&ground, &ground_half(), &crate_pose, &Vec3::repeat(0.5)).unwrap();
        assert_relative_eq!(m.normal, Vec3::y(), epsilon = 1e-12);
        assert_relative_eq!(m.depth, 0.05, epsilon = 1e-12);
        assert_eq!(m.points.len(), 4);
        for p in &m.points {
            assert_relative_eq!(p.depth, 0.05, epsilon = 1e-12);
            assert_relative_eq!(p.position.y, -0.05, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_box_box_separated() {
        let a = Pose::from_position(Vec3::zeros());
        let b = Pose::new(Vec3::new(2.2, 0.0, 0.0), axis_angle(&Vec3::y(), 0.3));
        let half = Vec3::new(0.5, 0.5, 0.5);
        assert!(cuboid_cuboid(&a, &half, &b, &half).is_none());
    }

    #[test]
    fn test_rotated_box_corner_contact() {
        let ground = Pose::from_position(Vec3::new(0.0, -0.5, 0.0));
        // Cube balanced on an edge, slightly sunk into the ground.
        let tilt = axis_angle(&Vec3::z(), std::f64::consts::FRAC_PI_4);
        let height = 0.5 * std::f64::consts::SQRT_2 - 0.02;
        let cube = Pose::new(Vec3::new(0.0, height, 0.0), tilt);
        let m = cuboid_cuboid(&ground, &ground_half(), &cube, &Vec3::repeat(0.5)).unwrap();
        assert_relative_eq!(m.normal, Vec3::y(), epsilon = 1e-9);
        assert_relative_eq!(m.depth, 0.02, epsilon = 1e-9);
        assert_eq!(m.points.len(), 2);
    }

    #[test]
    fn test_broad_phase_skips_static_and_same_group() {
        let ground = Primitive::cuboid(Vec3::new(5.0, 0.5, 5.0), Material::fixed()).unwrap();
        let wall = Primitive::cuboid(Vec3::new(0.5, 5.0, 0.5), Material::fixed()).unwrap();
        let a = Primitive::sphere(0.5, Material::new(1.0)).unwrap();
        let b = Primitive::sphere(0.5, Material::new(1.0)).unwrap();
        let bodies = vec![&ground, &wall, &a, &b];

        let contacts = find_contacts(&bodies, &[None, None, Some(0), Some(0)]);
        // ground-wall is static/static and a-b share a composite.
        let pairs: Vec<(usize, usize)> = contacts.iter().map(|c| (c.a, c.b)).collect();
        assert_eq!(pairs, vec![(0, 2), (0, 3), (1, 2), (1, 3)]);

        let contacts = find_contacts(&bodies, &[None, None, None, Some(0)]);
        assert!(contacts.iter().any(|c| (c.a, c.b) == (2, 3)));
    }
}
