//! Contact response: sequential impulses and penetration correction.

use tracing::warn;
use volley_math::{orthonormal_basis, Vec3};

use crate::body::Primitive;
use crate::collision::PairContact;
use crate::config::SolverConfig;
use crate::material::{combine_friction, combine_restitution};

/// Effective masses below this mean neither body can respond.
const MIN_EFFECTIVE_MASS: f64 = 1e-12;

/// Per-point solver state.
#[derive(Debug, Clone)]
struct PointConstraint {
    ra: Vec3,
    rb: Vec3,
    normal_mass: f64,
    tangent_mass: [f64; 2],
    /// Separating velocity targeted by the normal row.
    bias: f64,
    normal_impulse: f64,
    tangent_impulse: [f64; 2],
}

/// Solver state of one contacting pair.
#[derive(Debug, Clone)]
struct PairConstraint {
    a: usize,
    b: usize,
    normal: Vec3,
    tangents: [Vec3; 2],
    friction: f64,
    depth: f64,
    points: Vec<PointConstraint>,
}

/// Sequential-impulse contact solver for one step.
#[derive(Debug, Default)]
pub(crate) struct ContactSolver {
    pairs: Vec<PairConstraint>,
}

impl ContactSolver {
    /// Build constraints from the pairs found by collision detection.
    ///
    /// Restitution targets use the approach velocity measured here, before
    /// any impulse is applied.
    pub(crate) fn prepare(
        contacts: &[PairContact],
        bodies: &[&mut Primitive],
        config: &SolverConfig,
    ) -> Self {
        let mut pairs = Vec::with_capacity(contacts.len());
        for contact in contacts {
            let a = &*bodies[contact.a];
            let b = &*bodies[contact.b];
            let normal = contact.manifold.normal;
            let (t1, t2) = orthonormal_basis(&normal);
            let restitution = combine_restitution(a.material(), b.material());

            let points = contact
                .manifold
                .points
                .iter()
                .map(|p| {
                    let ra = p.position - a.position();
                    let rb = p.position - b.position();
                    let relative =
                        b.velocity_at_point(&p.position) - a.velocity_at_point(&p.position);
                    let approach = relative.dot(&normal);
                    let bias = if -approach > config.restitution_threshold {
                        -restitution * approach
                    } else {
                        0.0
                    };
                    PointConstraint {
                        ra,
                        rb,
                        normal_mass: effective_mass(a, b, &ra, &rb, &normal),
                        tangent_mass: [
                            effective_mass(a, b, &ra, &rb, &t1),
                            effective_mass(a, b, &ra, &rb, &t2),
                        ],
                        bias,
                        normal_impulse: 0.0,
                        tangent_impulse: [0.0; 2],
                    }
                })
                .collect();

            pairs.push(PairConstraint {
                a: contact.a,
                b: contact.b,
                normal,
                tangents: [t1, t2],
                friction: combine_friction(a.material(), b.material()),
                depth: contact.manifold.depth,
                points,
            });
        }
        Self { pairs }
    }

    /// Number of contacting pairs.
    pub(crate) fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Run `iterations` sweeps over every contact point.
    pub(crate) fn solve_velocity(&mut self, bodies: &mut [&mut Primitive], iterations: usize) {
        for _ in 0..iterations {
            for pair in &mut self.pairs {
                let (a, b) = pair_mut(bodies, pair.a, pair.b);
                for point in &mut pair.points {
                    solve_point(a, b, pair.normal, &pair.tangents, pair.friction, point);
                }
            }
        }
    }

    /// Push overlapping pairs apart by a fraction of their depth beyond the
    /// slop, split by inverse mass.
    pub(crate) fn correct_positions(&self, bodies: &mut [&mut Primitive], config: &SolverConfig) {
        for pair in &self.pairs {
            let (a, b) = pair_mut(bodies, pair.a, pair.b);
            let inv_sum = a.inverse_mass() + b.inverse_mass();
            if inv_sum <= 0.0 {
                continue;
            }
            let excess = (pair.depth - config.penetration_slop).max(0.0);
            if excess == 0.0 {
                continue;
            }
            let correction = pair.normal * (excess * config.penetration_correction / inv_sum);
            a.shift(-correction * a.inverse_mass(), Vec3::zeros());
            b.shift(correction * b.inverse_mass(), Vec3::zeros());
        }
    }
}

fn solve_point(
    a: &mut Primitive,
    b: &mut Primitive,
    normal: Vec3,
    tangents: &[Vec3; 2],
    friction: f64,
    point: &mut PointConstraint,
) {
    if point.normal_mass <= MIN_EFFECTIVE_MASS {
        return;
    }
    let pa = a.position() + point.ra;
    let pb = b.position() + point.rb;

    let vn = (b.velocity_at_point(&pb) - a.velocity_at_point(&pa)).dot(&normal);
    let total = (point.normal_impulse + (point.bias - vn) / point.normal_mass).max(0.0);
    let lambda = total - point.normal_impulse;
    point.normal_impulse = total;
    apply_pair_impulse(a, b, normal * lambda, &pa, &pb);

    // Both tangent rows are solved together and the accumulated impulse is
    // projected onto the friction cone of radius mu * normal impulse.
    let dv = b.velocity_at_point(&pb) - a.velocity_at_point(&pa);
    let mut candidate = point.tangent_impulse;
    for (k, tangent) in tangents.iter().enumerate() {
        if point.tangent_mass[k] > MIN_EFFECTIVE_MASS {
            candidate[k] -= dv.dot(tangent) / point.tangent_mass[k];
        }
    }
    let limit = friction * point.normal_impulse;
    let magnitude = candidate[0].hypot(candidate[1]);
    if magnitude > limit {
        let scale = if magnitude > 0.0 { limit / magnitude } else { 0.0 };
        candidate = [candidate[0] * scale, candidate[1] * scale];
    }
    let delta = tangents[0] * (candidate[0] - point.tangent_impulse[0])
        + tangents[1] * (candidate[1] - point.tangent_impulse[1]);
    point.tangent_impulse = candidate;
    apply_pair_impulse(a, b, delta, &pa, &pb);
}

/// `+impulse` on B and `-impulse` on A.
fn apply_pair_impulse(a: &mut Primitive, b: &mut Primitive, impulse: Vec3, pa: &Vec3, pb: &Vec3) {
    b.apply_impulse(impulse, *pb);
    a.apply_impulse(-impulse, *pa);
}

/// Inverse of the velocity response of the pair along `dir`.
fn effective_mass(a: &Primitive, b: &Primitive, ra: &Vec3, rb: &Vec3, dir: &Vec3) -> f64 {
    let ang_a = (a.inverse_inertia_world() * ra.cross(dir)).cross(ra);
    let ang_b = (b.inverse_inertia_world() * rb.cross(dir)).cross(rb);
    let k = a.inverse_mass() + b.inverse_mass() + dir.dot(&(ang_a + ang_b));
    if !k.is_finite() {
        warn!(k, "non-finite contact effective mass");
        return 0.0;
    }
    k
}

/// Two distinct bodies borrowed mutably at once.
fn pair_mut<'a>(
    bodies: &'a mut [&mut Primitive],
    a: usize,
    b: usize,
) -> (&'a mut Primitive, &'a mut Primitive) {
    debug_assert!(a < b);
    let (lo, hi) = bodies.split_at_mut(b);
    (&mut *lo[a], &mut *hi[0])
}
