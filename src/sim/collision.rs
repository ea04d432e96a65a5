//! Narrow-phase collision tests and impulse response
//!
//! Shapes are spheres (ball) and oriented boxes (car hitboxes). Contacts are
//! resolved with a single sequential impulse: normal impulse with restitution,
//! Coulomb-clamped friction, then positional correction split by inverse mass.

use glam::{Mat3A, Vec3A};

use super::body::RigidBody;

/// Approach speeds below this never bounce, so resting contacts settle
const RESTITUTION_VEL_THRESHOLD: f32 = 20.0;

/// Result of a collision check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point midway between the two surfaces
    pub point: Vec3A,
    /// Unit normal pointing from the first shape toward the second (for
    /// static geometry: pointing out of the surface)
    pub normal: Vec3A,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec3A::ZERO,
            normal: Vec3A::ZERO,
            penetration: 0.0,
        }
    }
}

/// Oriented box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obb {
    pub center: Vec3A,
    pub rot: Mat3A,
    pub half: Vec3A,
}

impl Obb {
    pub fn axis(&self, i: usize) -> Vec3A {
        self.rot.col(i)
    }

    pub fn corners(&self) -> [Vec3A; 8] {
        let mut out = [Vec3A::ZERO; 8];
        for (i, corner) in out.iter_mut().enumerate() {
            let sx = if i & 1 == 0 { -1.0 } else { 1.0 };
            let sy = if i & 2 == 0 { -1.0 } else { 1.0 };
            let sz = if i & 4 == 0 { -1.0 } else { 1.0 };
            *corner = self.center + self.rot * (self.half * Vec3A::new(sx, sy, sz));
        }
        out
    }

    /// Half-length of the box projected onto a unit axis
    fn projected_radius(&self, axis: Vec3A) -> f32 {
        (0..3)
            .map(|i| self.half[i] * self.axis(i).dot(axis).abs())
            .sum()
    }

    fn contains(&self, p: Vec3A, slack: f32) -> bool {
        let local = self.rot.transpose() * (p - self.center);
        local.abs().cmple(self.half + Vec3A::splat(slack)).all()
    }

    /// Farthest corner along `dir`
    fn support(&self, dir: Vec3A) -> Vec3A {
        let local_dir = self.rot.transpose() * dir;
        let signs = Vec3A::new(
            if local_dir.x >= 0.0 { 1.0 } else { -1.0 },
            if local_dir.y >= 0.0 { 1.0 } else { -1.0 },
            if local_dir.z >= 0.0 { 1.0 } else { -1.0 },
        );
        self.center + self.rot * (self.half * signs)
    }
}

/// Sphere against oriented box; the normal points from the box to the sphere
pub fn sphere_obb_collision(center: Vec3A, radius: f32, obb: &Obb) -> CollisionResult {
    let local = obb.rot.transpose() * (center - obb.center);
    let clamped = local.clamp(-obb.half, obb.half);
    let delta = local - clamped;
    let dist_sq = delta.length_squared();

    if dist_sq > 0.0 {
        if dist_sq >= radius * radius {
            return CollisionResult::miss();
        }
        let dist = dist_sq.sqrt();
        let normal = obb.rot * (delta / dist);
        let surface = obb.center + obb.rot * clamped;
        let penetration = radius - dist;
        return CollisionResult {
            hit: true,
            point: surface - normal * (penetration * 0.5),
            normal,
            penetration,
        };
    }

    // Center inside the box: push out through the nearest face
    let gaps = obb.half - local.abs();
    let axis = if gaps.x <= gaps.y && gaps.x <= gaps.z {
        0
    } else if gaps.y <= gaps.z {
        1
    } else {
        2
    };
    let sign = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
    let normal = obb.axis(axis) * sign;
    let mut face_local = local;
    face_local[axis] = obb.half[axis] * sign;
    CollisionResult {
        hit: true,
        point: obb.center + obb.rot * face_local,
        normal,
        penetration: radius + gaps[axis],
    }
}

/// Box against box via the separating axis test; the normal points from `a`
/// to `b`
pub fn obb_obb_collision(a: &Obb, b: &Obb) -> CollisionResult {
    let offset = b.center - a.center;
    let mut best_overlap = f32::INFINITY;
    let mut best_axis = Vec3A::ZERO;

    let mut test_axis = |axis: Vec3A, bias: f32| -> bool {
        let len_sq = axis.length_squared();
        if len_sq < 1e-6 {
            return true;
        }
        let axis = axis / len_sq.sqrt();
        let dist = offset.dot(axis);
        let overlap = a.projected_radius(axis) + b.projected_radius(axis) - dist.abs();
        if overlap <= 0.0 {
            return false;
        }
        if overlap * bias < best_overlap {
            best_overlap = overlap;
            best_axis = if dist < 0.0 { -axis } else { axis };
        }
        true
    };

    for i in 0..3 {
        if !test_axis(a.axis(i), 1.0) || !test_axis(b.axis(i), 1.0) {
            return CollisionResult::miss();
        }
    }
    // Edge axes only win when clearly shallower than every face axis
    for i in 0..3 {
        for j in 0..3 {
            if !test_axis(a.axis(i).cross(b.axis(j)), 1.05) {
                return CollisionResult::miss();
            }
        }
    }

    let normal = best_axis;
    let half_pen = best_overlap * 0.5;
    let mut sum = Vec3A::ZERO;
    let mut count = 0u32;
    for corner in b.corners() {
        if a.contains(corner, 0.01) {
            sum += corner + normal * half_pen;
            count += 1;
        }
    }
    for corner in a.corners() {
        if b.contains(corner, 0.01) {
            sum += corner - normal * half_pen;
            count += 1;
        }
    }
    let point = if count > 0 {
        sum / count as f32
    } else {
        (a.support(normal) + b.support(-normal)) * 0.5
    };

    CollisionResult {
        hit: true,
        point,
        normal,
        penetration: best_overlap,
    }
}

/// Surface response parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactMaterial {
    pub restitution: f32,
    pub friction: f32,
}

/// Resolve a body against static geometry. The contact normal must point
/// out of the surface toward the body. Returns the normal impulse applied.
pub fn resolve_static_contact(
    body: &mut RigidBody,
    contact: &CollisionResult,
    material: ContactMaterial,
) -> f32 {
    let n = contact.normal;
    body.pos += n * contact.penetration;

    let vel = body.velocity_at(contact.point);
    let vn = vel.dot(n);
    if vn >= 0.0 {
        return 0.0;
    }

    let restitution = if -vn < RESTITUTION_VEL_THRESHOLD {
        0.0
    } else {
        material.restitution
    };
    let j = -(1.0 + restitution) * vn / body.inv_effective_mass(contact.point, n);
    body.apply_impulse_at(n * j, contact.point);

    let vel = body.velocity_at(contact.point);
    let tangent_vel = vel - n * vel.dot(n);
    let slip = tangent_vel.length();
    if slip > 1e-4 {
        let t = tangent_vel / slip;
        let jt = (slip / body.inv_effective_mass(contact.point, t)).min(material.friction * j);
        body.apply_impulse_at(-t * jt, contact.point);
    }

    j
}

/// Resolve two dynamic bodies; the normal points from `a` to `b`. Returns the
/// normal impulse applied to `b` (zero if they were already separating).
pub fn resolve_pair_contact(
    a: &mut RigidBody,
    b: &mut RigidBody,
    contact: &CollisionResult,
    material: ContactMaterial,
) -> f32 {
    let n = contact.normal;
    let inv_sum = a.inv_mass + b.inv_mass;
    if inv_sum > 0.0 {
        a.pos -= n * (contact.penetration * a.inv_mass / inv_sum);
        b.pos += n * (contact.penetration * b.inv_mass / inv_sum);
    }

    let p = contact.point;
    let rel = b.velocity_at(p) - a.velocity_at(p);
    let vn = rel.dot(n);
    if vn >= 0.0 {
        return 0.0;
    }

    let restitution = if -vn < RESTITUTION_VEL_THRESHOLD {
        0.0
    } else {
        material.restitution
    };
    let k = a.inv_effective_mass(p, n) + b.inv_effective_mass(p, n);
    let j = -(1.0 + restitution) * vn / k;
    a.apply_impulse_at(-n * j, p);
    b.apply_impulse_at(n * j, p);

    let rel = b.velocity_at(p) - a.velocity_at(p);
    let tangent_vel = rel - n * rel.dot(n);
    let slip = tangent_vel.length();
    if slip > 1e-4 {
        let t = tangent_vel / slip;
        let kt = a.inv_effective_mass(p, t) + b.inv_effective_mass(p, t);
        let jt = (slip / kt).min(material.friction * j);
        a.apply_impulse_at(t * jt, p);
        b.apply_impulse_at(-t * jt, p);
    }

    j
}
