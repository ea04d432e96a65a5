//! Value types shared by every part of the simulation
//!
//! The public state structs use these plain types so they can be compared,
//! hashed and serialized. Internally the simulation converts to glam's SIMD
//! types for the actual arithmetic.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use glam::{Mat3A, Quat, Vec3A};
use serde::{Deserialize, Serialize};

/// Three-component vector in unreal units
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn cross(self, other: Self) -> Self {
        Vec3A::from(self).cross(other.into()).into()
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    #[inline]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Distance between two points
    #[inline]
    pub fn dist(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Unit vector, or zero when the length is zero
    pub fn normalized(self) -> Self {
        Vec3A::from(self).normalize_or_zero().into()
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    fn bits(self) -> [u32; 3] {
        [self.x.to_bits(), self.y.to_bits(), self.z.to_bits()]
    }
}

// Equality is bitwise so it agrees with `Hash` and `Ord`; identical
// simulation runs produce identical bits.
impl PartialEq for Vec3 {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for Vec3 {}

impl Hash for Vec3 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

impl PartialOrd for Vec3 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lexicographic on (x, y, z) using IEEE total ordering
impl Ord for Vec3 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.x
            .total_cmp(&other.x)
            .then_with(|| self.y.total_cmp(&other.y))
            .then_with(|| self.z.total_cmp(&other.z))
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl From<Vec3> for Vec3A {
    #[inline]
    fn from(v: Vec3) -> Self {
        Vec3A::new(v.x, v.y, v.z)
    }
}

impl From<Vec3A> for Vec3 {
    #[inline]
    fn from(v: Vec3A) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

/// Orientation as three orthonormal axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RotMat {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl Default for RotMat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RotMat {
    pub const IDENTITY: Self = Self {
        forward: Vec3::new(1.0, 0.0, 0.0),
        right: Vec3::new(0.0, 1.0, 0.0),
        up: Vec3::new(0.0, 0.0, 1.0),
    };

    pub const fn new(forward: Vec3, right: Vec3, up: Vec3) -> Self {
        Self { forward, right, up }
    }

    /// Normalized quaternion as `[w, x, y, z]`
    pub fn to_quat(&self) -> [f32; 4] {
        let q = Quat::from_mat3a(&Mat3A::from(*self)).normalize();
        [q.w, q.x, q.y, q.z]
    }

    /// Build from a `[w, x, y, z]` quaternion; the input is normalized first
    pub fn from_quat(wxyz: [f32; 4]) -> Self {
        let [w, x, y, z] = wxyz;
        let q = Quat::from_xyzw(x, y, z, w).normalize();
        Mat3A::from_quat(q).into()
    }

    /// Vector expressed in this basis, rotated into world space
    pub fn dot_local(&self, local: Vec3) -> Vec3 {
        (Mat3A::from(*self) * Vec3A::from(local)).into()
    }
}

impl From<RotMat> for Mat3A {
    #[inline]
    fn from(m: RotMat) -> Self {
        Mat3A::from_cols(m.forward.into(), m.right.into(), m.up.into())
    }
}

impl From<Mat3A> for RotMat {
    #[inline]
    fn from(m: Mat3A) -> Self {
        RotMat::new(m.x_axis.into(), m.y_axis.into(), m.z_axis.into())
    }
}

/// Yaw/pitch/roll in radians
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Angle {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Angle {
    pub const fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Direction angles of a vector (roll is always zero)
    pub fn from_vec(v: Vec3A) -> Self {
        let yaw = v.y.atan2(v.x);
        let pitch = v.z.atan2((v.x * v.x + v.y * v.y).sqrt());
        Self::new(yaw, pitch, 0.0)
    }

    pub fn from_rot_mat(m: &RotMat) -> Self {
        let pitch = m.forward.z.clamp(-1.0, 1.0).asin();
        let yaw = m.forward.y.atan2(m.forward.x);
        let roll = (-m.right.z).atan2(m.up.z);
        Self::new(yaw, pitch, roll)
    }

    pub fn to_rot_mat(&self) -> RotMat {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        let (sr, cr) = self.roll.sin_cos();

        RotMat::new(
            Vec3::new(cp * cy, cp * sy, sp),
            Vec3::new(cy * sp * sr - cr * sy, sy * sp * sr + cr * cy, -cp * sr),
            Vec3::new(-cr * cy * sp - sr * sy, -cr * sy * sp + sr * cy, cp * cr),
        )
    }

    pub fn forward_vec(&self) -> Vec3A {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3A::new(cp * cy, cp * sy, sp)
    }

    /// Component-wise difference with each term wrapped to [-π, π)
    pub fn delta_to(&self, target: &Angle) -> Angle {
        Angle::new(
            crate::normalize_angle(target.yaw - self.yaw),
            crate::normalize_angle(target.pitch - self.pitch),
            crate::normalize_angle(target.roll - self.roll),
        )
    }
}

/// Piecewise-linear lookup table, clamped at both ends
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearPieceCurve<const N: usize> {
    points: [(f32, f32); N],
}

impl<const N: usize> LinearPieceCurve<N> {
    /// Points must be sorted by input
    pub const fn new(points: [(f32, f32); N]) -> Self {
        Self { points }
    }

    pub fn get_output(&self, input: f32) -> f32 {
        let Some(&(first_in, first_out)) = self.points.first() else {
            return 0.0;
        };
        if input <= first_in {
            return first_out;
        }

        for pair in self.points.windows(2) {
            let (in_a, out_a) = pair[0];
            let (in_b, out_b) = pair[1];
            if input < in_b {
                let t = (input - in_a) / (in_b - in_a);
                return out_a + (out_b - out_a) * t;
            }
        }

        self.points[N - 1].1
    }
}
