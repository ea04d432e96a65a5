//! Rigid body integration
//!
//! Semi-implicit Euler: velocities are updated from the accumulated forces
//! first, then positions and orientation advance with the new velocities.
//! All arithmetic is plain f32 in a fixed order so identical inputs give
//! identical bits.

use glam::{Mat3A, Quat, Vec3A};

/// A free body with accumulated forces for the current tick
#[derive(Debug, Clone, Copy)]
pub struct RigidBody {
    pub pos: Vec3A,
    pub vel: Vec3A,
    pub ang_vel: Vec3A,
    /// Columns are forward, right, up
    pub rot: Mat3A,
    pub inv_mass: f32,
    /// Inverse principal moments in the body frame
    pub inv_inertia_local: Vec3A,
    force: Vec3A,
    torque: Vec3A,
    ang_accel: Vec3A,
}

impl RigidBody {
    pub fn new(
        pos: Vec3A,
        vel: Vec3A,
        ang_vel: Vec3A,
        rot: Mat3A,
        mass: f32,
        inv_inertia_local: Vec3A,
    ) -> Self {
        Self {
            pos,
            vel,
            ang_vel,
            rot,
            inv_mass: if mass > 0.0 { 1.0 / mass } else { 0.0 },
            inv_inertia_local,
            force: Vec3A::ZERO,
            torque: Vec3A::ZERO,
            ang_accel: Vec3A::ZERO,
        }
    }

    /// Inverse inertia of a solid box with full extents `size`
    pub fn box_inv_inertia(mass: f32, size: Vec3A) -> Vec3A {
        let sq = size * size;
        let k = mass / 12.0;
        // Degenerate boxes do not respond to torque
        let inv = |moment: f32| if moment > 0.0 { 1.0 / moment } else { 0.0 };
        Vec3A::new(
            inv(k * (sq.y + sq.z)),
            inv(k * (sq.x + sq.z)),
            inv(k * (sq.x + sq.y)),
        )
    }

    pub fn sphere_inv_inertia(mass: f32, radius: f32) -> Vec3A {
        Vec3A::splat(1.0 / (0.4 * mass * radius * radius))
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        if self.inv_mass > 0.0 { 1.0 / self.inv_mass } else { 0.0 }
    }

    #[inline]
    pub fn forward(&self) -> Vec3A {
        self.rot.x_axis
    }

    #[inline]
    pub fn right(&self) -> Vec3A {
        self.rot.y_axis
    }

    #[inline]
    pub fn up(&self) -> Vec3A {
        self.rot.z_axis
    }

    /// World-space point from a body-frame offset
    #[inline]
    pub fn world_point(&self, local: Vec3A) -> Vec3A {
        self.pos + self.rot * local
    }

    /// Body-frame offset of a world-space point
    #[inline]
    pub fn local_point(&self, world: Vec3A) -> Vec3A {
        self.rot.transpose() * (world - self.pos)
    }

    /// Apply the world-space inverse inertia tensor to `v`
    pub fn inv_inertia_mul(&self, v: Vec3A) -> Vec3A {
        self.rot * (self.inv_inertia_local * (self.rot.transpose() * v))
    }

    #[inline]
    pub fn velocity_at(&self, point: Vec3A) -> Vec3A {
        self.vel + self.ang_vel.cross(point - self.pos)
    }

    #[inline]
    pub fn apply_central_force(&mut self, force: Vec3A) {
        self.force += force;
    }

    pub fn apply_force_at(&mut self, force: Vec3A, point: Vec3A) {
        self.force += force;
        self.torque += (point - self.pos).cross(force);
    }

    #[inline]
    pub fn apply_torque(&mut self, torque: Vec3A) {
        self.torque += torque;
    }

    /// Angular acceleration that bypasses the inertia tensor
    #[inline]
    pub fn apply_angular_accel(&mut self, accel: Vec3A) {
        self.ang_accel += accel;
    }

    #[inline]
    pub fn apply_central_impulse(&mut self, impulse: Vec3A) {
        self.vel += impulse * self.inv_mass;
    }

    pub fn apply_impulse_at(&mut self, impulse: Vec3A, point: Vec3A) {
        self.vel += impulse * self.inv_mass;
        self.ang_vel += self.inv_inertia_mul((point - self.pos).cross(impulse));
    }

    /// Resistance to an impulse along `dir` at `point` (inverse effective mass)
    pub fn inv_effective_mass(&self, point: Vec3A, dir: Vec3A) -> f32 {
        let r = point - self.pos;
        self.inv_mass + dir.dot(self.inv_inertia_mul(r.cross(dir)).cross(r))
    }

    /// Advance one step and clear the force accumulators
    pub fn integrate(&mut self, dt: f32, gravity: Vec3A) {
        if self.inv_mass > 0.0 {
            self.vel += (self.force * self.inv_mass + gravity) * dt;
            self.ang_vel += (self.inv_inertia_mul(self.torque) + self.ang_accel) * dt;
        }

        self.pos += self.vel * dt;

        let spin = self.ang_vel * dt;
        if spin.length_squared() > 0.0 {
            let q = Quat::from_scaled_axis(glam::Vec3::from(spin)) * Quat::from_mat3a(&self.rot);
            self.rot = Mat3A::from_quat(q.normalize());
        }

        self.clear_forces();
    }

    pub fn clear_forces(&mut self) {
        self.force = Vec3A::ZERO;
        self.torque = Vec3A::ZERO;
        self.ang_accel = Vec3A::ZERO;
    }

    pub fn clamp_speeds(&mut self, max_speed: f32, max_ang_speed: f32) {
        self.vel = self.vel.clamp_length_max(max_speed);
        self.ang_vel = self.ang_vel.clamp_length_max(max_ang_speed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball_body() -> RigidBody {
        RigidBody::new(
            Vec3A::new(0.0, 0.0, 500.0),
            Vec3A::ZERO,
            Vec3A::ZERO,
            Mat3A::IDENTITY,
            30.0,
            RigidBody::sphere_inv_inertia(30.0, 91.25),
        )
    }

    #[test]
    fn test_semi_implicit_order() {
        let mut body = ball_body();
        let dt = 0.5;
        body.integrate(dt, Vec3A::new(0.0, 0.0, -10.0));
        // Velocity first, then position from the new velocity
        assert_eq!(body.vel.z, -5.0);
        assert_eq!(body.pos.z, 500.0 - 2.5);
    }

    #[test]
    fn test_forces_cleared_after_step() {
        let mut body = ball_body();
        body.apply_central_force(Vec3A::new(300.0, 0.0, 0.0));
        body.integrate(0.1, Vec3A::ZERO);
        assert!((body.vel.x - 1.0).abs() < 1e-6);
        body.integrate(0.1, Vec3A::ZERO);
        assert!((body.vel.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_stays_orthonormal() {
        let mut body = ball_body();
        body.ang_vel = Vec3A::new(1.0, 2.0, 3.0);
        for _ in 0..500 {
            body.integrate(1.0 / 120.0, Vec3A::ZERO);
        }
        let r = body.rot;
        assert!((r.x_axis.length() - 1.0).abs() < 1e-4);
        assert!(r.x_axis.dot(r.y_axis).abs() < 1e-4);
        assert!((r.x_axis.cross(r.y_axis) - r.z_axis).length() < 1e-4);
    }

    #[test]
    fn test_off_center_impulse_spins() {
        let mut body = ball_body();
        body.pos = Vec3A::ZERO;
        body.apply_impulse_at(Vec3A::new(0.0, 30.0, 0.0), Vec3A::new(91.25, 0.0, 0.0));
        assert!((body.vel.y - 1.0).abs() < 1e-6);
        assert!(body.ang_vel.z > 0.0);
    }

    #[test]
    fn test_box_inertia_ordering() {
        let inv = RigidBody::box_inv_inertia(180.0, Vec3A::new(120.0, 86.0, 38.0));
        // Yaw is the hardest axis to spin for a flat long box
        assert!(inv.z < inv.y && inv.y < inv.x);
    }
}
