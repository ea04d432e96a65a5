//! Car simulation
//!
//! A car is a box-shaped rigid body held up by four raycast wheels. Each tick
//! the car reads its latched controls and turns them into forces: suspension
//! and tire grip while grounded, air control and flips while airborne, boost
//! in both. The rigid body itself only exists for the duration of a tick; the
//! persistent data is `CarState`.

use std::f32::consts::PI;

use glam::{Mat3A, Vec3A};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::body::RigidBody;
use super::collision::Obb;
use super::geometry::RayHit;
use super::kickoff::respawn_locations;
use super::mutator::MutatorConfig;
use super::state::{CarControls, CarState, CarStats, GameMode, RngState, Team};
use super::tick::TickContext;
use crate::consts::*;
use crate::math::{Angle, RotMat, Vec3};
use crate::rate_scaled;

/// Geometry shared by the two wheels of an axle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WheelPairConfig {
    pub wheel_radius: f32,
    pub suspension_rest_length: f32,
    /// Right-side wheel hard point in the car frame; the left wheel mirrors y
    pub connection_point_offset: Vec3,
}

/// Hitbox and wheel layout of a car body
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CarConfig {
    /// Full extents of the hitbox
    pub hitbox_size: Vec3,
    /// Hitbox center relative to the car origin
    pub hitbox_pos_offset: Vec3,
    pub front_wheels: WheelPairConfig,
    pub back_wheels: WheelPairConfig,
    /// Combined |pitch| + |yaw| + |roll| at which a second jump becomes a flip
    pub dodge_deadzone: f32,
}

const fn wheels(radius: f32, rest: f32, x: f32, y: f32, z: f32) -> WheelPairConfig {
    WheelPairConfig {
        wheel_radius: radius,
        suspension_rest_length: rest,
        connection_point_offset: Vec3::new(x, y, z),
    }
}

impl CarConfig {
    pub const OCTANE: Self = Self {
        hitbox_size: Vec3::new(120.507, 86.6994, 38.6591),
        hitbox_pos_offset: Vec3::new(13.8757, 0.0, 20.755),
        front_wheels: wheels(12.5, 38.755, 51.25, 25.9, 20.755),
        back_wheels: wheels(15.0, 37.055, -33.75, 29.5, 20.755),
        dodge_deadzone: 0.5,
    };

    pub const DOMINUS: Self = Self {
        hitbox_size: Vec3::new(130.427, 85.7799, 33.8),
        hitbox_pos_offset: Vec3::new(9.0, 0.0, 15.75),
        front_wheels: wheels(12.0, 33.95, 50.3, 31.1, 15.75),
        back_wheels: wheels(13.5, 33.85, -34.75, 33.0, 15.75),
        dodge_deadzone: 0.5,
    };

    pub const PLANK: Self = Self {
        hitbox_size: Vec3::new(131.32, 87.1704, 31.8944),
        hitbox_pos_offset: Vec3::new(9.00857, 0.0, 12.0942),
        front_wheels: wheels(12.5, 31.9, 49.97, 27.8, 12.0942),
        back_wheels: wheels(17.0, 27.8, -35.43, 20.28, 12.0942),
        dodge_deadzone: 0.5,
    };

    pub const BREAKOUT: Self = Self {
        hitbox_size: Vec3::new(133.992, 83.021, 32.8),
        hitbox_pos_offset: Vec3::new(12.5, 0.0, 11.75),
        front_wheels: wheels(13.5, 29.7, 51.5, 26.67, 11.75),
        back_wheels: wheels(15.0, 29.666, -35.75, 35.0, 11.75),
        dodge_deadzone: 0.5,
    };

    pub const HYBRID: Self = Self {
        hitbox_size: Vec3::new(129.519, 84.6879, 36.6591),
        hitbox_pos_offset: Vec3::new(13.8757, 0.0, 20.755),
        front_wheels: wheels(12.5, 38.755, 51.25, 25.9, 20.755),
        back_wheels: wheels(15.0, 37.055, -34.75, 29.5, 20.755),
        dodge_deadzone: 0.5,
    };

    pub const MERC: Self = Self {
        hitbox_size: Vec3::new(123.22, 79.2103, 44.1591),
        hitbox_pos_offset: Vec3::new(11.3757, 0.0, 21.505),
        front_wheels: wheels(15.0, 39.5, 51.25, 25.9, 21.505),
        back_wheels: wheels(15.0, 39.105, -33.75, 29.5, 21.505),
        dodge_deadzone: 0.5,
    };

    /// Empty config with every dimension zero
    pub const DEFAULT: Self = Self {
        hitbox_size: Vec3::ZERO,
        hitbox_pos_offset: Vec3::ZERO,
        front_wheels: wheels(0.0, 0.0, 0.0, 0.0, 0.0),
        back_wheels: wheels(0.0, 0.0, 0.0, 0.0, 0.0),
        dodge_deadzone: 0.0,
    };

    pub const PRESETS: [(&'static str, CarConfig); 6] = [
        ("octane", Self::OCTANE),
        ("dominus", Self::DOMINUS),
        ("plank", Self::PLANK),
        ("breakout", Self::BREAKOUT),
        ("hybrid", Self::HYBRID),
        ("merc", Self::MERC),
    ];

    /// Look up a preset by name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        Self::PRESETS
            .iter()
            .find(|(preset, _)| *preset == name)
            .map(|(_, config)| *config)
    }

    fn wheel_base(&self) -> f32 {
        let base = self.front_wheels.connection_point_offset.x
            - self.back_wheels.connection_point_offset.x;
        base.max(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    id: u32,
    team: Team,
    config: CarConfig,
    pub(crate) state: CarState,
    pub(crate) controls: CarControls,
    pub(crate) stats: CarStats,
    /// Bump velocity added once contacts are resolved
    pub(crate) velocity_impulse_cache: Vec3,
}

impl Car {
    pub(crate) fn new(id: u32, team: Team, config: CarConfig, mutator: &MutatorConfig) -> Self {
        Self {
            id,
            team,
            config,
            state: CarState {
                boost: mutator.car_spawn_boost_amount,
                ..Default::default()
            },
            controls: CarControls::default(),
            stats: CarStats::default(),
            velocity_impulse_cache: Vec3::ZERO,
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn team(&self) -> Team {
        self.team
    }

    pub fn config(&self) -> &CarConfig {
        &self.config
    }

    pub fn state(&self) -> &CarState {
        &self.state
    }

    pub fn controls(&self) -> &CarControls {
        &self.controls
    }

    pub fn stats(&self) -> &CarStats {
        &self.stats
    }

    pub(crate) fn set_state(&mut self, state: CarState) {
        self.state = state;
        self.state.boost = self.state.boost.clamp(0.0, BOOST_MAX);
        self.velocity_impulse_cache = Vec3::ZERO;
    }

    /// Velocity along the car's nose
    pub fn forward_speed(&self) -> f32 {
        self.state.vel.dot(self.state.rot_mat.forward)
    }

    /// Hitbox at the current state
    pub fn hitbox(&self) -> Obb {
        let rot = Mat3A::from(self.state.rot_mat);
        self.hitbox_at(Vec3A::from(self.state.pos), rot)
    }

    pub(crate) fn hitbox_for(&self, body: &RigidBody) -> Obb {
        self.hitbox_at(body.pos, body.rot)
    }

    fn hitbox_at(&self, pos: Vec3A, rot: Mat3A) -> Obb {
        Obb {
            center: pos + rot * Vec3A::from(self.config.hitbox_pos_offset),
            rot,
            half: Vec3A::from(self.config.hitbox_size) * 0.5,
        }
    }

    /// Transient rigid body for this tick
    pub(crate) fn rigid_body(&self, mutator: &MutatorConfig) -> RigidBody {
        let mass = mutator.car_mass;
        RigidBody::new(
            self.state.pos.into(),
            self.state.vel.into(),
            self.state.ang_vel.into(),
            Mat3A::from(self.state.rot_mat),
            mass,
            RigidBody::box_inv_inertia(mass, self.config.hitbox_size.into()),
        )
    }

    pub(crate) fn demolish(&mut self, respawn_delay: f32) {
        self.state.is_demoed = true;
        self.state.demo_respawn_timer = respawn_delay;
        self.velocity_impulse_cache = Vec3::ZERO;
    }

    /// Place the car at a random respawn slot on its own half
    pub(crate) fn respawn<R: Rng>(&mut self, game_mode: GameMode, rng: &mut R, boost_amount: f32) {
        let locations = respawn_locations(game_mode);
        let spawn = locations[rng.random_range(0..locations.len())];
        let (y_scale, yaw_offset) = match self.team {
            Team::Blue => (1.0, 0.0),
            Team::Orange => (-1.0, PI),
        };

        self.set_state(CarState {
            pos: Vec3::new(spawn.x, spawn.y * y_scale, CAR_RESPAWN_Z),
            rot_mat: Angle::new(spawn.yaw + yaw_offset, 0.0, 0.0).to_rot_mat(),
            boost: boost_amount,
            ..Default::default()
        });
        log::debug!("Car {} respawned at ({}, {})", self.id, spawn.x, spawn.y * y_scale);
    }

    /// Count down a demolition; returns true while the car stays out of play
    pub(crate) fn update_demo(
        &mut self,
        ctx: &TickContext,
        rng_state: &mut RngState,
    ) -> bool {
        if !self.state.is_demoed {
            return false;
        }

        self.state.demo_respawn_timer = (self.state.demo_respawn_timer - ctx.tick_time).max(0.0);
        if self.state.demo_respawn_timer == 0.0 {
            let mut rng = rng_state.next_rng();
            self.respawn(ctx.game_mode, &mut rng, ctx.mutator.car_spawn_boost_amount);
            return false;
        }
        true
    }

    /// Turn controls into forces for the coming integration step
    pub(crate) fn pre_tick_update(&mut self, body: &mut RigidBody, ctx: &TickContext) {
        self.controls.clamp_fix();

        let dt = ctx.tick_time;
        let forward_speed = body.vel.dot(body.forward());
        let jump_pressed = self.controls.jump && !self.state.last_controls.jump;

        let hits = self.cast_wheels(body, ctx);
        let mut num_wheels_in_contact = 0u8;
        for (contact, hit) in self.state.wheels_with_contact.iter_mut().zip(&hits) {
            *contact = hit.is_some();
            num_wheels_in_contact += u8::from(hit.is_some());
        }
        self.state.is_on_ground = num_wheels_in_contact >= 3;

        self.apply_suspension(body, &hits);
        self.update_wheels(body, dt, &hits, forward_speed, ctx.mutator.car_mass);

        if self.state.is_on_ground {
            self.state.is_flipping = false;
        } else {
            self.update_air_torque(body, num_wheels_in_contact == 0, ctx.mutator.car_mass);
        }

        self.update_jump(body, dt, ctx.mutator, jump_pressed);
        self.update_auto_flip(body, dt, jump_pressed);
        self.update_double_jump_or_flip(body, dt, ctx.mutator, jump_pressed, forward_speed);

        if self.controls.throttle != 0.0
            && ((0 < num_wheels_in_contact && num_wheels_in_contact < 4)
                || self.state.world_contact.has_contact)
        {
            self.update_auto_roll(body, &hits, ctx.mutator.car_mass);
        }

        // Recomputed by this tick's car-world contacts
        self.state.world_contact.has_contact = false;

        self.update_boost(body, dt, ctx.mutator);
    }

    fn cast_wheels(&self, body: &RigidBody, ctx: &TickContext) -> [Option<RayHit>; 4] {
        let down = -body.up();
        std::array::from_fn(|i| {
            let pair = self.wheel_pair(i);
            let hard_point = body.world_point(self.wheel_offset(i));
            let ray_len = pair.suspension_rest_length - MAX_SUSPENSION_TRAVEL + pair.wheel_radius;
            ctx.geometry.raycast(hard_point, down, ray_len)
        })
    }

    /// Front-left, front-right, back-left, back-right
    fn wheel_pair(&self, i: usize) -> &WheelPairConfig {
        if i < 2 {
            &self.config.front_wheels
        } else {
            &self.config.back_wheels
        }
    }

    fn wheel_offset(&self, i: usize) -> Vec3A {
        let mut offset = Vec3A::from(self.wheel_pair(i).connection_point_offset);
        if i % 2 == 0 {
            offset.y = -offset.y;
        }
        offset
    }

    /// Spring and damper per wheel, applied at the contact point
    fn apply_suspension(&self, body: &mut RigidBody, hits: &[Option<RayHit>; 4]) {
        for (i, hit) in hits.iter().enumerate() {
            let Some(hit) = hit else { continue };
            let pair = self.wheel_pair(i);
            let rest = pair.suspension_rest_length - MAX_SUSPENSION_TRAVEL;
            let length = hit.dist - pair.wheel_radius;
            let compression = (rest - length).clamp(0.0, MAX_SUSPENSION_TRAVEL);
            let scale = if i < 2 {
                SUSPENSION_FORCE_SCALE_FRONT
            } else {
                SUSPENSION_FORCE_SCALE_BACK
            };

            let separating_vel = body.velocity_at(hit.point).dot(hit.normal);
            let force = SUSPENSION_STIFFNESS * compression * scale
                - SUSPENSION_DAMPING * separating_vel;
            if force > 0.0 {
                body.apply_force_at(hit.normal * force, hit.point);
            }
        }
    }

    fn update_wheels(
        &mut self,
        body: &mut RigidBody,
        dt: f32,
        hits: &[Option<RayHit>; 4],
        forward_speed: f32,
        mass: f32,
    ) {
        let handbrake_rate = if self.controls.handbrake {
            POWERSLIDE_RISE_RATE
        } else {
            -POWERSLIDE_FALL_RATE
        };
        self.state.handbrake_val = (self.state.handbrake_val + handbrake_rate * dt).clamp(0.0, 1.0);

        let num_contacts = hits.iter().flatten().count();
        if num_contacts == 0 {
            return;
        }
        let contact_share = num_contacts as f32 / 4.0;

        let mut real_brake = 0.0;
        let real_throttle = if self.controls.boost && self.state.boost > 0.0 {
            1.0
        } else {
            self.controls.throttle
        };

        let abs_forward_speed = forward_speed.abs();
        let mut engine_throttle = real_throttle;
        if !self.controls.handbrake {
            if real_throttle.abs() >= THROTTLE_DEADZONE {
                if abs_forward_speed > STOPPING_FORWARD_VEL
                    && real_throttle.signum() != forward_speed.signum()
                {
                    real_brake = 1.0;
                    if abs_forward_speed > BRAKING_NO_THROTTLE_SPEED_THRESH {
                        engine_throttle = 0.0;
                    }
                }
            } else {
                engine_throttle = 0.0;
                real_brake = if abs_forward_speed < STOPPING_FORWARD_VEL {
                    1.0
                } else {
                    COASTING_BRAKE_FACTOR
                };
            }
        }

        let mut drive_speed_scale = DRIVE_SPEED_FACTOR_CURVE.get_output(abs_forward_speed);
        if num_contacts < 3 {
            drive_speed_scale /= 4.0;
        }

        let up = hits
            .iter()
            .flatten()
            .map(|hit| hit.normal)
            .sum::<Vec3A>()
            .normalize_or_zero();
        let forward = body.forward().reject_from_normalized(up).normalize_or_zero();
        let lateral = body.right().reject_from_normalized(up).normalize_or_zero();

        body.apply_central_force(
            forward * (engine_throttle * THROTTLE_ACCEL * drive_speed_scale * contact_share * mass),
        );

        if real_brake > 0.0 && abs_forward_speed > 0.0 {
            let decel = (BRAKE_ACCEL * real_brake).min(abs_forward_speed / dt);
            body.apply_central_force(
                forward * (-forward_speed.signum() * decel * contact_share * mass),
            );
        }

        let mut steer_angle = STEER_ANGLE_FROM_SPEED_CURVE.get_output(abs_forward_speed);
        let handbrake = self.state.handbrake_val;
        if handbrake != 0.0 {
            steer_angle += (POWERSLIDE_STEER_ANGLE_FROM_SPEED_CURVE.get_output(abs_forward_speed)
                - steer_angle)
                * handbrake;
        }
        steer_angle *= self.controls.steer;

        let target_yaw_rate = forward_speed * steer_angle.tan() / self.config.wheel_base();
        let yaw_rate = body.ang_vel.dot(up);
        let grip = rate_scaled(LAT_GRIP, dt) * contact_share;
        body.apply_angular_accel(up * ((target_yaw_rate - yaw_rate) * grip / dt));

        let lat_grip = LAT_GRIP * (1.0 + (HANDBRAKE_LAT_FRICTION_FACTOR - 1.0) * handbrake);
        let lat_vel = body.vel.dot(lateral);
        let removed = rate_scaled(lat_grip, dt) * contact_share;
        body.apply_central_force(lateral * (-lat_vel * removed / dt * mass));

        let full_stick = real_throttle != 0.0 || abs_forward_speed > STOPPING_FORWARD_VEL;
        let mut sticky_force_scale = 0.5;
        if full_stick {
            sticky_force_scale += 1.0 - up.z.abs();
        }
        body.apply_central_force(up * (sticky_force_scale * GRAVITY_Z * mass));
    }

    fn update_air_torque(&mut self, body: &mut RigidBody, update_air_control: bool, mass: f32) {
        let dir_pitch = -body.right();
        let dir_yaw = body.up();
        let dir_roll = -body.forward();

        if self.state.is_flipping {
            self.state.is_flipping = self.state.has_flipped && self.state.flip_time < FLIP_TORQUE_TIME;
        }

        let mut do_air_control = false;
        if self.state.is_flipping {
            let mut rel_dodge_torque = Vec3A::from(self.state.flip_rel_torque);
            if rel_dodge_torque == Vec3A::ZERO {
                do_air_control = true;
            } else {
                let mut pitch_scale = 1.0;
                if rel_dodge_torque.y != 0.0
                    && self.controls.pitch != 0.0
                    && rel_dodge_torque.y.signum() == self.controls.pitch.signum()
                {
                    pitch_scale = 1.0 - self.controls.pitch.abs().min(1.0);
                    do_air_control = true;
                }

                rel_dodge_torque.y *= pitch_scale;
                let dodge_torque = rel_dodge_torque * Vec3A::new(FLIP_TORQUE_X, FLIP_TORQUE_Y, 0.0);
                body.apply_angular_accel(body.rot * dodge_torque);
            }
        } else {
            do_air_control = true;
        }

        do_air_control &= !self.state.is_auto_flipping;
        do_air_control &= update_air_control;
        if do_air_control {
            let [torque_pitch, torque_yaw, torque_roll] = CAR_AIR_CONTROL_TORQUE;
            let [damp_pitch_k, damp_yaw_k, damp_roll_k] = CAR_AIR_CONTROL_DAMPING;
            let controls = self.controls;

            let mut pitch_torque_scale = 1.0;
            let torque = if controls.pitch != 0.0 || controls.yaw != 0.0 || controls.roll != 0.0 {
                if self.state.is_flipping
                    || (self.state.has_flipped
                        && self.state.flip_time < FLIP_TORQUE_TIME + FLIP_PITCHLOCK_EXTRA_TIME)
                {
                    pitch_torque_scale = 0.0;
                }

                dir_pitch * (controls.pitch * pitch_torque_scale * torque_pitch)
                    + dir_yaw * (controls.yaw * torque_yaw)
                    + dir_roll * (controls.roll * torque_roll)
            } else {
                Vec3A::ZERO
            };

            let ang_vel = body.ang_vel;
            let damp_pitch = dir_pitch.dot(ang_vel)
                * damp_pitch_k
                * (1.0 - (controls.pitch * pitch_torque_scale).abs());
            let damp_yaw = dir_yaw.dot(ang_vel) * damp_yaw_k * (1.0 - controls.yaw.abs());
            let damp_roll = dir_roll.dot(ang_vel) * damp_roll_k;
            let damping = dir_yaw * damp_yaw + dir_pitch * damp_pitch + dir_roll * damp_roll;

            body.apply_angular_accel((torque - damping) * CAR_TORQUE_SCALE);
        }

        if self.controls.throttle != 0.0 {
            body.apply_central_force(
                body.forward() * (self.controls.throttle * THROTTLE_AIR_ACCEL * mass),
            );
        }
    }

    fn update_jump(
        &mut self,
        body: &mut RigidBody,
        dt: f32,
        mutator: &MutatorConfig,
        jump_pressed: bool,
    ) {
        let mass = mutator.car_mass;
        let state = &mut self.state;

        // A minimum-time jump may not have left the ground yet
        if state.is_on_ground
            && state.is_jumping
            && !(state.has_jumped && state.jump_time < JUMP_MIN_TIME + JUMP_RESET_TIME_PAD)
        {
            state.has_jumped = false;
            state.jump_time = 0.0;
        }

        if state.is_jumping {
            state.is_jumping = state.jump_time < JUMP_MIN_TIME
                || (self.controls.jump && state.jump_time < JUMP_MAX_TIME);
        } else if state.is_on_ground && jump_pressed {
            state.is_jumping = true;
            state.jump_time = 0.0;
            body.apply_central_impulse(body.up() * (mutator.jump_immediate_force * mass));
        }

        if state.is_jumping {
            state.has_jumped = true;

            let mut jump_accel = mutator.jump_accel;
            if state.jump_time < JUMP_MIN_TIME {
                jump_accel *= JUMP_PRE_MIN_ACCEL_SCALE;
            }
            body.apply_central_force(body.up() * (jump_accel * mass));
        }

        if state.is_jumping || state.has_jumped {
            state.jump_time += dt;
        }
    }

    /// Jumping while resting on the roof rolls the car back over
    fn update_auto_flip(&mut self, body: &mut RigidBody, dt: f32, jump_pressed: bool) {
        let contact = self.state.world_contact;
        if jump_pressed
            && contact.has_contact
            && contact.contact_normal.z > CAR_AUTOFLIP_NORMZ_THRESH
        {
            let roll = Angle::from_rot_mat(&RotMat::from(body.rot)).roll;
            let abs_roll = roll.abs();
            if abs_roll > CAR_AUTOFLIP_ROLL_THRESH {
                self.state.auto_flip_timer = CAR_AUTOFLIP_TIME * (abs_roll / PI);
                self.state.auto_flip_torque_scale = roll.signum();
                self.state.is_auto_flipping = true;
                body.apply_central_impulse(-body.up() * (CAR_AUTOFLIP_IMPULSE * body.mass()));
            }
        }

        if self.state.is_auto_flipping {
            if self.state.auto_flip_timer <= 0.0 {
                self.state.is_auto_flipping = false;
                self.state.auto_flip_timer = 0.0;
            } else {
                body.ang_vel += body.forward()
                    * (CAR_AUTOFLIP_TORQUE * self.state.auto_flip_torque_scale * dt);
                self.state.auto_flip_timer -= dt;
            }
        }
    }

    fn update_double_jump_or_flip(
        &mut self,
        body: &mut RigidBody,
        dt: f32,
        mutator: &MutatorConfig,
        jump_pressed: bool,
        forward_speed: f32,
    ) {
        let state = &mut self.state;
        if state.is_on_ground {
            state.has_double_jumped = false;
            state.has_flipped = false;
            state.air_time = 0.0;
            state.air_time_since_jump = 0.0;
            state.flip_time = 0.0;
            return;
        }

        let tick_time_scale = dt * 120.0;
        state.air_time += dt;

        if state.has_jumped && !state.is_jumping {
            state.air_time_since_jump += dt;
        } else {
            state.air_time_since_jump = 0.0;
        }

        if jump_pressed && state.air_time_since_jump < DOUBLEJUMP_MAX_DELAY {
            let controls = self.controls;
            let input_magnitude = controls.yaw.abs() + controls.pitch.abs() + controls.roll.abs();
            let is_flip_input = input_magnitude >= self.config.dodge_deadzone;

            let can_use = (!state.is_auto_flipping && !state.has_double_jumped && !state.has_flipped)
                || if is_flip_input {
                    mutator.unlimited_flips
                } else {
                    mutator.unlimited_double_jumps
                };

            if can_use && is_flip_input {
                state.flip_time = 0.0;
                state.has_flipped = true;
                state.is_flipping = true;

                let forward_speed_ratio = forward_speed.abs() / CAR_MAX_SPEED;
                let mut dodge_dir = Vec3A::new(-controls.pitch, controls.yaw + controls.roll, 0.0);
                state.flip_rel_torque =
                    (Vec3A::new(-dodge_dir.y, dodge_dir.x, 0.0) / tick_time_scale).into();

                if dodge_dir.x.abs() < 0.1 {
                    dodge_dir.x = 0.0;
                }
                if dodge_dir.y.abs() < 0.1 {
                    dodge_dir.y = 0.0;
                }

                if dodge_dir.length_squared() > f32::EPSILON * f32::EPSILON {
                    let should_dodge_backwards = if forward_speed.abs() < 100.0 {
                        dodge_dir.x < 0.0
                    } else {
                        dodge_dir.x.signum() != forward_speed.signum()
                    };

                    let max_speed_scale_x = if should_dodge_backwards {
                        FLIP_BACKWARD_IMPULSE_MAX_SPEED_SCALE
                    } else {
                        FLIP_FORWARD_IMPULSE_MAX_SPEED_SCALE
                    };

                    let mut initial_dodge_vel = dodge_dir * FLIP_INITIAL_VEL_SCALE;
                    initial_dodge_vel.x *= (max_speed_scale_x - 1.0) * forward_speed_ratio + 1.0;
                    initial_dodge_vel.y *=
                        (FLIP_SIDE_IMPULSE_MAX_SPEED_SCALE - 1.0) * forward_speed_ratio + 1.0;
                    if should_dodge_backwards {
                        initial_dodge_vel.x *= FLIP_BACKWARD_IMPULSE_SCALE_X;
                    }

                    let forward_2d = body.forward().with_z(0.0).normalize_or_zero();
                    let right_2d = Vec3A::new(-forward_2d.y, forward_2d.x, 0.0);
                    let delta_vel = forward_2d * initial_dodge_vel.x + right_2d * initial_dodge_vel.y;
                    body.apply_central_impulse(delta_vel * body.mass());
                }
            } else if can_use {
                body.apply_central_impulse(body.up() * (mutator.jump_immediate_force * body.mass()));
                state.has_double_jumped = true;
            }
        }

        if state.is_flipping {
            state.flip_time += dt;
            if state.flip_time <= FLIP_TORQUE_TIME
                && state.flip_time >= FLIP_Z_DAMP_START
                && (body.vel.z < 0.0 || state.flip_time < FLIP_Z_DAMP_END)
            {
                body.vel.z *= (1.0 - FLIP_Z_DAMP_120).powf(tick_time_scale);
            }
        } else if state.has_flipped {
            state.flip_time += dt;
        }
    }

    /// Pull a partially grounded car flat against the surface
    fn update_auto_roll(&self, body: &mut RigidBody, hits: &[Option<RayHit>; 4], mass: f32) {
        let wheel_up = hits
            .iter()
            .flatten()
            .map(|hit| hit.normal)
            .sum::<Vec3A>()
            .normalize_or_zero();
        let ground_up_dir = if wheel_up != Vec3A::ZERO {
            wheel_up
        } else {
            Vec3A::from(self.state.world_contact.contact_normal)
        };
        let ground_down_dir = -ground_up_dir;

        let forward_dir = body.forward();
        let right_dir = body.right();

        let cross_right_dir = ground_up_dir.cross(forward_dir);
        let cross_forward_dir = ground_down_dir.cross(cross_right_dir);

        let right_torque_factor = 1.0 - right_dir.dot(cross_right_dir).clamp(0.0, 1.0);
        let forward_torque_factor = 1.0 - forward_dir.dot(cross_forward_dir).clamp(0.0, 1.0);

        let torque_dir_right = forward_dir * -right_dir.dot(ground_up_dir).signum();
        let torque_dir_forward = right_dir * forward_dir.dot(ground_up_dir).signum();

        body.apply_central_force(ground_down_dir * (CAR_AUTOROLL_FORCE * mass));
        body.apply_angular_accel(
            (torque_dir_forward * forward_torque_factor + torque_dir_right * right_torque_factor)
                * CAR_AUTOROLL_TORQUE,
        );
    }

    fn update_boost(&mut self, body: &mut RigidBody, dt: f32, mutator: &MutatorConfig) {
        let state = &mut self.state;
        state.is_boosting = state.boost > 0.0
            && (self.controls.boost
                || (state.is_boosting && state.boosting_time < BOOST_MIN_TIME));

        if state.is_boosting {
            state.boosting_time += dt;
            state.time_since_boosted = 0.0;
            state.boost -= mutator.boost_used_per_second * dt;

            let accel = if state.is_on_ground {
                mutator.boost_accel_ground
            } else {
                mutator.boost_accel_air
            };
            body.apply_central_force(body.forward() * (accel * mutator.car_mass));
        } else {
            state.boosting_time = 0.0;
            state.time_since_boosted += dt;

            if mutator.recharge_boost_enabled
                && state.time_since_boosted >= mutator.recharge_boost_delay
            {
                state.boost += mutator.recharge_boost_per_second * dt;
            }
        }

        state.boost = state.boost.clamp(0.0, BOOST_MAX);
    }

    /// Apply cached bump velocity, clamp speeds and copy the body back
    pub(crate) fn finish_physics_tick(&mut self, body: &mut RigidBody, dt: f32) {
        if self.state.is_demoed {
            return;
        }

        body.vel += Vec3A::from(self.velocity_impulse_cache);
        self.velocity_impulse_cache = Vec3::ZERO;
        body.clamp_speeds(CAR_MAX_SPEED, CAR_MAX_ANG_SPEED);

        self.state.pos = body.pos.into();
        self.state.vel = body.vel.into();
        self.state.ang_vel = body.ang_vel.into();
        self.state.rot_mat = body.rot.into();

        let speed_squared = body.vel.length_squared();
        let threshold = if self.state.is_supersonic
            && self.state.supersonic_time < SUPERSONIC_MAINTAIN_MAX_TIME
        {
            SUPERSONIC_MAINTAIN_MIN_SPEED
        } else {
            SUPERSONIC_START_SPEED
        };
        self.state.is_supersonic = speed_squared >= threshold * threshold;

        if self.state.is_supersonic {
            self.state.supersonic_time += dt;
        } else {
            self.state.supersonic_time = 0.0;
        }

        let contact = &mut self.state.car_contact;
        if contact.other_car_id != 0 {
            contact.cooldown_timer -= dt;
            if contact.cooldown_timer <= 0.0 {
                *contact = Default::default();
            }
        }

        self.state.last_controls = self.controls;
    }
}
