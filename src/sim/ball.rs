//! Ball physics, touches and goal detection

use glam::{Mat3A, Vec3A};

use super::body::RigidBody;
use super::car::Car;
use super::collision::{ContactMaterial, resolve_static_contact};
use super::dropshot::{self, TileState};
use super::geometry::ArenaGeometry;
use super::mutator::MutatorConfig;
use super::state::{BallHitInfo, BallState, GameMode, Team};
use crate::consts::*;
use crate::math::{Angle, Vec3};

/// Transient rigid body for this tick
pub(crate) fn rigid_body(ball: &BallState, mutator: &MutatorConfig) -> RigidBody {
    RigidBody::new(
        ball.pos.into(),
        ball.vel.into(),
        ball.ang_vel.into(),
        Mat3A::from(ball.rot_mat),
        mutator.ball_mass,
        RigidBody::sphere_inv_inertia(mutator.ball_mass, mutator.ball_radius),
    )
}

pub(crate) fn write_back(ball: &mut BallState, body: &RigidBody) {
    ball.pos = body.pos.into();
    ball.vel = body.vel.into();
    ball.ang_vel = body.ang_vel.into();
    ball.rot_mat = body.rot.into();
}

/// Heatseeker homing, applied before integration
pub(crate) fn pre_tick_update(
    ball: &mut BallState,
    body: &mut RigidBody,
    game_mode: GameMode,
    tick_time: f32,
) {
    if game_mode != GameMode::Heatseeker {
        return;
    }

    let hs = &mut ball.hs_info;
    if hs.y_target_dir == 0.0 {
        return;
    }

    let speed = body.vel.length();
    if speed > 0.0 {
        let target = Vec3A::new(0.0, HEATSEEKER_TARGET_Y * hs.y_target_dir, HEATSEEKER_TARGET_Z);
        let angles = Angle::from_vec(body.vel);
        let delta = angles.delta_to(&Angle::from_vec(target - body.pos));

        let interp = (speed / hs.cur_target_speed) * tick_time;
        let yaw = angles.yaw + delta.yaw * interp * HEATSEEKER_HORIZONTAL_BLEND;
        let pitch = (angles.pitch + delta.pitch * interp * HEATSEEKER_VERTICAL_BLEND)
            .clamp(-HEATSEEKER_MAX_TURN_PITCH, HEATSEEKER_MAX_TURN_PITCH);

        let blend = (HEATSEEKER_SPEED_BLEND * tick_time * 120.0).min(1.0);
        let new_speed = speed + (hs.cur_target_speed - speed) * blend;
        body.vel = Angle::new(yaw, pitch, 0.0).forward_vec() * new_speed;
    }

    hs.time_since_hit += tick_time;
}

/// Integrate, bounce off the arena and apply drag and speed limits
///
/// `tiles` are the Dropshot floor tiles (empty elsewhere); the floor is
/// skipped over broken ones. Returns whether the ball touched the floor.
pub(crate) fn step_body(
    body: &mut RigidBody,
    geometry: &ArenaGeometry,
    mutator: &MutatorConfig,
    tiles: &[TileState],
    tick_time: f32,
) -> bool {
    body.vel *= (1.0 - mutator.ball_drag).powf(tick_time);
    body.integrate(tick_time, mutator.gravity.into());

    let material = ContactMaterial {
        restitution: mutator.ball_world_restitution,
        friction: mutator.ball_world_friction,
    };
    // Contacts keep the same small gap the ball rests at
    let contact_radius = mutator.ball_rest_z();
    let contacts: Vec<_> = geometry.sphere_contacts(body.pos, contact_radius).collect();
    let mut touched_floor = false;
    for contact in &contacts {
        let is_floor = contact.normal.z > 0.99;
        if is_floor && dropshot::floor_is_open(tiles, body.pos) {
            continue;
        }
        resolve_static_contact(body, contact, material);
        touched_floor |= is_floor;
    }

    body.clamp_speeds(mutator.ball_max_speed, BALL_MAX_ANG_SPEED);
    touched_floor
}

/// Record a car touch and compute the extra hit velocity
///
/// `rel_pos` is the contact point relative to the ball center. Returns the
/// velocity to add to the ball, if any. The extra impulse is skipped when the
/// same car already received it on the previous tick.
pub(crate) fn on_hit(
    ball: &mut BallState,
    ball_body: &RigidBody,
    car: &mut Car,
    car_body: &RigidBody,
    rel_pos: Vec3A,
    game_mode: GameMode,
    mutator: &MutatorConfig,
    tick_count: u64,
) -> Vec3A {
    let prev = car.state.ball_hit_info;
    let mut info = BallHitInfo {
        is_valid: true,
        relative_pos_on_ball: (car_body.rot.transpose() * rel_pos).into(),
        ball_pos: ball_body.pos.into(),
        extra_hit_vel: Vec3::ZERO,
        tick_count_when_hit: tick_count,
        tick_count_when_extra_impulse_applied: prev.tick_count_when_extra_impulse_applied,
    };

    ball.last_hit_car_id = car.id();

    let mut added_vel = Vec3A::ZERO;
    if !prev.is_valid || tick_count > prev.tick_count_when_extra_impulse_applied + 1 {
        info.tick_count_when_extra_impulse_applied = tick_count;

        let rel_vel = ball_body.vel - car_body.vel;
        let rel_speed = rel_vel.length().min(BALL_CAR_EXTRA_IMPULSE_MAX_DELTA_VEL);
        if rel_speed > 0.0 {
            let car_forward = car_body.forward();
            let mut hit_dir = ((ball_body.pos - car_body.pos)
                * Vec3A::new(1.0, 1.0, BALL_CAR_EXTRA_IMPULSE_Z_SCALE))
            .normalize_or_zero();
            let forward_adjustment =
                car_forward * hit_dir.dot(car_forward) * (1.0 - BALL_CAR_EXTRA_IMPULSE_FORWARD_SCALE);
            hit_dir = (hit_dir - forward_adjustment).normalize_or_zero();

            added_vel = hit_dir
                * rel_speed
                * BALL_CAR_EXTRA_IMPULSE_FACTOR_CURVE.get_output(rel_speed)
                * mutator.ball_hit_extra_force_scale;
            info.extra_hit_vel = added_vel.into();
        }

        if game_mode == GameMode::Dropshot {
            dropshot::on_charging_hit(&mut ball.ds_info, car.team(), rel_speed);
        }
    }
    car.state.ball_hit_info = info;

    if game_mode == GameMode::Heatseeker {
        let hs = &mut ball.hs_info;
        let new_dir = car.team().opponent().side_sign();
        if hs.y_target_dir != new_dir {
            hs.y_target_dir = new_dir;
            hs.cur_target_speed = (hs.cur_target_speed + HEATSEEKER_TARGET_SPEED_INCREMENT)
                .min(HEATSEEKER_MAX_SPEED);
            hs.time_since_hit = 0.0;
        }
    }

    added_vel
}

fn hoops_goal_margin(x: f32, y: f32) -> f32 {
    let dy = y.abs() * HOOPS_GOAL_SCALE_Y - HOOPS_GOAL_OFFSET_Y;
    x * x + dy * dy - HOOPS_GOAL_RADIUS * HOOPS_GOAL_RADIUS
}

/// Whether a ball center at `pos` counts as inside a goal
///
/// A positive `extra_margin` makes the test more lenient.
pub fn is_scored_at(pos: Vec3, game_mode: GameMode, mutator: &MutatorConfig, extra_margin: f32) -> bool {
    match game_mode {
        GameMode::Soccar | GameMode::Heatseeker | GameMode::Snowday => {
            pos.y.abs() > mutator.goal_base_threshold_y + mutator.ball_radius - extra_margin
        }
        // Down in the net: under the rim line but resting above the net floor
        GameMode::Hoops => {
            pos.z < HOOPS_GOAL_SCORE_THRESHOLD_Z + extra_margin
                && pos.z > HOOPS_NET_FLOOR_Z - extra_margin
                && hoops_goal_margin(pos.x, pos.y) < 0.0
        }
        GameMode::Dropshot => {
            pos.z < -mutator.ball_radius * DROPSHOT_GOAL_DEPTH_SCALE + extra_margin
        }
        GameMode::TheVoid => false,
    }
}

/// Team credited for a goal at this ball position; the +y goal belongs to orange
pub fn scoring_team(pos: Vec3) -> Team {
    if pos.y > 0.0 { Team::Blue } else { Team::Orange }
}

/// Predict the ball alone, ignoring cars, and report the first goal it enters
///
/// Dropshot tiles are taken as they are now; the prediction never cracks them.
pub fn predict_goal(
    ball: &BallState,
    geometry: &ArenaGeometry,
    game_mode: GameMode,
    mutator: &MutatorConfig,
    tiles: &[TileState],
    tick_time: f32,
    max_time: f32,
    extra_margin: f32,
) -> Option<Team> {
    if !game_mode.has_goals() {
        return None;
    }

    let mut predicted = *ball;
    let mut body = rigid_body(&predicted, mutator);
    let steps = (max_time / tick_time).ceil().max(0.0) as u32;
    for _ in 0..=steps {
        let pos = Vec3::from(body.pos);
        if is_scored_at(pos, game_mode, mutator, extra_margin) {
            return Some(scoring_team(pos));
        }
        pre_tick_update(&mut predicted, &mut body, game_mode, tick_time);
        step_body(&mut body, geometry, mutator, tiles, tick_time);
    }
    None
}
