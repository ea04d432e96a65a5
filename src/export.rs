//! Flat float arrays for bulk consumers
//!
//! Layouts:
//! - ball (18): pos, vel, ang_vel, forward, right, up
//! - car (25): the ball layout, then boost, is_on_ground, has_jumped,
//!   has_double_jumped, has_flipped, is_demoed, is_supersonic
//! - pads: 1.0 for active, 0.0 for cooling down

use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::math::{RotMat, Vec3};
use crate::sim::{BallState, CarState};

pub const BALL_STATE_LEN: usize = 18;
pub const CAR_STATE_LEN: usize = 25;

fn write_body(out: &mut [f32], pos: Vec3, vel: Vec3, ang_vel: Vec3, rot: &RotMat) {
    for (chunk, v) in out
        .chunks_exact_mut(3)
        .zip([pos, vel, ang_vel, rot.forward, rot.right, rot.up])
    {
        chunk.copy_from_slice(&v.to_array());
    }
}

pub fn ball_state_array(ball: &BallState) -> [f32; BALL_STATE_LEN] {
    let mut out = [0.0; BALL_STATE_LEN];
    write_body(&mut out, ball.pos, ball.vel, ball.ang_vel, &ball.rot_mat);
    out
}

pub fn car_state_array(car: &CarState) -> [f32; CAR_STATE_LEN] {
    let mut out = [0.0; CAR_STATE_LEN];
    write_body(
        &mut out[..BALL_STATE_LEN],
        car.pos,
        car.vel,
        car.ang_vel,
        &car.rot_mat,
    );
    let flags = [
        car.is_on_ground,
        car.has_jumped,
        car.has_double_jumped,
        car.has_flipped,
        car.is_demoed,
        car.is_supersonic,
    ];
    out[BALL_STATE_LEN] = car.boost;
    for (slot, flag) in out[BALL_STATE_LEN + 1..].iter_mut().zip(flags) {
        *slot = if flag { 1.0 } else { 0.0 };
    }
    out
}

/// Everything a gym-style environment reads after a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GymState {
    pub ball: [f32; BALL_STATE_LEN],
    /// One row per car, in `car_ids` order
    pub cars: Vec<[f32; CAR_STATE_LEN]>,
    pub pads: Vec<f32>,
    pub blue_score: u32,
    pub orange_score: u32,
    pub tick_count: u64,
    pub car_ids: Vec<u32>,
    /// 0 for blue, 1 for orange
    pub car_teams: Vec<u8>,
}

impl Arena {
    pub fn ball_state_array(&self) -> [f32; BALL_STATE_LEN] {
        ball_state_array(self.ball())
    }

    /// `None` for an unknown car id
    pub fn car_state_array(&self, id: u32) -> Option<[f32; CAR_STATE_LEN]> {
        self.car(id).map(|c| car_state_array(c.state()))
    }

    pub fn cars_state_array(&self) -> Vec<[f32; CAR_STATE_LEN]> {
        self.cars().iter().map(|c| car_state_array(c.state())).collect()
    }

    pub fn pads_state_array(&self) -> Vec<f32> {
        self.boost_pads()
            .iter()
            .map(|p| if p.state.is_active { 1.0 } else { 0.0 })
            .collect()
    }

    pub fn gym_state(&self) -> GymState {
        GymState {
            ball: self.ball_state_array(),
            cars: self.cars_state_array(),
            pads: self.pads_state_array(),
            blue_score: self.blue_score(),
            orange_score: self.orange_score(),
            tick_count: self.tick_count(),
            car_ids: self.car_ids(),
            car_teams: self.cars().iter().map(|c| c.team().as_u8()).collect(),
        }
    }
}
