//! Kickoff and respawn placement
//!
//! Tables are written for the blue side; orange mirrors them through the
//! field center and turns around.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use rand::Rng;
use rand::seq::SliceRandom;

use super::dropshot;
use super::state::{BallState, BoostPadState, CarState, GameMode, GameState, Team};
use crate::consts::*;
use crate::math::{Angle, Vec3};

/// Ground position and heading for one spawn slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnLocation {
    pub x: f32,
    pub y: f32,
    pub yaw: f32,
}

const fn loc(x: f32, y: f32, yaw: f32) -> SpawnLocation {
    SpawnLocation { x, y, yaw }
}

const KICKOFF_LOCATIONS_SOCCAR: [SpawnLocation; 5] = [
    loc(-2048.0, -2560.0, FRAC_PI_4),
    loc(2048.0, -2560.0, 3.0 * FRAC_PI_4),
    loc(-256.0, -3840.0, FRAC_PI_2),
    loc(256.0, -3840.0, FRAC_PI_2),
    loc(0.0, -4608.0, FRAC_PI_2),
];

const KICKOFF_LOCATIONS_HOOPS: [SpawnLocation; 5] = [
    loc(-1536.0, -3072.0, FRAC_PI_2),
    loc(1536.0, -3072.0, FRAC_PI_2),
    loc(-256.0, -2816.0, FRAC_PI_2),
    loc(256.0, -2816.0, FRAC_PI_2),
    loc(0.0, -3200.0, FRAC_PI_2),
];

const KICKOFF_LOCATIONS_DROPSHOT: [SpawnLocation; 5] = [
    loc(-1867.0, -2379.0, FRAC_PI_4),
    loc(1867.0, -2379.0, 3.0 * FRAC_PI_4),
    loc(-256.0, -3576.0, FRAC_PI_2),
    loc(256.0, -3576.0, FRAC_PI_2),
    loc(0.0, -4088.0, FRAC_PI_2),
];

const RESPAWN_LOCATIONS_SOCCAR: [SpawnLocation; 4] = [
    loc(-2304.0, -4608.0, FRAC_PI_2),
    loc(-2688.0, -4608.0, FRAC_PI_2),
    loc(2304.0, -4608.0, FRAC_PI_2),
    loc(2688.0, -4608.0, FRAC_PI_2),
];

const RESPAWN_LOCATIONS_HOOPS: [SpawnLocation; 4] = [
    loc(-1920.0, -3072.0, FRAC_PI_2),
    loc(-1152.0, -3072.0, FRAC_PI_2),
    loc(1920.0, -3072.0, FRAC_PI_2),
    loc(1152.0, -3072.0, FRAC_PI_2),
];

const RESPAWN_LOCATIONS_DROPSHOT: [SpawnLocation; 4] = [
    loc(-2176.0, -3410.0, FRAC_PI_2),
    loc(-1980.0, -3540.0, FRAC_PI_2),
    loc(2176.0, -3410.0, FRAC_PI_2),
    loc(1980.0, -3540.0, FRAC_PI_2),
];

pub fn kickoff_locations(game_mode: GameMode) -> &'static [SpawnLocation] {
    match game_mode {
        GameMode::Hoops => &KICKOFF_LOCATIONS_HOOPS,
        GameMode::Dropshot => &KICKOFF_LOCATIONS_DROPSHOT,
        _ => &KICKOFF_LOCATIONS_SOCCAR,
    }
}

pub fn respawn_locations(game_mode: GameMode) -> &'static [SpawnLocation] {
    match game_mode {
        GameMode::Hoops => &RESPAWN_LOCATIONS_HOOPS,
        GameMode::Dropshot => &RESPAWN_LOCATIONS_DROPSHOT,
        _ => &RESPAWN_LOCATIONS_SOCCAR,
    }
}

/// Ball state at the start of a play
pub fn kickoff_ball<R: Rng>(state: &GameState, rng: &mut R) -> BallState {
    let mut ball = BallState::default();
    ball.pos.z = state.mutator.ball_rest_z();

    match state.game_mode {
        GameMode::Heatseeker => {
            let y_sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
            let [px, py, pz] = HEATSEEKER_BALL_START_POS;
            let [vx, vy, vz] = HEATSEEKER_BALL_START_VEL;
            ball.pos = Vec3::new(px, py * y_sign, pz);
            ball.vel = Vec3::new(vx, vy * y_sign, vz);
        }
        GameMode::Snowday => {
            // Keeps the puck awake on its first tick
            ball.vel.z = f32::EPSILON;
        }
        _ => {}
    }
    ball
}

/// Put every car on a kickoff slot, reset the ball, pads and scores
///
/// The i-th blue car and the i-th orange car (in id order) share slot i.
/// Cars beyond the kickoff slots queue up behind the respawn slots.
pub fn reset_to_kickoff<R: Rng>(state: &mut GameState, rng: &mut R) {
    let kickoff_locs = kickoff_locations(state.game_mode);
    let respawn_locs = respawn_locations(state.game_mode);

    let mut order: Vec<usize> = (0..kickoff_locs.len()).collect();
    order.shuffle(rng);

    let blue: Vec<usize> = team_indices(state, Team::Blue);
    let orange: Vec<usize> = team_indices(state, Team::Orange);
    let mut cars_at_respawn = vec![0u32; respawn_locs.len()];

    for i in 0..blue.len().max(orange.len()) {
        let spawn = if i < kickoff_locs.len() {
            kickoff_locs[order[i]]
        } else {
            let slot = (i - kickoff_locs.len()) % respawn_locs.len();
            let mut spawn = respawn_locs[slot];
            spawn.y += CAR_SPAWN_EXTRA_OFFSET_Y * cars_at_respawn[slot] as f32;
            cars_at_respawn[slot] += 1;
            spawn
        };

        for (team, indices) in [(Team::Blue, &blue), (Team::Orange, &orange)] {
            let Some(&idx) = indices.get(i) else { continue };
            let (pos, yaw) = match team {
                Team::Blue => (Vec3::new(spawn.x, spawn.y, CAR_SPAWN_REST_Z), spawn.yaw),
                Team::Orange => (Vec3::new(-spawn.x, -spawn.y, CAR_SPAWN_REST_Z), spawn.yaw + PI),
            };
            let car_state = CarState {
                pos,
                rot_mat: Angle::new(yaw, 0.0, 0.0).to_rot_mat(),
                boost: state.mutator.car_spawn_boost_amount,
                ..Default::default()
            };
            state.cars[idx].set_state(car_state);
        }
    }

    state.ball = kickoff_ball(state, rng);
    for pad in &mut state.boost_pads {
        pad.state = BoostPadState::default();
    }
    state.dropshot_tiles = dropshot::initial_tiles(state.game_mode);
    state.blue_score = 0;
    state.orange_score = 0;
    state.goal_latched = false;
}

fn team_indices(state: &GameState, team: Team) -> Vec<usize> {
    state
        .cars
        .iter()
        .enumerate()
        .filter(|(_, car)| car.team() == team)
        .map(|(idx, _)| idx)
        .collect()
}
