//! Arena Sim - deterministic car-and-ball arena physics
//!
//! Core modules:
//! - `sim`: Deterministic simulation (bodies, geometry, car/ball/pad rules, tick)
//! - `arena`: Owner of one simulation instance with callbacks, stop and clone
//! - `batch`: Parallel stepping of many independent arenas
//! - `export`: Flat float arrays for bulk consumers
//! - `wire`: Binary game-state codec for remote visualizers
//! - `config`: Arena configuration with JSON load/save

pub mod arena;
pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod math;
pub mod sim;
pub mod wire;

pub use arena::Arena;
pub use batch::{SharedArena, multi_step, multi_step_dyn};
pub use config::{ArenaConfig, MemWeightMode};
pub use error::{ArenaError, BoxError, ConfigError, WireError};
pub use math::{Angle, LinearPieceCurve, RotMat, Vec3};
pub use sim::{
    BallHitInfo, BallState, BoostPadConfig, BoostPadState, Car, CarConfig, CarControls,
    CarState, DemoMode, DropshotInfo, GameMode, MutatorConfig, Team, TileState,
};

/// Physics and game-balance constants (unreal units, seconds)
pub mod consts {
    use crate::math::LinearPieceCurve;

    /// Default simulation rate
    pub const DEFAULT_TICK_RATE: f32 = 120.0;
    pub const MIN_TICK_RATE: f32 = 15.0;
    pub const MAX_TICK_RATE: f32 = 120.0;

    pub const GRAVITY_Z: f32 = -650.0;

    /// Soccar field
    pub const ARENA_EXTENT_X: f32 = 4096.0;
    pub const ARENA_EXTENT_Y: f32 = 5120.0;
    pub const ARENA_HEIGHT: f32 = 2044.0;
    /// Distance cut off each corner along both axes
    pub const ARENA_CORNER_CUT: f32 = 1152.0;

    pub const ARENA_EXTENT_X_HOOPS: f32 = 8900.0 / 3.0;
    pub const ARENA_EXTENT_Y_HOOPS: f32 = 3581.0;
    pub const ARENA_HEIGHT_HOOPS: f32 = 1820.0;
    pub const ARENA_CORNER_CUT_HOOPS: f32 = 800.0;

    pub const ARENA_EXTENT_X_DROPSHOT: f32 = 5026.0;
    pub const ARENA_EXTENT_Y_DROPSHOT: f32 = 4555.0;
    pub const ARENA_HEIGHT_DROPSHOT: f32 = 2024.0;
    pub const ARENA_CORNER_CUT_DROPSHOT: f32 = 2600.0;
    pub const FLOOR_HEIGHT_DROPSHOT: f32 = 1.5;

    /// Goal mouth
    pub const GOAL_HALF_WIDTH: f32 = 892.755;
    pub const GOAL_HEIGHT: f32 = 642.775;
    pub const GOAL_DEPTH: f32 = 880.0;
    /// Ball center must pass this |y| plus its radius to count as scored
    pub const GOAL_BASE_THRESHOLD_Y: f32 = 5124.25;

    pub const HOOPS_GOAL_SCORE_THRESHOLD_Z: f32 = 270.0;
    pub const HOOPS_GOAL_SCALE_Y: f32 = 0.9;
    pub const HOOPS_GOAL_OFFSET_Y: f32 = 2770.0;
    pub const HOOPS_GOAL_RADIUS: f32 = 716.0;
    /// Hoop net: a basket hanging from the rim, open above, closed below
    pub const HOOPS_NET_CENTER_Y: f32 = HOOPS_GOAL_OFFSET_Y / HOOPS_GOAL_SCALE_Y;
    pub const HOOPS_NET_RADIUS: f32 = HOOPS_GOAL_RADIUS;
    pub const HOOPS_NET_FLOOR_Z: f32 = 160.0;
    pub const HOOPS_RIM_Z: f32 = 365.0;

    /// Dropshot floor tiles, 70 per side in rows of 13 down to 7
    pub const DROPSHOT_TILES_PER_TEAM: usize = 70;
    pub const DROPSHOT_NUM_TILES: usize = DROPSHOT_TILES_PER_TEAM * 2;
    pub const DROPSHOT_TILE_ROWS: usize = 7;
    pub const DROPSHOT_TILES_IN_FIRST_ROW: usize = 13;
    /// Distance between neighbouring tile centers
    pub const DROPSHOT_TILE_SPACING: f32 = 768.0;
    pub const DROPSHOT_TILE_ROW_SPACING: f32 = DROPSHOT_TILE_SPACING * 0.866_025_4;
    /// Center-to-corner distance of one hexagon
    pub const DROPSHOT_TILE_RADIUS: f32 = DROPSHOT_TILE_SPACING * 0.577_350_3;
    /// Car hits slower than this do not charge the ball
    pub const DROPSHOT_MIN_CHARGE_HIT_SPEED: f32 = 500.0;
    pub const DROPSHOT_CHARGE_LEVEL_2_FORCE: f32 = 2500.0;
    pub const DROPSHOT_CHARGE_LEVEL_3_FORCE: f32 = 11000.0;
    pub const DROPSHOT_MIN_DAMAGE_INTERVAL: f32 = 0.1;
    /// A ball this far below the floor has fallen through
    pub const DROPSHOT_GOAL_DEPTH_SCALE: f32 = 1.75;

    pub const CAR_MASS: f32 = 180.0;
    pub const BALL_MASS: f32 = 30.0;

    pub const BALL_RADIUS_SOCCAR: f32 = 91.25;
    pub const BALL_RADIUS_HOOPS: f32 = 96.3831;
    pub const BALL_RADIUS_DROPSHOT: f32 = 100.2565;
    pub const PUCK_RADIUS_SNOWDAY: f32 = 114.25;
    /// Rest height of the soccar ball; other modes keep the same floor gap
    pub const BALL_REST_Z: f32 = 93.15;
    pub const BALL_MAX_SPEED: f32 = 6000.0;
    pub const BALL_MAX_ANG_SPEED: f32 = 6.0;
    pub const BALL_DRAG: f32 = 0.03;
    pub const BALL_WORLD_FRICTION: f32 = 0.35;
    pub const BALL_WORLD_RESTITUTION: f32 = 0.6;

    pub const CAR_WORLD_FRICTION: f32 = 0.3;
    pub const CAR_WORLD_RESTITUTION: f32 = 0.3;
    pub const CAR_BALL_FRICTION: f32 = 2.0;
    pub const CAR_BALL_RESTITUTION: f32 = 0.0;
    pub const CAR_CAR_FRICTION: f32 = 0.09;
    pub const CAR_CAR_RESTITUTION: f32 = 0.1;

    pub const CAR_MAX_SPEED: f32 = 2300.0;
    pub const CAR_MAX_ANG_SPEED: f32 = 5.5;

    pub const SUPERSONIC_START_SPEED: f32 = 2200.0;
    pub const SUPERSONIC_MAINTAIN_MIN_SPEED: f32 = SUPERSONIC_START_SPEED - 100.0;
    pub const SUPERSONIC_MAINTAIN_MAX_TIME: f32 = 1.0;

    pub const CAR_SPAWN_REST_Z: f32 = 17.0;
    pub const CAR_RESPAWN_Z: f32 = 36.0;
    /// Extra y spacing when several cars share a respawn slot at kickoff
    pub const CAR_SPAWN_EXTRA_OFFSET_Y: f32 = 250.0;
    pub const DEMO_RESPAWN_TIME: f32 = 3.0;

    pub const BOOST_MAX: f32 = 100.0;
    pub const BOOST_USED_PER_SECOND: f32 = BOOST_MAX / 3.0;
    pub const BOOST_MIN_TIME: f32 = 0.1;
    pub const BOOST_ACCEL_GROUND: f32 = 2975.0 / 3.0;
    pub const BOOST_ACCEL_AIR: f32 = 3175.0 / 3.0;
    pub const BOOST_SPAWN_AMOUNT: f32 = BOOST_MAX / 3.0;
    pub const RECHARGE_BOOST_PER_SECOND: f32 = 10.0;
    pub const RECHARGE_BOOST_DELAY: f32 = 0.25;

    pub const JUMP_ACCEL: f32 = 4375.0 / 3.0;
    pub const JUMP_IMMEDIATE_FORCE: f32 = 875.0 / 3.0;
    pub const JUMP_MIN_TIME: f32 = 0.025;
    pub const JUMP_MAX_TIME: f32 = 0.2;
    pub const JUMP_RESET_TIME_PAD: f32 = 1.0 / 40.0;
    pub const JUMP_PRE_MIN_ACCEL_SCALE: f32 = 0.62;
    pub const DOUBLEJUMP_MAX_DELAY: f32 = 1.25;

    pub const FLIP_Z_DAMP_120: f32 = 0.35;
    pub const FLIP_Z_DAMP_START: f32 = 0.15;
    pub const FLIP_Z_DAMP_END: f32 = 0.21;
    pub const FLIP_TORQUE_TIME: f32 = 0.65;
    pub const FLIP_PITCHLOCK_EXTRA_TIME: f32 = 0.3;
    pub const FLIP_INITIAL_VEL_SCALE: f32 = 500.0;
    pub const FLIP_TORQUE_X: f32 = 260.0;
    pub const FLIP_TORQUE_Y: f32 = 224.0;
    pub const FLIP_FORWARD_IMPULSE_MAX_SPEED_SCALE: f32 = 1.0;
    pub const FLIP_SIDE_IMPULSE_MAX_SPEED_SCALE: f32 = 1.9;
    pub const FLIP_BACKWARD_IMPULSE_MAX_SPEED_SCALE: f32 = 2.5;
    pub const FLIP_BACKWARD_IMPULSE_SCALE_X: f32 = 16.0 / 15.0;

    /// Pitch, yaw, roll
    pub const CAR_AIR_CONTROL_TORQUE: [f32; 3] = [130.0, 95.0, 400.0];
    pub const CAR_AIR_CONTROL_DAMPING: [f32; 3] = [30.0, 20.0, 50.0];
    pub const CAR_TORQUE_SCALE: f32 = 2.0 * std::f32::consts::PI / 65536.0 * 1000.0;
    pub const THROTTLE_AIR_ACCEL: f32 = 200.0 / 3.0;

    pub const CAR_AUTOFLIP_IMPULSE: f32 = 200.0;
    pub const CAR_AUTOFLIP_TORQUE: f32 = 50.0;
    pub const CAR_AUTOFLIP_TIME: f32 = 0.4;
    pub const CAR_AUTOFLIP_NORMZ_THRESH: f32 = std::f32::consts::FRAC_1_SQRT_2;
    pub const CAR_AUTOFLIP_ROLL_THRESH: f32 = 2.8;

    pub const CAR_AUTOROLL_FORCE: f32 = 100.0;
    pub const CAR_AUTOROLL_TORQUE: f32 = 80.0;

    /// Ground driving
    pub const THROTTLE_ACCEL: f32 = 1600.0;
    pub const BRAKE_ACCEL: f32 = 3500.0;
    pub const COASTING_BRAKE_FACTOR: f32 = 0.15;
    pub const STOPPING_FORWARD_VEL: f32 = 25.0;
    pub const BRAKING_NO_THROTTLE_SPEED_THRESH: f32 = 0.01;
    pub const THROTTLE_DEADZONE: f32 = 0.001;
    pub const POWERSLIDE_RISE_RATE: f32 = 5.0;
    pub const POWERSLIDE_FALL_RATE: f32 = 2.0;
    pub const HANDBRAKE_LAT_FRICTION_FACTOR: f32 = 0.1;
    /// Share of lateral slip removed each tick at full grip
    pub const LAT_GRIP: f32 = 0.9;

    pub const DRIVE_SPEED_FACTOR_CURVE: LinearPieceCurve<3> =
        LinearPieceCurve::new([(0.0, 1.0), (1400.0, 0.1), (1410.0, 0.0)]);
    pub const STEER_ANGLE_FROM_SPEED_CURVE: LinearPieceCurve<6> = LinearPieceCurve::new([
        (0.0, 0.53356),
        (500.0, 0.31930),
        (1000.0, 0.18203),
        (1500.0, 0.10570),
        (1750.0, 0.08507),
        (3000.0, 0.03454),
    ]);
    pub const POWERSLIDE_STEER_ANGLE_FROM_SPEED_CURVE: LinearPieceCurve<2> =
        LinearPieceCurve::new([(0.0, 0.39235), (2500.0, 0.12610)]);

    /// Suspension
    pub const SUSPENSION_STIFFNESS: f32 = 19500.0;
    pub const SUSPENSION_DAMPING: f32 = 950.0;
    pub const SUSPENSION_FORCE_SCALE_FRONT: f32 = 0.8;
    pub const SUSPENSION_FORCE_SCALE_BACK: f32 = 1.2;
    pub const MAX_SUSPENSION_TRAVEL: f32 = 12.0;

    pub const BUMP_COOLDOWN_TIME: f32 = 0.25;
    /// Contact must be at least this far ahead of the bumper's origin
    pub const BUMP_MIN_FORWARD_DIST: f32 = 64.5;
    pub const BUMP_VEL_AMOUNT_GROUND_CURVE: LinearPieceCurve<3> =
        LinearPieceCurve::new([(0.0, 5.0 / 6.0), (1400.0, 1100.0), (2200.0, 1530.0)]);
    pub const BUMP_VEL_AMOUNT_AIR_CURVE: LinearPieceCurve<3> =
        LinearPieceCurve::new([(0.0, 5.0 / 6.0), (1400.0, 1390.0), (2200.0, 1945.0)]);
    pub const BUMP_UPWARD_VEL_AMOUNT_CURVE: LinearPieceCurve<3> =
        LinearPieceCurve::new([(0.0, 2.0 / 6.0), (1400.0, 278.0), (2200.0, 417.0)]);

    pub const BALL_CAR_EXTRA_IMPULSE_Z_SCALE: f32 = 0.35;
    pub const BALL_CAR_EXTRA_IMPULSE_FORWARD_SCALE: f32 = 0.65;
    pub const BALL_CAR_EXTRA_IMPULSE_MAX_DELTA_VEL: f32 = 4600.0;
    pub const BALL_CAR_EXTRA_IMPULSE_FACTOR_CURVE: LinearPieceCurve<4> = LinearPieceCurve::new([
        (0.0, 0.65),
        (500.0, 0.65),
        (2300.0, 0.55),
        (4600.0, 0.30),
    ]);

    pub const BOOST_PAD_PICKUP_RADIUS_BIG: f32 = 208.0;
    pub const BOOST_PAD_PICKUP_RADIUS_SMALL: f32 = 144.0;
    pub const BOOST_PAD_CYL_HEIGHT: f32 = 95.0;
    pub const BOOST_PAD_COOLDOWN_BIG: f32 = 10.0;
    pub const BOOST_PAD_COOLDOWN_SMALL: f32 = 4.0;
    pub const BOOST_PAD_SMALL_AMOUNT: f32 = 12.0;

    pub const HEATSEEKER_INITIAL_TARGET_SPEED: f32 = 2900.0;
    pub const HEATSEEKER_TARGET_SPEED_INCREMENT: f32 = 85.0;
    pub const HEATSEEKER_MAX_SPEED: f32 = 4600.0;
    pub const HEATSEEKER_TARGET_Y: f32 = 5120.0;
    pub const HEATSEEKER_TARGET_Z: f32 = 320.0;
    pub const HEATSEEKER_HORIZONTAL_BLEND: f32 = 1.45;
    pub const HEATSEEKER_VERTICAL_BLEND: f32 = 0.78;
    pub const HEATSEEKER_SPEED_BLEND: f32 = 0.3;
    pub const HEATSEEKER_MAX_TURN_PITCH: f32 = 7000.0 * std::f32::consts::PI / 32768.0;
    pub const HEATSEEKER_BALL_START_POS: [f32; 3] = [-1000.0, -2220.0, 92.75];
    pub const HEATSEEKER_BALL_START_VEL: [f32; 3] = [0.0, -65.0, 650.0];
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Scale a per-tick factor tuned at 120 Hz to another tick length
#[inline]
pub fn rate_scaled(factor_at_120: f32, tick_time: f32) -> f32 {
    1.0 - (1.0 - factor_at_120).powf(tick_time * 120.0)
}
