//! Arena-wide physics and rule overrides

use serde::{Deserialize, Serialize};

use super::state::GameMode;
use crate::consts::*;
use crate::math::Vec3;

/// When car-car contacts demolish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DemoMode {
    /// Only a supersonic bumper demolishes
    #[default]
    Normal,
    /// Every qualifying bump demolishes
    OnContact,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutatorConfig {
    pub gravity: Vec3,

    pub car_mass: f32,
    pub car_world_friction: f32,
    pub car_world_restitution: f32,

    pub ball_mass: f32,
    pub ball_max_speed: f32,
    pub ball_drag: f32,
    pub ball_world_friction: f32,
    pub ball_world_restitution: f32,
    pub ball_radius: f32,

    pub jump_accel: f32,
    pub jump_immediate_force: f32,
    pub boost_accel_ground: f32,
    pub boost_accel_air: f32,
    pub boost_used_per_second: f32,

    pub respawn_delay: f32,
    pub bump_cooldown_time: f32,
    pub boost_pad_cooldown_big: f32,
    pub boost_pad_cooldown_small: f32,
    pub car_spawn_boost_amount: f32,

    pub ball_hit_extra_force_scale: f32,
    pub bump_force_scale: f32,

    pub unlimited_flips: bool,
    pub unlimited_double_jumps: bool,

    pub recharge_boost_enabled: bool,
    pub recharge_boost_per_second: f32,
    pub recharge_boost_delay: f32,

    pub demo_mode: DemoMode,
    /// Allow demolishing teammates
    pub enable_team_demos: bool,
    pub enable_car_car_collision: bool,
    pub enable_car_ball_collision: bool,

    pub goal_base_threshold_y: f32,
}

impl Default for MutatorConfig {
    fn default() -> Self {
        Self::for_game_mode(GameMode::Soccar)
    }
}

impl MutatorConfig {
    /// Stock rules for a game mode
    pub fn for_game_mode(game_mode: GameMode) -> Self {
        let ball_radius = match game_mode {
            GameMode::Hoops => BALL_RADIUS_HOOPS,
            GameMode::Dropshot => BALL_RADIUS_DROPSHOT,
            GameMode::Snowday => PUCK_RADIUS_SNOWDAY,
            _ => BALL_RADIUS_SOCCAR,
        };

        Self {
            gravity: Vec3::new(0.0, 0.0, GRAVITY_Z),
            car_mass: CAR_MASS,
            car_world_friction: CAR_WORLD_FRICTION,
            car_world_restitution: CAR_WORLD_RESTITUTION,
            ball_mass: BALL_MASS,
            ball_max_speed: BALL_MAX_SPEED,
            ball_drag: BALL_DRAG,
            ball_world_friction: BALL_WORLD_FRICTION,
            ball_world_restitution: BALL_WORLD_RESTITUTION,
            ball_radius,
            jump_accel: JUMP_ACCEL,
            jump_immediate_force: JUMP_IMMEDIATE_FORCE,
            boost_accel_ground: BOOST_ACCEL_GROUND,
            boost_accel_air: BOOST_ACCEL_AIR,
            boost_used_per_second: BOOST_USED_PER_SECOND,
            respawn_delay: DEMO_RESPAWN_TIME,
            bump_cooldown_time: BUMP_COOLDOWN_TIME,
            boost_pad_cooldown_big: BOOST_PAD_COOLDOWN_BIG,
            boost_pad_cooldown_small: BOOST_PAD_COOLDOWN_SMALL,
            car_spawn_boost_amount: BOOST_SPAWN_AMOUNT,
            ball_hit_extra_force_scale: 1.0,
            bump_force_scale: 1.0,
            unlimited_flips: false,
            unlimited_double_jumps: false,
            recharge_boost_enabled: false,
            recharge_boost_per_second: RECHARGE_BOOST_PER_SECOND,
            recharge_boost_delay: RECHARGE_BOOST_DELAY,
            demo_mode: DemoMode::Normal,
            enable_team_demos: false,
            enable_car_car_collision: true,
            enable_car_ball_collision: true,
            goal_base_threshold_y: GOAL_BASE_THRESHOLD_Y,
        }
    }

    /// Ball height when resting on the floor
    pub fn ball_rest_z(&self) -> f32 {
        self.ball_radius + (BALL_REST_Z - BALL_RADIUS_SOCCAR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soccar_defaults() {
        let m = MutatorConfig::for_game_mode(GameMode::Soccar);
        assert_eq!(m.gravity, Vec3::new(0.0, 0.0, -650.0));
        assert_eq!(m.ball_radius, BALL_RADIUS_SOCCAR);
        assert!((m.ball_rest_z() - BALL_REST_Z).abs() < 1e-4);
        assert_eq!(m.demo_mode, DemoMode::Normal);
        assert!(m.enable_car_ball_collision && m.enable_car_car_collision);
    }

    #[test]
    fn test_radius_per_mode() {
        assert_eq!(
            MutatorConfig::for_game_mode(GameMode::Snowday).ball_radius,
            PUCK_RADIUS_SNOWDAY
        );
        assert_eq!(
            MutatorConfig::for_game_mode(GameMode::Hoops).ball_radius,
            BALL_RADIUS_HOOPS
        );
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let m: MutatorConfig =
            serde_json::from_str(r#"{"unlimited_flips": true, "demo_mode": "OnContact"}"#)
                .expect("parse");
        assert!(m.unlimited_flips);
        assert_eq!(m.demo_mode, DemoMode::OnContact);
        assert_eq!(m.car_mass, CAR_MASS);
    }
}
