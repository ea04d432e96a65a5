//! Simulation state and core value types
//!
//! Everything a replay needs lives in `GameState`. Cloning it yields a fully
//! independent copy; nothing in here is shared.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::boost_pad::BoostPad;
use super::car::{Car, CarConfig};
use super::dropshot::{self, TileState};
use super::mutator::MutatorConfig;
use crate::consts::*;
use crate::math::{RotMat, Vec3};

/// Game mode; selects field geometry, goals and pad layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    Soccar,
    Hoops,
    Heatseeker,
    Snowday,
    Dropshot,
    TheVoid,
}

impl GameMode {
    pub const ALL: [GameMode; 6] = [
        GameMode::Soccar,
        GameMode::Hoops,
        GameMode::Heatseeker,
        GameMode::Snowday,
        GameMode::Dropshot,
        GameMode::TheVoid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Soccar => "soccar",
            GameMode::Hoops => "hoops",
            GameMode::Heatseeker => "heatseeker",
            GameMode::Snowday => "snowday",
            GameMode::Dropshot => "dropshot",
            GameMode::TheVoid => "the_void",
        }
    }

    pub fn from_u8(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn has_goals(&self) -> bool {
        *self != GameMode::TheVoid
    }

    pub fn has_boost_pads(&self) -> bool {
        !matches!(self, GameMode::TheVoid | GameMode::Dropshot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Team {
    #[default]
    Blue,
    Orange,
}

impl Team {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Team::Blue),
            1 => Some(Team::Orange),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Sign of the half of the field this team defends (blue defends -y)
    pub fn side_sign(&self) -> f32 {
        match self {
            Team::Blue => -1.0,
            Team::Orange => 1.0,
        }
    }

    pub fn opponent(&self) -> Team {
        match self {
            Team::Blue => Team::Orange,
            Team::Orange => Team::Blue,
        }
    }
}

/// Player inputs for one car; latched until overwritten
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CarControls {
    pub throttle: f32,
    pub steer: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
    pub boost: bool,
    pub jump: bool,
    pub handbrake: bool,
}

impl CarControls {
    /// Clamp analog inputs to [-1, 1]; NaN becomes 0
    pub fn clamp_fix(&mut self) {
        for axis in [
            &mut self.throttle,
            &mut self.steer,
            &mut self.pitch,
            &mut self.yaw,
            &mut self.roll,
        ] {
            *axis = if axis.is_nan() { 0.0 } else { axis.clamp(-1.0, 1.0) };
        }
    }
}

/// Hitbox contact with arena geometry during the last tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldContact {
    pub has_contact: bool,
    pub contact_normal: Vec3,
}

/// Bump cooldown against a specific car
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CarContact {
    /// 0 when there is no recent contact
    pub other_car_id: u32,
    pub cooldown_timer: f32,
}

/// Details of the car's most recent ball touch
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BallHitInfo {
    pub is_valid: bool,
    /// Contact point relative to the ball, in the car's local frame
    pub relative_pos_on_ball: Vec3,
    pub ball_pos: Vec3,
    pub extra_hit_vel: Vec3,
    pub tick_count_when_hit: u64,
    pub tick_count_when_extra_impulse_applied: u64,
}

/// Heatseeker homing state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatseekerInfo {
    /// +1 or -1 for the goal being targeted, 0 before the first touch
    pub y_target_dir: f32,
    pub cur_target_speed: f32,
    pub time_since_hit: f32,
}

impl Default for HeatseekerInfo {
    fn default() -> Self {
        Self {
            y_target_dir: 0.0,
            cur_target_speed: HEATSEEKER_INITIAL_TARGET_SPEED,
            time_since_hit: 0.0,
        }
    }
}

/// Dropshot charge carried by the ball between floor impacts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropshotInfo {
    /// 1 to 3; sets how many rings of tiles one impact damages
    pub charge_level: i32,
    pub accumulated_hit_force: f32,
    /// +1 or -1 for the half being attacked, 0 before the first touch
    pub y_target_dir: f32,
    /// Already damaged tiles since the last charging hit
    pub has_damaged: bool,
    pub last_damage_tick: u64,
}

impl Default for DropshotInfo {
    fn default() -> Self {
        Self {
            charge_level: 1,
            accumulated_hit_force: 0.0,
            y_target_dir: 0.0,
            has_damaged: false,
            last_damage_tick: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    pub pos: Vec3,
    pub rot_mat: RotMat,
    pub vel: Vec3,
    pub ang_vel: Vec3,
    /// Id of the last car to touch the ball, 0 for none
    pub last_hit_car_id: u32,
    #[serde(default)]
    pub hs_info: HeatseekerInfo,
    #[serde(default)]
    pub ds_info: DropshotInfo,
}

impl Default for BallState {
    fn default() -> Self {
        Self {
            pos: Vec3::new(0.0, 0.0, BALL_REST_Z),
            rot_mat: RotMat::IDENTITY,
            vel: Vec3::ZERO,
            ang_vel: Vec3::ZERO,
            last_hit_car_id: 0,
            hs_info: HeatseekerInfo::default(),
            ds_info: DropshotInfo::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarState {
    pub pos: Vec3,
    pub rot_mat: RotMat,
    pub vel: Vec3,
    pub ang_vel: Vec3,

    /// True when three or more wheels touch a surface
    pub is_on_ground: bool,
    /// Front-left, front-right, back-left, back-right
    pub wheels_with_contact: [bool; 4],

    /// Left the ground by jumping (false after a flip reset)
    pub has_jumped: bool,
    pub has_double_jumped: bool,
    pub has_flipped: bool,
    /// Flip torque direction in the car frame; forward flips have positive y
    pub flip_rel_torque: Vec3,
    pub jump_time: f32,
    pub flip_time: f32,
    pub is_flipping: bool,
    pub is_jumping: bool,
    pub air_time: f32,
    /// Time airborne since the jump ended; 0 if we never jumped
    pub air_time_since_jump: f32,

    /// 0 to 100
    pub boost: f32,
    pub time_since_boosted: f32,
    pub is_boosting: bool,
    pub boosting_time: f32,

    pub is_supersonic: bool,
    pub supersonic_time: f32,
    /// Powerslide amount, eased toward the handbrake input
    pub handbrake_val: f32,

    pub is_auto_flipping: bool,
    pub auto_flip_timer: f32,
    pub auto_flip_torque_scale: f32,

    pub world_contact: WorldContact,
    pub car_contact: CarContact,

    pub is_demoed: bool,
    pub demo_respawn_timer: f32,

    pub ball_hit_info: BallHitInfo,
    /// Controls applied during the previous tick
    pub last_controls: CarControls,
}

impl Default for CarState {
    fn default() -> Self {
        Self {
            pos: Vec3::new(0.0, 0.0, CAR_SPAWN_REST_Z),
            rot_mat: RotMat::IDENTITY,
            vel: Vec3::ZERO,
            ang_vel: Vec3::ZERO,
            is_on_ground: true,
            wheels_with_contact: [false; 4],
            has_jumped: false,
            has_double_jumped: false,
            has_flipped: false,
            flip_rel_torque: Vec3::ZERO,
            jump_time: 0.0,
            flip_time: 0.0,
            is_flipping: false,
            is_jumping: false,
            air_time: 0.0,
            air_time_since_jump: 0.0,
            boost: BOOST_SPAWN_AMOUNT,
            time_since_boosted: 0.0,
            is_boosting: false,
            boosting_time: 0.0,
            is_supersonic: false,
            supersonic_time: 0.0,
            handbrake_val: 0.0,
            is_auto_flipping: false,
            auto_flip_timer: 0.0,
            auto_flip_torque_scale: 0.0,
            world_contact: WorldContact::default(),
            car_contact: CarContact::default(),
            is_demoed: false,
            demo_respawn_timer: 0.0,
            ball_hit_info: BallHitInfo::default(),
            last_controls: CarControls::default(),
        }
    }
}

/// Fixed per-pad configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostPadConfig {
    pub pos: Vec3,
    pub is_big: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostPadState {
    pub is_active: bool,
    /// Seconds until reactivation; 0 while active
    pub cooldown: f32,
}

impl Default for BoostPadState {
    fn default() -> Self {
        Self {
            is_active: true,
            cooldown: 0.0,
        }
    }
}

/// Per-car counters; cleared when the car is removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarStats {
    pub goals: u32,
    pub demos: u32,
    pub boost_pickups: u32,
    pub ball_touches: u32,
}

/// RNG state wrapper for serialization
///
/// Each draw builds a fresh generator on the next stream, so the state is
/// two plain integers that clone and compare like any other field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    /// Generator for one draw site; advances the stream
    pub fn next_rng(&mut self) -> Pcg32 {
        let rng = Pcg32::new(self.seed, self.stream);
        self.stream = self.stream.wrapping_add(1);
        rng
    }

    /// Generator for an explicit caller seed
    pub fn seeded(seed: u64) -> Pcg32 {
        Pcg32::seed_from_u64(seed)
    }
}

/// Complete simulation state (deterministic, serializable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub game_mode: GameMode,
    pub tick_rate: f32,
    /// Completed ticks since creation
    pub tick_count: u64,
    pub ball: BallState,
    /// Sorted by id for determinism
    pub cars: Vec<Car>,
    pub boost_pads: Vec<BoostPad>,
    pub mutator: MutatorConfig,
    pub blue_score: u32,
    pub orange_score: u32,
    pub rng_state: RngState,
    /// Set when a goal registers; cleared by kickoff or a ball reset
    pub goal_latched: bool,
    /// Floor tiles in Dropshot, empty in every other mode
    #[serde(default)]
    pub dropshot_tiles: Vec<TileState>,
    /// Last car id handed out; ids are never reused
    last_car_id: u32,
}

impl GameState {
    pub fn new(
        game_mode: GameMode,
        tick_rate: f32,
        boost_pads: Vec<BoostPad>,
        mutator: MutatorConfig,
        rng_seed: u64,
    ) -> Self {
        let mut ball = BallState::default();
        ball.pos.z = mutator.ball_rest_z();

        Self {
            game_mode,
            tick_rate,
            tick_count: 0,
            ball,
            cars: Vec::new(),
            boost_pads,
            mutator,
            blue_score: 0,
            orange_score: 0,
            rng_state: RngState::new(rng_seed),
            goal_latched: false,
            dropshot_tiles: dropshot::initial_tiles(game_mode),
            last_car_id: 0,
        }
    }

    #[inline]
    pub fn tick_time(&self) -> f32 {
        1.0 / self.tick_rate
    }

    /// Allocate a new car id
    pub fn next_car_id(&mut self) -> u32 {
        self.last_car_id += 1;
        self.last_car_id
    }

    /// Add a car and return its id; ids are strictly increasing
    pub fn push_car(&mut self, team: Team, config: CarConfig) -> u32 {
        let id = self.next_car_id();
        self.cars.push(Car::new(id, team, config, &self.mutator));
        id
    }

    pub fn remove_car(&mut self, id: u32) -> bool {
        match self.car_index(id) {
            Some(idx) => {
                self.cars.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn car_index(&self, id: u32) -> Option<usize> {
        self.cars.binary_search_by_key(&id, |c| c.id()).ok()
    }

    pub fn car(&self, id: u32) -> Option<&Car> {
        self.car_index(id).map(|idx| &self.cars[idx])
    }

    pub fn car_mut(&mut self, id: u32) -> Option<&mut Car> {
        self.car_index(id).map(move |idx| &mut self.cars[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_rng_state_is_deterministic() {
        let mut a = RngState::new(7);
        let mut b = RngState::new(7);
        for _ in 0..4 {
            let x: u32 = a.next_rng().random();
            let y: u32 = b.next_rng().random();
            assert_eq!(x, y);
        }
        assert_eq!(a, b);
    }

    #[test]
    fn test_rng_streams_differ() {
        let mut s = RngState::new(7);
        let x: u64 = s.next_rng().random();
        let y: u64 = s.next_rng().random();
        assert_ne!(x, y);
    }

    #[test]
    fn test_controls_clamp() {
        let mut c = CarControls {
            throttle: 3.0,
            steer: -7.0,
            pitch: f32::NAN,
            ..Default::default()
        };
        c.clamp_fix();
        assert_eq!(c.throttle, 1.0);
        assert_eq!(c.steer, -1.0);
        assert_eq!(c.pitch, 0.0);
    }

    #[test]
    fn test_game_mode_tags() {
        for mode in GameMode::ALL {
            assert_eq!(GameMode::from_u8(mode.as_u8()), Some(mode));
        }
        assert_eq!(GameMode::from_u8(6), None);
        assert!(!GameMode::TheVoid.has_goals());
        assert!(!GameMode::TheVoid.has_boost_pads());
        assert!(GameMode::Hoops.has_boost_pads());
    }

    #[test]
    fn test_team_sides() {
        assert_eq!(Team::Blue.opponent(), Team::Orange);
        assert_eq!(Team::Orange.opponent(), Team::Blue);
        assert_eq!(Team::Blue.side_sign(), -Team::Orange.side_sign());
    }

    #[test]
    fn test_only_dropshot_has_tiles() {
        for mode in GameMode::ALL {
            let state = GameState::new(mode, 120.0, Vec::new(), MutatorConfig::for_game_mode(mode), 0);
            let expected = if mode == GameMode::Dropshot { DROPSHOT_NUM_TILES } else { 0 };
            assert_eq!(state.dropshot_tiles.len(), expected);
        }
    }

    #[test]
    fn test_car_ids_never_reused() {
        let mut state = GameState::new(
            GameMode::Soccar,
            120.0,
            Vec::new(),
            MutatorConfig::for_game_mode(GameMode::Soccar),
            0,
        );
        let a = state.push_car(Team::Blue, CarConfig::OCTANE);
        let b = state.push_car(Team::Orange, CarConfig::OCTANE);
        assert!(state.remove_car(b));
        let c = state.push_car(Team::Orange, CarConfig::OCTANE);
        assert_eq!((a, b, c), (1, 2, 3));
        assert!(state.car(2).is_none());
        assert!(!state.remove_car(2));
    }
}
