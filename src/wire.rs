//! Binary game-state codec for remote visualizers
//!
//! Little-endian, no padding. Layout:
//! - header (21 bytes): u64 tick_count, f32 tick_rate, u8 game_mode,
//!   u32 num_pads, u32 num_cars
//! - ball (109 bytes): pos, rot, vel, ang_vel, heatseeker info, last hit id,
//!   dropshot charge
//! - pads (18 bytes each): active, cooldown, pos, is_big
//! - cars (316 bytes each): id, team, full state, config
//! - Dropshot only: one tile state byte per floor tile, blue half first
//!
//! Only the codec lives here; sockets are the caller's business.

use crate::arena::Arena;
use crate::consts::DROPSHOT_NUM_TILES;
use crate::error::WireError;
use crate::math::{RotMat, Vec3};
use crate::sim::{
    BallHitInfo, BallState, BoostPad, BoostPadConfig, BoostPadState, CarConfig, CarContact,
    CarControls, CarState, DropshotInfo, GameMode, HeatseekerInfo, Team, TileState,
    WheelPairConfig, WorldContact,
};

pub const HEADER_LEN: usize = 8 + 4 + 1 + 4 + 4;
pub const BALL_LEN: usize = VEC_LEN + ROT_LEN + 2 * VEC_LEN + 3 * 4 + 4 + DROPSHOT_INFO_LEN;
pub const PAD_LEN: usize = 1 + 4 + VEC_LEN + 1;
pub const CAR_LEN: usize = 4 + 1 + CAR_STATE_LEN + CAR_CONFIG_LEN;

const VEC_LEN: usize = 12;
const ROT_LEN: usize = 3 * VEC_LEN;
const DROPSHOT_INFO_LEN: usize = 4 + 4 + 4 + 1 + 8;
const BALL_HIT_LEN: usize = 1 + 3 * VEC_LEN + 2 * 8;
const CONTROLS_LEN: usize = 5 * 4 + 3;
const CAR_STATE_LEN: usize = VEC_LEN + ROT_LEN + 2 * VEC_LEN // physics
    + 1 + 4 + 3 // ground, wheels, jump flags
    + VEC_LEN + 2 * 4 + 2 + 2 * 4 // flip and jump timing
    + 2 * 4 + 1 + 4 // boost
    + 1 + 4 + 4 // supersonic, handbrake
    + 1 + 2 * 4 // auto flip
    + 1 + VEC_LEN + 4 + 4 // world and car contact
    + 1 + 4 // demo
    + BALL_HIT_LEN
    + CONTROLS_LEN;
const CAR_CONFIG_LEN: usize = 2 * VEC_LEN + 2 * (2 * 4 + VEC_LEN) + 4;

/// Packet tags on the visualizer socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UdpPacketType {
    Quit = 0,
    GameState = 1,
    Connection = 2,
    Paused = 3,
    Speed = 4,
    Render = 5,
}

impl UdpPacketType {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Quit),
            1 => Some(Self::GameState),
            2 => Some(Self::Connection),
            3 => Some(Self::Paused),
            4 => Some(Self::Speed),
            5 => Some(Self::Render),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WireCar {
    pub id: u32,
    pub team: Team,
    pub state: CarState,
    pub config: CarConfig,
}

/// Everything a visualizer needs to draw one tick
#[derive(Debug, Clone, PartialEq)]
pub struct WireGameState {
    pub tick_count: u64,
    pub tick_rate: f32,
    pub game_mode: GameMode,
    pub ball: BallState,
    pub pads: Vec<BoostPad>,
    pub cars: Vec<WireCar>,
    /// Empty unless the mode is Dropshot
    pub dropshot_tiles: Vec<TileState>,
}

fn tiles_len(game_mode: Option<GameMode>) -> usize {
    match game_mode {
        Some(GameMode::Dropshot) => DROPSHOT_NUM_TILES,
        _ => 0,
    }
}

impl WireGameState {
    pub fn from_arena(arena: &Arena) -> Self {
        Self {
            tick_count: arena.tick_count(),
            tick_rate: arena.tick_rate(),
            game_mode: arena.game_mode(),
            ball: *arena.ball(),
            pads: arena.boost_pads().to_vec(),
            cars: arena
                .cars()
                .iter()
                .map(|car| WireCar {
                    id: car.id(),
                    team: car.team(),
                    state: *car.state(),
                    config: *car.config(),
                })
                .collect(),
            dropshot_tiles: arena.dropshot_tiles().to_vec(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(
            HEADER_LEN
                + BALL_LEN
                + self.pads.len() * PAD_LEN
                + self.cars.len() * CAR_LEN
                + self.dropshot_tiles.len(),
        );
        w.u64(self.tick_count);
        w.f32(self.tick_rate);
        w.u8(self.game_mode.as_u8());
        w.u32(self.pads.len() as u32);
        w.u32(self.cars.len() as u32);

        write_ball(&mut w, &self.ball);
        for pad in &self.pads {
            w.bool(pad.state.is_active);
            w.f32(pad.state.cooldown);
            w.vec(pad.config.pos);
            w.bool(pad.config.is_big);
        }
        for car in &self.cars {
            w.u32(car.id);
            w.u8(car.team.as_u8());
            write_car_state(&mut w, &car.state);
            write_car_config(&mut w, &car.config);
        }
        // Fixed count per mode, so a short list is padded with intact tiles
        let tiles = self.dropshot_tiles.iter().copied().chain(std::iter::repeat(TileState::Full));
        for tile in tiles.take(tiles_len(Some(self.game_mode))) {
            w.u8(tile.as_u8());
        }
        w.0
    }

    /// Total message size announced by a header
    pub fn encoded_len(header: &[u8]) -> Result<usize, WireError> {
        let mut r = ByteReader::new(header);
        r.skip(8 + 4)?;
        let game_mode = GameMode::from_u8(r.u8()?);
        let num_pads = r.u32()? as usize;
        let num_cars = r.u32()? as usize;
        Ok(HEADER_LEN
            + BALL_LEN
            + num_pads * PAD_LEN
            + num_cars * CAR_LEN
            + tiles_len(game_mode))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let needed = Self::encoded_len(bytes)?;
        if bytes.len() < needed {
            return Err(WireError::Truncated {
                needed,
                available: bytes.len(),
            });
        }

        let mut r = ByteReader::new(bytes);
        let tick_count = r.u64()?;
        let tick_rate = r.f32()?;
        let mode_tag = r.u8()?;
        let game_mode = GameMode::from_u8(mode_tag).ok_or(WireError::InvalidGameMode(mode_tag))?;
        let num_pads = r.u32()?;
        let num_cars = r.u32()?;

        let ball = read_ball(&mut r)?;
        let pads = (0..num_pads)
            .map(|_| {
                let is_active = r.bool()?;
                let cooldown = r.f32()?;
                let pos = r.vec()?;
                let is_big = r.bool()?;
                Ok(BoostPad {
                    config: BoostPadConfig { pos, is_big },
                    state: BoostPadState {
                        is_active,
                        cooldown,
                    },
                })
            })
            .collect::<Result<Vec<_>, WireError>>()?;
        let cars = (0..num_cars)
            .map(|_| {
                let id = r.u32()?;
                let team_tag = r.u8()?;
                let team = Team::from_u8(team_tag).ok_or(WireError::InvalidTeam(team_tag))?;
                let state = read_car_state(&mut r)?;
                let config = read_car_config(&mut r)?;
                Ok(WireCar {
                    id,
                    team,
                    state,
                    config,
                })
            })
            .collect::<Result<Vec<_>, WireError>>()?;
        let dropshot_tiles = (0..tiles_len(Some(game_mode)))
            .map(|_| {
                let tag = r.u8()?;
                TileState::from_u8(tag).ok_or(WireError::InvalidTileState(tag))
            })
            .collect::<Result<Vec<_>, WireError>>()?;

        Ok(Self {
            tick_count,
            tick_rate,
            game_mode,
            ball,
            pads,
            cars,
            dropshot_tiles,
        })
    }
}

struct ByteWriter(Vec<u8>);

impl ByteWriter {
    fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    fn u8(&mut self, v: u8) {
        self.0.push(v);
    }

    fn bool(&mut self, v: bool) {
        self.0.push(u8::from(v));
    }

    fn u32(&mut self, v: u32) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    fn vec(&mut self, v: Vec3) {
        for c in v.to_array() {
            self.f32(c);
        }
    }

    fn rot(&mut self, m: &RotMat) {
        self.vec(m.forward);
        self.vec(m.right);
        self.vec(m.up);
    }
}

struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let bytes = self
            .buf
            .get(self.pos..self.pos + N)
            .ok_or(WireError::Truncated {
                needed: self.pos + N,
                available: self.buf.len(),
            })?;
        self.pos += N;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn skip(&mut self, n: usize) -> Result<(), WireError> {
        if self.pos + n > self.buf.len() {
            return Err(WireError::Truncated {
                needed: self.pos + n,
                available: self.buf.len(),
            });
        }
        self.pos += n;
        Ok(())
    }

    fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take::<1>()?[0])
    }

    fn bool(&mut self) -> Result<bool, WireError> {
        Ok(self.u8()? != 0)
    }

    fn u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn u64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    fn f32(&mut self) -> Result<f32, WireError> {
        Ok(f32::from_le_bytes(self.take()?))
    }

    fn vec(&mut self) -> Result<Vec3, WireError> {
        Ok(Vec3::new(self.f32()?, self.f32()?, self.f32()?))
    }

    fn rot(&mut self) -> Result<RotMat, WireError> {
        Ok(RotMat::new(self.vec()?, self.vec()?, self.vec()?))
    }
}

fn write_ball(w: &mut ByteWriter, ball: &BallState) {
    w.vec(ball.pos);
    w.rot(&ball.rot_mat);
    w.vec(ball.vel);
    w.vec(ball.ang_vel);
    w.f32(ball.hs_info.y_target_dir);
    w.f32(ball.hs_info.cur_target_speed);
    w.f32(ball.hs_info.time_since_hit);
    w.u32(ball.last_hit_car_id);
    let ds = &ball.ds_info;
    w.u32(ds.charge_level as u32);
    w.f32(ds.accumulated_hit_force);
    w.f32(ds.y_target_dir);
    w.bool(ds.has_damaged);
    w.u64(ds.last_damage_tick);
}

fn read_ball(r: &mut ByteReader) -> Result<BallState, WireError> {
    Ok(BallState {
        pos: r.vec()?,
        rot_mat: r.rot()?,
        vel: r.vec()?,
        ang_vel: r.vec()?,
        hs_info: HeatseekerInfo {
            y_target_dir: r.f32()?,
            cur_target_speed: r.f32()?,
            time_since_hit: r.f32()?,
        },
        last_hit_car_id: r.u32()?,
        ds_info: DropshotInfo {
            charge_level: r.u32()? as i32,
            accumulated_hit_force: r.f32()?,
            y_target_dir: r.f32()?,
            has_damaged: r.bool()?,
            last_damage_tick: r.u64()?,
        },
    })
}

fn write_car_state(w: &mut ByteWriter, s: &CarState) {
    w.vec(s.pos);
    w.rot(&s.rot_mat);
    w.vec(s.vel);
    w.vec(s.ang_vel);
    w.bool(s.is_on_ground);
    for contact in s.wheels_with_contact {
        w.bool(contact);
    }
    w.bool(s.has_jumped);
    w.bool(s.has_double_jumped);
    w.bool(s.has_flipped);
    w.vec(s.flip_rel_torque);
    w.f32(s.jump_time);
    w.f32(s.flip_time);
    w.bool(s.is_flipping);
    w.bool(s.is_jumping);
    w.f32(s.air_time);
    w.f32(s.air_time_since_jump);
    w.f32(s.boost);
    w.f32(s.time_since_boosted);
    w.bool(s.is_boosting);
    w.f32(s.boosting_time);
    w.bool(s.is_supersonic);
    w.f32(s.supersonic_time);
    w.f32(s.handbrake_val);
    w.bool(s.is_auto_flipping);
    w.f32(s.auto_flip_timer);
    w.f32(s.auto_flip_torque_scale);
    w.bool(s.world_contact.has_contact);
    w.vec(s.world_contact.contact_normal);
    w.u32(s.car_contact.other_car_id);
    w.f32(s.car_contact.cooldown_timer);
    w.bool(s.is_demoed);
    w.f32(s.demo_respawn_timer);

    let hit = &s.ball_hit_info;
    w.bool(hit.is_valid);
    w.vec(hit.relative_pos_on_ball);
    w.vec(hit.ball_pos);
    w.vec(hit.extra_hit_vel);
    w.u64(hit.tick_count_when_hit);
    w.u64(hit.tick_count_when_extra_impulse_applied);

    let c = &s.last_controls;
    for axis in [c.throttle, c.steer, c.pitch, c.yaw, c.roll] {
        w.f32(axis);
    }
    w.bool(c.boost);
    w.bool(c.jump);
    w.bool(c.handbrake);
}

fn read_car_state(r: &mut ByteReader) -> Result<CarState, WireError> {
    Ok(CarState {
        pos: r.vec()?,
        rot_mat: r.rot()?,
        vel: r.vec()?,
        ang_vel: r.vec()?,
        is_on_ground: r.bool()?,
        wheels_with_contact: [r.bool()?, r.bool()?, r.bool()?, r.bool()?],
        has_jumped: r.bool()?,
        has_double_jumped: r.bool()?,
        has_flipped: r.bool()?,
        flip_rel_torque: r.vec()?,
        jump_time: r.f32()?,
        flip_time: r.f32()?,
        is_flipping: r.bool()?,
        is_jumping: r.bool()?,
        air_time: r.f32()?,
        air_time_since_jump: r.f32()?,
        boost: r.f32()?,
        time_since_boosted: r.f32()?,
        is_boosting: r.bool()?,
        boosting_time: r.f32()?,
        is_supersonic: r.bool()?,
        supersonic_time: r.f32()?,
        handbrake_val: r.f32()?,
        is_auto_flipping: r.bool()?,
        auto_flip_timer: r.f32()?,
        auto_flip_torque_scale: r.f32()?,
        world_contact: WorldContact {
            has_contact: r.bool()?,
            contact_normal: r.vec()?,
        },
        car_contact: CarContact {
            other_car_id: r.u32()?,
            cooldown_timer: r.f32()?,
        },
        is_demoed: r.bool()?,
        demo_respawn_timer: r.f32()?,
        ball_hit_info: BallHitInfo {
            is_valid: r.bool()?,
            relative_pos_on_ball: r.vec()?,
            ball_pos: r.vec()?,
            extra_hit_vel: r.vec()?,
            tick_count_when_hit: r.u64()?,
            tick_count_when_extra_impulse_applied: r.u64()?,
        },
        last_controls: CarControls {
            throttle: r.f32()?,
            steer: r.f32()?,
            pitch: r.f32()?,
            yaw: r.f32()?,
            roll: r.f32()?,
            boost: r.bool()?,
            jump: r.bool()?,
            handbrake: r.bool()?,
        },
    })
}

fn write_car_config(w: &mut ByteWriter, c: &CarConfig) {
    w.vec(c.hitbox_size);
    w.vec(c.hitbox_pos_offset);
    for wheels in [&c.front_wheels, &c.back_wheels] {
        w.f32(wheels.wheel_radius);
        w.f32(wheels.suspension_rest_length);
        w.vec(wheels.connection_point_offset);
    }
    w.f32(c.dodge_deadzone);
}

fn read_wheels(r: &mut ByteReader) -> Result<WheelPairConfig, WireError> {
    Ok(WheelPairConfig {
        wheel_radius: r.f32()?,
        suspension_rest_length: r.f32()?,
        connection_point_offset: r.vec()?,
    })
}

fn read_car_config(r: &mut ByteReader) -> Result<CarConfig, WireError> {
    Ok(CarConfig {
        hitbox_size: r.vec()?,
        hitbox_pos_offset: r.vec()?,
        front_wheels: read_wheels(r)?,
        back_wheels: read_wheels(r)?,
        dodge_deadzone: r.f32()?,
    })
}
