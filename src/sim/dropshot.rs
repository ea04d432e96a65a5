//! Dropshot floor tiles
//!
//! Each half of the floor is a hexagonal grid of tiles. Hits charge the ball;
//! when a charged ball lands on the half it was sent toward, the tile under it
//! and every tile within the charge radius crack one step. A broken tile is a
//! hole the ball falls through, which is how goals are scored.

use glam::Vec3A;
use serde::{Deserialize, Serialize};

use super::state::{BallState, DropshotInfo, GameMode, Team};
use crate::consts::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum TileState {
    #[default]
    Full,
    Damaged,
    Broken,
}

impl TileState {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(TileState::Full),
            1 => Some(TileState::Damaged),
            2 => Some(TileState::Broken),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    fn cracked(self) -> Self {
        match self {
            TileState::Full => TileState::Damaged,
            TileState::Damaged | TileState::Broken => TileState::Broken,
        }
    }
}

/// Fresh tile set for a mode; empty unless the mode is Dropshot
pub fn initial_tiles(game_mode: GameMode) -> Vec<TileState> {
    match game_mode {
        GameMode::Dropshot => vec![TileState::Full; DROPSHOT_NUM_TILES],
        _ => Vec::new(),
    }
}

/// Team whose half a tile index lies on; blue tiles come first
pub fn tile_team(index: usize) -> Team {
    if index < DROPSHOT_TILES_PER_TEAM { Team::Blue } else { Team::Orange }
}

/// Center of a tile on the floor
///
/// Rows run outward from midfield, the first holding 13 tiles and each later
/// row one fewer, so neighbouring rows sit half a tile apart.
pub fn tile_pos(index: usize) -> Vec3A {
    let team = tile_team(index);
    let mut local = index % DROPSHOT_TILES_PER_TEAM;
    let mut row = 0;
    let mut row_len = DROPSHOT_TILES_IN_FIRST_ROW;
    while local >= row_len && row + 1 < DROPSHOT_TILE_ROWS {
        local -= row_len;
        row += 1;
        row_len -= 1;
    }

    let x = (local as f32 - (row_len - 1) as f32 * 0.5) * DROPSHOT_TILE_SPACING;
    let y = team.side_sign() * DROPSHOT_TILE_ROW_SPACING * (row as f32 + 0.5);
    Vec3A::new(x, y, FLOOR_HEIGHT_DROPSHOT)
}

/// Tile under a horizontal position, if any
///
/// The hexagons tile the plane, so the cell holding a point is the one with the
/// nearest center.
pub fn tile_index_at(pos: Vec3A) -> Option<usize> {
    if pos.y == 0.0 {
        return None;
    }
    let team = if pos.y < 0.0 { Team::Blue } else { Team::Orange };
    let first = team.as_u8() as usize * DROPSHOT_TILES_PER_TEAM;
    let flat = Vec3A::new(pos.x, pos.y, FLOOR_HEIGHT_DROPSHOT);

    (first..first + DROPSHOT_TILES_PER_TEAM)
        .map(|index| (index, tile_pos(index).distance_squared(flat)))
        .filter(|&(_, dist_sq)| dist_sq <= DROPSHOT_TILE_RADIUS * DROPSHOT_TILE_RADIUS)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

/// Whether the floor under a ball center is missing
///
/// Always false with no tiles. Once the ball has sunk below the floor it
/// stays open, so the ball cannot be snapped back up through the edge of a hole.
pub fn floor_is_open(tiles: &[TileState], pos: Vec3A) -> bool {
    if tiles.is_empty() {
        return false;
    }
    if pos.z < FLOOR_HEIGHT_DROPSHOT {
        return true;
    }
    tile_index_at(pos).is_some_and(|index| tiles.get(index) == Some(&TileState::Broken))
}

/// Charge the ball from a car hit with the given relative speed
pub(crate) fn on_charging_hit(info: &mut DropshotInfo, team: Team, rel_speed: f32) {
    if rel_speed < DROPSHOT_MIN_CHARGE_HIT_SPEED {
        return;
    }

    info.y_target_dir = team.opponent().side_sign();
    info.accumulated_hit_force += rel_speed;
    info.charge_level = if info.accumulated_hit_force >= DROPSHOT_CHARGE_LEVEL_3_FORCE {
        3
    } else if info.accumulated_hit_force >= DROPSHOT_CHARGE_LEVEL_2_FORCE {
        2
    } else {
        1
    };
    info.has_damaged = false;
}

/// Crack tiles under a ball that just landed; returns how many changed
pub(crate) fn on_floor_impact(
    ball: &mut BallState,
    tiles: &mut [TileState],
    tick_count: u64,
    tick_time: f32,
) -> usize {
    let info = &mut ball.ds_info;
    if tiles.len() != DROPSHOT_NUM_TILES || info.has_damaged || info.y_target_dir == 0.0 {
        return 0;
    }
    let pos = Vec3A::from(ball.pos);
    if pos.y * info.y_target_dir <= 0.0 {
        return 0;
    }
    let since_last = tick_count.saturating_sub(info.last_damage_tick) as f32 * tick_time;
    if info.last_damage_tick != 0 && since_last < DROPSHOT_MIN_DAMAGE_INTERVAL {
        return 0;
    }

    let Some(center) = tile_index_at(pos) else {
        return 0;
    };
    if tiles[center] == TileState::Broken {
        return 0;
    }

    let reach = (info.charge_level - 1).max(0) as f32 * DROPSHOT_TILE_SPACING + 1.0;
    let center_pos = tile_pos(center);
    let team = tile_team(center);
    let mut changed = 0;
    for (index, tile) in tiles.iter_mut().enumerate() {
        if tile_team(index) != team || *tile == TileState::Broken {
            continue;
        }
        if tile_pos(index).distance(center_pos) <= reach {
            *tile = tile.cracked();
            changed += 1;
        }
    }

    log::debug!(
        "Ball at charge {} cracked {} tiles around tile {} at tick {}",
        info.charge_level,
        changed,
        center,
        tick_count
    );
    info.has_damaged = true;
    info.charge_level = 1;
    info.accumulated_hit_force = 0.0;
    info.last_damage_tick = tick_count;
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    fn charged_ball(pos: Vec3, level_force: f32, team: Team) -> BallState {
        let mut ball = BallState {
            pos,
            ..Default::default()
        };
        on_charging_hit(&mut ball.ds_info, team, level_force);
        ball
    }

    #[test]
    fn test_tile_layout() {
        let first = Vec3A::new(
            -6.0 * DROPSHOT_TILE_SPACING,
            -DROPSHOT_TILE_ROW_SPACING * 0.5,
            FLOOR_HEIGHT_DROPSHOT,
        );
        assert_eq!(tile_pos(0), first);
        // Last tile of each half is the outer end of the seven-tile row
        let last_blue = tile_pos(DROPSHOT_TILES_PER_TEAM - 1);
        assert!((last_blue.x - 3.0 * DROPSHOT_TILE_SPACING).abs() < 1e-3);
        assert!((last_blue.y + DROPSHOT_TILE_ROW_SPACING * 6.5).abs() < 1e-2);

        for index in 0..DROPSHOT_NUM_TILES {
            let pos = tile_pos(index);
            assert_eq!(tile_index_at(pos), Some(index));
            assert_eq!(pos.y > 0.0, tile_team(index) == Team::Orange);
            // Every tile lies inside the side walls and corner cuts
            assert!(pos.x.abs() < ARENA_EXTENT_X_DROPSHOT);
            assert!(
                pos.x.abs() + pos.y.abs()
                    < ARENA_EXTENT_X_DROPSHOT + ARENA_EXTENT_Y_DROPSHOT - ARENA_CORNER_CUT_DROPSHOT
            );
        }
        assert_eq!(tile_index_at(Vec3A::new(0.0, 0.0, 100.0)), None);
        assert_eq!(tile_index_at(Vec3A::new(0.0, 4900.0, 100.0)), None);
    }

    #[test]
    fn test_charge_levels() {
        let mut info = DropshotInfo::default();
        on_charging_hit(&mut info, Team::Blue, 400.0);
        assert_eq!(info, DropshotInfo::default());

        on_charging_hit(&mut info, Team::Blue, 1500.0);
        assert_eq!(info.charge_level, 1);
        assert_eq!(info.y_target_dir, 1.0);
        on_charging_hit(&mut info, Team::Blue, 1500.0);
        assert_eq!(info.charge_level, 2);
        for _ in 0..3 {
            on_charging_hit(&mut info, Team::Orange, 3000.0);
        }
        assert_eq!(info.charge_level, 3);
        assert_eq!(info.y_target_dir, -1.0);
    }

    #[test]
    fn test_impact_cracks_then_breaks() {
        let mut tiles = initial_tiles(GameMode::Dropshot);
        let target = tile_pos(DROPSHOT_TILES_PER_TEAM + 20);
        let landing = Vec3::new(target.x, target.y, 100.0);

        let mut ball = charged_ball(landing, 600.0, Team::Blue);
        assert_eq!(on_floor_impact(&mut ball, &mut tiles, 100, 1.0 / 120.0), 1);
        assert_eq!(tiles[DROPSHOT_TILES_PER_TEAM + 20], TileState::Damaged);
        // No second crack until the ball is hit again
        assert_eq!(on_floor_impact(&mut ball, &mut tiles, 200, 1.0 / 120.0), 0);

        on_charging_hit(&mut ball.ds_info, Team::Blue, 600.0);
        assert_eq!(on_floor_impact(&mut ball, &mut tiles, 300, 1.0 / 120.0), 1);
        assert_eq!(tiles[DROPSHOT_TILES_PER_TEAM + 20], TileState::Broken);
        assert!(floor_is_open(&tiles, Vec3A::from(landing)));
        assert!(!floor_is_open(&tiles, Vec3A::new(0.0, -1000.0, 100.0)));
        assert!(!floor_is_open(&[], Vec3A::from(landing)));
    }

    #[test]
    fn test_impact_only_on_attacked_half() {
        let mut tiles = initial_tiles(GameMode::Dropshot);
        let own = tile_pos(20);
        let mut ball = charged_ball(Vec3::new(own.x, own.y, 100.0), 600.0, Team::Blue);
        assert_eq!(on_floor_impact(&mut ball, &mut tiles, 100, 1.0 / 120.0), 0);
        assert!(tiles.iter().all(|t| *t == TileState::Full));
    }

    #[test]
    fn test_full_charge_cracks_two_rings() {
        let mut tiles = initial_tiles(GameMode::Dropshot);
        // Middle of the third row, away from the edges
        let center = DROPSHOT_TILES_PER_TEAM + 13 + 12 + 5;
        let target = tile_pos(center);
        let mut ball = charged_ball(Vec3::new(target.x, target.y, 100.0), 0.0, Team::Blue);
        for _ in 0..3 {
            on_charging_hit(&mut ball.ds_info, Team::Blue, 4600.0);
        }
        assert_eq!(ball.ds_info.charge_level, 3);

        // One tile, six neighbours and twelve in the second ring
        assert_eq!(on_floor_impact(&mut ball, &mut tiles, 10, 1.0 / 120.0), 19);
        assert_eq!(ball.ds_info.charge_level, 1);
        assert!(ball.ds_info.has_damaged);
        assert!(tiles[..DROPSHOT_TILES_PER_TEAM].iter().all(|t| *t == TileState::Full));
    }
}
