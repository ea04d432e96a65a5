use std::sync::{Arc, Mutex};

use arena_sim::arena::EventCallback;
use arena_sim::consts::*;
use arena_sim::error::BoxError;
use arena_sim::sim::dropshot::tile_pos;
use arena_sim::{
    Angle, Arena, ArenaConfig, BallState, CarConfig, CarState, DropshotInfo, GameMode, Team,
    TileState, Vec3,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Arena with a goal callback that records every scoring team
fn recording_arena(mode: GameMode) -> (Arena, Arc<Mutex<Vec<Team>>>) {
    init_logging();
    let mut arena = Arena::new(mode, 120.0, ArenaConfig::default()).unwrap();
    let goals: Arc<Mutex<Vec<Team>>> = Arc::default();
    let log = Arc::clone(&goals);
    arena
        .set_goal_scored_callback(Some(EventCallback::goal_scored(
            move |_: &mut Arena, team, _| -> Result<(), BoxError> {
                log.lock().unwrap().push(team);
                Ok(())
            },
            None,
        )))
        .unwrap();
    (arena, goals)
}

fn drop_ball(arena: &mut Arena, x: f32, y: f32, z: f32) {
    arena.set_ball(BallState {
        pos: Vec3::new(x, y, z),
        ..Default::default()
    });
}

#[test]
fn hoops_ball_dropped_through_rim_scores() {
    let (mut arena, goals) = recording_arena(GameMode::Hoops);
    drop_ball(&mut arena, 0.0, HOOPS_NET_CENTER_Y, 800.0);
    arena.step(300).unwrap();

    assert_eq!(*goals.lock().unwrap(), vec![Team::Blue]);
    assert_eq!((arena.blue_score(), arena.orange_score()), (1, 0));
    assert!(arena.is_ball_scored());
    // Caught by the net, not the arena floor
    assert!(arena.ball().pos.z > HOOPS_NET_FLOOR_Z);
}

#[test]
fn hoops_ball_resting_under_hoop_does_not_score() {
    let (mut arena, goals) = recording_arena(GameMode::Hoops);
    let rest_z = arena.mutator_config().ball_rest_z();
    drop_ball(&mut arena, 0.0, HOOPS_NET_CENTER_Y, rest_z);
    arena.step(240).unwrap();

    assert!(goals.lock().unwrap().is_empty());
    assert!(!arena.is_ball_scored());
    assert_eq!((arena.blue_score(), arena.orange_score()), (0, 0));
}

#[test]
fn hoops_ball_outside_rim_does_not_score() {
    let (mut arena, goals) = recording_arena(GameMode::Hoops);
    let beside = HOOPS_NET_CENTER_Y - HOOPS_NET_RADIUS - 250.0;
    drop_ball(&mut arena, 0.0, -beside, 800.0);
    assert_eq!(arena.is_ball_probably_going_in(3.0, 0.0), None);
    arena.step(360).unwrap();

    assert!(goals.lock().unwrap().is_empty());
    assert!(!arena.is_ball_scored());
}

#[test]
fn dropshot_ball_over_broken_tile_scores() {
    let (mut arena, goals) = recording_arena(GameMode::Dropshot);
    let hole = DROPSHOT_TILES_PER_TEAM + 20;
    let mut tiles = arena.dropshot_tiles().to_vec();
    tiles[hole] = TileState::Broken;
    arena.set_dropshot_tiles(tiles).unwrap();

    let over = tile_pos(hole);
    drop_ball(&mut arena, over.x, over.y, 300.0);
    assert_eq!(arena.is_ball_probably_going_in(3.0, 0.0), Some(Team::Blue));
    arena.step(240).unwrap();

    // Falling through the orange half is a goal for blue
    assert_eq!(*goals.lock().unwrap(), vec![Team::Blue]);
    assert!(arena.ball().pos.z < 0.0);
    assert!(arena.is_ball_scored());
}

#[test]
fn dropshot_ball_over_intact_floor_does_not_score() {
    let (mut arena, goals) = recording_arena(GameMode::Dropshot);
    let mut tiles = arena.dropshot_tiles().to_vec();
    // Damaged tiles still hold the ball
    tiles[20] = TileState::Damaged;
    arena.set_dropshot_tiles(tiles).unwrap();

    let over = tile_pos(20);
    drop_ball(&mut arena, over.x, over.y, 300.0);
    assert_eq!(arena.is_ball_probably_going_in(3.0, 0.0), None);
    arena.step(240).unwrap();

    assert!(goals.lock().unwrap().is_empty());
    assert!(!arena.is_ball_scored());
    assert!(arena.ball().pos.z > FLOOR_HEIGHT_DROPSHOT);
}

#[test]
fn dropshot_charged_ball_cracks_tiles_on_landing() {
    let (mut arena, _) = recording_arena(GameMode::Dropshot);
    let target = DROPSHOT_TILES_PER_TEAM + 20;
    let over = tile_pos(target);
    arena.set_ball(BallState {
        pos: Vec3::new(over.x, over.y, 400.0),
        ds_info: DropshotInfo {
            charge_level: 2,
            accumulated_hit_force: 3000.0,
            y_target_dir: 1.0,
            ..Default::default()
        },
        ..Default::default()
    });
    arena.step(120).unwrap();

    // The tile under the ball and its six neighbours
    let tiles = arena.dropshot_tiles();
    assert_eq!(tiles[target], TileState::Damaged);
    assert_eq!(tiles.iter().filter(|t| **t == TileState::Damaged).count(), 7);
    assert!(tiles[..DROPSHOT_TILES_PER_TEAM].iter().all(|t| *t == TileState::Full));
    let info = arena.ball().ds_info;
    assert!(info.has_damaged);
    assert_eq!(info.charge_level, 1);
    assert_eq!(arena.blue_score(), 0);
}

#[test]
fn dropshot_car_hit_charges_ball_toward_opponent() {
    let (mut arena, _) = recording_arena(GameMode::Dropshot);
    let id = arena.add_car(Team::Blue, CarConfig::OCTANE);
    let rest_z = arena.mutator_config().ball_rest_z();
    drop_ball(&mut arena, 0.0, -2000.0, FLOOR_HEIGHT_DROPSHOT + rest_z);
    arena.set_car_state(id, CarState {
        pos: Vec3::new(-400.0, -2000.0, 17.0 + FLOOR_HEIGHT_DROPSHOT),
        rot_mat: Angle::new(0.0, 0.0, 0.0).to_rot_mat(),
        vel: Vec3::new(1500.0, 0.0, 0.0),
        ..Default::default()
    });
    arena.step(60).unwrap();

    assert_eq!(arena.car_stats(id).ball_touches, 1);
    let info = arena.ball().ds_info;
    assert_eq!(info.y_target_dir, 1.0);
    assert!(info.accumulated_hit_force >= DROPSHOT_MIN_CHARGE_HIT_SPEED);
    // Landing on its own half leaves blue's floor alone
    assert!(arena.dropshot_tiles().iter().all(|t| *t == TileState::Full));
}
