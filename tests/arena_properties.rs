use std::any::Any;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use arena_sim::arena::EventCallback;
use arena_sim::error::BoxError;
use arena_sim::{
    Angle, Arena, ArenaConfig, ArenaError, BallState, BoostPadState, CarConfig, CarControls,
    CarState, GameMode, MemWeightMode, SharedArena, Team, Vec3, multi_step, multi_step_dyn,
};
use proptest::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn arena_with(mode: GameMode, config: ArenaConfig) -> Arena {
    Arena::new(mode, 120.0, config).unwrap()
}

fn kickoff_arena(mode: GameMode, seed: u64) -> Arena {
    let mut arena = arena_with(mode, ArenaConfig {
        rng_seed: seed,
        ..Default::default()
    });
    arena.add_car(Team::Blue, CarConfig::OCTANE);
    arena.add_car(Team::Orange, CarConfig::DOMINUS);
    arena.reset_to_random_kickoff(Some(seed));
    arena
}

fn place(arena: &mut Arena, id: u32, pos: Vec3, vel: Vec3) {
    arena.set_car_state(id, CarState {
        pos,
        rot_mat: Angle::new(0.0, 0.0, 0.0).to_rot_mat(),
        vel,
        ..Default::default()
    });
}

fn goal_mode() -> impl Strategy<Value = GameMode> {
    prop_oneof![
        Just(GameMode::Soccar),
        Just(GameMode::Hoops),
        Just(GameMode::Heatseeker),
        Just(GameMode::Snowday),
    ]
}

fn controls() -> impl Strategy<Value = CarControls> {
    (
        -1.0f32..=1.0,
        -1.0f32..=1.0,
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(throttle, steer, boost, jump)| CarControls {
            throttle,
            steer,
            boost,
            jump,
            ..Default::default()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_step_advances_tick_count(mode in goal_mode(), seed in any::<u64>(), ticks in 0u32..200) {
        init_logging();
        let mut arena = kickoff_arena(mode, seed);
        let before = arena.tick_count();
        arena.step(ticks).unwrap();
        prop_assert_eq!(arena.tick_count(), before + ticks as u64);
    }

    #[test]
    fn prop_seeded_kickoff_is_reproducible(mode in goal_mode(), seed in any::<u64>()) {
        let a = kickoff_arena(mode, seed);
        let b = kickoff_arena(mode, seed);
        prop_assert_eq!(a.state(), b.state());
    }

    #[test]
    fn prop_clone_steps_identically(seed in any::<u64>(), input in controls(), ticks in 1u32..150) {
        let mut original = kickoff_arena(GameMode::Soccar, seed);
        let ids = original.car_ids();
        original.set_car_controls(ids[0], input);

        let mut copy = original.clone_arena(false);
        prop_assert_eq!(copy.state(), original.state());
        original.step(ticks).unwrap();
        copy.step(ticks).unwrap();
        prop_assert_eq!(copy.state(), original.state());
    }

    #[test]
    fn prop_clone_is_independent(seed in any::<u64>(), ticks in 1u32..60) {
        let original = kickoff_arena(GameMode::Soccar, seed);
        let snapshot = original.state().clone();
        let mut copy = original.clone_arena(true);
        copy.step(ticks).unwrap();
        copy.remove_all_cars();
        prop_assert_eq!(original.state(), &snapshot);
    }

    #[test]
    fn prop_light_and_heavy_agree(seed in any::<u64>(), input in controls()) {
        let build = |mode| {
            let mut arena = arena_with(GameMode::Soccar, ArenaConfig {
                mem_weight_mode: mode,
                rng_seed: seed,
                ..Default::default()
            });
            let id = arena.add_car(Team::Blue, CarConfig::OCTANE);
            arena.reset_to_random_kickoff(Some(seed));
            arena.set_car_controls(id, input);
            arena.step(240).unwrap();
            arena
        };
        let heavy = build(MemWeightMode::Heavy);
        let light = build(MemWeightMode::Light);
        prop_assert_eq!(heavy.state(), light.state());
    }

    #[test]
    fn prop_multi_step_matches_step(seeds in prop::collection::vec(any::<u64>(), 1..5), ticks in 1u32..90) {
        let batch: Vec<SharedArena> = seeds
            .iter()
            .map(|&s| Arc::new(Mutex::new(kickoff_arena(GameMode::Soccar, s))))
            .collect();
        multi_step(&batch, ticks).unwrap();

        for (&seed, shared) in seeds.iter().zip(&batch) {
            let mut solo = kickoff_arena(GameMode::Soccar, seed);
            solo.step(ticks).unwrap();
            let stepped = shared.lock().unwrap();
            prop_assert_eq!(stepped.state(), solo.state());
        }
    }

    #[test]
    fn prop_falling_ball_never_gains_height(x in -2500.0f32..2500.0, y in -3000.0f32..3000.0, z in 300.0f32..1500.0) {
        let mut arena = arena_with(GameMode::Soccar, ArenaConfig::default());
        arena.set_ball(BallState {
            pos: Vec3::new(x, y, z),
            ..Default::default()
        });
        let mut last_z = z;
        for _ in 0..60 {
            arena.step(1).unwrap();
            let ball = arena.ball();
            prop_assert!(ball.pos.z <= last_z + 1e-3);
            last_z = ball.pos.z;
        }
    }

    #[test]
    fn prop_disabled_car_ball_collision_leaves_ball(speed in 800.0f32..2000.0) {
        let mut arena = arena_with(GameMode::Soccar, ArenaConfig::default());
        let mut mutator = *arena.mutator_config();
        mutator.enable_car_ball_collision = false;
        arena.set_mutator_config(mutator);
        let id = arena.add_car(Team::Blue, CarConfig::OCTANE);
        place(&mut arena, id, Vec3::new(-500.0, 0.0, 17.0), Vec3::new(speed, 0.0, 0.0));

        arena.step(90).unwrap();
        prop_assert!(arena.ball().vel.length() < 50.0);
        prop_assert_eq!(arena.car_stats(id).ball_touches, 0);
    }

    #[test]
    fn prop_disabled_car_car_collision_passes_through(speed in 1400.0f32..2000.0) {
        let mut arena = arena_with(GameMode::Soccar, ArenaConfig::default());
        let mut mutator = *arena.mutator_config();
        mutator.enable_car_car_collision = false;
        arena.set_mutator_config(mutator);
        let left = arena.add_car(Team::Blue, CarConfig::OCTANE);
        let right = arena.add_car(Team::Orange, CarConfig::OCTANE);
        // Head on at equal and opposite speeds, each driving forward
        place(&mut arena, left, Vec3::new(-400.0, -2000.0, 17.0), Vec3::new(speed, 0.0, 0.0));
        arena.set_car_state(right, CarState {
            pos: Vec3::new(400.0, -2000.0, 17.0),
            rot_mat: Angle::new(std::f32::consts::PI, 0.0, 0.0).to_rot_mat(),
            vel: Vec3::new(-speed, 0.0, 0.0),
            ..Default::default()
        });

        let bumps: Arc<Mutex<Vec<(u32, u32, bool)>>> = Arc::default();
        let log = Arc::clone(&bumps);
        arena.set_car_bump_callback(Some(EventCallback::car_bump(
            move |_: &mut Arena, bumper, victim, is_demo, _| -> Result<(), BoxError> {
                log.lock().unwrap().push((bumper, victim, is_demo));
                Ok(())
            },
            None,
        )));

        arena.step(90).unwrap();
        let a = arena.car_state(left).unwrap();
        let b = arena.car_state(right).unwrap();
        prop_assert!(a.pos.x > 0.0 && b.pos.x < 0.0);
        prop_assert!((a.pos.x + b.pos.x).abs() < 5.0);
        prop_assert!((a.pos.y + 2000.0).abs() < 5.0 && (b.pos.y + 2000.0).abs() < 5.0);
        prop_assert!(!a.is_demoed && !b.is_demoed);
        prop_assert!(bumps.lock().unwrap().is_empty());
        prop_assert_eq!(arena.car_stats(left).demos + arena.car_stats(right).demos, 0);
    }
}

#[test]
fn demo_fires_once_per_bump() {
    init_logging();
    let mut arena = arena_with(GameMode::Soccar, ArenaConfig::default());
    let victim = arena.add_car(Team::Orange, CarConfig::BREAKOUT);
    let bumper = arena.add_car(Team::Blue, CarConfig::HYBRID);
    place(&mut arena, victim, Vec3::new(0.0, -2000.0, 17.0), Vec3::ZERO);
    place(&mut arena, bumper, Vec3::new(-300.0, -2000.0, 17.0), Vec3::new(2300.0, 0.0, 0.0));
    arena.set_car_controls(bumper, CarControls {
        throttle: 1.0,
        boost: true,
        ..Default::default()
    });

    let seen: Arc<Mutex<Vec<(u64, u32, u32, bool)>>> = Arc::default();
    let log = Arc::clone(&seen);
    arena.set_car_bump_callback(Some(EventCallback::car_bump(
        move |arena: &mut Arena, bumper, victim, is_demo, _| -> Result<(), BoxError> {
            log.lock().unwrap().push((arena.tick_count(), bumper, victim, is_demo));
            Ok(())
        },
        None,
    )));
    arena.step(60).unwrap();

    let events = seen.lock().unwrap();
    let keys: HashSet<_> = events.iter().map(|&(tick, b, v, _)| (tick, b, v)).collect();
    assert_eq!(keys.len(), events.len());
    let demos: Vec<_> = events.iter().filter(|e| e.3).collect();
    assert_eq!(demos.len(), 1);
    assert_eq!((demos[0].1, demos[0].2), (bumper, victim));
    assert_eq!(arena.car_stats(bumper).demos, 1);
}

#[test]
fn pad_cycles_through_cooldown() {
    let mut arena = arena_with(GameMode::Soccar, ArenaConfig::default());
    let id = arena.add_car(Team::Blue, CarConfig::OCTANE);
    let (index, pad) = arena
        .boost_pad_configs()
        .into_iter()
        .enumerate()
        .find(|(_, p)| p.is_big)
        .unwrap();
    place(&mut arena, id, Vec3::new(pad.pos.x, pad.pos.y, 17.0), Vec3::ZERO);

    let pickups: Arc<Mutex<Vec<(u32, usize)>>> = Arc::default();
    let log = Arc::clone(&pickups);
    arena
        .set_boost_pickup_callback(Some(EventCallback::boost_pickup(
            move |_: &mut Arena, car_id, pad_index, _| -> Result<(), BoxError> {
                log.lock().unwrap().push((car_id, pad_index));
                Ok(())
            },
            None,
        )))
        .unwrap();

    arena.step(1).unwrap();
    assert_eq!(*pickups.lock().unwrap(), vec![(id, index)]);
    assert_eq!(arena.car_state(id).unwrap().boost, 100.0);
    let state = arena.boost_pad_state(index).unwrap();
    assert!(!state.is_active);

    // A full tank cannot take another pickup even once the pad is back
    arena.set_boost_pad_state(index, BoostPadState {
        is_active: true,
        cooldown: 0.0,
    });
    arena.step(1).unwrap();
    assert_eq!(pickups.lock().unwrap().len(), 1);
    assert!(arena.boost_pad_state(index).unwrap().is_active);
}

#[test]
fn batch_rejects_bad_input_without_stepping() {
    let a: SharedArena = Arc::new(Mutex::new(kickoff_arena(GameMode::Soccar, 1)));
    let err = multi_step(&[Arc::clone(&a), Arc::clone(&a)], 10).unwrap_err();
    assert!(matches!(err, ArenaError::DuplicateArena { index: 1 }));

    let items: Vec<Arc<dyn Any + Send + Sync>> = vec![
        Arc::clone(&a) as Arc<dyn Any + Send + Sync>,
        Arc::new(42u32) as Arc<dyn Any + Send + Sync>,
    ];
    let err = multi_step_dyn(&items, 10).unwrap_err();
    assert!(matches!(err, ArenaError::UnexpectedType { index: 1 }));
    assert_eq!(a.lock().unwrap().tick_count(), 0);
}

#[test]
fn tick_rate_bounds() {
    for rate in [15.0, 60.0, 120.0] {
        assert!(Arena::new(GameMode::Soccar, rate, ArenaConfig::default()).is_ok());
    }
    for rate in [14.9, 120.5, 0.0, f32::NAN] {
        assert!(matches!(
            Arena::new(GameMode::Soccar, rate, ArenaConfig::default()),
            Err(ArenaError::InvalidTickRate(_))
        ));
    }
}
