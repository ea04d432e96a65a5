//! Fixed timestep simulation tick
//!
//! Core loop that advances the game state deterministically. Cars are always
//! visited in ascending id order and every pairwise test runs in (i, j) index
//! order, so the same state and inputs give the same bits.

use glam::Vec3A;

use super::ball;
use super::dropshot;
use super::body::RigidBody;
use super::boost_pad::PadLookup;
use super::car::Car;
use super::collision::{
    ContactMaterial, obb_obb_collision, resolve_pair_contact, resolve_static_contact,
    sphere_obb_collision,
};
use super::events::GameEvent;
use super::geometry::ArenaGeometry;
use super::mutator::{DemoMode, MutatorConfig};
use super::state::{CarContact, GameMode, GameState, Team, WorldContact};
use crate::consts::*;
use crate::math::Vec3;

/// Read-only inputs shared by every update within one tick
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub geometry: &'a ArenaGeometry,
    pub mutator: &'a MutatorConfig,
    pub game_mode: GameMode,
    pub tick_time: f32,
    /// Ticks completed before this one
    pub tick_count: u64,
}

/// Advance the game state by one fixed timestep and return the events it raised
pub fn tick(state: &mut GameState, geometry: &ArenaGeometry, pad_lookup: &PadLookup) -> Vec<GameEvent> {
    let mutator = state.mutator;
    let ctx = TickContext {
        geometry,
        mutator: &mutator,
        game_mode: state.game_mode,
        tick_time: state.tick_time(),
        tick_count: state.tick_count,
    };
    let dt = ctx.tick_time;
    let mut events = Vec::new();

    for car in &mut state.cars {
        car.update_demo(&ctx, &mut state.rng_state);
    }

    // Controls to forces
    let mut car_bodies: Vec<RigidBody> = state.cars.iter().map(|c| c.rigid_body(&mutator)).collect();
    for (car, body) in state.cars.iter_mut().zip(&mut car_bodies) {
        if !car.state.is_demoed {
            car.pre_tick_update(body, &ctx);
        }
    }

    let mut ball_body = ball::rigid_body(&state.ball, &mutator);
    ball::pre_tick_update(&mut state.ball, &mut ball_body, ctx.game_mode, dt);

    // Integrate cars and push them out of the arena surfaces
    let world_material = ContactMaterial {
        restitution: mutator.car_world_restitution,
        friction: mutator.car_world_friction,
    };
    let gravity = Vec3A::from(mutator.gravity);
    for (car, body) in state.cars.iter_mut().zip(&mut car_bodies) {
        if car.state.is_demoed {
            continue;
        }
        body.integrate(dt, gravity);

        let corners = car.hitbox_for(body).corners();
        let contacts: Vec<_> = geometry.point_contacts(&corners).collect();
        for contact in &contacts {
            resolve_static_contact(body, contact, world_material);
            car.state.world_contact = WorldContact {
                has_contact: true,
                contact_normal: contact.normal.into(),
            };
        }
    }

    if mutator.enable_car_car_collision {
        collide_cars(&mut state.cars, &mut car_bodies, &mutator, &mut events);
    }

    if mutator.enable_car_ball_collision {
        let material = ContactMaterial {
            restitution: CAR_BALL_RESTITUTION,
            friction: CAR_BALL_FRICTION,
        };
        for (car, body) in state.cars.iter_mut().zip(&mut car_bodies) {
            if car.state.is_demoed {
                continue;
            }
            let hitbox = car.hitbox_for(body);
            let contact = sphere_obb_collision(ball_body.pos, mutator.ball_radius, &hitbox);
            if !contact.hit {
                continue;
            }

            // The hit impulse scales with the approach speed, so read it first
            let prev_hit = car.state.ball_hit_info;
            let rel_pos = contact.point - ball_body.pos;
            let extra_vel = ball::on_hit(
                &mut state.ball,
                &ball_body,
                car,
                body,
                rel_pos,
                ctx.game_mode,
                &mutator,
                ctx.tick_count,
            );
            resolve_pair_contact(body, &mut ball_body, &contact, material);
            ball_body.vel += extra_vel;

            // Touching on consecutive ticks counts as one touch
            let is_new_touch =
                !prev_hit.is_valid || prev_hit.tick_count_when_hit + 1 < ctx.tick_count;
            if is_new_touch {
                car.stats.ball_touches += 1;
                events.push(GameEvent::BallTouch { car_id: car.id() });
            }
        }
    }

    let touched_floor =
        ball::step_body(&mut ball_body, geometry, &mutator, &state.dropshot_tiles, dt);
    ball::write_back(&mut state.ball, &ball_body);
    if touched_floor && ctx.game_mode == GameMode::Dropshot {
        dropshot::on_floor_impact(&mut state.ball, &mut state.dropshot_tiles, ctx.tick_count, dt);
    }

    for (car, body) in state.cars.iter_mut().zip(&mut car_bodies) {
        car.finish_physics_tick(body, dt);
    }

    for pad in &mut state.boost_pads {
        pad.update_cooldown(dt);
    }
    for car in &mut state.cars {
        for pad_index in pad_lookup.pickups(&mut state.boost_pads, &mut car.state, &mutator) {
            car.stats.boost_pickups += 1;
            events.push(GameEvent::BoostPickup {
                car_id: car.id(),
                pad_index,
            });
        }
    }

    if let Some(team) = check_goal(state) {
        events.push(GameEvent::GoalScored { team });
    }

    state.tick_count += 1;
    events
}

/// Register a goal on the tick the ball first enters a goal
fn check_goal(state: &mut GameState) -> Option<Team> {
    if state.goal_latched || !state.game_mode.has_goals() {
        return None;
    }
    let pos = state.ball.pos;
    if !ball::is_scored_at(pos, state.game_mode, &state.mutator, 0.0) {
        return None;
    }

    state.goal_latched = true;
    let team = ball::scoring_team(pos);
    match team {
        Team::Blue => state.blue_score += 1,
        Team::Orange => state.orange_score += 1,
    }

    let scorer = state.ball.last_hit_car_id;
    if let Some(car) = state.car_mut(scorer) {
        car.stats.goals += 1;
    }
    log::info!(
        "Goal for {:?} at tick {} (scorer {}), score {}-{}",
        team,
        state.tick_count,
        scorer,
        state.blue_score,
        state.orange_score
    );
    Some(team)
}

/// Pairwise hitbox contacts, impulse response and bump rules
fn collide_cars(
    cars: &mut [Car],
    bodies: &mut [RigidBody],
    mutator: &MutatorConfig,
    events: &mut Vec<GameEvent>,
) {
    let material = ContactMaterial {
        restitution: CAR_CAR_RESTITUTION,
        friction: CAR_CAR_FRICTION,
    };

    for i in 0..cars.len() {
        for j in (i + 1)..cars.len() {
            if cars[i].state.is_demoed || cars[j].state.is_demoed {
                continue;
            }
            let contact = obb_obb_collision(&cars[i].hitbox_for(&bodies[i]), &cars[j].hitbox_for(&bodies[j]));
            if !contact.hit {
                continue;
            }

            // Bump rules look at the motion before the contact impulse
            let before = (bodies[i], bodies[j]);
            let (head, tail) = bodies.split_at_mut(j);
            resolve_pair_contact(&mut head[i], &mut tail[0], &contact, material);

            let half_pen = contact.normal * (contact.penetration * 0.5);
            let sides = [
                (i, j, &before.0, &before.1, contact.point + half_pen),
                (j, i, &before.1, &before.0, contact.point - half_pen),
            ];
            for (bumper, victim, bumper_body, victim_body, surface_point) in sides {
                let local_point = bumper_body.local_point(surface_point);
                if let Some(is_demo) =
                    try_bump(cars, bumper, victim, bumper_body, victim_body, local_point, mutator)
                {
                    events.push(GameEvent::CarBump {
                        bumper: cars[bumper].id(),
                        victim: cars[victim].id(),
                        is_demo,
                    });
                }
            }
        }
    }
}

/// Apply one direction of a car-car hit; returns `Some(is_demo)` when it
/// counts as a bump
fn try_bump(
    cars: &mut [Car],
    bumper: usize,
    victim: usize,
    bumper_body: &RigidBody,
    victim_body: &RigidBody,
    local_point: Vec3A,
    mutator: &MutatorConfig,
) -> Option<bool> {
    let victim_id = cars[victim].id();
    let bumper_state = &cars[bumper].state;
    if bumper_state.is_demoed || cars[victim].state.is_demoed {
        return None;
    }

    let contact = bumper_state.car_contact;
    if contact.other_car_id == victim_id && contact.cooldown_timer > 0.0 {
        return None;
    }

    let delta_pos = victim_body.pos - bumper_body.pos;
    if bumper_body.vel.dot(delta_pos) < 0.0 {
        return None;
    }

    let vel_dir = bumper_body.vel.normalize_or_zero();
    let dir_to_victim = delta_pos.normalize_or_zero();
    let speed_towards_victim = bumper_body.vel.dot(dir_to_victim);
    let victim_away_speed = victim_body.vel.dot(vel_dir);
    if speed_towards_victim <= victim_away_speed {
        return None;
    }

    if local_point.x <= BUMP_MIN_FORWARD_DIST {
        return None;
    }

    let mut is_demo = match mutator.demo_mode {
        DemoMode::OnContact => true,
        DemoMode::Disabled => false,
        DemoMode::Normal => bumper_state.is_supersonic,
    };
    if is_demo && !mutator.enable_team_demos {
        is_demo = cars[bumper].team() != cars[victim].team();
    }

    if is_demo {
        cars[victim].demolish(mutator.respawn_delay);
        cars[bumper].stats.demos += 1;
        log::debug!("Car {} demolished car {}", cars[bumper].id(), victim_id);
    } else {
        let victim_grounded = cars[victim].state.is_on_ground;
        let base_scale = if victim_grounded {
            BUMP_VEL_AMOUNT_GROUND_CURVE
        } else {
            BUMP_VEL_AMOUNT_AIR_CURVE
        }
        .get_output(speed_towards_victim);
        let hit_up_dir = if victim_grounded {
            victim_body.up()
        } else {
            Vec3A::Z
        };

        let bump_vel = (vel_dir * base_scale
            + hit_up_dir * BUMP_UPWARD_VEL_AMOUNT_CURVE.get_output(speed_towards_victim))
            * mutator.bump_force_scale;
        cars[victim].velocity_impulse_cache += Vec3::from(bump_vel);
    }

    cars[bumper].state.car_contact = CarContact {
        other_car_id: victim_id,
        cooldown_timer: mutator.bump_cooldown_time,
    };
    Some(is_demo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Angle;
    use crate::sim::boost_pad::{BoostPad, default_layout};
    use crate::sim::car::CarConfig;
    use crate::sim::state::CarState;

    fn soccar_state() -> GameState {
        let pads = default_layout(GameMode::Soccar).iter().copied().map(BoostPad::new).collect();
        GameState::new(
            GameMode::Soccar,
            DEFAULT_TICK_RATE,
            pads,
            MutatorConfig::for_game_mode(GameMode::Soccar),
            0,
        )
    }

    fn run(state: &mut GameState, ticks: u32) -> Vec<GameEvent> {
        let geometry = ArenaGeometry::shared(state.game_mode);
        let mut events = Vec::new();
        for _ in 0..ticks {
            events.extend(tick(state, &geometry, &PadLookup::Linear));
        }
        events
    }

    fn place_car(state: &mut GameState, id: u32, pos: Vec3, yaw: f32, vel: Vec3) {
        if let Some(car) = state.car_mut(id) {
            let boost = car.state.boost;
            car.set_state(CarState {
                pos,
                rot_mat: Angle::new(yaw, 0.0, 0.0).to_rot_mat(),
                vel,
                boost,
                ..Default::default()
            });
        }
    }

    #[test]
    fn test_tick_count_advances() {
        let mut state = soccar_state();
        run(&mut state, 7);
        assert_eq!(state.tick_count, 7);
    }

    #[test]
    fn test_car_rests_on_suspension() {
        let mut state = soccar_state();
        let id = state.push_car(Team::Blue, CarConfig::OCTANE);
        place_car(&mut state, id, Vec3::new(0.0, -1000.0, 17.0), 0.0, Vec3::ZERO);
        run(&mut state, 240);

        let car = state.car(id).map(|c| *c.state()).unwrap_or_default();
        assert!(car.is_on_ground);
        assert!((car.pos.z - 17.0).abs() < 5.0, "z = {}", car.pos.z);
        assert!(car.vel.length() < 10.0);
    }

    #[test]
    fn test_throttle_drives_forward() {
        let mut state = soccar_state();
        let id = state.push_car(Team::Blue, CarConfig::OCTANE);
        place_car(&mut state, id, Vec3::new(0.0, -2000.0, 17.0), 0.0, Vec3::ZERO);
        if let Some(car) = state.car_mut(id) {
            car.controls.throttle = 1.0;
        }
        run(&mut state, 120);

        let car = state.car(id).map(|c| *c.state()).unwrap_or_default();
        assert!(car.vel.x > 500.0, "vx = {}", car.vel.x);
        assert!(car.vel.y.abs() < 50.0);
    }

    #[test]
    fn test_pad_pickup_event_and_cooldown() {
        let mut state = soccar_state();
        let id = state.push_car(Team::Blue, CarConfig::OCTANE);
        // Small pad at (0, -1024)
        place_car(&mut state, id, Vec3::new(0.0, -1024.0, 17.0), 0.0, Vec3::ZERO);

        let events = run(&mut state, 1);
        assert_eq!(
            events,
            vec![GameEvent::BoostPickup {
                car_id: id,
                pad_index: 13
            }]
        );
        let pad = state.boost_pads[13];
        assert!(!pad.state.is_active);
        assert!(pad.state.cooldown > 0.0);
        assert_eq!(state.car(id).map(|c| c.stats().boost_pickups), Some(1));
        place_car(&mut state, id, Vec3::new(0.0, -2000.0, 17.0), 0.0, Vec3::ZERO);

        // Full cooldown at 120 Hz
        run(&mut state, 478);
        assert!(!state.boost_pads[13].state.is_active);
        run(&mut state, 4);
        assert!(state.boost_pads[13].state.is_active);
    }

    #[test]
    fn test_goal_registers_once() {
        let mut state = soccar_state();
        state.ball.pos = Vec3::new(0.0, 5000.0, 300.0);
        state.ball.vel = Vec3::new(0.0, 2000.0, 0.0);

        let events = run(&mut state, 120);
        let goals: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, GameEvent::GoalScored { .. }))
            .collect();
        assert_eq!(goals, vec![&GameEvent::GoalScored { team: Team::Blue }]);
        assert_eq!((state.blue_score, state.orange_score), (1, 0));
        assert!(state.goal_latched);
    }

    #[test]
    fn test_car_hits_ball() {
        let mut state = soccar_state();
        let id = state.push_car(Team::Blue, CarConfig::OCTANE);
        place_car(&mut state, id, Vec3::new(-400.0, 0.0, 17.0), 0.0, Vec3::new(1500.0, 0.0, 0.0));

        let events = run(&mut state, 60);
        let touches = events
            .iter()
            .filter(|e| **e == GameEvent::BallTouch { car_id: id })
            .count();
        assert_eq!(touches, 1);
        assert_eq!(state.ball.last_hit_car_id, id);
        assert!(state.ball.vel.x > 1000.0);
        assert_eq!(state.car(id).map(|c| c.stats().ball_touches), Some(1));
    }

    #[test]
    fn test_disabled_car_ball_collision_passes_through() {
        let mut state = soccar_state();
        state.mutator.enable_car_ball_collision = false;
        let id = state.push_car(Team::Blue, CarConfig::OCTANE);
        place_car(&mut state, id, Vec3::new(-400.0, 0.0, 17.0), 0.0, Vec3::new(1500.0, 0.0, 0.0));

        let events = run(&mut state, 60);
        assert!(events.iter().all(|e| !matches!(e, GameEvent::BallTouch { .. })));
        assert!(state.ball.vel.x.abs() < 1.0);
        assert_eq!(state.ball.last_hit_car_id, 0);
    }

    #[test]
    fn test_supersonic_bump_demolishes_opponent() {
        let mut state = soccar_state();
        let bumper = state.push_car(Team::Blue, CarConfig::OCTANE);
        let victim = state.push_car(Team::Orange, CarConfig::OCTANE);
        place_car(&mut state, bumper, Vec3::new(-300.0, -2000.0, 17.0), 0.0, Vec3::new(2300.0, 0.0, 0.0));
        place_car(&mut state, victim, Vec3::new(0.0, -2000.0, 17.0), 0.0, Vec3::ZERO);
        if let Some(car) = state.car_mut(bumper) {
            car.controls.throttle = 1.0;
            car.controls.boost = true;
            car.state.is_supersonic = true;
        }

        let events = run(&mut state, 30);
        let bumps: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, GameEvent::CarBump { .. }))
            .collect();
        assert_eq!(
            bumps,
            vec![&GameEvent::CarBump {
                bumper,
                victim,
                is_demo: true
            }]
        );
        assert!(state.car(victim).is_some_and(|c| c.state().is_demoed));
        assert_eq!(state.car(bumper).map(|c| c.stats().demos), Some(1));
    }

    #[test]
    fn test_teammates_bump_without_demo() {
        let mut state = soccar_state();
        state.mutator.demo_mode = DemoMode::OnContact;
        let bumper = state.push_car(Team::Blue, CarConfig::OCTANE);
        let victim = state.push_car(Team::Blue, CarConfig::OCTANE);
        place_car(&mut state, bumper, Vec3::new(-300.0, -2000.0, 17.0), 0.0, Vec3::new(1500.0, 0.0, 0.0));
        place_car(&mut state, victim, Vec3::new(0.0, -2000.0, 17.0), 0.0, Vec3::ZERO);

        let events = run(&mut state, 30);
        assert!(events.contains(&GameEvent::CarBump {
            bumper,
            victim,
            is_demo: false
        }));
        let victim_state = state.car(victim).map(|c| *c.state()).unwrap_or_default();
        assert!(!victim_state.is_demoed);
        assert!(victim_state.vel.x > 500.0);
    }

    #[test]
    fn test_demoed_car_respawns() {
        let mut state = soccar_state();
        let id = state.push_car(Team::Orange, CarConfig::OCTANE);
        if let Some(car) = state.car_mut(id) {
            car.demolish(0.5);
        }
        run(&mut state, 59);
        assert!(state.car(id).is_some_and(|c| c.state().is_demoed));
        run(&mut state, 2);
        let car = state.car(id).map(|c| *c.state()).unwrap_or_default();
        assert!(!car.is_demoed);
        assert!(car.pos.y > 0.0);
    }
}
