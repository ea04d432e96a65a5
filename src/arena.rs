//! A single simulation instance
//!
//! The arena owns the game state and wraps the pure tick with everything the
//! host needs: validated construction, state accessors, event callbacks,
//! cooperative stop and deep cloning.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{ArenaConfig, MemWeightMode};
use crate::consts::*;
use crate::error::{ArenaError, BoxError};
use crate::sim::ball::{is_scored_at, predict_goal};
use crate::sim::kickoff::reset_to_kickoff;
use crate::sim::{
    ArenaGeometry, BallState, BoostPad, BoostPadConfig, BoostPadState, Car, CarConfig,
    CarControls, CarState, CarStats, GameEvent, GameMode, GameState, MutatorConfig, PadGrid,
    PadLookup, RngState, Team, TileState, default_layout, tick,
};

/// Opaque host data handed back to a callback on every call
pub type UserData = Arc<dyn Any + Send + Sync>;

pub type GoalScoredFn =
    dyn Fn(&mut Arena, Team, Option<&UserData>) -> Result<(), BoxError> + Send + Sync;
/// Arguments: bumper id, victim id, is_demo
pub type CarBumpFn =
    dyn Fn(&mut Arena, u32, u32, bool, Option<&UserData>) -> Result<(), BoxError> + Send + Sync;
/// Arguments: car id, pad index
pub type BoostPickupFn =
    dyn Fn(&mut Arena, u32, usize, Option<&UserData>) -> Result<(), BoxError> + Send + Sync;
pub type BallTouchFn =
    dyn Fn(&mut Arena, u32, Option<&UserData>) -> Result<(), BoxError> + Send + Sync;

/// A registered callback and the user data it was registered with
pub struct EventCallback<F: ?Sized> {
    pub func: Arc<F>,
    pub user_data: Option<UserData>,
}

impl<F: ?Sized> EventCallback<F> {
    pub fn new(func: Arc<F>, user_data: Option<UserData>) -> Self {
        Self { func, user_data }
    }

    /// Whether both handles point at the same function and data
    pub fn same_as(&self, other: &Self) -> bool {
        let same_data = match (&self.user_data, &other.user_data) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        Arc::ptr_eq(&self.func, &other.func) && same_data
    }
}

impl<F: ?Sized> Clone for EventCallback<F> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
            user_data: self.user_data.clone(),
        }
    }
}

impl<F: ?Sized> fmt::Debug for EventCallback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventCallback")
            .field("has_user_data", &self.user_data.is_some())
            .finish_non_exhaustive()
    }
}

impl EventCallback<GoalScoredFn> {
    pub fn goal_scored<C>(func: C, user_data: Option<UserData>) -> Self
    where
        C: Fn(&mut Arena, Team, Option<&UserData>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self::new(Arc::new(func), user_data)
    }
}

impl EventCallback<CarBumpFn> {
    pub fn car_bump<C>(func: C, user_data: Option<UserData>) -> Self
    where
        C: Fn(&mut Arena, u32, u32, bool, Option<&UserData>) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(Arc::new(func), user_data)
    }
}

impl EventCallback<BoostPickupFn> {
    pub fn boost_pickup<C>(func: C, user_data: Option<UserData>) -> Self
    where
        C: Fn(&mut Arena, u32, usize, Option<&UserData>) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(Arc::new(func), user_data)
    }
}

impl EventCallback<BallTouchFn> {
    pub fn ball_touch<C>(func: C, user_data: Option<UserData>) -> Self
    where
        C: Fn(&mut Arena, u32, Option<&UserData>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self::new(Arc::new(func), user_data)
    }
}

#[derive(Clone, Default)]
struct Callbacks {
    goal_scored: Option<EventCallback<GoalScoredFn>>,
    car_bump: Option<EventCallback<CarBumpFn>>,
    boost_pickup: Option<EventCallback<BoostPickupFn>>,
    ball_touch: Option<EventCallback<BallTouchFn>>,
}

pub struct Arena {
    state: GameState,
    /// Read-only and shared between every arena of the same mode
    geometry: Arc<ArenaGeometry>,
    pad_lookup: PadLookup,
    config: ArenaConfig,
    callbacks: Callbacks,
    stop_requested: bool,
    /// Set while `step` runs, so callbacks cannot step the arena again
    in_step: bool,
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("game_mode", &self.state.game_mode)
            .field("tick_rate", &self.state.tick_rate)
            .field("tick_count", &self.state.tick_count)
            .field("num_cars", &self.state.cars.len())
            .finish_non_exhaustive()
    }
}

impl Arena {
    /// Create an arena; fails for a tick rate outside [15, 120]
    pub fn new(game_mode: GameMode, tick_rate: f32, config: ArenaConfig) -> Result<Self, ArenaError> {
        if !(MIN_TICK_RATE..=MAX_TICK_RATE).contains(&tick_rate) {
            log::warn!("Rejected arena with tick rate {}", tick_rate);
            return Err(ArenaError::InvalidTickRate(tick_rate));
        }

        let pad_configs: Vec<BoostPadConfig> = if !game_mode.has_boost_pads() {
            if !config.custom_boost_pads.is_empty() {
                log::warn!("Ignoring custom boost pads: {:?} has none", game_mode);
            }
            Vec::new()
        } else if config.custom_boost_pads.is_empty() {
            default_layout(game_mode).to_vec()
        } else {
            config.custom_boost_pads.clone()
        };
        let pads: Vec<BoostPad> = pad_configs.into_iter().map(BoostPad::new).collect();

        let pad_lookup = match config.mem_weight_mode {
            MemWeightMode::Heavy => PadLookup::Grid(PadGrid::build(&pads)),
            MemWeightMode::Light => PadLookup::Linear,
        };
        let mutator = config
            .mutator
            .unwrap_or_else(|| MutatorConfig::for_game_mode(game_mode));
        let state = GameState::new(game_mode, tick_rate, pads, mutator, config.rng_seed);

        log::info!(
            "Created {} arena at {} Hz with {} boost pads ({})",
            game_mode.as_str(),
            tick_rate,
            state.boost_pads.len(),
            config.mem_weight_mode.as_str()
        );

        Ok(Self {
            state,
            geometry: ArenaGeometry::shared(game_mode),
            pad_lookup,
            config,
            callbacks: Callbacks::default(),
            stop_requested: false,
            in_step: false,
        })
    }

    /// Run `ticks` ticks, firing callbacks after each one
    ///
    /// A `stop()` from a callback ends the loop after the current tick. A
    /// callback error also ends it and is returned as is. Callbacks may read
    /// and edit the arena, but stepping it from inside a callback fails with
    /// `ArenaError::ReentrantStep`.
    pub fn step(&mut self, ticks: u32) -> Result<(), ArenaError> {
        self.step_with_abort(ticks, None)
    }

    /// `step` that also halts at a tick boundary once `abort` is set
    pub(crate) fn step_with_abort(
        &mut self,
        ticks: u32,
        abort: Option<&AtomicBool>,
    ) -> Result<(), ArenaError> {
        if self.in_step {
            log::warn!("Rejected step from a callback at tick {}", self.state.tick_count);
            return Err(ArenaError::ReentrantStep);
        }
        self.in_step = true;
        let result = self.run_ticks(ticks, abort);
        self.in_step = false;
        result
    }

    fn run_ticks(&mut self, ticks: u32, abort: Option<&AtomicBool>) -> Result<(), ArenaError> {
        self.stop_requested = false;
        for _ in 0..ticks {
            if abort.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                break;
            }

            let events = tick(&mut self.state, &self.geometry, &self.pad_lookup);
            self.dispatch(events)?;

            if self.stop_requested {
                self.stop_requested = false;
                log::debug!("Stopped at tick {}", self.state.tick_count);
                break;
            }
        }
        Ok(())
    }

    /// Ask a running `step` to halt once the current tick finishes
    pub fn stop(&mut self) {
        self.stop_requested = true;
    }

    fn dispatch(&mut self, events: Vec<GameEvent>) -> Result<(), ArenaError> {
        for event in events {
            let result = match event {
                GameEvent::GoalScored { team } => match self.callbacks.goal_scored.clone() {
                    Some(cb) => (cb.func)(self, team, cb.user_data.as_ref()),
                    None => Ok(()),
                },
                GameEvent::CarBump {
                    bumper,
                    victim,
                    is_demo,
                } => match self.callbacks.car_bump.clone() {
                    Some(cb) => (cb.func)(self, bumper, victim, is_demo, cb.user_data.as_ref()),
                    None => Ok(()),
                },
                GameEvent::BoostPickup { car_id, pad_index } => {
                    match self.callbacks.boost_pickup.clone() {
                        Some(cb) => (cb.func)(self, car_id, pad_index, cb.user_data.as_ref()),
                        None => Ok(()),
                    }
                }
                GameEvent::BallTouch { car_id } => match self.callbacks.ball_touch.clone() {
                    Some(cb) => (cb.func)(self, car_id, cb.user_data.as_ref()),
                    None => Ok(()),
                },
            };
            result.map_err(ArenaError::Callback)?;
        }
        Ok(())
    }

    /// Replace the goal callback and return the previous one
    pub fn set_goal_scored_callback(
        &mut self,
        callback: Option<EventCallback<GoalScoredFn>>,
    ) -> Result<Option<EventCallback<GoalScoredFn>>, ArenaError> {
        self.require(self.state.game_mode.has_goals(), "goal scored callback")?;
        Ok(std::mem::replace(&mut self.callbacks.goal_scored, callback))
    }

    /// Replace the bump callback and return the previous one
    pub fn set_car_bump_callback(
        &mut self,
        callback: Option<EventCallback<CarBumpFn>>,
    ) -> Option<EventCallback<CarBumpFn>> {
        std::mem::replace(&mut self.callbacks.car_bump, callback)
    }

    /// Replace the boost pickup callback and return the previous one
    pub fn set_boost_pickup_callback(
        &mut self,
        callback: Option<EventCallback<BoostPickupFn>>,
    ) -> Result<Option<EventCallback<BoostPickupFn>>, ArenaError> {
        self.require(self.state.game_mode.has_boost_pads(), "boost pickup callback")?;
        Ok(std::mem::replace(&mut self.callbacks.boost_pickup, callback))
    }

    /// Replace the ball touch callback and return the previous one
    pub fn set_ball_touch_callback(
        &mut self,
        callback: Option<EventCallback<BallTouchFn>>,
    ) -> Option<EventCallback<BallTouchFn>> {
        std::mem::replace(&mut self.callbacks.ball_touch, callback)
    }

    fn require(&self, supported: bool, operation: &'static str) -> Result<(), ArenaError> {
        if supported {
            return Ok(());
        }
        log::warn!("Rejected {} in {:?}", operation, self.state.game_mode);
        Err(ArenaError::UnsupportedInGameMode {
            operation,
            mode: self.state.game_mode,
        })
    }

    /// Deep copy; callbacks and their user data are shared only on request
    pub fn clone_arena(&self, copy_callbacks: bool) -> Arena {
        Arena {
            state: self.state.clone(),
            geometry: Arc::clone(&self.geometry),
            pad_lookup: self.pad_lookup.clone(),
            config: self.config.clone(),
            callbacks: if copy_callbacks {
                self.callbacks.clone()
            } else {
                Callbacks::default()
            },
            stop_requested: false,
            in_step: false,
        }
    }

    /// Move every car to a kickoff spot and reset ball, pads and scores
    ///
    /// With a seed the placement depends only on the seed; without one it is
    /// drawn from the arena's own RNG.
    pub fn reset_to_random_kickoff(&mut self, seed: Option<u64>) {
        let mut rng = match seed {
            Some(seed) => RngState::seeded(seed),
            None => self.state.rng_state.next_rng(),
        };
        reset_to_kickoff(&mut self.state, &mut rng);
        log::info!(
            "Kickoff reset with {} cars (seed {:?})",
            self.state.cars.len(),
            seed
        );
    }

    /// Whether the ball is in a goal, or a goal registered since the last reset
    pub fn is_ball_scored(&self) -> bool {
        self.state.goal_latched
            || is_scored_at(self.state.ball.pos, self.state.game_mode, &self.state.mutator, 0.0)
    }

    /// Goal the ball would enter within `max_time` seconds if no car touched it
    pub fn is_ball_probably_going_in(&self, max_time: f32, extra_margin: f32) -> Option<Team> {
        predict_goal(
            &self.state.ball,
            &self.geometry,
            self.state.game_mode,
            &self.state.mutator,
            &self.state.dropshot_tiles,
            self.state.tick_time(),
            max_time,
            extra_margin,
        )
    }

    pub fn game_mode(&self) -> GameMode {
        self.state.game_mode
    }

    pub fn tick_rate(&self) -> f32 {
        self.state.tick_rate
    }

    pub fn tick_time(&self) -> f32 {
        self.state.tick_time()
    }

    pub fn tick_count(&self) -> u64 {
        self.state.tick_count
    }

    pub fn blue_score(&self) -> u32 {
        self.state.blue_score
    }

    pub fn orange_score(&self) -> u32 {
        self.state.orange_score
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Full simulation state
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn ball(&self) -> &BallState {
        &self.state.ball
    }

    /// Replace the ball state; a new goal can register afterwards
    pub fn set_ball(&mut self, ball: BallState) {
        self.state.ball = ball;
        self.state.goal_latched = false;
    }

    pub fn mutator_config(&self) -> &MutatorConfig {
        &self.state.mutator
    }

    pub fn set_mutator_config(&mut self, mutator: MutatorConfig) {
        self.state.mutator = mutator;
    }

    /// Add a car at a random respawn spot and return its id
    pub fn add_car(&mut self, team: Team, config: CarConfig) -> u32 {
        let id = self.state.push_car(team, config);
        let mut rng = self.state.rng_state.next_rng();
        let game_mode = self.state.game_mode;
        let boost = self.state.mutator.car_spawn_boost_amount;
        if let Some(car) = self.state.car_mut(id) {
            car.respawn(game_mode, &mut rng, boost);
        }
        log::debug!("Added car {} to team {:?}", id, team);
        id
    }

    /// Remove a car and its stats; false for an unknown id
    pub fn remove_car(&mut self, id: u32) -> bool {
        let removed = self.state.remove_car(id);
        if removed {
            log::debug!("Removed car {}", id);
        }
        removed
    }

    pub fn remove_all_cars(&mut self) {
        log::debug!("Removing all {} cars", self.state.cars.len());
        self.state.cars.clear();
    }

    /// Cars in ascending id order
    pub fn cars(&self) -> &[Car] {
        &self.state.cars
    }

    pub fn car_ids(&self) -> Vec<u32> {
        self.state.cars.iter().map(Car::id).collect()
    }

    pub fn car(&self, id: u32) -> Option<&Car> {
        self.state.car(id)
    }

    pub fn car_state(&self, id: u32) -> Option<CarState> {
        self.state.car(id).map(|c| *c.state())
    }

    /// Overwrite a car's state; boost is clamped to [0, 100]
    pub fn set_car_state(&mut self, id: u32, state: CarState) -> bool {
        match self.state.car_mut(id) {
            Some(car) => {
                car.set_state(state);
                true
            }
            None => false,
        }
    }

    pub fn car_controls(&self, id: u32) -> Option<CarControls> {
        self.state.car(id).map(|c| *c.controls())
    }

    /// Latch controls for the coming ticks
    pub fn set_car_controls(&mut self, id: u32, controls: CarControls) -> bool {
        match self.state.car_mut(id) {
            Some(car) => {
                car.controls = controls;
                true
            }
            None => false,
        }
    }

    /// Stats for a car; all zero for an unknown id
    pub fn car_stats(&self, id: u32) -> CarStats {
        self.state.car(id).map(|c| *c.stats()).unwrap_or_default()
    }

    /// Demolish a car as if it had been hit; false if unknown or already out
    pub fn demolish_car(&mut self, id: u32) -> bool {
        let delay = self.state.mutator.respawn_delay;
        match self.state.car_mut(id) {
            Some(car) if !car.state().is_demoed => {
                car.demolish(delay);
                true
            }
            _ => false,
        }
    }

    /// Put a car back on a random respawn spot right away
    pub fn respawn_car(&mut self, id: u32) -> bool {
        let mut rng = self.state.rng_state.next_rng();
        let game_mode = self.state.game_mode;
        let boost = self.state.mutator.car_spawn_boost_amount;
        match self.state.car_mut(id) {
            Some(car) => {
                car.respawn(game_mode, &mut rng, boost);
                true
            }
            None => false,
        }
    }

    pub fn boost_pads(&self) -> &[BoostPad] {
        &self.state.boost_pads
    }

    pub fn boost_pad_configs(&self) -> Vec<BoostPadConfig> {
        self.state.boost_pads.iter().map(|p| p.config).collect()
    }

    pub fn boost_pad_state(&self, index: usize) -> Option<BoostPadState> {
        self.state.boost_pads.get(index).map(|p| p.state)
    }

    pub fn set_boost_pad_state(&mut self, index: usize, state: BoostPadState) -> bool {
        match self.state.boost_pads.get_mut(index) {
            Some(pad) => {
                pad.state = state;
                true
            }
            None => false,
        }
    }

    /// Dropshot floor tiles, blue half first; empty in every other mode
    pub fn dropshot_tiles(&self) -> &[TileState] {
        &self.state.dropshot_tiles
    }

    /// Replace every Dropshot tile at once
    pub fn set_dropshot_tiles(&mut self, tiles: Vec<TileState>) -> Result<(), ArenaError> {
        self.require(self.state.game_mode == GameMode::Dropshot, "dropshot tile state")?;
        if tiles.len() != DROPSHOT_NUM_TILES {
            log::warn!("Rejected {} dropshot tiles", tiles.len());
            return Err(ArenaError::InvalidTileCount {
                expected: DROPSHOT_NUM_TILES,
                actual: tiles.len(),
            });
        }
        self.state.dropshot_tiles = tiles;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;
    use std::sync::Mutex;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn arena(mode: GameMode) -> Arena {
        init_logger();
        Arena::new(mode, DEFAULT_TICK_RATE, ArenaConfig::default()).unwrap()
    }

    #[test]
    fn test_tick_rate_validation() {
        init_logger();
        for rate in [14.9, 0.0, 121.0, f32::NAN] {
            assert!(matches!(
                Arena::new(GameMode::Soccar, rate, ArenaConfig::default()),
                Err(ArenaError::InvalidTickRate(_))
            ));
        }
        assert!(Arena::new(GameMode::Soccar, 15.0, ArenaConfig::default()).is_ok());
        assert!(Arena::new(GameMode::Soccar, 120.0, ArenaConfig::default()).is_ok());
    }

    #[test]
    fn test_pad_layout_per_mode() {
        assert_eq!(arena(GameMode::Soccar).boost_pads().len(), 34);
        assert_eq!(arena(GameMode::Hoops).boost_pads().len(), 20);
        assert!(arena(GameMode::TheVoid).boost_pads().is_empty());

        let custom = ArenaConfig {
            custom_boost_pads: vec![BoostPadConfig {
                pos: Vec3::new(0.0, 0.0, 70.0),
                is_big: false,
            }],
            ..Default::default()
        };
        let arena = Arena::new(GameMode::Soccar, 120.0, custom).unwrap();
        assert_eq!(arena.boost_pad_configs().len(), 1);
    }

    #[test]
    fn test_void_rejects_goal_and_boost_callbacks() {
        let mut arena = arena(GameMode::TheVoid);
        let goal = EventCallback::goal_scored(|_: &mut Arena, _, _| Ok(()), None);
        assert!(matches!(
            arena.set_goal_scored_callback(Some(goal)),
            Err(ArenaError::UnsupportedInGameMode { .. })
        ));
        let boost = EventCallback::boost_pickup(|_: &mut Arena, _, _, _| Ok(()), None);
        assert!(arena.set_boost_pickup_callback(Some(boost)).is_err());
        // Bumps still work without goals or pads
        let bump = EventCallback::car_bump(|_: &mut Arena, _, _, _, _| Ok(()), None);
        assert!(arena.set_car_bump_callback(Some(bump)).is_none());
    }

    #[test]
    fn test_setter_returns_previous_callback() {
        let mut arena = arena(GameMode::Soccar);
        let data: UserData = Arc::new(5u32);
        let first = EventCallback::goal_scored(|_: &mut Arena, _, _| Ok(()), Some(data));
        assert!(arena.set_goal_scored_callback(Some(first.clone())).unwrap().is_none());

        let previous = arena.set_goal_scored_callback(None).unwrap().unwrap();
        assert!(previous.same_as(&first));
        let value = previous.user_data.as_ref().and_then(|d| d.downcast_ref::<u32>());
        assert_eq!(value, Some(&5));
    }

    #[test]
    fn test_stop_from_callback_ends_after_tick() {
        let mut arena = arena(GameMode::Soccar);
        let id = arena.add_car(Team::Blue, CarConfig::OCTANE);
        let mut state = arena.car_state(id).unwrap();
        state.pos = Vec3::new(0.0, -1024.0, 17.0);
        state.boost = 0.0;
        arena.set_car_state(id, state);

        let hits = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&hits);
        let cb = EventCallback::boost_pickup(
            move |arena: &mut Arena, car_id, pad, _| {
                seen.lock().unwrap().push((arena.tick_count(), car_id, pad));
                arena.stop();
                Ok(())
            },
            None,
        );
        arena.set_boost_pickup_callback(Some(cb)).unwrap();

        arena.step(100).unwrap();
        assert_eq!(arena.tick_count(), 1);
        assert_eq!(*hits.lock().unwrap(), vec![(1, id, 13)]);

        // A new step runs normally
        arena.step(5).unwrap();
        assert_eq!(arena.tick_count(), 6);
    }

    #[test]
    fn test_callback_error_propagates() {
        #[derive(Debug, thiserror::Error)]
        #[error("host failure")]
        struct HostError;

        let mut arena = arena(GameMode::Soccar);
        let mut ball = *arena.ball();
        ball.pos = Vec3::new(0.0, 5100.0, 300.0);
        ball.vel = Vec3::new(0.0, 1500.0, 0.0);
        arena.set_ball(ball);
        let cb = EventCallback::goal_scored(|_: &mut Arena, _, _| Err(HostError.into()), None);
        arena.set_goal_scored_callback(Some(cb)).unwrap();

        let err = arena.step(120).unwrap_err();
        let source = err.callback_error().unwrap();
        assert!(source.downcast_ref::<HostError>().is_some());
        assert!(arena.tick_count() < 120);
        assert!(arena.is_ball_scored());
        assert_eq!(arena.blue_score(), 1);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut arena = arena(GameMode::Soccar);
        arena.add_car(Team::Blue, CarConfig::OCTANE);
        arena.add_car(Team::Orange, CarConfig::DOMINUS);
        arena.step(30).unwrap();

        let mut copy = arena.clone_arena(false);
        assert_eq!(copy.state(), arena.state());

        copy.set_car_controls(1, CarControls {
            throttle: 1.0,
            ..Default::default()
        });
        copy.step(60).unwrap();
        assert_eq!(arena.tick_count(), 30);
        assert_ne!(copy.car_state(1), arena.car_state(1));

        // Ids continue from the shared history in both
        assert_eq!(arena.add_car(Team::Blue, CarConfig::PLANK), 3);
        assert_eq!(copy.add_car(Team::Blue, CarConfig::PLANK), 3);
    }

    #[test]
    fn test_clone_copies_callbacks_on_request() {
        let mut arena = arena(GameMode::Soccar);
        let cb = EventCallback::ball_touch(|_: &mut Arena, _, _| Ok(()), None);
        arena.set_ball_touch_callback(Some(cb.clone()));

        let mut with = arena.clone_arena(true);
        let mut without = arena.clone_arena(false);
        assert!(with.set_ball_touch_callback(None).is_some_and(|prev| prev.same_as(&cb)));
        assert!(without.set_ball_touch_callback(None).is_none());
    }

    #[test]
    fn test_unknown_car_lookups() {
        let mut arena = arena(GameMode::Soccar);
        assert!(arena.car(42).is_none());
        assert_eq!(arena.car_stats(42), CarStats::default());
        assert!(!arena.remove_car(42));
        assert!(!arena.set_car_controls(42, CarControls::default()));
        assert!(!arena.demolish_car(42));
        assert!(arena.boost_pad_state(500).is_none());
    }

    #[test]
    fn test_remove_car_clears_stats() {
        let mut arena = arena(GameMode::Soccar);
        let id = arena.add_car(Team::Blue, CarConfig::OCTANE);
        let mut state = arena.car_state(id).unwrap();
        state.pos = Vec3::new(0.0, -1024.0, 17.0);
        state.boost = 0.0;
        arena.set_car_state(id, state);
        arena.step(1).unwrap();
        assert_eq!(arena.car_stats(id).boost_pickups, 1);

        assert!(arena.remove_car(id));
        assert_eq!(arena.car_stats(id), CarStats::default());
        assert!(arena.car_ids().is_empty());
    }

    #[test]
    fn test_seeded_kickoff_is_reproducible() {
        let make = || {
            let mut arena = arena(GameMode::Soccar);
            for team in [Team::Blue, Team::Blue, Team::Orange, Team::Orange] {
                arena.add_car(team, CarConfig::OCTANE);
            }
            arena
        };
        let mut a = make();
        let mut b = make();
        a.reset_to_random_kickoff(Some(1234));
        b.reset_to_random_kickoff(Some(1234));
        assert_eq!(a.state(), b.state());
        assert_eq!(a.ball().pos.z, a.mutator_config().ball_rest_z());
        assert!(a.boost_pads().iter().all(|p| p.state.is_active));
    }

    #[test]
    fn test_set_ball_clears_goal_latch() {
        let mut arena = arena(GameMode::Soccar);
        let mut ball = *arena.ball();
        ball.pos = Vec3::new(0.0, -5300.0, 200.0);
        arena.set_ball(ball);
        arena.step(1).unwrap();
        assert_eq!(arena.orange_score(), 1);
        assert!(arena.is_ball_scored());

        arena.set_ball(BallState {
            pos: Vec3::new(0.0, 0.0, 500.0),
            ..Default::default()
        });
        assert!(!arena.is_ball_scored());
    }

    #[test]
    fn test_ball_prediction() {
        let mut arena = arena(GameMode::Soccar);
        arena.set_ball(BallState {
            pos: Vec3::new(0.0, 3000.0, 200.0),
            vel: Vec3::new(0.0, 3000.0, 0.0),
            ..Default::default()
        });
        assert_eq!(arena.is_ball_probably_going_in(2.0, 0.0), Some(Team::Blue));
        assert_eq!(arena.is_ball_probably_going_in(0.1, 0.0), None);
        assert_eq!(arena.tick_count(), 0);
    }

    #[test]
    fn test_step_from_callback_is_rejected() {
        let mut arena = arena(GameMode::Soccar);
        let id = arena.add_car(Team::Blue, CarConfig::OCTANE);
        let mut state = arena.car_state(id).unwrap();
        state.pos = Vec3::new(0.0, -1024.0, 17.0);
        state.boost = 0.0;
        arena.set_car_state(id, state);

        let results = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&results);
        let cb = EventCallback::boost_pickup(
            move |arena: &mut Arena, _, _, _| {
                let before = arena.tick_count();
                let rejected = matches!(arena.step(10), Err(ArenaError::ReentrantStep));
                seen.lock().unwrap().push((rejected, arena.tick_count() - before));
                Ok(())
            },
            None,
        );
        arena.set_boost_pickup_callback(Some(cb)).unwrap();

        arena.step(3).unwrap();
        assert_eq!(*results.lock().unwrap(), vec![(true, 0)]);
        assert_eq!(arena.tick_count(), 3);
        // The guard is released once the outer step returns
        arena.step(2).unwrap();
        assert_eq!(arena.tick_count(), 5);
    }

    #[test]
    fn test_dropshot_tile_accessors() {
        let mut soccar = arena(GameMode::Soccar);
        assert!(soccar.dropshot_tiles().is_empty());
        assert!(matches!(
            soccar.set_dropshot_tiles(vec![TileState::Full; DROPSHOT_NUM_TILES]),
            Err(ArenaError::UnsupportedInGameMode { .. })
        ));

        let mut dropshot = arena(GameMode::Dropshot);
        assert_eq!(dropshot.dropshot_tiles().len(), DROPSHOT_NUM_TILES);
        assert!(matches!(
            dropshot.set_dropshot_tiles(vec![TileState::Broken; 3]),
            Err(ArenaError::InvalidTileCount { expected: DROPSHOT_NUM_TILES, actual: 3 })
        ));
        let mut tiles = vec![TileState::Full; DROPSHOT_NUM_TILES];
        tiles[7] = TileState::Damaged;
        dropshot.set_dropshot_tiles(tiles.clone()).unwrap();
        assert_eq!(dropshot.dropshot_tiles(), tiles.as_slice());
        // A kickoff lays a fresh floor
        dropshot.reset_to_random_kickoff(Some(1));
        assert!(dropshot.dropshot_tiles().iter().all(|t| *t == TileState::Full));
    }

    #[test]
    fn test_demolish_and_respawn() {
        let mut arena = arena(GameMode::Soccar);
        let id = arena.add_car(Team::Blue, CarConfig::OCTANE);
        assert!(arena.demolish_car(id));
        assert!(!arena.demolish_car(id));
        assert!(arena.car_state(id).unwrap().is_demoed);
        assert!(arena.respawn_car(id));
        let state = arena.car_state(id).unwrap();
        assert!(!state.is_demoed);
        assert_eq!(state.pos.z, CAR_RESPAWN_Z);
    }
}
