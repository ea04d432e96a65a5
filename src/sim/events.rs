//! Gameplay events raised during a tick
//!
//! The tick collects events in the order they happen; the arena dispatches
//! them to callbacks once the physics for that tick is complete.

use serde::{Deserialize, Serialize};

use super::state::Team;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Ball entered a goal; `team` is the team credited with the goal
    GoalScored { team: Team },
    /// A front-bumper hit, possibly a demolition
    CarBump { bumper: u32, victim: u32, is_demo: bool },
    BoostPickup { car_id: u32, pad_index: usize },
    /// First tick of a new touch
    BallTouch { car_id: u32 },
}
