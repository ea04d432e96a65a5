//! Deterministic simulation module
//!
//! All gameplay physics lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by car id)
//! - No I/O or threading

pub mod ball;
pub mod body;
pub mod boost_pad;
pub mod car;
pub mod collision;
pub mod dropshot;
pub mod events;
pub mod geometry;
pub mod kickoff;
pub mod mutator;
pub mod state;
pub mod tick;

pub use boost_pad::{BoostPad, PadGrid, PadLookup, default_layout};
pub use car::{Car, CarConfig, WheelPairConfig};
pub use collision::{CollisionResult, Obb};
pub use dropshot::TileState;
pub use events::GameEvent;
pub use geometry::ArenaGeometry;
pub use kickoff::{SpawnLocation, kickoff_locations, respawn_locations};
pub use mutator::{DemoMode, MutatorConfig};
pub use state::{
    BallHitInfo, BallState, BoostPadConfig, BoostPadState, CarContact, CarControls, CarState,
    CarStats, DropshotInfo, GameMode, GameState, HeatseekerInfo, RngState, Team, WorldContact,
};
pub use tick::{TickContext, tick};
