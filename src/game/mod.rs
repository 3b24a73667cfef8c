//! Game Logic Module
//!
//! The authoritative match core. No I/O, 100% deterministic.
//!
//! ## Module Structure
//!
//! - `grid`: Board geometry, adjacency, spawn zones
//! - `catalog`: Robot and weapon archetypes
//! - `trap`: Hazard lifecycle and seeded resolution
//! - `combat`: Move/attack legality, damage, spawn healing
//! - `state`: Competitors and the match aggregate
//! - `engine`: Intent handling, turn rotation, outcome, replay
//! - `events`: Outcome events for the transport layer
//! - `error`: Engine error taxonomy

pub mod grid;
pub mod catalog;
pub mod trap;
pub mod combat;
pub mod state;
pub mod engine;
pub mod events;
pub mod error;

// Re-export key types
pub use catalog::{Catalog, CatalogError};
pub use engine::{replay, ArenaEngine, Intent, MatchConfig};
pub use error::{EngineError, ErrorClass, RejectReason, Rejection};
pub use events::{GameEvent, GameEventData};
pub use grid::{Grid, GridPos};
pub use state::{Competitor, CompetitorId, MatchOutcome, MatchPhase, MatchState};
pub use trap::{TrapDefinition, TrapInstance, TrapPhase};
