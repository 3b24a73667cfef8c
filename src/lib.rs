//! # Robot Arena Server
//!
//! Authoritative server for a turn-based 1v1 robot arena on a square grid.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ROBOT ARENA SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Match logic (deterministic)               │
//! │  ├── grid.rs     - Board geometry and spawn zones            │
//! │  ├── catalog.rs  - Robot and weapon archetypes               │
//! │  ├── trap.rs     - Hazard lifecycle                          │
//! │  ├── combat.rs   - Move/attack legality, spawn healing       │
//! │  ├── state.rs    - Competitors and match state               │
//! │  └── engine.rs   - Intents, turns, outcome, replay           │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── server.rs   - WebSocket server                          │
//! │  ├── protocol.rs - Message types                             │
//! │  └── session.rs  - Seats, tokens, broadcasts                 │
//! │                                                              │
//! │  config.rs       - Environment configuration                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in game logic
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from seeded Xorshift128+, re-seeded per turn
//!
//! Given the same seed and the same intent sequence, a match produces
//! **identical results**, including trap rolls and competitor ids.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_SCALE};
pub use core::rng::DeterministicRng;
pub use game::engine::{ArenaEngine, Intent, MatchConfig};
pub use game::state::{CompetitorId, MatchPhase, MatchState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
