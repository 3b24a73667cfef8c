//! Process Configuration
//!
//! Environment-style settings, read once at startup.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::game::engine::{MatchConfig, DEFAULT_ACTION_POINTS};
use crate::game::grid::{Grid, DEFAULT_GRID_COLS, DEFAULT_GRID_ROWS, MIN_GRID_SIDE};
use crate::game::state::MAX_COMPETITORS;
use crate::game::trap::default_trap_definitions;
use crate::network::server::ServerConfig;

/// Default Reference Catalog location.
pub const DEFAULT_CATALOG_PATH: &str = "data/seed.json";

/// Invalid environment value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Value could not be parsed.
    #[error("{var}: cannot parse {value:?}")]
    Parse {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
    },
    /// Value parsed but is not allowed.
    #[error("{var}: {reason}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// What is wrong
        reason: String,
    },
}

/// All process settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Bind host
    pub host: IpAddr,
    /// Bind port
    pub port: u16,
    /// Grid width
    pub grid_cols: i32,
    /// Grid height
    pub grid_rows: i32,
    /// Seats per match
    pub max_players: usize,
    /// Action points per turn
    pub ap_per_turn: u32,
    /// Reference Catalog JSON file
    pub catalog_path: PathBuf,
    /// Fixed match seed; random when unset
    pub arena_seed: Option<u64>,
    /// Concurrent WebSocket connections
    pub max_connections: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 8000,
            grid_cols: DEFAULT_GRID_COLS,
            grid_rows: DEFAULT_GRID_ROWS,
            max_players: MAX_COMPETITORS,
            ap_per_turn: DEFAULT_ACTION_POINTS,
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            arena_seed: None,
            max_connections: 64,
        }
    }
}

impl ArenaConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            host: parse_or(&lookup, "HOST", defaults.host)?,
            port: parse_or(&lookup, "PORT", defaults.port)?,
            grid_cols: parse_or(&lookup, "GRID_COLS", defaults.grid_cols)?,
            grid_rows: parse_or(&lookup, "GRID_ROWS", defaults.grid_rows)?,
            max_players: parse_or(&lookup, "MAX_PLAYERS", defaults.max_players)?,
            ap_per_turn: parse_or(&lookup, "AP_PER_TURN", defaults.ap_per_turn)?,
            catalog_path: lookup("CATALOG_PATH").map(PathBuf::from).unwrap_or(defaults.catalog_path),
            arena_seed: match lookup("ARENA_SEED") {
                Some(raw) => Some(parse("ARENA_SEED", &raw)?),
                None => None,
            },
            max_connections: parse_or(&lookup, "MAX_CONNECTIONS", defaults.max_connections)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_players != MAX_COMPETITORS {
            return Err(ConfigError::Invalid {
                var: "MAX_PLAYERS",
                reason: format!("only {} is supported", MAX_COMPETITORS),
            });
        }
        if self.ap_per_turn == 0 {
            return Err(ConfigError::Invalid { var: "AP_PER_TURN", reason: "must be at least 1".into() });
        }
        if !Grid::new(self.grid_cols, self.grid_rows).is_playable() {
            let var = if self.grid_cols < MIN_GRID_SIDE { "GRID_COLS" } else { "GRID_ROWS" };
            return Err(ConfigError::Invalid {
                var,
                reason: format!("must be at least {}", MIN_GRID_SIDE),
            });
        }
        Ok(())
    }

    /// Network settings.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: SocketAddr::new(self.host, self.port),
            max_connections: self.max_connections,
        }
    }

    /// Engine settings. Trap cells outside the grid are dropped, as are
    /// traps left without cells.
    pub fn match_config(&self) -> MatchConfig {
        let grid = Grid::new(self.grid_cols, self.grid_rows);
        let traps = default_trap_definitions()
            .into_iter()
            .filter_map(|mut def| {
                def.cells.retain(|cell| grid.in_bounds(*cell));
                (!def.cells.is_empty()).then_some(def)
            })
            .collect();

        MatchConfig { grid, action_points: self.ap_per_turn, traps }
    }

    /// The configured seed, or a fresh random one.
    pub fn seed(&self) -> u64 {
        self.arena_seed.unwrap_or_else(|| {
            let (high, _) = uuid::Uuid::new_v4().as_u64_pair();
            high
        })
    }
}

fn parse<T: FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Parse { var, value: raw.to_string() })
}

fn parse_or<T, F>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) => parse(var, &raw),
        None => Ok(default),
    }
}
