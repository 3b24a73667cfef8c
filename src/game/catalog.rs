//! Reference Catalog
//!
//! Immutable lookup of robot archetypes (max HP) and weapon archetypes
//! (damage, range). Loaded once at startup, shared read-only afterwards.
//!
//! ## Format
//!
//! ```json
//! {
//!   "robots":  [{ "id": "scout", "name": "Scout", "hpMax": 80 }],
//!   "weapons": [{ "id": "blaster", "name": "Blaster", "damage": 20, "range": 3 }]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for hpMax / damage / range.
///
/// Keeps every catalog value representable in Q16.16 with headroom for
/// healing arithmetic.
pub const MAX_CATALOG_VALUE: i32 = 10_000;

// =============================================================================
// ARCHETYPES
// =============================================================================

/// A robot chassis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotArchetype {
    /// Catalog identifier
    pub id: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Maximum hit points
    #[serde(rename = "hpMax")]
    pub hp_max: i32,
}

/// A weapon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponArchetype {
    /// Catalog identifier
    pub id: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Damage per hit
    pub damage: i32,
    /// Maximum Manhattan attack distance
    pub range: u32,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Catalog loading / validation failure.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// File could not be read.
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    /// Document is not valid catalog JSON.
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    /// Two entries of the same kind share an id.
    #[error("duplicate {kind} id: {id}")]
    Duplicate {
        /// "robot" or "weapon"
        kind: &'static str,
        /// Offending id
        id: String,
    },
    /// A numeric field is out of range.
    #[error("{kind} {id}: {field} must be in 1..={max}")]
    InvalidValue {
        /// "robot" or "weapon"
        kind: &'static str,
        /// Offending id
        id: String,
        /// Field name
        field: &'static str,
        /// Inclusive upper bound
        max: i32,
    },
}

// =============================================================================
// CATALOG
// =============================================================================

#[derive(Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    robots: Vec<RobotArchetype>,
    #[serde(default)]
    weapons: Vec<WeaponArchetype>,
}

/// Robot and weapon archetypes by id.
///
/// BTreeMap keeps the `seed` payload sent to clients in a stable order.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    robots: BTreeMap<String, RobotArchetype>,
    weapons: BTreeMap<String, WeaponArchetype>,
}

impl Catalog {
    /// Build a catalog from archetype lists, validating ids and values.
    pub fn new(
        robots: Vec<RobotArchetype>,
        weapons: Vec<WeaponArchetype>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();

        for robot in robots {
            check_value("robot", &robot.id, "hpMax", robot.hp_max)?;
            if catalog.robots.contains_key(&robot.id) {
                return Err(CatalogError::Duplicate { kind: "robot", id: robot.id });
            }
            catalog.robots.insert(robot.id.clone(), robot);
        }

        for weapon in weapons {
            check_value("weapon", &weapon.id, "damage", weapon.damage)?;
            let range = i32::try_from(weapon.range).unwrap_or(i32::MAX);
            check_value("weapon", &weapon.id, "range", range)?;
            if catalog.weapons.contains_key(&weapon.id) {
                return Err(CatalogError::Duplicate { kind: "weapon", id: weapon.id });
            }
            catalog.weapons.insert(weapon.id.clone(), weapon);
        }

        Ok(catalog)
    }

    /// Parse a catalog JSON document.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(json)?;
        Self::new(doc.robots, doc.weapons)
    }

    /// Load a catalog JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Look up a robot archetype.
    pub fn robot(&self, id: &str) -> Option<&RobotArchetype> {
        self.robots.get(id)
    }

    /// Look up a weapon archetype.
    pub fn weapon(&self, id: &str) -> Option<&WeaponArchetype> {
        self.weapons.get(id)
    }

    /// All robots in id order.
    pub fn robots(&self) -> impl Iterator<Item = &RobotArchetype> {
        self.robots.values()
    }

    /// All weapons in id order.
    pub fn weapons(&self) -> impl Iterator<Item = &WeaponArchetype> {
        self.weapons.values()
    }
}

fn check_value(
    kind: &'static str,
    id: &str,
    field: &'static str,
    value: i32,
) -> Result<(), CatalogError> {
    if (1..=MAX_CATALOG_VALUE).contains(&value) {
        Ok(())
    } else {
        Err(CatalogError::InvalidValue {
            kind,
            id: id.to_string(),
            field,
            max: MAX_CATALOG_VALUE,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
