//! Unit types and their catalog stats
//!
//! The catalog is static configuration. It is never mutated, so it can be
//! read from any task without synchronization.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::core::error::FrontlineError;

/// Type of military unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    Infantry,
    Tank,
    Aircraft,
    Navy,
    Missile,
}

/// Static properties of a unit type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitStats {
    /// Treasury cost to train one unit (before political modifiers)
    pub cost: f64,
    pub attack: u32,
    pub defense: u32,
    /// Kilometers per minute of travel
    pub speed: f64,
}

/// Unit type → count. Ordered so iteration (and RNG draws) are stable.
pub type Dispatch = BTreeMap<UnitType, u32>;

impl UnitType {
    pub const ALL: [UnitType; 5] = [
        UnitType::Infantry,
        UnitType::Tank,
        UnitType::Aircraft,
        UnitType::Navy,
        UnitType::Missile,
    ];

    pub fn stats(&self) -> UnitStats {
        match self {
            UnitType::Infantry => UnitStats {
                cost: 100.0,
                attack: 10,
                defense: 15,
                speed: 1.0,
            },
            UnitType::Tank => UnitStats {
                cost: 500.0,
                attack: 50,
                defense: 40,
                speed: 0.7,
            },
            UnitType::Aircraft => UnitStats {
                cost: 1000.0,
                attack: 80,
                defense: 20,
                speed: 3.0,
            },
            UnitType::Navy => UnitStats {
                cost: 2000.0,
                attack: 60,
                defense: 70,
                speed: 0.5,
            },
            // Missiles are one-way: no defensive value
            UnitType::Missile => UnitStats {
                cost: 5000.0,
                attack: 200,
                defense: 0,
                speed: 10.0,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::Infantry => "infantry",
            UnitType::Tank => "tank",
            UnitType::Aircraft => "aircraft",
            UnitType::Navy => "navy",
            UnitType::Missile => "missile",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitType {
    type Err = FrontlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        UnitType::ALL
            .into_iter()
            .find(|unit| unit.as_str() == name)
            .ok_or_else(|| FrontlineError::InvalidUnitType(s.to_string()))
    }
}

/// Build a dispatch from loosely typed `(name, count)` pairs
///
/// Counts for repeated names are summed.
pub fn parse_dispatch<'a, I>(entries: I) -> Result<Dispatch, FrontlineError>
where
    I: IntoIterator<Item = (&'a str, u32)>,
{
    let mut dispatch = Dispatch::new();
    for (name, count) in entries {
        let unit: UnitType = name.parse()?;
        *dispatch.entry(unit).or_insert(0) += count;
    }
    Ok(dispatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("Tank".parse::<UnitType>().unwrap(), UnitType::Tank);
        assert_eq!(" NAVY ".parse::<UnitType>().unwrap(), UnitType::Navy);
    }

    #[test]
    fn test_unknown_unit_type() {
        let err = "cavalry".parse::<UnitType>().unwrap_err();
        assert!(matches!(err, FrontlineError::InvalidUnitType(name) if name == "cavalry"));
    }

    #[test]
    fn test_catalog_stats() {
        assert_eq!(UnitType::Tank.stats().attack, 50);
        assert_eq!(UnitType::Infantry.stats().defense, 15);
        assert_eq!(UnitType::Missile.stats().defense, 0);
        // Navy is the slowest unit in the catalog
        let slowest = UnitType::ALL
            .iter()
            .min_by(|a, b| a.stats().speed.total_cmp(&b.stats().speed))
            .copied();
        assert_eq!(slowest, Some(UnitType::Navy));
    }

    #[test]
    fn test_parse_dispatch_sums_duplicates() {
        let dispatch = parse_dispatch([("infantry", 5), ("Infantry", 3), ("tank", 2)]).unwrap();
        assert_eq!(dispatch.get(&UnitType::Infantry), Some(&8));
        assert_eq!(dispatch.get(&UnitType::Tank), Some(&2));
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&UnitType::Aircraft).unwrap();
        assert_eq!(json, "\"aircraft\"");
    }
}
