//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for nations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NationId(pub Uuid);

impl NationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for attack orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttackId(pub Uuid);

impl AttackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Latitude/longitude in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nation_id_uniqueness() {
        let a = NationId::new();
        let b = NationId::new();
        assert_ne!(a, b);
        assert_eq!(a, a);
    }

    #[test]
    fn test_nation_id_ordering_is_total() {
        let a = NationId::new();
        let b = NationId::new();
        assert!(a < b || b < a);
    }

    #[test]
    fn test_attack_id_hash() {
        use std::collections::HashMap;
        let id = AttackId::new();
        let mut map: HashMap<AttackId, &str> = HashMap::new();
        map.insert(id, "raid");
        assert_eq!(map.get(&id), Some(&"raid"));
    }
}
