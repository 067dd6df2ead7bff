//! Infrastructure damage notifications toward the economy
//!
//! The engine only reports damage. Applying it to production or stability
//! belongs to the economy side, which receives reports through an
//! [`InfrastructureSink`] without the engine waiting on it.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::core::types::NationId;

/// Percent damage dealt to one of a nation's facilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureDamage {
    pub nation: NationId,
    pub facility: String,
    pub percent: f64,
}

/// `min(cap, ratio * per_ratio)`, never negative
pub fn damage_percent(power_ratio: f64, per_ratio: f64, cap: f64) -> f64 {
    (power_ratio * per_ratio).clamp(0.0, cap)
}

/// Fire-and-forget receiver of damage reports
pub trait InfrastructureSink: Send + Sync {
    fn notify(&self, damage: InfrastructureDamage);
}

impl InfrastructureSink for UnboundedSender<InfrastructureDamage> {
    fn notify(&self, damage: InfrastructureDamage) {
        if let Err(err) = self.send(damage) {
            warn!(nation = %err.0.nation, facility = %err.0.facility, "Economy receiver dropped; damage report lost");
        }
    }
}

/// Keeps every report in memory
#[derive(Debug, Default)]
pub struct DamageLog {
    reports: Mutex<Vec<InfrastructureDamage>>,
}

impl DamageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<InfrastructureDamage> {
        match self.reports.lock() {
            Ok(reports) => reports.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl InfrastructureSink for DamageLog {
    fn notify(&self, damage: InfrastructureDamage) {
        match self.reports.lock() {
            Ok(mut reports) => reports.push(damage),
            Err(poisoned) => poisoned.into_inner().push(damage),
        }
    }
}
