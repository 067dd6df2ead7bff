//! Per-nation unit stock
//!
//! The ledger is the only writer of unit counts. Every nation's stock sits
//! behind its own async mutex, so train/add/remove on one nation are
//! serialized while different nations proceed in parallel. Operations that
//! touch two nations lock them in id order.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::unit_type::{Dispatch, UnitType};
use crate::core::error::{FrontlineError, Result};
use crate::core::types::NationId;
use crate::nation::NationDirectory;

/// Unit counts held by one nation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitStock {
    /// Depleted entries are removed rather than kept at zero
    units: Dispatch,
}

impl UnitStock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dispatch(units: Dispatch) -> Self {
        let mut stock = Self::new();
        stock.add_all(&units);
        stock
    }

    pub fn count(&self, unit: UnitType) -> u32 {
        self.units.get(&unit).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.units.values().map(|&c| u64::from(c)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &Dispatch {
        &self.units
    }

    /// Add units; counts saturate at `u32::MAX`
    pub fn add(&mut self, unit: UnitType, count: u32) {
        if count == 0 {
            return;
        }
        let held = self.units.entry(unit).or_insert(0);
        *held = held.saturating_add(count);
    }

    pub fn remove(&mut self, unit: UnitType, count: u32) -> Result<()> {
        let available = self.count(unit);
        if available < count {
            return Err(FrontlineError::InsufficientUnits {
                unit_type: unit,
                requested: count,
                available,
            });
        }
        if available == count {
            self.units.remove(&unit);
        } else {
            self.units.insert(unit, available - count);
        }
        Ok(())
    }

    /// Check that every entry of `required` is covered
    pub fn covers(&self, required: &Dispatch) -> Result<()> {
        for (&unit, &count) in required {
            let available = self.count(unit);
            if available < count {
                return Err(FrontlineError::InsufficientUnits {
                    unit_type: unit,
                    requested: count,
                    available,
                });
            }
        }
        Ok(())
    }

    /// Remove every entry of `units`, or nothing at all
    pub fn remove_all(&mut self, units: &Dispatch) -> Result<()> {
        self.covers(units)?;
        for (&unit, &count) in units {
            self.remove(unit, count)?;
        }
        Ok(())
    }

    pub fn add_all(&mut self, units: &Dispatch) {
        for (&unit, &count) in units {
            self.add(unit, count);
        }
    }
}

/// Atomic per-nation unit ledger
#[derive(Debug)]
pub struct UnitLedger<N> {
    directory: Arc<N>,
    stocks: RwLock<AHashMap<NationId, Arc<Mutex<UnitStock>>>>,
}

impl<N: NationDirectory> UnitLedger<N> {
    pub fn new(directory: Arc<N>) -> Self {
        Self {
            directory,
            stocks: RwLock::new(AHashMap::new()),
        }
    }

    pub fn directory(&self) -> &Arc<N> {
        &self.directory
    }

    async fn slot(&self, nation: NationId) -> Arc<Mutex<UnitStock>> {
        if let Some(slot) = self.stocks.read().await.get(&nation) {
            return Arc::clone(slot);
        }
        Arc::clone(self.stocks.write().await.entry(nation).or_default())
    }

    /// Snapshot of a nation's current stock
    pub async fn stock(&self, nation: NationId) -> UnitStock {
        self.slot(nation).await.lock().await.clone()
    }

    pub async fn count(&self, nation: NationId, unit: UnitType) -> u32 {
        self.slot(nation).await.lock().await.count(unit)
    }

    /// Train units, debiting the treasury. Returns the amount debited.
    ///
    /// The nation's stock stays locked across the treasury debit, so a
    /// concurrent remove or resolution cannot interleave with training.
    pub async fn train(&self, nation: NationId, unit: UnitType, count: u32) -> Result<f64> {
        if count == 0 {
            return Err(FrontlineError::Validation(
                "must train at least one unit".into(),
            ));
        }

        let slot = self.slot(nation).await;
        let mut stock = slot.lock().await;

        let system = self.directory.political_system(nation).await?;
        let cost = unit.stats().cost * f64::from(count) * system.cost_multiplier();
        let remaining = self.directory.debit_treasury(nation, cost).await?;

        stock.add(unit, count);
        debug!(
            %nation, %unit, count, cost, remaining,
            "Trained units"
        );
        Ok(cost)
    }

    /// Train by catalog name (`InvalidUnitType` for unknown names)
    pub async fn train_named(&self, nation: NationId, unit: &str, count: u32) -> Result<f64> {
        let unit: UnitType = unit.parse()?;
        self.train(nation, unit, count).await
    }

    pub async fn add(&self, nation: NationId, unit: UnitType, count: u32) {
        let slot = self.slot(nation).await;
        slot.lock().await.add(unit, count);
        debug!(%nation, %unit, count, "Added units");
    }

    pub async fn remove(&self, nation: NationId, unit: UnitType, count: u32) -> Result<()> {
        let slot = self.slot(nation).await;
        slot.lock().await.remove(unit, count)?;
        debug!(%nation, %unit, count, "Removed units");
        Ok(())
    }

    pub async fn add_all(&self, nation: NationId, units: &Dispatch) {
        let slot = self.slot(nation).await;
        slot.lock().await.add_all(units);
    }

    /// All-or-nothing removal of several unit types
    pub async fn remove_all(&self, nation: NationId, units: &Dispatch) -> Result<()> {
        let slot = self.slot(nation).await;
        slot.lock().await.remove_all(units)?;
        debug!(%nation, ?units, "Removed unit batch");
        Ok(())
    }

    /// Run `apply` against copies of two nations' stocks under both locks
    ///
    /// Both copies are written back only if `apply` returns `Ok`, so a
    /// failure leaves both nations exactly as they were.
    pub async fn settle<T, F>(&self, first: NationId, second: NationId, apply: F) -> Result<T>
    where
        F: FnOnce(&mut UnitStock, &mut UnitStock) -> Result<T>,
    {
        if first == second {
            return Err(FrontlineError::Validation(
                "cannot settle a nation against itself".into(),
            ));
        }

        let first_slot = self.slot(first).await;
        let second_slot = self.slot(second).await;

        // Fixed lock order prevents two settlements deadlocking
        let (mut first_guard, mut second_guard) = if first < second {
            let a = first_slot.lock().await;
            let b = second_slot.lock().await;
            (a, b)
        } else {
            let b = second_slot.lock().await;
            let a = first_slot.lock().await;
            (a, b)
        };

        let mut first_next = first_guard.clone();
        let mut second_next = second_guard.clone();
        let out = apply(&mut first_next, &mut second_next)?;

        *first_guard = first_next;
        *second_guard = second_next;
        Ok(out)
    }
}
