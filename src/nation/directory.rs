//! Nation collaborators consumed by the conflict engine
//!
//! The engine only sees nations through [`NationDirectory`] and
//! [`WarPolicy`]. Storage behind them is the application's business;
//! [`NationRegistry`] and [`CasusBelliRegistry`] are in-memory versions.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::RwLock;

use super::political::PoliticalSystem;
use crate::core::error::{FrontlineError, Result};
use crate::core::types::{GeoPoint, NationId};

/// Treasury, government and geography of nations
pub trait NationDirectory: Send + Sync {
    fn treasury(&self, nation: NationId) -> impl Future<Output = Result<f64>> + Send;

    /// Atomically check and debit. Fails with `InsufficientFunds` and leaves
    /// the balance untouched when the treasury is short.
    fn debit_treasury(
        &self,
        nation: NationId,
        amount: f64,
    ) -> impl Future<Output = Result<f64>> + Send;

    fn political_system(
        &self,
        nation: NationId,
    ) -> impl Future<Output = Result<PoliticalSystem>> + Send;

    /// `Ok(None)` when the nation has not claimed territory yet
    fn territory_center(
        &self,
        nation: NationId,
    ) -> impl Future<Output = Result<Option<GeoPoint>>> + Send;
}

/// Casus belli lookup
pub trait WarPolicy: Send + Sync {
    fn has_war_justification(
        &self,
        attacker: NationId,
        defender: NationId,
    ) -> impl Future<Output = bool> + Send;
}

/// A nation as the engine sees it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nation {
    pub id: NationId,
    pub name: String,
    pub treasury: f64,
    pub political_system: PoliticalSystem,
    pub territory_center: Option<GeoPoint>,
}

impl Nation {
    pub fn new(name: impl Into<String>, political_system: PoliticalSystem) -> Self {
        Self {
            id: NationId::new(),
            name: name.into(),
            treasury: 0.0,
            political_system,
            territory_center: None,
        }
    }

    pub fn with_treasury(mut self, treasury: f64) -> Self {
        self.treasury = treasury;
        self
    }

    pub fn with_center(mut self, center: GeoPoint) -> Self {
        self.territory_center = Some(center);
        self
    }
}

/// In-memory nation store
#[derive(Debug, Default)]
pub struct NationRegistry {
    nations: RwLock<AHashMap<NationId, Nation>>,
}

impl NationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, nation: Nation) -> NationId {
        let id = nation.id;
        self.nations.write().await.insert(id, nation);
        id
    }

    pub async fn get(&self, nation: NationId) -> Result<Nation> {
        self.nations
            .read()
            .await
            .get(&nation)
            .cloned()
            .ok_or(FrontlineError::NationNotFound(nation))
    }

    pub async fn credit_treasury(&self, nation: NationId, amount: f64) -> Result<f64> {
        if amount < 0.0 {
            return Err(FrontlineError::Validation(format!(
                "cannot credit negative amount {}",
                amount
            )));
        }
        let mut nations = self.nations.write().await;
        let record = nations
            .get_mut(&nation)
            .ok_or(FrontlineError::NationNotFound(nation))?;
        record.treasury += amount;
        Ok(record.treasury)
    }

    pub async fn set_political_system(&self, nation: NationId, system: PoliticalSystem) -> Result<()> {
        let mut nations = self.nations.write().await;
        let record = nations
            .get_mut(&nation)
            .ok_or(FrontlineError::NationNotFound(nation))?;
        record.political_system = system;
        Ok(())
    }

    pub async fn set_territory_center(&self, nation: NationId, center: GeoPoint) -> Result<()> {
        let mut nations = self.nations.write().await;
        let record = nations
            .get_mut(&nation)
            .ok_or(FrontlineError::NationNotFound(nation))?;
        record.territory_center = Some(center);
        Ok(())
    }
}

impl NationDirectory for NationRegistry {
    async fn treasury(&self, nation: NationId) -> Result<f64> {
        Ok(self.get(nation).await?.treasury)
    }

    async fn debit_treasury(&self, nation: NationId, amount: f64) -> Result<f64> {
        if amount < 0.0 {
            return Err(FrontlineError::Validation(format!(
                "cannot debit negative amount {}",
                amount
            )));
        }
        let mut nations = self.nations.write().await;
        let record = nations
            .get_mut(&nation)
            .ok_or(FrontlineError::NationNotFound(nation))?;
        if record.treasury < amount {
            return Err(FrontlineError::InsufficientFunds {
                needed: amount,
                available: record.treasury,
            });
        }
        record.treasury -= amount;
        Ok(record.treasury)
    }

    async fn political_system(&self, nation: NationId) -> Result<PoliticalSystem> {
        Ok(self.get(nation).await?.political_system)
    }

    async fn territory_center(&self, nation: NationId) -> Result<Option<GeoPoint>> {
        Ok(self.get(nation).await?.territory_center)
    }
}

/// Granted war justifications, keyed by (attacker, defender)
#[derive(Debug, Default)]
pub struct CasusBelliRegistry {
    granted: RwLock<AHashSet<(NationId, NationId)>>,
}

impl CasusBelliRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn grant(&self, attacker: NationId, defender: NationId) {
        self.granted.write().await.insert((attacker, defender));
    }

    pub async fn revoke(&self, attacker: NationId, defender: NationId) -> bool {
        self.granted.write().await.remove(&(attacker, defender))
    }
}

impl WarPolicy for CasusBelliRegistry {
    async fn has_war_justification(&self, attacker: NationId, defender: NationId) -> bool {
        self.granted.read().await.contains(&(attacker, defender))
    }
}
