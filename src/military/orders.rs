//! Attack orders and the order book
//!
//! An order is created once by the scheduler and transitions exactly once
//! to `Completed`. The book's claim is a compare-and-swap on status: only
//! the caller that moves a matured order from `Traveling` to `Resolving`
//! may resolve it, and only the [`ClaimToken`] it received can complete or
//! release the order.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::damage::InfrastructureDamage;
use super::ledger::UnitStock;
use super::unit_type::Dispatch;
use crate::core::error::{ConflictSource, FrontlineError, Result};
use crate::core::types::{AttackId, NationId};

/// What an attack is aimed at
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TargetType {
    #[default]
    Territory,
    /// A named facility category (e.g. "oil_refinery")
    Infrastructure(String),
}

impl TargetType {
    pub fn is_territory(&self) -> bool {
        matches!(self, TargetType::Territory)
    }

    pub fn facility(&self) -> Option<&str> {
        match self {
            TargetType::Territory => None,
            TargetType::Infrastructure(name) => Some(name),
        }
    }
}

impl From<String> for TargetType {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("territory") {
            TargetType::Territory
        } else {
            TargetType::Infrastructure(value)
        }
    }
}

impl From<&str> for TargetType {
    fn from(value: &str) -> Self {
        TargetType::from(value.to_string())
    }
}

impl From<TargetType> for String {
    fn from(value: TargetType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::Territory => f.write_str("territory"),
            TargetType::Infrastructure(name) => f.write_str(name),
        }
    }
}

/// Lifecycle of an attack order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackStatus {
    Traveling,
    /// Claimed by a resolver; transient
    Resolving,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Attacker,
    Defender,
}

/// Outcome of a resolved attack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleResult {
    pub winner: Winner,
    pub attacker_losses: Dispatch,
    pub defender_losses: Dispatch,
    /// Attacking units returned home
    pub survivors: Dispatch,
    pub attack_power: f64,
    pub effective_power: f64,
    pub defense_power: f64,
    pub supply_penalty: f64,
    pub power_ratio: f64,
    pub infrastructure_damage: Option<InfrastructureDamage>,
}

impl BattleResult {
    pub fn attacker_won(&self) -> bool {
        self.winner == Winner::Attacker
    }
}

/// A time-delayed attack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackOrder {
    pub id: AttackId,
    pub attacker_id: NationId,
    pub defender_id: NationId,
    pub units_sent: Dispatch,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    /// Distance computed at launch; the supply penalty uses this value
    pub distance_km: f64,
    pub target_type: TargetType,
    pub status: AttackStatus,
    pub result: Option<BattleResult>,
}

impl AttackOrder {
    pub fn is_matured(&self, now: DateTime<Utc>) -> bool {
        self.status == AttackStatus::Traveling && self.arrival_time <= now
    }

    pub fn involves(&self, nation: NationId) -> bool {
        self.attacker_id == nation || self.defender_id == nation
    }
}

/// Proof of holding the resolution claim on one order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClaimToken(Uuid);

/// A won claim: the order as it was claimed plus the token to finish it
#[derive(Debug, Clone)]
pub struct Claim {
    pub token: ClaimToken,
    pub order: AttackOrder,
}

#[derive(Debug, Default)]
struct BookState {
    orders: AHashMap<AttackId, AttackOrder>,
    /// Present exactly while the order is `Resolving`
    claims: AHashMap<AttackId, ClaimToken>,
}

impl BookState {
    fn order_mut(&mut self, id: AttackId) -> Result<&mut AttackOrder> {
        self.orders.get_mut(&id).ok_or(FrontlineError::AttackNotFound(id))
    }

    /// Drop the claim on `id` if `token` holds it
    fn take_claim(&mut self, id: AttackId, token: ClaimToken, action: &str) -> Result<()> {
        match self.claims.get(&id) {
            Some(held) if *held == token => {
                self.claims.remove(&id);
                Ok(())
            }
            _ => Err(FrontlineError::ConcurrencyConflict {
                resource: ConflictSource::Claim,
                message: format!("attack {} {} without holding the claim", id, action),
            }),
        }
    }
}

/// In-memory store of attack orders
#[derive(Debug, Default)]
pub struct AttackBook {
    state: RwLock<BookState>,
}

impl AttackBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, order: AttackOrder) -> AttackId {
        let id = order.id;
        self.state.write().await.orders.insert(id, order);
        id
    }

    pub async fn get(&self, id: AttackId) -> Result<AttackOrder> {
        self.state
            .read()
            .await
            .orders
            .get(&id)
            .cloned()
            .ok_or(FrontlineError::AttackNotFound(id))
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.orders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.orders.is_empty()
    }

    /// Traveling orders whose arrival time has passed, earliest first
    pub async fn matured(&self, now: DateTime<Utc>) -> Vec<AttackOrder> {
        let mut due: Vec<AttackOrder> = self
            .state
            .read()
            .await
            .orders
            .values()
            .filter(|order| order.is_matured(now))
            .cloned()
            .collect();
        due.sort_by_key(|order| order.arrival_time);
        due
    }

    /// Earliest arrival among traveling orders
    pub async fn next_arrival(&self) -> Option<DateTime<Utc>> {
        self.state
            .read()
            .await
            .orders
            .values()
            .filter(|order| order.status == AttackStatus::Traveling)
            .map(|order| order.arrival_time)
            .min()
    }

    /// Claim a matured order for resolution
    ///
    /// Succeeds for exactly one caller per order. Everyone else gets a
    /// `ConcurrencyConflict` with `ConflictSource::Claim`. An order whose
    /// arrival time is after `now` cannot be claimed (`Validation`).
    pub async fn try_claim(&self, id: AttackId, now: DateTime<Utc>) -> Result<Claim> {
        let mut state = self.state.write().await;
        let order = state.order_mut(id)?;
        if order.status != AttackStatus::Traveling {
            return Err(FrontlineError::claim_lost(id));
        }
        if order.arrival_time > now {
            return Err(FrontlineError::Validation(format!(
                "attack {} has not arrived (due {})",
                id, order.arrival_time
            )));
        }
        order.status = AttackStatus::Resolving;
        let order = order.clone();

        let token = ClaimToken(Uuid::new_v4());
        state.claims.insert(id, token);
        info!(attack = %id, "Claimed attack");
        Ok(Claim { token, order })
    }

    /// Attach a result to a claimed order and mark it completed
    pub async fn complete(
        &self,
        id: AttackId,
        token: ClaimToken,
        result: BattleResult,
    ) -> Result<AttackOrder> {
        let mut state = self.state.write().await;
        state.order_mut(id)?;
        state.take_claim(id, token, "completed")?;
        let order = state.order_mut(id)?;
        order.status = AttackStatus::Completed;
        order.result = Some(result);
        Ok(order.clone())
    }

    /// Return a claimed order to `Traveling` after a failed resolution
    pub async fn release(&self, id: AttackId, token: ClaimToken) -> Result<()> {
        let mut state = self.state.write().await;
        state.order_mut(id)?;
        state.take_claim(id, token, "released")?;
        state.order_mut(id)?.status = AttackStatus::Traveling;
        Ok(())
    }

    /// Orders where the nation is attacker or defender, newest first
    pub async fn for_nation(&self, nation: NationId) -> Vec<AttackOrder> {
        let mut orders: Vec<AttackOrder> = self
            .state
            .read()
            .await
            .orders
            .values()
            .filter(|order| order.involves(nation))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.departure_time.cmp(&a.departure_time));
        orders
    }

    /// Units the nation currently has on the march
    pub async fn in_flight(&self, nation: NationId) -> UnitStock {
        let mut stock = UnitStock::new();
        for order in self.state.read().await.orders.values() {
            if order.attacker_id == nation && order.status != AttackStatus::Completed {
                stock.add_all(&order.units_sent);
            }
        }
        stock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::military::unit_type::UnitType;
    use chrono::Duration;

    fn order(arrival_in_minutes: i64) -> AttackOrder {
        let now = Utc::now();
        let mut units = Dispatch::new();
        units.insert(UnitType::Infantry, 10);
        AttackOrder {
            id: AttackId::new(),
            attacker_id: NationId::new(),
            defender_id: NationId::new(),
            units_sent: units,
            departure_time: now,
            arrival_time: now + Duration::minutes(arrival_in_minutes),
            distance_km: 100.0,
            target_type: TargetType::Territory,
            status: AttackStatus::Traveling,
            result: None,
        }
    }

    fn empty_result() -> BattleResult {
        BattleResult {
            winner: Winner::Defender,
            attacker_losses: Dispatch::new(),
            defender_losses: Dispatch::new(),
            survivors: Dispatch::new(),
            attack_power: 0.0,
            effective_power: 0.0,
            defense_power: 0.0,
            supply_penalty: 0.0,
            power_ratio: 0.0,
            infrastructure_damage: None,
        }
    }

    #[test]
    fn test_target_type_strings() {
        assert_eq!(TargetType::from("territory"), TargetType::Territory);
        assert_eq!(
            TargetType::from("oil_refinery"),
            TargetType::Infrastructure("oil_refinery".into())
        );
        assert_eq!(TargetType::Infrastructure("port".into()).to_string(), "port");
    }

    #[test]
    fn test_order_serializes_logical_schema() {
        let order = order(5);
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "traveling");
        assert_eq!(json["target_type"], "territory");
        assert_eq!(json["units_sent"]["infantry"], 10);
        assert!(json["result"].is_null());

        let back: AttackOrder = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }

    #[tokio::test]
    async fn test_matured_filters_by_time() {
        let book = AttackBook::new();
        let past = book.insert(order(-5)).await;
        book.insert(order(60)).await;

        let due = book.matured(Utc::now()).await;
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, past);
    }

    #[tokio::test]
    async fn test_claim_is_exclusive() {
        let book = AttackBook::new();
        let id = book.insert(order(-1)).await;

        let claim = book.try_claim(id, Utc::now()).await.unwrap();
        assert_eq!(claim.order.status, AttackStatus::Resolving);

        let second = book.try_claim(id, Utc::now()).await.unwrap_err();
        assert!(!second.is_retryable());

        // A resolving order is not matured any more
        assert!(book.matured(Utc::now()).await.is_empty());
    }

    #[tokio::test]
    async fn test_claim_refused_before_arrival() {
        let book = AttackBook::new();
        let id = book.insert(order(30)).await;

        let err = book.try_claim(id, Utc::now()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(book.get(id).await.unwrap().status, AttackStatus::Traveling);

        let later = Utc::now() + Duration::minutes(31);
        assert!(book.try_claim(id, later).await.is_ok());
    }

    #[tokio::test]
    async fn test_release_allows_reclaim() {
        let book = AttackBook::new();
        let id = book.insert(order(-1)).await;

        let claim = book.try_claim(id, Utc::now()).await.unwrap();
        book.release(id, claim.token).await.unwrap();
        assert_eq!(book.get(id).await.unwrap().status, AttackStatus::Traveling);
        assert!(book.try_claim(id, Utc::now()).await.is_ok());
    }

    #[tokio::test]
    async fn test_foreign_token_cannot_release_or_complete() {
        let book = AttackBook::new();
        let id = book.insert(order(-1)).await;
        let other = book.insert(order(-1)).await;

        let held = book.try_claim(id, Utc::now()).await.unwrap();
        let foreign = book.try_claim(other, Utc::now()).await.unwrap();

        let err = book.release(id, foreign.token).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConcurrencyConflict);
        assert!(!err.is_retryable());
        assert!(book.complete(id, foreign.token, empty_result()).await.is_err());

        // Still held by the original claimant, so nobody else can claim it
        assert_eq!(book.get(id).await.unwrap().status, AttackStatus::Resolving);
        assert!(book.try_claim(id, Utc::now()).await.is_err());

        let done = book.complete(id, held.token, empty_result()).await.unwrap();
        assert_eq!(done.status, AttackStatus::Completed);
    }

    #[tokio::test]
    async fn test_complete_requires_claim() {
        let book = AttackBook::new();
        let id = book.insert(order(-1)).await;

        let claim = book.try_claim(id, Utc::now()).await.unwrap();
        let done = book.complete(id, claim.token, empty_result()).await.unwrap();
        assert_eq!(done.status, AttackStatus::Completed);
        assert!(done.result.is_some());

        // Completed is terminal; the spent token no longer holds anything
        assert!(book.try_claim(id, Utc::now()).await.is_err());
        assert!(book.complete(id, claim.token, empty_result()).await.is_err());
        assert!(book.release(id, claim.token).await.is_err());
        assert_eq!(book.get(id).await.unwrap().status, AttackStatus::Completed);
    }

    #[tokio::test]
    async fn test_in_flight_counts_uncompleted() {
        let book = AttackBook::new();
        let first = order(10);
        let attacker = first.attacker_id;
        let mut second = order(-20);
        second.attacker_id = attacker;

        book.insert(first).await;
        let second_id = book.insert(second).await;
        assert_eq!(book.in_flight(attacker).await.count(UnitType::Infantry), 20);

        let claim = book.try_claim(second_id, Utc::now()).await.unwrap();
        book.complete(second_id, claim.token, empty_result()).await.unwrap();
        assert_eq!(book.in_flight(attacker).await.count(UnitType::Infantry), 10);
        assert_eq!(book.for_nation(attacker).await.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let book = AttackBook::new();
        let missing = AttackId::new();
        assert!(matches!(
            book.try_claim(missing, Utc::now()).await,
            Err(FrontlineError::AttackNotFound(id)) if id == missing
        ));
    }
}
