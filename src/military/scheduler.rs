//! Attack scheduling
//!
//! Launching validates the attacker's right to wage war, deducts the
//! dispatched units, then records a traveling order. Units leave the
//! attacker's stock before the order exists, so the same units can never
//! be sent twice.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::damage::{damage_percent, InfrastructureDamage, InfrastructureSink};
use super::ledger::UnitLedger;
use super::orders::{AttackBook, AttackOrder, AttackStatus, TargetType};
use super::travel::TravelPlan;
use super::unit_type::{Dispatch, UnitType};
use crate::core::clock::Clock;
use crate::core::config::EngineConfig;
use crate::core::error::{FrontlineError, Result};
use crate::core::types::{AttackId, NationId};
use crate::nation::{NationDirectory, WarPolicy};

/// Returned to the caller of a successful launch
#[derive(Debug, Clone, Serialize)]
pub struct LaunchReceipt {
    pub order: AttackOrder,
    pub distance_km: f64,
    pub travel_minutes: i64,
    pub arrival: DateTime<Utc>,
}

/// Outcome of an immediate missile strike
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrikeReport {
    pub missiles_used: u32,
    pub damage: f64,
    pub target: String,
    pub percent: f64,
}

/// Creates attack orders
pub struct AttackScheduler<N, P, S, C> {
    ledger: Arc<UnitLedger<N>>,
    book: Arc<AttackBook>,
    policy: Arc<P>,
    sink: Arc<S>,
    clock: Arc<C>,
    config: EngineConfig,
}

impl<N, P, S, C> AttackScheduler<N, P, S, C>
where
    N: NationDirectory,
    P: WarPolicy,
    S: InfrastructureSink,
    C: Clock,
{
    pub fn new(
        ledger: Arc<UnitLedger<N>>,
        book: Arc<AttackBook>,
        policy: Arc<P>,
        sink: Arc<S>,
        clock: Arc<C>,
        config: EngineConfig,
    ) -> Self {
        Self {
            ledger,
            book,
            policy,
            sink,
            clock,
            config,
        }
    }

    async fn authorize(&self, attacker: NationId, defender: NationId) -> Result<()> {
        if attacker == defender {
            return Err(FrontlineError::Validation(
                "a nation cannot attack itself".into(),
            ));
        }

        let directory = self.ledger.directory();
        let system = directory.political_system(attacker).await?;
        // Defender must exist even when no justification is needed
        directory.political_system(defender).await?;

        if system.requires_war_justification()
            && !self.policy.has_war_justification(attacker, defender).await
        {
            return Err(FrontlineError::WarNotAuthorized { attacker, defender });
        }
        Ok(())
    }

    /// Launch a time-delayed attack
    ///
    /// All-or-nothing: on any error no units are deducted and no order is
    /// created.
    pub async fn launch_attack(
        &self,
        attacker: NationId,
        defender: NationId,
        dispatch: Dispatch,
        target: TargetType,
    ) -> Result<LaunchReceipt> {
        if dispatch.is_empty() || dispatch.values().any(|&count| count == 0) {
            return Err(FrontlineError::Validation(
                "dispatch must contain at least one unit of each listed type".into(),
            ));
        }

        self.authorize(attacker, defender).await?;

        let directory = self.ledger.directory();
        let from = directory.territory_center(attacker).await?;
        let to = directory.territory_center(defender).await?;
        let departure = self.clock.now();
        let plan = TravelPlan::compute(
            from,
            to,
            &dispatch,
            departure,
            self.config.nominal_distance_km,
        );

        self.ledger.remove_all(attacker, &dispatch).await?;

        let order = AttackOrder {
            id: AttackId::new(),
            attacker_id: attacker,
            defender_id: defender,
            units_sent: dispatch,
            departure_time: plan.departure,
            arrival_time: plan.arrival,
            distance_km: plan.distance_km,
            target_type: target,
            status: AttackStatus::Traveling,
            result: None,
        };
        self.book.insert(order.clone()).await;

        info!(
            attack = %order.id,
            %attacker,
            %defender,
            target = %order.target_type,
            distance_km = plan.distance_km,
            travel_minutes = plan.travel_minutes,
            "Attack launched"
        );

        Ok(LaunchReceipt {
            order,
            distance_km: plan.distance_km,
            travel_minutes: plan.travel_minutes,
            arrival: plan.arrival,
        })
    }

    /// Fire missiles at a facility; resolves immediately
    pub async fn launch_precision_strike(
        &self,
        attacker: NationId,
        defender: NationId,
        facility: &str,
        missiles: u32,
    ) -> Result<StrikeReport> {
        if missiles == 0 {
            return Err(FrontlineError::Validation(
                "precision strike needs at least one missile".into(),
            ));
        }
        if facility.trim().is_empty() {
            return Err(FrontlineError::Validation(
                "precision strike needs a target facility".into(),
            ));
        }

        self.authorize(attacker, defender).await?;
        self.ledger.remove(attacker, UnitType::Missile, missiles).await?;

        let damage = f64::from(missiles) * f64::from(UnitType::Missile.stats().attack);
        let percent = damage_percent(
            damage / 100.0,
            self.config.infrastructure_damage_per_ratio,
            self.config.infrastructure_damage_cap,
        );
        self.sink.notify(InfrastructureDamage {
            nation: defender,
            facility: facility.to_string(),
            percent,
        });

        info!(%attacker, %defender, facility, missiles, damage, percent, "Precision strike");

        Ok(StrikeReport {
            missiles_used: missiles,
            damage,
            target: facility.to_string(),
            percent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::types::GeoPoint;
    use crate::military::damage::DamageLog;
    use crate::nation::{CasusBelliRegistry, Nation, NationRegistry, PoliticalSystem};

    type TestScheduler = AttackScheduler<NationRegistry, CasusBelliRegistry, DamageLog, ManualClock>;

    struct Fixture {
        scheduler: TestScheduler,
        ledger: Arc<UnitLedger<NationRegistry>>,
        book: Arc<AttackBook>,
        policy: Arc<CasusBelliRegistry>,
        sink: Arc<DamageLog>,
        attacker: NationId,
        defender: NationId,
    }

    async fn fixture(attacker_system: PoliticalSystem) -> Fixture {
        let registry = Arc::new(NationRegistry::new());
        let attacker = registry
            .register(
                Nation::new("Red", attacker_system)
                    .with_treasury(100_000.0)
                    .with_center(GeoPoint::new(0.0, 0.0)),
            )
            .await;
        let defender = registry
            .register(
                Nation::new("Blue", PoliticalSystem::Socialist)
                    .with_center(GeoPoint::new(0.0, 1.0)),
            )
            .await;

        let ledger = Arc::new(UnitLedger::new(registry));
        let book = Arc::new(AttackBook::new());
        let policy = Arc::new(CasusBelliRegistry::new());
        let sink = Arc::new(DamageLog::new());
        let scheduler = AttackScheduler::new(
            Arc::clone(&ledger),
            Arc::clone(&book),
            Arc::clone(&policy),
            Arc::clone(&sink),
            Arc::new(ManualClock::default()),
            EngineConfig::default(),
        );

        Fixture {
            scheduler,
            ledger,
            book,
            policy,
            sink,
            attacker,
            defender,
        }
    }

    fn dispatch(entries: &[(UnitType, u32)]) -> Dispatch {
        entries.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_launch_deducts_units_and_records_order() {
        let f = fixture(PoliticalSystem::Dictatorship).await;
        f.ledger.add(f.attacker, UnitType::Infantry, 10).await;

        let receipt = f
            .scheduler
            .launch_attack(
                f.attacker,
                f.defender,
                dispatch(&[(UnitType::Infantry, 4)]),
                TargetType::Territory,
            )
            .await
            .unwrap();

        assert_eq!(f.ledger.count(f.attacker, UnitType::Infantry).await, 6);
        assert_eq!(receipt.order.status, AttackStatus::Traveling);
        // One degree of longitude at the equator is ~111 km
        assert!((receipt.distance_km - 111.2).abs() < 1.0);
        assert_eq!(receipt.travel_minutes, receipt.distance_km.ceil() as i64);
        assert_eq!(f.book.get(receipt.order.id).await.unwrap(), receipt.order);
    }

    #[tokio::test]
    async fn test_democracy_without_justification_rejected() {
        let f = fixture(PoliticalSystem::Democracy).await;
        f.ledger.add(f.attacker, UnitType::Tank, 5).await;

        let err = f
            .scheduler
            .launch_attack(
                f.attacker,
                f.defender,
                dispatch(&[(UnitType::Tank, 5)]),
                TargetType::Territory,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, FrontlineError::WarNotAuthorized { .. }));
        assert_eq!(f.ledger.count(f.attacker, UnitType::Tank).await, 5);
        assert!(f.book.is_empty().await);

        f.policy.grant(f.attacker, f.defender).await;
        assert!(f
            .scheduler
            .launch_attack(
                f.attacker,
                f.defender,
                dispatch(&[(UnitType::Tank, 5)]),
                TargetType::Territory,
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_partial_shortage_deducts_nothing() {
        let f = fixture(PoliticalSystem::Socialist).await;
        f.ledger.add(f.attacker, UnitType::Infantry, 10).await;
        f.ledger.add(f.attacker, UnitType::Tank, 1).await;

        let err = f
            .scheduler
            .launch_attack(
                f.attacker,
                f.defender,
                dispatch(&[(UnitType::Infantry, 10), (UnitType::Tank, 2)]),
                TargetType::Territory,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, FrontlineError::InsufficientUnits { .. }));
        assert_eq!(f.ledger.count(f.attacker, UnitType::Infantry).await, 10);
        assert_eq!(f.ledger.count(f.attacker, UnitType::Tank).await, 1);
        assert!(f.book.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_dispatches() {
        let f = fixture(PoliticalSystem::Socialist).await;

        let empty = f
            .scheduler
            .launch_attack(f.attacker, f.defender, Dispatch::new(), TargetType::Territory)
            .await;
        assert!(matches!(empty, Err(FrontlineError::Validation(_))));

        let zero = f
            .scheduler
            .launch_attack(
                f.attacker,
                f.defender,
                dispatch(&[(UnitType::Infantry, 0)]),
                TargetType::Territory,
            )
            .await;
        assert!(matches!(zero, Err(FrontlineError::Validation(_))));

        let own = f
            .scheduler
            .launch_attack(
                f.attacker,
                f.attacker,
                dispatch(&[(UnitType::Infantry, 1)]),
                TargetType::Territory,
            )
            .await;
        assert!(matches!(own, Err(FrontlineError::Validation(_))));

        let missing = NationId::new();
        let unknown = f
            .scheduler
            .launch_attack(
                f.attacker,
                missing,
                dispatch(&[(UnitType::Infantry, 1)]),
                TargetType::Territory,
            )
            .await;
        assert!(matches!(unknown, Err(FrontlineError::NationNotFound(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_precision_strike() {
        let f = fixture(PoliticalSystem::Socialist).await;
        f.ledger.add(f.attacker, UnitType::Missile, 3).await;

        let report = f
            .scheduler
            .launch_precision_strike(f.attacker, f.defender, "power_plant", 2)
            .await
            .unwrap();

        // 2 missiles * 200 attack = 400 damage -> ratio 4 -> 80%, capped at 50
        assert_eq!(report.damage, 400.0);
        assert_eq!(report.percent, 50.0);
        assert_eq!(f.ledger.count(f.attacker, UnitType::Missile).await, 1);

        let reports = f.sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].nation, f.defender);
        assert_eq!(reports[0].facility, "power_plant");
    }

    #[tokio::test]
    async fn test_precision_strike_without_missiles() {
        let f = fixture(PoliticalSystem::Socialist).await;
        let err = f
            .scheduler
            .launch_precision_strike(f.attacker, f.defender, "port", 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FrontlineError::InsufficientUnits { unit_type: UnitType::Missile, .. }
        ));
        assert!(f.sink.reports().is_empty());
    }
}
