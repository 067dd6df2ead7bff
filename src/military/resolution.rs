//! Battle resolution for matured attacks
//!
//! Resolution is a pure function of the dispatched units, the defender's
//! stock at arrival, the order's travel distance and a caller-supplied RNG.
//! Applying the outcome to the ledger is a separate step.

use rand::Rng;

use super::damage::{damage_percent, InfrastructureDamage};
use super::ledger::UnitStock;
use super::orders::{AttackOrder, BattleResult, Winner};
use super::unit_type::Dispatch;
use crate::core::config::EngineConfig;
use crate::core::error::Result;

/// Raw offensive power of a force
pub fn attack_power(units: &Dispatch) -> f64 {
    units
        .iter()
        .map(|(unit, &count)| f64::from(unit.stats().attack) * f64::from(count))
        .sum()
}

/// Defensive power of a standing stock
pub fn defense_power(units: &Dispatch) -> f64 {
    units
        .iter()
        .map(|(unit, &count)| f64::from(unit.stats().defense) * f64::from(count))
        .sum()
}

/// Fraction of attack power lost to supply lines over `distance_km`
pub fn supply_penalty(distance_km: f64, config: &EngineConfig) -> f64 {
    (distance_km.max(0.0) / config.supply_penalty_divisor_km).min(config.supply_penalty_cap)
}

/// Losses per unit type: `ceil(count * rate * m)` with an independent
/// `m` drawn per type, capped at `count`
pub fn calculate_losses<R: Rng + ?Sized>(
    units: &Dispatch,
    loss_rate: f64,
    config: &EngineConfig,
    rng: &mut R,
) -> Dispatch {
    let mut losses = Dispatch::new();
    for (&unit, &count) in units {
        if count == 0 {
            continue;
        }
        let multiplier = rng.gen_range(config.loss_multiplier_min..config.loss_multiplier_max);
        let lost = (f64::from(count) * loss_rate * multiplier).ceil() as u32;
        let lost = lost.min(count);
        if lost > 0 {
            losses.insert(unit, lost);
        }
    }
    losses
}

/// Resolve a matured order against the defender's current stock
pub fn resolve_battle<R: Rng + ?Sized>(
    order: &AttackOrder,
    defender_stock: &UnitStock,
    config: &EngineConfig,
    rng: &mut R,
) -> BattleResult {
    let dispatch = &order.units_sent;

    let attack_power = attack_power(dispatch);
    let supply_penalty = supply_penalty(order.distance_km, config);
    let effective_power = attack_power * (1.0 - supply_penalty);
    let defense_power = defense_power(defender_stock.units());

    let attacker_wins = effective_power > defense_power;
    let power_ratio = effective_power / defense_power.max(1.0);

    let (attacker_rate, defender_rate) = if attacker_wins {
        (config.winner_loss_rate, config.loser_loss_rate)
    } else {
        (config.loser_loss_rate, config.winner_loss_rate)
    };

    // Draw order is fixed (attacker first, then defender, each in unit order)
    let attacker_losses = calculate_losses(dispatch, attacker_rate, config, rng);
    let defender_losses = calculate_losses(defender_stock.units(), defender_rate, config, rng);

    let survivors: Dispatch = dispatch
        .iter()
        .filter_map(|(&unit, &sent)| {
            let lost = attacker_losses.get(&unit).copied().unwrap_or(0);
            let surviving = sent.saturating_sub(lost);
            (surviving > 0).then_some((unit, surviving))
        })
        .collect();

    let infrastructure_damage = match order.target_type.facility() {
        Some(facility) if attacker_wins => Some(InfrastructureDamage {
            nation: order.defender_id,
            facility: facility.to_string(),
            percent: damage_percent(
                power_ratio,
                config.infrastructure_damage_per_ratio,
                config.infrastructure_damage_cap,
            ),
        }),
        _ => None,
    };

    BattleResult {
        winner: if attacker_wins {
            Winner::Attacker
        } else {
            Winner::Defender
        },
        attacker_losses,
        defender_losses,
        survivors,
        attack_power,
        effective_power,
        defense_power,
        supply_penalty,
        power_ratio,
        infrastructure_damage,
    }
}

/// Return survivors to the attacker and remove defender losses
///
/// Callers run this against copies inside `UnitLedger::settle`, so an error
/// here discards both mutations.
pub fn apply_outcome(
    attacker: &mut UnitStock,
    defender: &mut UnitStock,
    result: &BattleResult,
) -> Result<()> {
    defender.remove_all(&result.defender_losses)?;
    attacker.add_all(&result.survivors);
    Ok(())
}
