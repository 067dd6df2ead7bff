//! Frontline - Entry Point
//!
//! Runs a scripted two-nation campaign on a manual clock: both sides train
//! units, launch attacks and a missile strike, then two pollers race to
//! resolve the matured orders.

use clap::Parser;
use frontline::core::clock::{Clock, ManualClock};
use frontline::core::config::EngineConfig;
use frontline::core::error::Result;
use frontline::core::types::GeoPoint;
use frontline::military::{
    parse_dispatch, AttackBook, AttackScheduler, CompletionPoller, InfrastructureDamage,
    TargetType, UnitLedger, UnitType,
};
use frontline::nation::{CasusBelliRegistry, Nation, NationRegistry, PoliticalSystem};

use chrono::Duration;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Deferred conflict demo
#[derive(Parser, Debug)]
#[command(name = "frontline")]
#[command(about = "Run a scripted attack scenario through the conflict engine")]
struct Args {
    /// Random seed for battle outcomes
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Engine config (TOML); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print completed orders as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ScenarioOutput {
    orders: Vec<frontline::military::AttackOrder>,
    damage_reports: Vec<InfrastructureDamage>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("frontline=info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    }
    .with_seed(args.seed);

    tracing::info!("Frontline starting...");

    // Collaborators
    let registry = Arc::new(NationRegistry::new());
    let policy = Arc::new(CasusBelliRegistry::new());
    let clock = Arc::new(ManualClock::default());
    let (damage_tx, mut damage_rx) = mpsc::unbounded_channel::<InfrastructureDamage>();
    let sink = Arc::new(damage_tx);

    let aurora = registry
        .register(
            Nation::new("Republic of Aurora", PoliticalSystem::Democracy)
                .with_treasury(60_000.0)
                .with_center(GeoPoint::new(37.5665, 126.9780)),
        )
        .await;
    let borealis = registry
        .register(
            Nation::new("Borealis Directorate", PoliticalSystem::Dictatorship)
                .with_treasury(60_000.0)
                .with_center(GeoPoint::new(39.0392, 125.7625)),
        )
        .await;

    // Engine
    let ledger = Arc::new(UnitLedger::new(Arc::clone(&registry)));
    let book = Arc::new(AttackBook::new());
    let scheduler = AttackScheduler::new(
        Arc::clone(&ledger),
        Arc::clone(&book),
        Arc::clone(&policy),
        Arc::clone(&sink),
        Arc::clone(&clock),
        config.clone(),
    );
    let poller = CompletionPoller::new(
        Arc::clone(&ledger),
        Arc::clone(&book),
        Arc::clone(&sink),
        Arc::clone(&clock),
        config.clone(),
    );
    // A second instance sharing the same book simulates another process
    let rival = CompletionPoller::new(
        Arc::clone(&ledger),
        Arc::clone(&book),
        Arc::clone(&sink),
        Arc::clone(&clock),
        config.clone().with_seed(args.seed.wrapping_add(1)),
    );

    // Training
    ledger.train(aurora, UnitType::Infantry, 120).await?;
    ledger.train(aurora, UnitType::Tank, 20).await?;
    ledger.train(aurora, UnitType::Aircraft, 10).await?;
    ledger.train(borealis, UnitType::Infantry, 150).await?;
    ledger.train(borealis, UnitType::Tank, 30).await?;
    ledger.train(borealis, UnitType::Missile, 2).await?;

    // A democracy needs a casus belli first
    match scheduler
        .launch_attack(
            aurora,
            borealis,
            parse_dispatch([("tank", 10)])?,
            TargetType::Territory,
        )
        .await
    {
        Ok(_) => tracing::warn!("Democracy launched without a casus belli"),
        Err(err) => println!("Aurora blocked: {}", err),
    }
    policy.grant(aurora, borealis).await;

    let strike = scheduler
        .launch_attack(
            borealis,
            aurora,
            parse_dispatch([("tank", 25), ("infantry", 60)])?,
            TargetType::from("oil_refinery"),
        )
        .await?;
    println!(
        "Borealis dispatched {} units: {:.1} km, arriving in {} minutes",
        strike.order.units_sent.values().sum::<u32>(),
        strike.distance_km,
        strike.travel_minutes
    );

    let counter = scheduler
        .launch_attack(
            aurora,
            borealis,
            parse_dispatch([("aircraft", 10), ("tank", 5)])?,
            TargetType::Territory,
        )
        .await?;
    println!(
        "Aurora counterattacks: {:.1} km, arriving in {} minutes",
        counter.distance_km, counter.travel_minutes
    );

    let missiles = scheduler
        .launch_precision_strike(borealis, aurora, "power_grid", 1)
        .await?;
    println!(
        "Missile strike on {}: {:.0}% damage",
        missiles.target, missiles.percent
    );

    // Let every order mature, then race two pollers over the same book
    let latest = strike.arrival.max(counter.arrival);
    clock.advance((latest - clock.now()) + Duration::minutes(1));
    let (first, second) = tokio::join!(poller.run_cycle(), rival.run_cycle());
    println!(
        "Pollers resolved {} + {} orders ({} claims lost)",
        first.resolved.len(),
        second.resolved.len(),
        first.conflicts + second.conflicts
    );

    let mut orders = Vec::new();
    for id in [strike.order.id, counter.order.id] {
        orders.push(book.get(id).await?);
    }

    let mut damage_reports = Vec::new();
    while let Ok(report) = damage_rx.try_recv() {
        damage_reports.push(report);
    }

    if args.json {
        let output = ScenarioOutput {
            orders,
            damage_reports,
        };
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(err) => tracing::error!("Could not serialize scenario output: {}", err),
        }
        return Ok(());
    }

    for order in &orders {
        if let Some(result) = &order.result {
            println!();
            println!("Attack {} -> {:?}", order.id, result.winner);
            println!(
                "  Power: {:.0} effective ({:.0}% supply penalty) vs {:.0} defense",
                result.effective_power,
                result.supply_penalty * 100.0,
                result.defense_power
            );
            println!("  Attacker losses: {:?}", result.attacker_losses);
            println!("  Defender losses: {:?}", result.defender_losses);
            println!("  Survivors home:  {:?}", result.survivors);
        }
    }
    println!();
    for report in &damage_reports {
        println!("Damage: {} -{:.1}%", report.facility, report.percent);
    }
    for (name, id) in [("Aurora", aurora), ("Borealis", borealis)] {
        println!("{} stock: {:?}", name, ledger.stock(id).await.units());
    }

    Ok(())
}
