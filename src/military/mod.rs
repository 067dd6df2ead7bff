//! Deferred military conflict engine
//!
//! Units are trained into a per-nation [`UnitLedger`], dispatched by the
//! [`AttackScheduler`] as time-delayed [`AttackOrder`]s, and resolved once
//! matured by the [`CompletionPoller`].

pub mod damage;
pub mod ledger;
pub mod orders;
pub mod poller;
pub mod resolution;
pub mod scheduler;
pub mod travel;
pub mod unit_type;

pub use damage::{DamageLog, InfrastructureDamage, InfrastructureSink};
pub use ledger::{UnitLedger, UnitStock};
pub use orders::{
    AttackBook, AttackOrder, AttackStatus, BattleResult, Claim, ClaimToken, TargetType, Winner,
};
pub use poller::{CompletionPoller, CycleReport, PollerHandle};
pub use resolution::{apply_outcome, resolve_battle};
pub use scheduler::{AttackScheduler, LaunchReceipt, StrikeReport};
pub use travel::TravelPlan;
pub use unit_type::{parse_dispatch, Dispatch, UnitStats, UnitType};
