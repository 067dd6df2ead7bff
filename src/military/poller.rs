//! Completion poller
//!
//! Periodically resolves attack orders whose arrival time has passed.
//! Each order goes through the book's claim first; the claim holder then
//! settles both nations' stocks in one locked step and marks the order
//! completed. Losing a claim is a no-op. A failed or abandoned settlement
//! changes no stock and puts the order back to `Traveling` for the next
//! cycle.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::damage::InfrastructureSink;
use super::ledger::UnitLedger;
use super::orders::{AttackBook, AttackOrder, BattleResult, ClaimToken};
use super::resolution::{apply_outcome, resolve_battle};
use crate::core::clock::Clock;
use crate::core::config::EngineConfig;
use crate::core::error::{ErrorKind, FrontlineError, Result};
use crate::core::types::AttackId;
use crate::nation::NationDirectory;

/// Summary of one poller cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub resolved: Vec<AttackId>,
    /// Orders another resolver claimed first
    pub conflicts: usize,
    /// Orders whose settlement failed and were released
    pub failed: usize,
}

/// Releases a held claim if resolution stops before stocks are settled
struct ClaimGuard {
    book: Arc<AttackBook>,
    id: AttackId,
    token: ClaimToken,
    armed: bool,
}

impl ClaimGuard {
    fn new(book: Arc<AttackBook>, id: AttackId, token: ClaimToken) -> Self {
        Self {
            book,
            id,
            token,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }

    async fn release(mut self) -> Result<()> {
        let released = self.book.release(self.id, self.token).await;
        self.armed = false;
        released
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let (id, token) = (self.id, self.token);
        let book = Arc::clone(&self.book);
        match Handle::try_current() {
            Ok(handle) => {
                warn!(attack = %id, "Resolution abandoned; releasing claim");
                handle.spawn(async move {
                    if let Err(err) = book.release(id, token).await {
                        warn!(attack = %id, error = %err, "Could not release abandoned claim");
                    }
                });
            }
            Err(_) => warn!(attack = %id, "No runtime to release abandoned claim"),
        }
    }
}

/// Resolves matured attack orders exactly once
pub struct CompletionPoller<N, S, C> {
    ledger: Arc<UnitLedger<N>>,
    book: Arc<AttackBook>,
    sink: Arc<S>,
    clock: Arc<C>,
    config: EngineConfig,
    rng: Mutex<ChaCha8Rng>,
}

impl<N, S, C> CompletionPoller<N, S, C>
where
    N: NationDirectory,
    S: InfrastructureSink + 'static,
    C: Clock,
{
    pub fn new(
        ledger: Arc<UnitLedger<N>>,
        book: Arc<AttackBook>,
        sink: Arc<S>,
        clock: Arc<C>,
        config: EngineConfig,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            ledger,
            book,
            sink,
            clock,
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Replace the battle RNG
    pub fn with_rng(mut self, rng: ChaCha8Rng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    /// Claim, settle and complete a single matured order
    ///
    /// Fails with `Validation` if the order has not arrived by the clock's
    /// current time, and with a claim `ConcurrencyConflict` if it is not
    /// traveling (already claimed or completed). Dropping the returned
    /// future before stocks are settled releases the claim.
    pub async fn resolve(&self, id: AttackId) -> Result<AttackOrder> {
        let claim = self.book.try_claim(id, self.clock.now()).await?;
        let guard = ClaimGuard::new(Arc::clone(&self.book), id, claim.token);

        let result = match self.settle(&claim.order).await {
            Ok(result) => result,
            Err(err) => {
                warn!(attack = %id, error = %err, "Resolution failed; order released");
                guard.release().await?;
                return Err(err);
            }
        };

        // Stocks are committed; completion runs detached so cancelling the
        // caller cannot leave them applied to an order that looks unresolved
        guard.disarm();
        let book = Arc::clone(&self.book);
        let sink = Arc::clone(&self.sink);
        let token = claim.token;
        let completed = tokio::spawn(async move {
            let damage = result.infrastructure_damage.clone();
            let completed = book.complete(id, token, result).await?;
            if let Some(damage) = damage {
                sink.notify(damage);
            }
            Ok::<_, FrontlineError>(completed)
        })
        .await??;

        if let Some(result) = &completed.result {
            info!(
                attack = %id,
                attacker = %completed.attacker_id,
                defender = %completed.defender_id,
                winner = ?result.winner,
                effective_power = result.effective_power,
                defense_power = result.defense_power,
                "Attack resolved"
            );
        }
        Ok(completed)
    }

    async fn settle(&self, order: &AttackOrder) -> Result<BattleResult> {
        let mut rng = self.rng.lock().await;
        let config = &self.config;
        self.ledger
            .settle(order.attacker_id, order.defender_id, |attacker, defender| {
                let result = resolve_battle(order, defender, config, &mut *rng);
                apply_outcome(attacker, defender, &result)?;
                Ok(result)
            })
            .await
    }

    /// Resolve every order matured at the clock's current time
    pub async fn run_cycle(&self) -> CycleReport {
        let now = self.clock.now();
        let mut report = CycleReport::default();

        for order in self.book.matured(now).await {
            match self.resolve(order.id).await {
                Ok(_) => report.resolved.push(order.id),
                Err(err) if err.kind() == ErrorKind::ConcurrencyConflict => {
                    warn!(attack = %order.id, "Claim lost to another resolver");
                    report.conflicts += 1;
                }
                Err(_) => report.failed += 1,
            }
        }

        if !report.resolved.is_empty() || report.conflicts > 0 || report.failed > 0 {
            debug!(
                resolved = report.resolved.len(),
                conflicts = report.conflicts,
                failed = report.failed,
                "Poller cycle"
            );
        }
        report
    }
}

impl<N, S, C> CompletionPoller<N, S, C>
where
    N: NationDirectory + 'static,
    S: InfrastructureSink + 'static,
    C: Clock + 'static,
{
    /// Start the periodic loop on the current tokio runtime
    pub fn spawn(self: Arc<Self>) -> PollerHandle {
        let (shutdown, signal) = watch::channel(false);
        let task = tokio::spawn(self.run(signal));
        PollerHandle { shutdown, task }
    }

    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.config.poll_interval_secs, "Completion poller started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Completion poller stopped");
    }
}

/// Handle to a running poller task
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop after the in-progress cycle (if any) and wait for the task
    pub async fn shutdown(self) {
        if self.shutdown.send(true).is_err() {
            debug!("Poller task already gone");
        }
        if let Err(err) = self.task.await {
            warn!(error = %err, "Poller task ended abnormally");
        }
    }
}
