use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{Bet, BetResult};
use crate::monitoring::metrics::METRICS;
use crate::settlement::Settler;
use crate::storage::BetStore;
use crate::utils::time::Clock;

/// Counters for one sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Bets whose `locked` flag was set because their start time passed.
    pub locked: u64,
    pub examined: usize,
    /// Terminal results written by this sweep, voids included.
    pub settled: usize,
    pub voided: usize,
    pub still_pending: usize,
    pub failed: usize,
    /// Bets that another settler finished between our read and our write.
    pub lost_race: usize,
}

/// Legs and single bets first, parlay parents last, so parents see freshly settled legs.
/// Order within each group is kept.
fn settlement_order(mut bets: Vec<Bet>) -> Vec<Bet> {
    bets.sort_by_key(|bet| bet.market.is_parlay());
    bets
}

/// Settle up to `limit` pending bets, one at a time.
///
/// A failure on one bet, including a row that cannot be read, is counted and logged and the
/// sweep moves on. Only failing to list pending bets aborts.
pub async fn run_sweep(
    store: &dyn BetStore,
    settler: &Settler,
    clock: &dyn Clock,
    limit: i64,
) -> anyhow::Result<SweepReport> {
    let mut report = SweepReport::default();

    match store.lock_started(clock.now()).await {
        Ok(n) => report.locked = n,
        Err(err) => warn!(target: "sweep", error = %err, "failed to lock started bets"),
    }

    let batch = store.pending_bets(limit).await?;
    for (id, reason) in &batch.unreadable {
        report.examined += 1;
        report.failed += 1;
        warn!(target: "sweep", bet_id = %id, error = %reason, "skipping unreadable bet");
        METRICS.record_sweep_failure(&id.to_string(), reason);
    }

    for mut bet in settlement_order(batch.bets) {
        report.examined += 1;

        let settlement = match settler.settle_bet(&bet).await {
            Ok(s) => s,
            Err(err) => {
                fail(&mut report, &bet, &err.to_string());
                continue;
            }
        };

        if !settlement.is_terminal() {
            report.still_pending += 1;
            continue;
        }

        if let Err(err) = bet.settle(settlement.result, settlement.reason.clone()) {
            fail(&mut report, &bet, &err.to_string());
            continue;
        }

        match store
            .record_result(bet.id, bet.result(), bet.void_reason())
            .await
        {
            Ok(true) => {
                report.settled += 1;
                if bet.result() == BetResult::Void {
                    report.voided += 1;
                }
                METRICS.record_settlement(bet.market.label(), bet.result());
            }
            Ok(false) => {
                report.lost_race += 1;
                debug!(target: "sweep", bet_id = %bet.id, "bet already settled elsewhere");
            }
            Err(err) => fail(&mut report, &bet, &err.to_string()),
        }
    }

    Ok(report)
}

fn fail(report: &mut SweepReport, bet: &Bet, reason: &str) {
    report.failed += 1;
    warn!(target: "sweep", bet_id = %bet.id, error = %reason, "failed to settle bet");
    METRICS.record_sweep_failure(&bet.id.to_string(), reason);
}
