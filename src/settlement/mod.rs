//! Settlement: grading single bets, aggregating parlays, and voiding bets whose data never
//! arrived after the game ended.

pub mod grader;
pub mod parlay;
pub mod voider;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{Bet, BetMarket, BetResult};
use crate::gateway::EventGateway;
use crate::monitoring::metrics::METRICS;
use crate::storage::BetStore;
use crate::utils::time::Clock;

pub use grader::{grade_bet, is_game_ended};
pub use parlay::aggregate_legs;
pub use voider::missing_data_reason;

/// Outcome of a settlement attempt. `reason` is set for voids.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Settlement {
    pub result: BetResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Settlement {
    pub fn pending() -> Self {
        Self {
            result: BetResult::Pending,
            reason: None,
        }
    }

    pub fn void(reason: String) -> Self {
        Self {
            result: BetResult::Void,
            reason: Some(reason),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.result.is_terminal()
    }
}

impl From<BetResult> for Settlement {
    fn from(result: BetResult) -> Self {
        Self { result, reason: None }
    }
}

pub struct Settler {
    gateway: Arc<EventGateway>,
    store: Arc<dyn BetStore>,
    clock: Arc<dyn Clock>,
}

impl Settler {
    pub fn new(gateway: Arc<EventGateway>, store: Arc<dyn BetStore>, clock: Arc<dyn Clock>) -> Self {
        Self { gateway, store, clock }
    }

    /// Compute the outcome of a bet without persisting it.
    ///
    /// Parlays go through their legs, everything else through the grader. A parlay leg that
    /// reaches a terminal result on the way is written to the store, so legs never lag a
    /// settled parent. Provider trouble yields `Pending`; only a failing bet store is an error.
    pub async fn settle_bet(&self, bet: &Bet) -> anyhow::Result<Settlement> {
        if !bet.is_pending() {
            return Ok(Settlement {
                result: bet.result(),
                reason: bet.void_reason().map(str::to_string),
            });
        }

        let settlement = match &bet.market {
            BetMarket::Parlay => self.settle_parlay(bet).await?,
            _ => self.settle_single(bet).await,
        };

        if settlement.is_terminal() {
            info!(
                target: "settlement",
                bet_id = %bet.id,
                market = bet.market.label(),
                result = %settlement.result,
                reason = settlement.reason.as_deref().unwrap_or(""),
                "bet settled"
            );
        } else {
            debug!(target: "settlement", bet_id = %bet.id, market = bet.market.label(), "bet still pending");
        }
        Ok(settlement)
    }

    async fn settle_single(&self, bet: &Bet) -> Settlement {
        let Some(event) = self.gateway.event_for(&bet.event).await else {
            debug!(target: "settlement", bet_id = %bet.id, "event unavailable; leaving pending");
            return Settlement::pending();
        };

        if !is_game_ended(&event, bet.starts_at(), self.clock.now()) {
            return Settlement::pending();
        }

        let resolver = self.gateway.resolver();
        let graded = grade_bet(bet, &event, resolver);
        if graded.is_terminal() {
            return graded;
        }

        // Game is over and grading is still impossible: the data is not coming.
        let reason = missing_data_reason(bet, &event, resolver).unwrap_or_else(|| {
            warn!(target: "settlement", bet_id = %bet.id, "grader undecided with no missing data identified");
            format!("{} could not be graded after {} ended", bet.market.label(), event.matchup())
        });
        METRICS.record_missing_data_void(bet.market.label(), &reason);
        Settlement::void(reason)
    }

    /// Grade a pending leg and persist a terminal outcome. When another settler got there
    /// first, the stored result wins.
    async fn settle_leg(&self, leg: &Bet) -> anyhow::Result<BetResult> {
        let settlement = self.settle_single(leg).await;
        if !settlement.is_terminal() {
            return Ok(BetResult::Pending);
        }

        let written = self
            .store
            .record_result(leg.id, settlement.result, settlement.reason.as_deref())
            .await?;
        if written {
            METRICS.record_settlement(leg.market.label(), settlement.result);
            info!(
                target: "settlement",
                bet_id = %leg.id,
                parent_id = ?leg.parent_id,
                result = %settlement.result,
                "parlay leg settled"
            );
            return Ok(settlement.result);
        }

        let stored = self.store.get_bet(leg.id).await?;
        Ok(stored.map_or(settlement.result, |b| b.result()))
    }

    async fn settle_parlay(&self, parent: &Bet) -> anyhow::Result<Settlement> {
        let legs = self.store.legs_of(parent.id).await?;
        if legs.is_empty() {
            return Ok(Settlement::void("parlay has no legs".to_string()));
        }

        let mut results = Vec::with_capacity(legs.len());
        for leg in &legs {
            let result = if leg.is_pending() {
                // Nested parlays are rejected at validation; a stray one just holds the parent.
                match leg.market {
                    BetMarket::Parlay => BetResult::Pending,
                    _ => self.settle_leg(leg).await?,
                }
            } else {
                leg.result()
            };
            results.push(result);
        }

        let result = aggregate_legs(&results);
        let reason = (result == BetResult::Void).then(|| {
            let voided = results
                .iter()
                .filter(|r| matches!(r, BetResult::Void | BetResult::Push))
                .count();
            format!("{voided} of {} legs pushed or voided", results.len())
        });
        Ok(Settlement { result, reason })
    }
}
