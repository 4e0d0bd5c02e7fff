//! Reasons for voiding a bet whose game is over but whose data never arrived.

use crate::domain::{Bet, BetMarket, Event};
use crate::resolver::{player_key_for, NameResolver};
use crate::stats::{canonical_stat, compute_player_stat_value};

/// Audit reason for voiding `bet`, given the grader left it pending on an ended game.
///
/// Returns `None` when nothing is missing, which callers treat as "leave it pending".
pub fn missing_data_reason(bet: &Bet, event: &Event, resolver: &dyn NameResolver) -> Option<String> {
    match &bet.market {
        BetMarket::PlayerProp(prop) => {
            let Some(player_id) = player_key_for(resolver, event, prop) else {
                return Some(format!(
                    "player '{}' could not be matched to provider data for {}",
                    prop.player_name,
                    event.matchup()
                ));
            };
            let Some(record) = event.stats_for(&player_id) else {
                return Some(format!("no stats were published for player '{}'", prop.player_name));
            };
            let stat = canonical_stat(&prop.stat_type);
            if compute_player_stat_value(&stat.id, record).is_some() {
                return None;
            }
            if !stat.known {
                return Some(format!("stat type '{}' is not recognised", prop.stat_type));
            }
            Some(format!(
                "stat '{}' is unavailable for player '{}'",
                stat.id, prop.player_name
            ))
        }
        BetMarket::Moneyline { .. } | BetMarket::Spread { .. } | BetMarket::Total { .. } => {
            if event.scores().is_some() {
                return None;
            }
            Some(format!("final score unavailable for {}", event.matchup()))
        }
        BetMarket::Parlay => None,
    }
}
