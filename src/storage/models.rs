use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{Bet, BetMarket, BetResult, EventRef, Odds, OddsFormat};

/// Row model for the `bets` table.
///
/// The market is stored as the tagged JSON of [`BetMarket`]; odds as canonical decimal plus
/// the entered format and text.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BetRow {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub event_id: Option<String>,
    pub league: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub market: serde_json::Value,
    pub odds_decimal: f64,
    pub odds_format: String,
    pub odds_entered: String,
    pub result: String,
    pub void_reason: Option<String>,
    pub locked: bool,
}

impl TryFrom<BetRow> for Bet {
    type Error = anyhow::Error;

    fn try_from(row: BetRow) -> anyhow::Result<Self> {
        let market: BetMarket = serde_json::from_value(row.market)
            .with_context(|| format!("bet {} has an unreadable market", row.id))?;
        let format: OddsFormat = row.odds_format.parse().map_err(anyhow::Error::msg)?;
        // The entered text is authoritative; fall back to the stored decimal for rows
        // written before entry formats were kept.
        let odds = Odds::parse(format, &row.odds_entered)
            .or_else(|_| Odds::from_decimal(row.odds_decimal))
            .with_context(|| format!("bet {} has unreadable odds", row.id))?;
        let result: BetResult = row.result.parse().map_err(anyhow::Error::msg)?;

        let event = EventRef {
            event_id: row.event_id,
            league: row.league,
            home_team: row.home_team,
            away_team: row.away_team,
            starts_at: row.starts_at,
        };

        let mut bet = Bet::new(row.id, event, market, odds);
        bet.locked = row.locked;
        bet.parent_id = row.parent_id;
        if result.is_terminal() {
            bet.settle(result, row.void_reason)?;
        }
        Ok(bet)
    }
}
