use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, Pool, Postgres};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{Bet, BetResult};
use crate::storage::models::BetRow;
use crate::storage::{BetStore, PendingBatch};

const BET_COLUMNS: &str = "id, parent_id, event_id, league, home_team, away_team, starts_at, market, \
     odds_decimal, odds_format, odds_entered, result, void_reason, locked";

/// Postgres-backed bet store.
///
/// The expected schema (created via migrations) is:
/// ```sql
/// CREATE TABLE IF NOT EXISTS bets (
///   id            UUID PRIMARY KEY,
///   parent_id     UUID REFERENCES bets (id),
///   event_id      TEXT,
///   league        TEXT,
///   home_team     TEXT,
///   away_team     TEXT,
///   starts_at     TIMESTAMPTZ NOT NULL,
///   market        JSONB       NOT NULL,
///   odds_decimal  DOUBLE PRECISION NOT NULL CHECK (odds_decimal >= 1.01),
///   odds_format   TEXT        NOT NULL,
///   odds_entered  TEXT        NOT NULL,
///   result        TEXT        NOT NULL DEFAULT 'pending',
///   void_reason   TEXT,
///   locked        BOOLEAN     NOT NULL DEFAULT FALSE,
///   settled_at    TIMESTAMPTZ
/// );
/// CREATE INDEX IF NOT EXISTS bets_pending_idx ON bets (starts_at) WHERE result = 'pending';
/// CREATE INDEX IF NOT EXISTS bets_parent_idx ON bets (parent_id);
/// ```
pub struct PgBetStore {
    pool: Pool<Postgres>,
}

impl PgBetStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn into_bets(rows: Vec<BetRow>) -> anyhow::Result<Vec<Bet>> {
        rows.into_iter().map(Bet::try_from).collect()
    }
}

#[async_trait]
impl BetStore for PgBetStore {
    async fn get_bet(&self, id: Uuid) -> anyhow::Result<Option<Bet>> {
        let row: Option<BetRow> = query_as(&format!("SELECT {BET_COLUMNS} FROM bets WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Bet::try_from).transpose()
    }

    async fn legs_of(&self, parent_id: Uuid) -> anyhow::Result<Vec<Bet>> {
        let rows: Vec<BetRow> = query_as(&format!(
            "SELECT {BET_COLUMNS} FROM bets WHERE parent_id = $1 ORDER BY id"
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Self::into_bets(rows)
    }

    async fn pending_bets(&self, limit: i64) -> anyhow::Result<PendingBatch> {
        let rows: Vec<BetRow> = query_as(&format!(
            "SELECT {BET_COLUMNS} FROM bets WHERE result = 'pending' ORDER BY starts_at, id LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut batch = PendingBatch::default();
        for row in rows {
            let id = row.id;
            match Bet::try_from(row) {
                Ok(bet) => batch.bets.push(bet),
                Err(err) => {
                    warn!(target: "storage", bet_id = %id, error = %err, "unreadable bet row");
                    batch.unreadable.push((id, err.to_string()));
                }
            }
        }
        Ok(batch)
    }

    async fn record_result(&self, id: Uuid, result: BetResult, reason: Option<&str>) -> anyhow::Result<bool> {
        if !result.is_terminal() {
            anyhow::bail!("refusing to record non-terminal result for bet {id}");
        }

        let done = query(
            "UPDATE bets SET result = $2, void_reason = $3, settled_at = NOW() \
             WHERE id = $1 AND result = 'pending'",
        )
        .bind(id)
        .bind(result.as_str())
        .bind(reason)
        .execute(&self.pool)
        .await?;

        let written = done.rows_affected() == 1;
        debug!(target: "storage", bet_id = %id, result = %result, written, "record result");
        Ok(written)
    }

    async fn lock_started(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let done = query("UPDATE bets SET locked = TRUE WHERE locked = FALSE AND starts_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }
}
