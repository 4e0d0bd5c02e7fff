use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::domain::{Bet, BetResult};
use crate::types::{PostgresConfig, RedisConfig};

pub mod bets;
pub mod cache;
pub mod models;

pub use bets::PgBetStore;
pub use cache::RedisEventCache;

pub type PgPool = Pool<Postgres>;

/// Create a PostgreSQL connection pool using the provided config.
///
/// The sweep is sequential, so a small pool is enough. Connection establishment is
/// performed eagerly so misconfiguration is surfaced early at startup.
pub async fn create_pg_pool(cfg: &PostgresConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(15))
        .connect(&cfg.url)
        .await?;
    Ok(pool)
}

/// Create a Redis client using the provided config.
pub fn create_redis_client(cfg: &RedisConfig) -> anyhow::Result<redis::Client> {
    let client = redis::Client::open(cfg.url.as_str())?;
    Ok(client)
}

/// Pending bets loaded for a sweep. Rows that could not be read are reported next to the
/// readable ones so the sweep can count them and carry on.
#[derive(Debug, Default)]
pub struct PendingBatch {
    pub bets: Vec<Bet>,
    /// `(bet id, decode error)` per unreadable row.
    pub unreadable: Vec<(Uuid, String)>,
}

/// What settlement needs from bet persistence.
#[async_trait]
pub trait BetStore: Send + Sync {
    async fn get_bet(&self, id: Uuid) -> anyhow::Result<Option<Bet>>;

    /// Leg bets of a parlay.
    async fn legs_of(&self, parent_id: Uuid) -> anyhow::Result<Vec<Bet>>;

    /// Pending bets, oldest start first.
    async fn pending_bets(&self, limit: i64) -> anyhow::Result<PendingBatch>;

    /// Persist a terminal result. Only writes while the stored bet is still pending and
    /// returns whether this call made the transition.
    async fn record_result(&self, id: Uuid, result: BetResult, reason: Option<&str>) -> anyhow::Result<bool>;

    /// Lock every unlocked bet whose start time has passed. Returns how many were locked.
    async fn lock_started(&self, now: DateTime<Utc>) -> anyhow::Result<u64>;
}
