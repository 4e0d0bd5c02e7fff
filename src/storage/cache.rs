use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::warn;

use crate::domain::Event;
use crate::gateway::EventCache;
use crate::types::RedisConfig;

use super::create_redis_client;

/// Event cache shared through Redis.
///
/// Entries are keyed `wager:event:{key}` and expire through `SET .. EX`. Redis failures and
/// undecodable payloads read as misses.
pub struct RedisEventCache {
    conn: ConnectionManager,
}

impl RedisEventCache {
    pub async fn new(cfg: &RedisConfig) -> anyhow::Result<Self> {
        let client = create_redis_client(cfg)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    fn key(key: &str) -> String {
        format!("wager:event:{key}")
    }
}

#[async_trait]
impl EventCache for RedisEventCache {
    async fn get(&self, key: &str) -> Option<Event> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = match conn.get(Self::key(key)).await {
            Ok(v) => v,
            Err(err) => {
                warn!(target: "storage", key = %key, error = %err, "redis cache read failed");
                return None;
            }
        };
        raw.and_then(|json| match serde_json::from_str(&json) {
            Ok(event) => Some(event),
            Err(err) => {
                warn!(target: "storage", key = %key, error = %err, "dropping undecodable cached event");
                None
            }
        })
    }

    async fn set(&self, key: &str, event: &Event, ttl: Duration) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(err) => {
                warn!(target: "storage", key = %key, error = %err, "failed to encode event for cache");
                return;
            }
        };
        let mut conn = self.conn.clone();
        let res: redis::RedisResult<()> = redis::cmd("SET")
            .arg(Self::key(key))
            .arg(json)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await;
        if let Err(err) = res {
            warn!(target: "storage", key = %key, error = %err, "redis cache write failed");
        }
    }
}
