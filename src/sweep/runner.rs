use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    client::SportsDataClient,
    gateway::{EventCache, EventGateway, MemoryEventCache},
    monitoring::metrics::{log_metrics_snapshot, METRICS},
    resolver::ContainmentResolver,
    settlement::{Settlement, Settler},
    storage::{create_pg_pool, BetStore, PgBetStore, RedisEventCache},
    sweep::core::{run_sweep, SweepReport},
    types::{AppConfig, CacheBackend},
    utils::time::{Clock, SystemClock},
};

/// Gateway over the configured provider and cache backend.
pub async fn build_gateway(cfg: &AppConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Arc<EventGateway>> {
    let client = SportsDataClient::new(&cfg.provider).context("failed to build provider client")?;

    let cache: Arc<dyn EventCache> = match cfg.cache.backend {
        CacheBackend::Memory => Arc::new(MemoryEventCache::new(clock)),
        CacheBackend::Redis => {
            let redis = cfg
                .redis
                .as_ref()
                .context("cache backend is redis but no [redis] section is configured")?;
            Arc::new(RedisEventCache::new(redis).await.context("failed to connect to redis")?)
        }
    };

    let gateway = EventGateway::new(Arc::new(client), cache, Arc::new(ContainmentResolver))
        .with_ttl(Duration::from_secs(cfg.cache.ttl_secs))
        .with_window_hours(cfg.validation.fallback_window_hours);
    Ok(Arc::new(gateway))
}

pub async fn build_store(cfg: &AppConfig) -> anyhow::Result<Arc<PgBetStore>> {
    let pool = create_pg_pool(&cfg.postgres)
        .await
        .context("failed to connect to postgres")?;
    Ok(Arc::new(PgBetStore::new(pool)))
}

/// Run one settlement sweep over pending bets and log its summary.
pub async fn run_sweep_job(cfg: &AppConfig, limit: Option<i64>) -> anyhow::Result<SweepReport> {
    let started_at = Utc::now();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let gateway = build_gateway(cfg, clock.clone()).await?;
    let store = build_store(cfg).await?;
    let settler = Settler::new(gateway, store.clone(), clock.clone());

    let limit = limit.unwrap_or(cfg.sweep.batch_limit);
    let report = run_sweep(store.as_ref(), &settler, clock.as_ref(), limit).await?;

    log_summary(&report, started_at.to_rfc3339(), limit);
    log_metrics_snapshot(&METRICS.snapshot());
    Ok(report)
}

/// Settle a single bet by id and persist the outcome when it is terminal.
pub async fn settle_one(cfg: &AppConfig, bet_id: Uuid) -> anyhow::Result<Settlement> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let gateway = build_gateway(cfg, clock.clone()).await?;
    let store = build_store(cfg).await?;
    let settler = Settler::new(gateway, store.clone(), clock);

    let mut bet = store
        .get_bet(bet_id)
        .await?
        .with_context(|| format!("bet {bet_id} not found"))?;
    if !bet.is_pending() {
        return settler.settle_bet(&bet).await;
    }

    let settlement = settler.settle_bet(&bet).await?;
    if settlement.is_terminal() {
        bet.settle(settlement.result, settlement.reason.clone())?;
        let written = store
            .record_result(bet.id, bet.result(), bet.void_reason())
            .await?;
        if written {
            METRICS.record_settlement(bet.market.label(), bet.result());
        } else {
            info!(target: "sweep", bet_id = %bet.id, "bet was settled concurrently; result not written");
        }
    }
    Ok(settlement)
}

#[derive(Serialize)]
struct SweepSummary<'a> {
    event: &'a str,
    started_at: String,
    finished_at: String,
    limit: i64,
    #[serde(flatten)]
    report: &'a SweepReport,
}

fn log_summary(report: &SweepReport, started_at: String, limit: i64) {
    let summary = SweepSummary {
        event: "sweep_summary",
        started_at,
        finished_at: Utc::now().to_rfc3339(),
        limit,
        report,
    };

    let payload =
        serde_json::to_string(&summary).unwrap_or_else(|_| "{\"event\":\"sweep_summary_error\"}".to_string());
    info!(target: "sweep", "{payload}");
}
