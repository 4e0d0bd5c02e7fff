use serde::Serialize;
use tracing::info;

use crate::types::{AppConfig, CacheBackend};

#[derive(Serialize)]
struct StartupLog<'a> {
    event: &'a str,
    provider: &'a str,
    cache_backend: &'a str,
    cache_ttl_secs: u64,
    odds_tolerance: f64,
    line_tolerance: f64,
    sweep_batch_limit: i64,
}

pub fn log_startup(cfg: &AppConfig) {
    let cache_backend = match cfg.cache.backend {
        CacheBackend::Memory => "memory",
        CacheBackend::Redis => "redis",
    };
    // Only the host part of the provider URL is logged.
    let provider = reqwest::Url::parse(&cfg.provider.base_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());
    let payload = StartupLog {
        event: "startup",
        provider: &provider,
        cache_backend,
        cache_ttl_secs: cfg.cache.ttl_secs,
        odds_tolerance: cfg.validation.odds_tolerance,
        line_tolerance: cfg.validation.line_tolerance,
        sweep_batch_limit: cfg.sweep.batch_limit,
    };
    info!(target: "engine", startup = serde_json::to_string(&payload).unwrap_or_default().as_str());
}
