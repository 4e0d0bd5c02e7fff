use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::BetResult;

/// Global metrics registry used across the engine.
pub static METRICS: Lazy<Metrics> = Lazy::new(Metrics::default);

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}

#[derive(Default)]
struct MetricsInner {
    validations_accepted: AtomicU64,
    validations_rejected: AtomicU64,
    settled_win: AtomicU64,
    settled_loss: AtomicU64,
    settled_push: AtomicU64,
    settled_void: AtomicU64,
    missing_data_voids: AtomicU64,
    provider_failures: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    sweep_failures: AtomicU64,
    last_event_ts: AtomicU64,
}

/// Lightweight metrics handle backed by atomics so it can be cloned cheaply.
#[derive(Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

impl Metrics {
    fn touch(&self) {
        self.inner
            .last_event_ts
            .store(now_unix_secs(), Ordering::Relaxed);
    }

    pub fn record_validation(&self, market: &str, accepted: bool) {
        let counter = if accepted {
            &self.inner.validations_accepted
        } else {
            &self.inner.validations_rejected
        };
        let total = counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.touch();

        debug!(
            target: "metrics",
            event = "validation",
            market = %market,
            accepted,
            total,
            "validation recorded"
        );
    }

    pub fn record_settlement(&self, market: &str, result: BetResult) {
        let counter = match result {
            BetResult::Win => &self.inner.settled_win,
            BetResult::Loss => &self.inner.settled_loss,
            BetResult::Push => &self.inner.settled_push,
            BetResult::Void => &self.inner.settled_void,
            BetResult::Pending => return,
        };
        let total = counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.touch();

        info!(
            target: "metrics",
            event = "settlement",
            market = %market,
            result = %result,
            total,
            "settlement recorded"
        );
    }

    pub fn record_missing_data_void(&self, market: &str, reason: &str) {
        self.inner.missing_data_voids.fetch_add(1, Ordering::Relaxed);
        self.touch();

        info!(
            target: "metrics",
            event = "missing_data_void",
            market = %market,
            reason = %reason,
            total_voids = self.inner.missing_data_voids.load(Ordering::Relaxed),
            "bet voided for missing data"
        );
    }

    pub fn record_provider_failure(&self, operation: &str) {
        self.inner.provider_failures.fetch_add(1, Ordering::Relaxed);
        self.touch();

        info!(
            target: "metrics",
            event = "provider_failure",
            operation = %operation,
            total_failures = self.inner.provider_failures.load(Ordering::Relaxed),
            "provider call failed"
        );
    }

    pub fn record_cache(&self, hit: bool) {
        if hit {
            self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_sweep_failure(&self, bet_id: &str, reason: &str) {
        self.inner.sweep_failures.fetch_add(1, Ordering::Relaxed);
        self.touch();

        info!(
            target: "metrics",
            event = "sweep_failure",
            bet_id = %bet_id,
            reason = %reason,
            total_failures = self.inner.sweep_failures.load(Ordering::Relaxed),
            "sweep item failed"
        );
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            validations_accepted: load(&self.inner.validations_accepted),
            validations_rejected: load(&self.inner.validations_rejected),
            settled_win: load(&self.inner.settled_win),
            settled_loss: load(&self.inner.settled_loss),
            settled_push: load(&self.inner.settled_push),
            settled_void: load(&self.inner.settled_void),
            missing_data_voids: load(&self.inner.missing_data_voids),
            provider_failures: load(&self.inner.provider_failures),
            cache_hits: load(&self.inner.cache_hits),
            cache_misses: load(&self.inner.cache_misses),
            sweep_failures: load(&self.inner.sweep_failures),
            last_event_ts: load(&self.inner.last_event_ts),
        }
    }
}

/// Serializable view of current metrics, logged at the end of each sweep.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub validations_accepted: u64,
    pub validations_rejected: u64,
    pub settled_win: u64,
    pub settled_loss: u64,
    pub settled_push: u64,
    pub settled_void: u64,
    pub missing_data_voids: u64,
    pub provider_failures: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub sweep_failures: u64,
    pub last_event_ts: u64,
}

pub fn log_metrics_snapshot(snapshot: &MetricsSnapshot) {
    info!(
        target: "metrics",
        event = "metrics_snapshot",
        snapshot = serde_json::to_string(snapshot).unwrap_or_default().as_str(),
        "metrics snapshot"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_track_results() {
        let metrics = Metrics::default();
        metrics.record_validation("spread", true);
        metrics.record_validation("spread", false);
        metrics.record_settlement("total", BetResult::Push);
        metrics.record_settlement("total", BetResult::Pending);
        metrics.record_cache(true);
        metrics.record_cache(false);
        metrics.record_cache(false);

        let snap = metrics.snapshot();
        assert_eq!(snap.validations_accepted, 1);
        assert_eq!(snap.validations_rejected, 1);
        assert_eq!(snap.settled_push, 1);
        assert_eq!(snap.settled_win, 0);
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.cache_misses, 2);
        assert!(snap.last_event_ts > 0);
    }
}
