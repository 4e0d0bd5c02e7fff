//! Event Data Gateway: provider lookups by id with a team/date fallback, behind a short TTL cache.

pub mod cache;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::client::{EventProvider, EventQuery};
use crate::domain::{Event, EventRef};
use crate::monitoring::metrics::METRICS;
use crate::resolver::{normalize, NameResolver};
use crate::utils::time::{fallback_window, FALLBACK_WINDOW_HOURS};

pub use cache::{EventCache, MemoryEventCache};

/// Default lifetime of a cached event.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15);

pub struct EventGateway {
    provider: Arc<dyn EventProvider>,
    cache: Arc<dyn EventCache>,
    resolver: Arc<dyn NameResolver>,
    ttl: Duration,
    window_hours: i64,
}

impl EventGateway {
    pub fn new(
        provider: Arc<dyn EventProvider>,
        cache: Arc<dyn EventCache>,
        resolver: Arc<dyn NameResolver>,
    ) -> Self {
        Self {
            provider,
            cache,
            resolver,
            ttl: DEFAULT_CACHE_TTL,
            window_hours: FALLBACK_WINDOW_HOURS,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_window_hours(mut self, hours: i64) -> Self {
        self.window_hours = hours;
        self
    }

    pub fn resolver(&self) -> &dyn NameResolver {
        self.resolver.as_ref()
    }

    /// Event a bet points at: by id first, then by league/teams/date.
    pub async fn event_for(&self, event_ref: &EventRef) -> Option<Event> {
        self.get_event(event_ref.event_id.as_deref(), Some(event_ref))
            .await
    }

    /// Look an event up by id, falling back to a league/team/date search.
    ///
    /// Returns `None` when neither path finds the event or the provider is unavailable;
    /// callers treat that as "cannot determine yet".
    pub async fn get_event(&self, event_id: Option<&str>, fallback: Option<&EventRef>) -> Option<Event> {
        let event_id = event_id.map(str::trim).filter(|id| !id.is_empty());

        if let Some(id) = event_id {
            if let Some(event) = self.cached(id).await {
                return Some(event);
            }

            match self.provider.event_by_id(id).await {
                Ok(Some(event)) => {
                    self.cache.set(id, &event, self.ttl).await;
                    return Some(event);
                }
                Ok(None) => {
                    debug!(target: "gateway", event_id = %id, "event not found by id");
                }
                Err(err) => {
                    METRICS.record_provider_failure("event_by_id");
                    warn!(target: "gateway", event_id = %id, error = %err, "provider lookup by id failed");
                }
            }
        }

        let fallback = fallback?;
        let key = fallback_key(fallback)?;
        if let Some(event) = self.cached(&key).await {
            return Some(event);
        }

        let event = self.search(fallback).await?;
        self.cache.set(&key, &event, self.ttl).await;
        if let Some(id) = event_id {
            self.cache.set(id, &event, self.ttl).await;
        }
        if event_id != Some(event.id.as_str()) {
            self.cache.set(&event.id, &event, self.ttl).await;
        }
        Some(event)
    }

    async fn cached(&self, key: &str) -> Option<Event> {
        let hit = self.cache.get(key).await;
        METRICS.record_cache(hit.is_some());
        debug!(target: "gateway", key = %key, hit = hit.is_some(), "event cache lookup");
        hit
    }

    /// League search in a window around the start time, matched on team names in either
    /// home/away orientation.
    async fn search(&self, fallback: &EventRef) -> Option<Event> {
        let league = fallback.league.as_deref()?;
        let home = fallback.home_team.as_deref()?;
        let away = fallback.away_team.as_deref()?;

        let (starts_after, starts_before) = fallback_window(fallback.starts_at, self.window_hours);
        let query = EventQuery {
            league: league.to_string(),
            starts_after,
            starts_before,
        };

        let candidates = match self.provider.events_in_window(&query).await {
            Ok(events) => events,
            Err(err) => {
                METRICS.record_provider_failure("events_in_window");
                warn!(target: "gateway", league = %league, error = %err, "provider window search failed");
                return None;
            }
        };

        let resolver = self.resolver.as_ref();
        let found = candidates.into_iter().find(|event| {
            let straight = resolver.team_matches(&event.home, home) && resolver.team_matches(&event.away, away);
            let swapped = resolver.team_matches(&event.home, away) && resolver.team_matches(&event.away, home);
            straight || swapped
        });

        match &found {
            Some(event) => debug!(
                target: "gateway",
                event_id = %event.id,
                matchup = %event.matchup(),
                "event found by team/date fallback"
            ),
            None => debug!(target: "gateway", league = %league, home = %home, away = %away, "no event matched fallback"),
        }
        found
    }
}

/// Cache key for a fallback lookup; `None` when the reference lacks the fields the search needs.
fn fallback_key(event_ref: &EventRef) -> Option<String> {
    Some(format!(
        "fallback:{}:{}:{}:{}",
        normalize(event_ref.league.as_deref()?),
        normalize(event_ref.home_team.as_deref()?),
        normalize(event_ref.away_team.as_deref()?),
        event_ref.starts_at.timestamp()
    ))
}
