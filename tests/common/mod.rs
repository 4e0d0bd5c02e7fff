#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use wager_engine::client::models::WireEvent;
use wager_engine::client::{ClientError, ClientResult, EventProvider, EventQuery};
use wager_engine::domain::{Bet, BetMarket, BetResult, Event, EventRef, Odds, OddsFormat};
use wager_engine::gateway::{EventGateway, MemoryEventCache};
use wager_engine::resolver::ContainmentResolver;
use wager_engine::settlement::Settler;
use wager_engine::storage::{BetStore, PendingBatch};
use wager_engine::utils::time::FixedClock;
use wager_engine::validation::{ValidationParams, Validator};

pub fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

/// Decode a provider payload the same way the HTTP client does.
pub fn wire_event(raw: Value) -> Event {
    serde_json::from_value::<WireEvent>(raw)
        .unwrap()
        .into_event()
        .unwrap()
}

/// In-process provider serving a fixed set of events.
#[derive(Default)]
pub struct FakeProvider {
    events: Mutex<HashMap<String, Event>>,
    failing: AtomicBool,
    pub by_id_calls: AtomicUsize,
    pub window_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn insert(&self, event: Event) {
        self.events.lock().insert(event.id.clone(), event);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn total_calls(&self) -> usize {
        self.by_id_calls.load(Ordering::SeqCst) + self.window_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> ClientResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::Provider("provider is down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventProvider for FakeProvider {
    async fn event_by_id(&self, event_id: &str) -> ClientResult<Option<Event>> {
        self.by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.events.lock().get(event_id).cloned())
    }

    async fn events_in_window(&self, query: &EventQuery) -> ClientResult<Vec<Event>> {
        self.window_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let mut events: Vec<Event> = self
            .events
            .lock()
            .values()
            .filter(|e| e.league.as_deref() == Some(query.league.as_str()))
            .filter(|e| {
                e.starts_at
                    .map_or(false, |s| s >= query.starts_after && s <= query.starts_before)
            })
            .cloned()
            .collect();
        events.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(events)
    }
}

/// Bet store over a vector, with switches for the failure modes the sweep must survive.
#[derive(Default)]
pub struct MemoryBetStore {
    bets: Mutex<Vec<Bet>>,
    frozen_pending: Mutex<Option<Vec<Bet>>>,
    broken_parents: Mutex<HashSet<Uuid>>,
    unreadable: Mutex<Vec<(Uuid, String)>>,
}

impl MemoryBetStore {
    pub fn insert(&self, bet: Bet) {
        self.bets.lock().push(bet);
    }

    pub fn get(&self, id: Uuid) -> Option<Bet> {
        self.bets.lock().iter().find(|b| b.id == id).cloned()
    }

    /// Make `pending_bets` keep returning the current pending set, as a stale read would.
    pub fn freeze_pending(&self) {
        let pending = self.bets.lock().iter().filter(|b| b.is_pending()).cloned().collect();
        *self.frozen_pending.lock() = Some(pending);
    }

    /// A stored pending row that cannot be decoded into a bet.
    pub fn insert_unreadable(&self, id: Uuid, error: &str) {
        self.unreadable.lock().push((id, error.to_string()));
    }

    /// Make `legs_of` fail for this parent.
    pub fn break_legs_of(&self, parent: Uuid) {
        self.broken_parents.lock().insert(parent);
    }
}

#[async_trait]
impl BetStore for MemoryBetStore {
    async fn get_bet(&self, id: Uuid) -> anyhow::Result<Option<Bet>> {
        Ok(self.get(id))
    }

    async fn legs_of(&self, parent_id: Uuid) -> anyhow::Result<Vec<Bet>> {
        if self.broken_parents.lock().contains(&parent_id) {
            anyhow::bail!("connection reset while loading legs of {parent_id}");
        }
        Ok(self
            .bets
            .lock()
            .iter()
            .filter(|b| b.parent_id == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn pending_bets(&self, limit: i64) -> anyhow::Result<PendingBatch> {
        let unreadable = self.unreadable.lock().clone();
        if let Some(frozen) = self.frozen_pending.lock().clone() {
            return Ok(PendingBatch {
                bets: frozen,
                unreadable,
            });
        }
        let bets = self
            .bets
            .lock()
            .iter()
            .filter(|b| b.is_pending())
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok(PendingBatch { bets, unreadable })
    }

    async fn record_result(&self, id: Uuid, result: BetResult, reason: Option<&str>) -> anyhow::Result<bool> {
        let mut bets = self.bets.lock();
        let Some(bet) = bets.iter_mut().find(|b| b.id == id) else {
            anyhow::bail!("bet {id} not found");
        };
        if !bet.is_pending() {
            return Ok(false);
        }
        bet.settle(result, reason.map(str::to_string))?;
        Ok(true)
    }

    async fn lock_started(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut locked = 0;
        for bet in self.bets.lock().iter_mut() {
            if bet.lock_if_started(now) {
                locked += 1;
            }
        }
        Ok(locked)
    }
}

pub struct Harness {
    pub provider: Arc<FakeProvider>,
    pub store: Arc<MemoryBetStore>,
    pub clock: Arc<FixedClock>,
    pub gateway: Arc<EventGateway>,
}

impl Harness {
    pub fn new(now: &str) -> Self {
        let provider = Arc::new(FakeProvider::default());
        let clock = Arc::new(FixedClock::new(ts(now)));
        let gateway = Arc::new(EventGateway::new(
            provider.clone(),
            Arc::new(MemoryEventCache::new(clock.clone())),
            Arc::new(ContainmentResolver),
        ));
        Self {
            provider,
            store: Arc::new(MemoryBetStore::default()),
            clock,
            gateway,
        }
    }

    pub fn settler(&self) -> Settler {
        Settler::new(self.gateway.clone(), self.store.clone(), self.clock.clone())
    }

    pub fn validator(&self) -> Validator {
        Validator::new(self.gateway.clone(), self.clock.clone(), ValidationParams::default())
    }
}

pub fn event_ref(event_id: Option<&str>, home: &str, away: &str, starts_at: &str) -> EventRef {
    EventRef {
        event_id: event_id.map(str::to_string),
        league: Some("NBA".to_string()),
        home_team: Some(home.to_string()),
        away_team: Some(away.to_string()),
        starts_at: ts(starts_at),
    }
}

pub fn bet(event: EventRef, market: BetMarket, american: &str) -> Bet {
    Bet::new(
        Uuid::new_v4(),
        event,
        market,
        Odds::parse(OddsFormat::American, american).unwrap(),
    )
}
