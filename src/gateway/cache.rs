use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::Event;
use crate::utils::time::Clock;

/// Short-lived event cache injected into the gateway.
///
/// Implementations must treat their own failures as misses; the gateway never sees errors.
#[async_trait]
pub trait EventCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Event>;
    async fn set(&self, key: &str, event: &Event, ttl: Duration);
}

struct Entry {
    event: Event,
    expires_at: DateTime<Utc>,
}

/// Process-local cache. Expiry is measured against the injected clock.
pub struct MemoryEventCache {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryEventCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventCache for MemoryEventCache {
    async fn get(&self, key: &str) -> Option<Event> {
        let now = self.clock.now();
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.event.clone())
    }

    async fn set(&self, key: &str, event: &Event, ttl: Duration) {
        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());
        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                event: event.clone(),
                expires_at: now + ttl,
            },
        );
    }
}
