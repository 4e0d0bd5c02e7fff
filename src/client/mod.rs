use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::Event;

pub mod models;
pub mod sports;

pub use sports::SportsDataClient;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("provider rejected request: {0}")]
    Provider(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Filters for the team/date fallback search.
#[derive(Clone, Debug, PartialEq)]
pub struct EventQuery {
    pub league: String,
    pub starts_after: DateTime<Utc>,
    pub starts_before: DateTime<Utc>,
}

/// Outbound port to the sports data provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventProvider: Send + Sync {
    /// Fetch a single event aggregate by provider id.
    async fn event_by_id(&self, event_id: &str) -> ClientResult<Option<Event>>;

    /// Fetch every event of a league starting inside the query window.
    async fn events_in_window(&self, query: &EventQuery) -> ClientResult<Vec<Event>>;
}
