use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::Event;
use crate::types::ProviderConfig;

use super::models::{EventsEnvelope, WireEvent};
use super::{ClientError, ClientResult, EventProvider, EventQuery};

const API_KEY_HEADER: &str = "X-Api-Key";

/// HTTP client for the sports data provider's `/events` endpoint.
pub struct SportsDataClient {
    http: Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
}

impl SportsDataClient {
    pub fn new(config: &ProviderConfig) -> ClientResult<Self> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            ClientError::Config(
                "provider api_key must be set in config or SPORTS_DATA_API_KEY".to_string(),
            )
        })?;

        let http = Client::builder()
            .user_agent("wager-engine/0.1")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            max_retries: config.max_retries,
        })
    }

    fn backoff(attempt: u32) -> Duration {
        let capped = attempt.min(5);
        let millis = 500 * (1_u64 << capped);
        Duration::from_millis(millis.min(8_000))
    }

    /// GET `/events` with retries on transport errors and 5xx responses.
    async fn get_events(&self, query: &[(&str, String)]) -> ClientResult<Vec<Event>> {
        let url = format!("{}/events", self.base_url);

        let mut attempt = 0;
        let envelope: EventsEnvelope = loop {
            let req = self
                .http
                .get(&url)
                .header(API_KEY_HEADER, &self.api_key)
                .query(query);

            match req.send().await {
                Ok(resp) => {
                    if resp.status().is_success() {
                        break resp.json::<EventsEnvelope>().await?;
                    }

                    if resp.status().is_server_error() && attempt < self.max_retries {
                        attempt += 1;
                        sleep(Self::backoff(attempt)).await;
                        continue;
                    }

                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    return Err(ClientError::HttpStatus { status, body });
                }
                Err(err) => {
                    if attempt < self.max_retries {
                        attempt += 1;
                        warn!(target: "gateway", error = %err, attempt, "provider request failed; retrying");
                        sleep(Self::backoff(attempt)).await;
                        continue;
                    }

                    return Err(ClientError::Http(err));
                }
            }
        };

        if envelope.success == Some(false) {
            return Err(ClientError::Provider(
                envelope.error.unwrap_or_else(|| "success=false".to_string()),
            ));
        }

        Ok(decode_events(envelope.data))
    }
}

/// Decode each raw event on its own; malformed ones are logged and skipped.
fn decode_events(raw: Vec<Value>) -> Vec<Event> {
    raw.into_iter()
        .filter_map(|v| match serde_json::from_value::<WireEvent>(v) {
            Ok(wire) => wire.into_event(),
            Err(err) => {
                warn!(target: "gateway", error = %err, "skipping malformed provider event");
                None
            }
        })
        .collect()
}

#[async_trait]
impl EventProvider for SportsDataClient {
    async fn event_by_id(&self, event_id: &str) -> ClientResult<Option<Event>> {
        debug!(target: "gateway", event_id = %event_id, "provider lookup by id");
        let events = self
            .get_events(&[("eventIDs", event_id.to_string())])
            .await?;
        Ok(events.into_iter().find(|e| e.id == event_id))
    }

    async fn events_in_window(&self, query: &EventQuery) -> ClientResult<Vec<Event>> {
        debug!(
            target: "gateway",
            league = %query.league,
            from = %query.starts_after,
            to = %query.starts_before,
            "provider search by league window"
        );
        self.get_events(&[
            ("leagueID", query.league.clone()),
            ("startsAfter", query.starts_after.to_rfc3339()),
            ("startsBefore", query.starts_before.to_rfc3339()),
        ])
        .await
    }
}
