//! Event store adapters
//!
//! The hosted event store is an external collaborator: given a site id and a
//! time window it returns that site's raw page-view events. [`EventStore`] is
//! the seam; two adapters ship with the crate:
//!
//! - [`MemoryEventStore`]: in-process events, for embedding and tests
//! - [`HttpEventStore`]: `GET {base_url}/sites/{site_id}/events?start=..&end=..`

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};

use crate::config::EventStoreConfig;
use crate::error::{Error, Result};
use crate::types::{Event, TimeWindow};

/// Source of raw events for a site.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Events for `site_id` with timestamps inside `window`, in arrival order.
    async fn fetch_events(&self, site_id: &str, window: &TimeWindow) -> Result<Vec<Event>>;
}

/// In-memory event store keyed by site id.
#[derive(Default)]
pub struct MemoryEventStore {
    sites: RwLock<HashMap<String, Vec<Event>>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append events for a site.
    pub fn insert(&self, site_id: &str, events: impl IntoIterator<Item = Event>) {
        let mut sites = self
            .sites
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sites.entry(site_id.to_string()).or_default().extend(events);
    }

    /// Number of stored events for a site.
    pub fn event_count(&self, site_id: &str) -> usize {
        self.sites
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(site_id)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn fetch_events(&self, site_id: &str, window: &TimeWindow) -> Result<Vec<Event>> {
        let sites = self
            .sites
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(sites
            .get(site_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| window.contains(e.timestamp))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// HTTP adapter for the hosted event query service.
pub struct HttpEventStore {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpEventStore {
    /// Create a client from configuration.
    ///
    /// Returns an error if `base_url` is missing or the api key is not a
    /// valid header value.
    pub fn new(config: &EventStoreConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| Error::Config("event_store.base_url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &config.api_key {
            let auth_value = format!("Bearer {}", api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid event_store.api_key: {}", e)))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn events_url(&self, site_id: &str) -> String {
        format!(
            "{}/sites/{}/events",
            self.base_url,
            urlencoding::encode(site_id)
        )
    }
}

#[async_trait]
impl EventStore for HttpEventStore {
    async fn fetch_events(&self, site_id: &str, window: &TimeWindow) -> Result<Vec<Event>> {
        let url = self.events_url(site_id);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("start", window.start.to_rfc3339()),
                ("end", window.end.to_rfc3339()),
            ])
            .send()
            .await
            .map_err(|e| Error::EventStore(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| Error::EventStore(format!("failed to read response: {}", e)))?;
            let events: Vec<Event> = serde_json::from_str(&body)?;
            tracing::debug!(site_id, events = events.len(), "Fetched events");
            Ok(events)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::EventStore(format!(
                "API error ({}): {}",
                status, error_text
            )))
        }
    }
}
