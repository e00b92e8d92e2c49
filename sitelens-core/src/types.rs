//! Core domain types for sitelens
//!
//! Raw page-view events come in from an [`EventStore`](crate::store::EventStore);
//! everything else in this module is derived from them and recomputed per request.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Event** | One page view by one visitor |
//! | **Session** | A maximal run of one visitor's events with no gap above 30 minutes |
//! | **Bounce** | A session consisting of exactly one event |
//! | **Exit page** | The path of a visitor's chronologically last event in the window |
//! | **Funnel stage** | One step of the canonical visitor journey |
//!
//! All result records serialize with camelCase field names since they are
//! consumed directly by dashboard components.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Source key used when an event carries neither a UTM source nor a referrer.
pub const DIRECT_SOURCE: &str = "direct";

// ============================================
// Events
// ============================================

/// A raw page-view record as returned by the event store.
///
/// Optional fields that are missing from the payload deserialize to `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Pseudo-anonymous visitor identifier, stable across a visit
    pub visitor_id: String,
    /// Page path visited
    pub path: String,
    /// HTTP referrer, if any
    #[serde(default)]
    pub referrer: Option<String>,
    /// `utm_source` campaign parameter, if any
    #[serde(default)]
    pub utm_source: Option<String>,
    /// When the event was recorded
    pub timestamp: DateTime<Utc>,
    /// Seconds spent on the page, if the tracker reported it
    #[serde(default)]
    pub time_on_page: Option<f64>,
    /// Device/locale data; carried through but never read by aggregation
    #[serde(default)]
    pub metadata: Option<EventMetadata>,
}

/// Device and locale information attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl Event {
    /// Create a page-view event with no referrer, source or timing data.
    pub fn page_view(
        visitor_id: impl Into<String>,
        path: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            visitor_id: visitor_id.into(),
            path: path.into(),
            referrer: None,
            utm_source: None,
            timestamp,
            time_on_page: None,
            metadata: None,
        }
    }

    /// Attribution key: `utm_source`, else `referrer`, else `"direct"`.
    ///
    /// Blank strings count as absent.
    pub fn source_key(&self) -> &str {
        non_blank(self.utm_source.as_deref())
            .or_else(|| non_blank(self.referrer.as_deref()))
            .unwrap_or(DIRECT_SOURCE)
    }

    /// Time on page in seconds, `0.0` when missing or not a usable number.
    pub fn time_on_page_secs(&self) -> f64 {
        match self.time_on_page {
            Some(secs) if secs.is_finite() && secs > 0.0 => secs,
            _ => 0.0,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ============================================
// Sessions
// ============================================

/// A run of one visitor's events, consecutive events at most the
/// session gap apart.
///
/// Identity is `(visitor_id, started_at)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub visitor_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Events in chronological order; never empty
    pub events: Vec<Event>,
}

impl Session {
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// A bounce is a session with exactly one event.
    pub fn is_bounce(&self) -> bool {
        self.events.len() == 1
    }

    /// Seconds between the first and last event.
    pub fn duration_secs(&self) -> f64 {
        (self.ended_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

// ============================================
// Time windows
// ============================================

/// Half-open query window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, rejecting `end < start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidWindow(format!(
                "end {} is before start {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// The `days` long window ending at `end`.
    ///
    /// Saturates at the earliest representable instant.
    pub fn last_days(end: DateTime<Utc>, days: i64) -> Self {
        let start = Duration::try_days(days.max(0))
            .and_then(|span| end.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end }
    }

    /// The window of length `lookback` that ends where this one starts.
    ///
    /// An event exactly at `self.start` belongs to `self`, never to the
    /// previous window.
    pub fn previous(&self, lookback: Duration) -> Self {
        Self {
            start: self
                .start
                .checked_sub_signed(lookback)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            end: self.start,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

// ============================================
// Aggregate results
// ============================================

/// Visitor and engagement totals for a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreMetrics {
    pub total_visitors: u64,
    pub new_visitors: u64,
    pub returning_visitors: u64,
    /// Percentage of sessions with a single event
    pub bounce_rate: f64,
    /// Mean duration of multi-event sessions, in seconds
    pub avg_session_duration: f64,
    pub pages_per_visit: f64,
    pub total_page_views: u64,
    pub total_sessions: u64,
}

/// Exit statistics for one path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitPage {
    pub path: String,
    pub exits: u64,
    pub visits: u64,
    pub exit_rate: f64,
    pub avg_time_on_page: f64,
}

/// Visitors and estimated value per acquisition source.
///
/// `estimated_*` fields come from the configured
/// [`SourceEstimates`](crate::analytics::sources::SourceEstimates) table,
/// not from measured conversions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSource {
    pub source: String,
    pub visitors: u64,
    pub bounced_visitors: u64,
    pub bounce_rate: f64,
    pub estimated_conversions: f64,
    pub estimated_cost: f64,
    pub estimated_revenue: f64,
}

/// One step of the canonical visitor journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStage {
    pub index: usize,
    pub path: String,
    pub visitors: u64,
    pub drop_off_count: u64,
    pub drop_off_rate: f64,
}

/// Everything the dashboard shows for one site and window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub metrics: CoreMetrics,
    pub exit_pages: Vec<ExitPage>,
    pub traffic_sources: Vec<TrafficSource>,
    pub funnel: Vec<FunnelStage>,
    /// `false` when the window held no events or the store was unreachable
    pub real_data: bool,
}

impl AggregateResult {
    /// All-zero result with `real_data = false`.
    pub fn empty() -> Self {
        Self::default()
    }
}
