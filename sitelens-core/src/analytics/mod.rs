//! Traffic analytics for sitelens
//!
//! Turns a window of raw page-view events into the dashboard aggregate:
//! - Session reconstruction ([`sessions`])
//! - Visitor and engagement metrics ([`metrics`])
//! - Exit pages ([`exit_pages`])
//! - Traffic-source attribution ([`sources`])
//! - Conversion funnel ([`funnel`])
//!
//! ```text
//! events ──► sessions ──► metrics ─────┐
//!    │                                 │
//!    ├──────► exit_pages ──────────────┤
//!    ├──────► sources ─────────────────┼──► AggregateResult
//!    └──────► funnel ──────────────────┘
//! ```
//!
//! Every function here is pure: the same events always produce the same result.

pub mod exit_pages;
pub mod funnel;
pub mod metrics;
pub mod sessions;
pub mod sources;

pub use exit_pages::exit_pages;
pub use funnel::funnel;
pub use metrics::aggregate;
pub use sessions::reconstruct;
pub use sources::{sources, SourceEstimate, SourceEstimates};

use crate::config::AnalyticsConfig;
use crate::error::{Error, Result};
use crate::types::{AggregateResult, Event};
use chrono::Duration;
use std::collections::HashSet;

/// Tunables for [`compute_aggregate`].
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub session_gap: Duration,
    pub exit_page_limit: usize,
    pub funnel_max_stages: usize,
    pub estimates: SourceEstimates,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            session_gap: sessions::default_session_gap(),
            exit_page_limit: exit_pages::DEFAULT_EXIT_PAGE_LIMIT,
            funnel_max_stages: funnel::DEFAULT_FUNNEL_STAGES,
            estimates: SourceEstimates::default(),
        }
    }
}

impl AggregateOptions {
    /// Options from the `[analytics]` config section and an estimate table.
    ///
    /// Fails when `session_gap_secs` does not fit a [`Duration`].
    pub fn from_config(config: &AnalyticsConfig, estimates: SourceEstimates) -> Result<Self> {
        let session_gap = i64::try_from(config.session_gap_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                Error::Config(format!(
                    "analytics.session_gap_secs out of range: {}",
                    config.session_gap_secs
                ))
            })?;

        Ok(Self {
            session_gap,
            exit_page_limit: config.exit_page_limit,
            funnel_max_stages: config.funnel_max_stages,
            estimates,
        })
    }
}

/// Run the full pipeline over one window of events.
///
/// An empty window yields [`AggregateResult::empty`].
pub fn compute_aggregate(
    events: &[Event],
    historical_visitor_ids: &HashSet<String>,
    options: &AggregateOptions,
) -> AggregateResult {
    if events.is_empty() {
        return AggregateResult::empty();
    }

    let sessions = sessions::reconstruct_with_gap(events, options.session_gap);
    let metrics = metrics::aggregate_sessions(&sessions, historical_visitor_ids);

    AggregateResult {
        metrics,
        exit_pages: exit_pages::exit_pages_with_limit(events, options.exit_page_limit),
        traffic_sources: sources::sources(events, &options.estimates),
        funnel: funnel::funnel_with_depth(events, options.funnel_max_stages),
        real_data: true,
    }
}

/// Round to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `numerator / denominator`, or `0.0` when the denominator is zero.
pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        numerator / denominator
    }
}

/// `part / whole × 100` rounded to one decimal, `0.0` when `whole` is zero.
pub(crate) fn percentage(part: u64, whole: u64) -> f64 {
    round1(ratio(part as f64, whole as f64) * 100.0)
}
