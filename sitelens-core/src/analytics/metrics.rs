//! Core visitor and engagement metrics
//!
//! | Metric | Definition |
//! |--------|------------|
//! | `total_visitors` | Distinct visitor ids in the window |
//! | `returning_visitors` | Visitors also seen in the historical window |
//! | `new_visitors` | `total - returning` |
//! | `bounce_rate` | Single-event sessions / sessions × 100 |
//! | `avg_session_duration` | Mean of (last − first) over multi-event sessions |
//! | `pages_per_visit` | Events / sessions |
//!
//! Rates are rounded to one decimal and are `0.0` when there are no sessions.

use super::sessions::reconstruct;
use super::{percentage, ratio, round1};
use crate::types::{CoreMetrics, Event, Session};
use std::collections::HashSet;

/// Compute core metrics for a window of events.
///
/// `historical_visitor_ids` holds the visitors seen in the older window that
/// precedes the queried one.
pub fn aggregate(events: &[Event], historical_visitor_ids: &HashSet<String>) -> CoreMetrics {
    let sessions = reconstruct(events);
    aggregate_sessions(&sessions, historical_visitor_ids)
}

/// Compute core metrics from already reconstructed sessions.
pub fn aggregate_sessions(
    sessions: &[Session],
    historical_visitor_ids: &HashSet<String>,
) -> CoreMetrics {
    let visitors: HashSet<&str> = sessions.iter().map(|s| s.visitor_id.as_str()).collect();
    let returning = visitors
        .iter()
        .filter(|id| historical_visitor_ids.contains(**id))
        .count() as u64;
    let total_visitors = visitors.len() as u64;

    let total_sessions = sessions.len() as u64;
    let total_page_views: u64 = sessions.iter().map(|s| s.event_count() as u64).sum();
    let bounces = sessions.iter().filter(|s| s.is_bounce()).count() as u64;

    let multi_event: Vec<f64> = sessions
        .iter()
        .filter(|s| !s.is_bounce())
        .map(Session::duration_secs)
        .collect();
    let duration_sum: f64 = multi_event.iter().sum();

    CoreMetrics {
        total_visitors,
        new_visitors: total_visitors - returning,
        returning_visitors: returning,
        bounce_rate: percentage(bounces, total_sessions),
        avg_session_duration: round1(ratio(duration_sum, multi_event.len() as f64)),
        pages_per_visit: round1(ratio(total_page_views as f64, total_sessions as f64)),
        total_page_views,
        total_sessions,
    }
}
