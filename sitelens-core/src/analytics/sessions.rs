//! Session reconstruction
//!
//! Splits each visitor's event stream into sessions. A new session starts
//! whenever the gap to the previous event of the same visitor is strictly
//! greater than the session gap (30 minutes by default); a gap of exactly
//! 30 minutes keeps the events together.

use crate::types::{Event, Session};
use chrono::Duration;
use std::collections::HashMap;

/// Default inactivity gap, in seconds.
pub const SESSION_GAP_SECS: i64 = 1800;

/// The default session gap as a [`Duration`].
pub fn default_session_gap() -> Duration {
    Duration::seconds(SESSION_GAP_SECS)
}

/// Reconstruct sessions using the default 30 minute gap.
pub fn reconstruct(events: &[Event]) -> Vec<Session> {
    reconstruct_with_gap(events, default_session_gap())
}

/// Reconstruct sessions with a custom inactivity gap.
///
/// Every input event ends up in exactly one session. Output is ordered by
/// `(started_at, visitor_id)`.
pub fn reconstruct_with_gap(events: &[Event], gap: Duration) -> Vec<Session> {
    let mut sessions = Vec::new();

    for (_, mut stream) in group_by_visitor(events) {
        // Stable sort keeps arrival order for identical timestamps
        stream.sort_by_key(|e| e.timestamp);

        let mut current: Vec<Event> = Vec::new();
        for event in stream {
            if let Some(prev) = current.last() {
                if event.timestamp - prev.timestamp > gap {
                    sessions.push(close_session(std::mem::take(&mut current)));
                }
            }
            current.push(event.clone());
        }
        if !current.is_empty() {
            sessions.push(close_session(current));
        }
    }

    sessions.sort_by(|a, b| {
        a.started_at
            .cmp(&b.started_at)
            .then_with(|| a.visitor_id.cmp(&b.visitor_id))
    });

    tracing::debug!(
        events = events.len(),
        sessions = sessions.len(),
        gap_secs = gap.num_seconds(),
        "Reconstructed sessions"
    );

    sessions
}

/// Group events by visitor, keeping arrival order within each group.
pub(crate) fn group_by_visitor(events: &[Event]) -> HashMap<&str, Vec<&Event>> {
    let mut groups: HashMap<&str, Vec<&Event>> = HashMap::new();
    for event in events {
        groups.entry(event.visitor_id.as_str()).or_default().push(event);
    }
    groups
}

/// Build a session from a non-empty, chronologically sorted run of events.
fn close_session(events: Vec<Event>) -> Session {
    let first = &events[0];
    let last = &events[events.len() - 1];
    Session {
        visitor_id: first.visitor_id.clone(),
        started_at: first.timestamp,
        ended_at: last.timestamp,
        events,
    }
}
