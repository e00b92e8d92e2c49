//! Exit-page statistics
//!
//! Each visitor contributes exactly one exit: the path of their
//! chronologically last event in the window, regardless of session
//! boundaries. `visits` counts every event at a path. Paths nobody left
//! from are still reported, with a zero exit rate. Every visited path is
//! reported, so paths nobody left from appear with a zero exit rate.

use super::{percentage, ratio, round1};
use crate::types::{Event, ExitPage};
use std::collections::HashMap;

/// Number of exit pages returned by [`exit_pages`].
pub const DEFAULT_EXIT_PAGE_LIMIT: usize = 10;

#[derive(Default)]
struct PathStats {
    visits: u64,
    exits: u64,
    time_on_page_sum: f64,
}

/// Top 10 exit pages by exit rate.
pub fn exit_pages(events: &[Event]) -> Vec<ExitPage> {
    exit_pages_with_limit(events, DEFAULT_EXIT_PAGE_LIMIT)
}

/// Exit pages sorted by exit rate (then visits, then path), truncated to `limit`.
pub fn exit_pages_with_limit(events: &[Event], limit: usize) -> Vec<ExitPage> {
    let mut stats: HashMap<&str, PathStats> = HashMap::new();
    // Last event per visitor; on equal timestamps the later arrival wins
    let mut last_seen: HashMap<&str, &Event> = HashMap::new();

    for event in events {
        let entry = stats.entry(event.path.as_str()).or_default();
        entry.visits += 1;
        entry.time_on_page_sum += event.time_on_page_secs();

        last_seen
            .entry(event.visitor_id.as_str())
            .and_modify(|current| {
                if event.timestamp >= current.timestamp {
                    *current = event;
                }
            })
            .or_insert(event);
    }

    for exit in last_seen.values() {
        if let Some(entry) = stats.get_mut(exit.path.as_str()) {
            entry.exits += 1;
        }
    }

    let mut pages: Vec<ExitPage> = stats
        .into_iter()
        .map(|(path, s)| ExitPage {
            path: path.to_string(),
            exits: s.exits,
            visits: s.visits,
            exit_rate: percentage(s.exits, s.visits),
            avg_time_on_page: round1(ratio(s.time_on_page_sum, s.visits as f64)),
        })
        .collect();

    pages.sort_by(|a, b| {
        b.exit_rate
            .total_cmp(&a.exit_rate)
            .then_with(|| b.visits.cmp(&a.visits))
            .then_with(|| a.path.cmp(&b.path))
    });
    pages.truncate(limit);
    pages
}
