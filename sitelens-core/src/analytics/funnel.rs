//! Conversion funnel derived from the dominant visitor journey
//!
//! ## Algorithm
//!
//! 1. Build each visitor's chronological path sequence, one entry per event.
//! 2. Take the first `max_stages` paths of every multi-step sequence as its
//!    journey signature and pick the most frequent one. It must be shared by
//!    at least two visitors, unless there is only one visitor in the window.
//! 3. Without such a journey, the stages are the globally most visited paths.
//! 4. A visitor reaches stage `i` when the stage's path appears in their
//!    sequence at index `i` or earlier.
//!
//! Stage 0 never has drop-off.

use super::percentage;
use super::sessions::group_by_visitor;
use crate::types::{Event, FunnelStage};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Maximum number of stages in a funnel.
pub const DEFAULT_FUNNEL_STAGES: usize = 4;

const SIGNATURE_SEPARATOR: &str = " > ";

/// Build the funnel with the default depth of 4 stages.
pub fn funnel(events: &[Event]) -> Vec<FunnelStage> {
    funnel_with_depth(events, DEFAULT_FUNNEL_STAGES)
}

/// Build the funnel with up to `max_stages` stages.
pub fn funnel_with_depth(events: &[Event], max_stages: usize) -> Vec<FunnelStage> {
    if events.is_empty() || max_stages == 0 {
        return Vec::new();
    }

    let sequences = visitor_sequences(events);
    let distinct: HashSet<&str> = events.iter().map(|e| e.path.as_str()).collect();

    if distinct.len() < 2 {
        // Single distinct path: everyone reaches it, nobody drops off
        let path = events[0].path.clone();
        return vec![FunnelStage {
            index: 0,
            path,
            visitors: sequences.len() as u64,
            drop_off_count: 0,
            drop_off_rate: 0.0,
        }];
    }

    let stages = match canonical_journey(&sequences, max_stages) {
        Some(journey) => {
            tracing::debug!(
                journey = %journey.join(SIGNATURE_SEPARATOR),
                "Using canonical journey"
            );
            journey
        }
        None => {
            let top = most_visited_paths(events, max_stages);
            tracing::debug!(stages = top.len(), "No repeated journey, using top paths");
            top
        }
    };

    build_stages(&stages, &sequences)
}

/// Chronological path sequences, ordered by visitor id.
fn visitor_sequences(events: &[Event]) -> Vec<Vec<&str>> {
    let grouped: BTreeMap<&str, Vec<&Event>> = group_by_visitor(events).into_iter().collect();

    grouped
        .into_values()
        .map(|mut stream| {
            stream.sort_by_key(|e| e.timestamp);
            stream.into_iter().map(|e| e.path.as_str()).collect()
        })
        .collect()
}

/// The most frequent multi-step journey signature, if it qualifies.
fn canonical_journey(sequences: &[Vec<&str>], max_stages: usize) -> Option<Vec<String>> {
    let mut histogram: HashMap<Vec<&str>, usize> = HashMap::new();
    for sequence in sequences.iter().filter(|s| s.len() >= 2) {
        let signature = sequence[..sequence.len().min(max_stages)].to_vec();
        *histogram.entry(signature).or_default() += 1;
    }

    // Highest count wins, ties go to the lexicographically smaller signature
    let (signature, count) = histogram
        .into_iter()
        .max_by(|(sig_a, count_a), (sig_b, count_b)| {
            count_a.cmp(count_b).then_with(|| sig_b.cmp(sig_a))
        })?;

    if count >= 2 || sequences.len() == 1 {
        Some(signature.into_iter().map(String::from).collect())
    } else {
        None
    }
}

/// Paths with the most events, ties broken by path.
fn most_visited_paths(events: &[Event], limit: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for event in events {
        *counts.entry(event.path.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(path, _)| path.to_string())
        .collect()
}

fn build_stages(stages: &[String], sequences: &[Vec<&str>]) -> Vec<FunnelStage> {
    let mut result: Vec<FunnelStage> = Vec::with_capacity(stages.len());

    for (index, path) in stages.iter().enumerate() {
        let visitors = sequences
            .iter()
            .filter(|seq| seq.iter().take(index + 1).any(|p| *p == path.as_str()))
            .count() as u64;

        let (drop_off_count, drop_off_rate) = match result.last() {
            Some(prev) => {
                let dropped = prev.visitors.saturating_sub(visitors);
                (dropped, percentage(dropped, prev.visitors))
            }
            None => (0, 0.0),
        };

        result.push(FunnelStage {
            index,
            path: path.clone(),
            visitors,
            drop_off_count,
            drop_off_rate,
        });
    }

    result
}
