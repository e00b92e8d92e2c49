//! Traffic-source attribution
//!
//! Each event is attributed to `utm_source`, else `referrer`, else `"direct"`.
//! A visitor counts once per source they arrived through. Bounce is a
//! per-visitor flag: exactly one event anywhere in the window.
//!
//! Cost, conversion and revenue figures are estimates computed from the
//! [`SourceEstimates`] table. They are configuration, not measurements.

use super::{percentage, round1, round2};
use crate::types::{Event, TrafficSource, DIRECT_SOURCE};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Assumed value of one conversion when nothing is configured.
pub const DEFAULT_AVERAGE_ORDER_VALUE: f64 = 50.0;

/// Estimated acquisition cost and conversion rate for one source.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SourceEstimate {
    /// Cost per acquired visitor
    pub cost_per_acquisition: f64,
    /// Fraction of visitors assumed to convert (0.0 - 1.0)
    pub conversion_rate: f64,
}

impl SourceEstimate {
    pub const fn new(cost_per_acquisition: f64, conversion_rate: f64) -> Self {
        Self {
            cost_per_acquisition,
            conversion_rate,
        }
    }
}

/// Built-in estimates, keyed by a lowercase source fragment.
const BUILTIN_ESTIMATES: &[(&str, SourceEstimate)] = &[
    ("bing", SourceEstimate::new(2.0, 0.028)),
    ("direct", SourceEstimate::new(0.0, 0.04)),
    ("email", SourceEstimate::new(0.5, 0.05)),
    ("facebook", SourceEstimate::new(3.0, 0.02)),
    ("google", SourceEstimate::new(2.5, 0.03)),
    ("instagram", SourceEstimate::new(3.5, 0.018)),
    ("linkedin", SourceEstimate::new(5.0, 0.025)),
    ("newsletter", SourceEstimate::new(0.5, 0.05)),
    ("reddit", SourceEstimate::new(1.5, 0.015)),
    ("tiktok", SourceEstimate::new(2.8, 0.012)),
    ("twitter", SourceEstimate::new(2.0, 0.015)),
    ("youtube", SourceEstimate::new(3.0, 0.02)),
];

/// Lookup table of per-source estimates.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEstimates {
    pub average_order_value: f64,
    /// Used for sources that match nothing in `sources`
    pub fallback: SourceEstimate,
    /// Keyed by lowercase source fragment
    pub sources: BTreeMap<String, SourceEstimate>,
}

impl Default for SourceEstimates {
    fn default() -> Self {
        Self {
            average_order_value: DEFAULT_AVERAGE_ORDER_VALUE,
            fallback: SourceEstimate::new(1.0, 0.02),
            sources: BUILTIN_ESTIMATES
                .iter()
                .map(|(name, estimate)| (name.to_string(), *estimate))
                .collect(),
        }
    }
}

impl SourceEstimates {
    /// Add or replace the estimate for a source fragment.
    pub fn set(&mut self, source: &str, estimate: SourceEstimate) {
        self.sources.insert(source.to_ascii_lowercase(), estimate);
    }

    /// Find the estimate for a source key.
    ///
    /// Exact (case-insensitive) matches win; otherwise the first fragment in
    /// key order contained in the source (`"https://www.google.com/"` →
    /// `google`); otherwise the fallback. `direct` only ever matches exactly.
    pub fn lookup(&self, source: &str) -> SourceEstimate {
        let normalized = source.to_ascii_lowercase();
        if let Some(estimate) = self.sources.get(&normalized) {
            return *estimate;
        }
        self.sources
            .iter()
            .filter(|(fragment, _)| fragment.as_str() != DIRECT_SOURCE)
            .find(|(fragment, _)| normalized.contains(fragment.as_str()))
            .map(|(_, estimate)| *estimate)
            .unwrap_or(self.fallback)
    }
}

/// Attribute visitors to sources, sorted by visitor count descending.
pub fn sources(events: &[Event], estimates: &SourceEstimates) -> Vec<TrafficSource> {
    let mut events_per_visitor: HashMap<&str, usize> = HashMap::new();
    let mut visitors_per_source: HashMap<&str, HashSet<&str>> = HashMap::new();

    for event in events {
        *events_per_visitor
            .entry(event.visitor_id.as_str())
            .or_default() += 1;
        visitors_per_source
            .entry(event.source_key())
            .or_default()
            .insert(event.visitor_id.as_str());
    }

    let mut result: Vec<TrafficSource> = visitors_per_source
        .into_iter()
        .map(|(source, visitors)| {
            let bounced = visitors
                .iter()
                .filter(|v| events_per_visitor.get(**v) == Some(&1))
                .count() as u64;
            let count = visitors.len() as u64;
            let estimate = estimates.lookup(source);
            let conversions = count as f64 * estimate.conversion_rate;

            TrafficSource {
                source: source.to_string(),
                visitors: count,
                bounced_visitors: bounced,
                bounce_rate: percentage(bounced, count),
                estimated_conversions: round1(conversions),
                estimated_cost: round2(count as f64 * estimate.cost_per_acquisition),
                estimated_revenue: round2(conversions * estimates.average_order_value),
            }
        })
        .collect();

    result.sort_by(|a, b| {
        b.visitors
            .cmp(&a.visitors)
            .then_with(|| a.source.cmp(&b.source))
    });
    result
}
