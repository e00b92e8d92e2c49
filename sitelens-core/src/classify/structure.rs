//! Structural statistics over a site's URL paths.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

/// Paths with at least this many segments count as deep.
pub const DEEP_PATH_SEGMENTS: usize = 4;

/// Counts of path shapes, computed over unique paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlStructureStats {
    /// Observed page views, duplicates included
    pub total_paths: usize,
    pub unique_paths: usize,
    pub product_paths: usize,
    pub category_paths: usize,
    pub date_paths: usize,
    pub search_paths: usize,
    /// Unique paths with at most one segment (`/` and `/about`)
    pub single_segment_paths: usize,
    pub deep_paths: usize,
    /// Segment count → number of unique paths
    pub depth_distribution: BTreeMap<usize, usize>,
    pub avg_depth: f64,
}

impl UrlStructureStats {
    /// Analyze observed paths.
    pub fn from_paths<S: AsRef<str>>(paths: &[S]) -> Self {
        let unique = unique_paths(paths);
        let mut stats = UrlStructureStats {
            total_paths: paths.len(),
            unique_paths: unique.len(),
            ..Default::default()
        };

        let mut depth_sum = 0usize;
        for path in &unique {
            let depth = segment_count(path);
            depth_sum += depth;
            *stats.depth_distribution.entry(depth).or_default() += 1;

            if depth <= 1 {
                stats.single_segment_paths += 1;
            }
            if depth >= DEEP_PATH_SEGMENTS {
                stats.deep_paths += 1;
            }
            if is_product_path(path) {
                stats.product_paths += 1;
            }
            if is_category_path(path) {
                stats.category_paths += 1;
            }
            if is_date_path(path) {
                stats.date_paths += 1;
            }
            if is_search_path(path) {
                stats.search_paths += 1;
            }
        }

        if !unique.is_empty() {
            stats.avg_depth = (depth_sum as f64 / unique.len() as f64 * 10.0).round() / 10.0;
        }
        stats
    }

    /// Fraction of unique paths with at most one segment.
    pub fn single_segment_fraction(&self) -> f64 {
        fraction(self.single_segment_paths, self.unique_paths)
    }

    /// Fraction of unique paths that are deep.
    pub fn deep_fraction(&self) -> f64 {
        fraction(self.deep_paths, self.unique_paths)
    }
}

fn fraction(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Lowercased unique paths, in first-seen order.
pub(crate) fn unique_paths<S: AsRef<str>>(paths: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    paths
        .iter()
        .map(|p| normalize(p.as_ref()))
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

/// Lowercase and trim; empty paths become `/`.
fn normalize(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Path without query string or fragment.
fn route(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

/// Number of non-empty segments in the route part of a path.
pub(crate) fn segment_count(path: &str) -> usize {
    route(path).split('/').filter(|s| !s.is_empty()).count()
}

fn product_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(^|/)(products?|items?|p|dp|sku)/[^/]+").expect("product regex must compile")
    })
}

fn category_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(^|/)(category|categories|collections?|c|department|shop)/[^/]+")
            .expect("category regex must compile")
    })
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"/(19|20)\d{2}/(0?[1-9]|1[0-2])(/|$)").expect("date regex must compile")
    })
}

pub(crate) fn is_product_path(path: &str) -> bool {
    product_regex().is_match(route(path))
}

fn is_category_path(path: &str) -> bool {
    category_regex().is_match(route(path))
}

fn is_date_path(path: &str) -> bool {
    date_regex().is_match(route(path))
}

fn is_search_path(path: &str) -> bool {
    let route = route(path);
    route.contains("/search")
        || route.contains("/find")
        || ["?q=", "&q=", "?s=", "&s=", "query="]
            .iter()
            .any(|marker| path.contains(marker))
}
