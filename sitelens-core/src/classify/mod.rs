//! Website-type classification
//!
//! Scores a site's observed paths against the weighted rule [`catalog`] to
//! guess its business category.
//!
//! ## Scoring
//!
//! For every category:
//!
//! ```text
//! score = Σ weight × |unique paths containing keyword|
//!       + Σ 3 × |unique paths matching pattern|
//! ```
//!
//! Structural boosts are added afterwards:
//!
//! | Signal | Boost |
//! |--------|-------|
//! | product-like paths | ecommerce += 2 per path |
//! | date-like paths (`/2024/05/...`) | news += 2, blog += 1 per path |
//! | search-like paths | ecommerce, directory, marketplace += 1.5 per path |
//! | > 40% deep paths (4+ segments) | saas += 10 × deep fraction |
//!
//! ## Confidence
//!
//! `30 + 6·ln(1 + max) + 2·(max − second)`, +8 when e-commerce technical
//! signals corroborate an e-commerce verdict, −12 for fewer than 5 observed
//! paths, −10 when over 80% of unique paths are single-segment. Clamped to
//! `[20, 99]`.

pub mod catalog;
pub mod structure;

pub use catalog::{CategoryRules, WebsiteType, CATALOG};
pub use structure::UrlStructureStats;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const BASE_CONFIDENCE: f64 = 30.0;
const MIN_CONFIDENCE: f64 = 20.0;
const MAX_CONFIDENCE: f64 = 99.0;
const ECOMMERCE_SIGNAL_BONUS: f64 = 8.0;
const SMALL_SAMPLE_PENALTY: f64 = 12.0;
const SMALL_SAMPLE_PATHS: usize = 5;
const FLAT_SITE_PENALTY: f64 = 10.0;
const FLAT_SITE_FRACTION: f64 = 0.8;
const DEEP_SITE_FRACTION: f64 = 0.4;

/// Result of classifying a site's paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub website_type: WebsiteType,
    /// Heuristic confidence in `[20, 99]`
    pub confidence: f64,
    /// Raw score per catalog category, boosts included
    pub pattern_scores: BTreeMap<WebsiteType, f64>,
    pub structure: UrlStructureStats,
    /// Cart/checkout/product paths corroborate an e-commerce site
    pub ecommerce_signals: bool,
}

/// Classifier over the static [`CATALOG`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier;

impl Classifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a site from its observed page-view paths.
    ///
    /// Duplicates are allowed; the number of paths is the sample size.
    pub fn classify<S: AsRef<str>>(&self, paths: &[S]) -> Classification {
        let unique = structure::unique_paths(paths);
        let structure = UrlStructureStats::from_paths(paths);

        let mut scores = self.pattern_scores(&unique);
        apply_structural_boosts(&mut scores, &structure);

        let (website_type, max_score, second_score) = pick_winner(&scores);
        let ecommerce_signals = has_ecommerce_signals(&unique, &structure);

        let mut confidence = BASE_CONFIDENCE
            + 6.0 * (1.0 + max_score).ln()
            + 2.0 * (max_score - second_score);
        if website_type == WebsiteType::Ecommerce && ecommerce_signals {
            confidence += ECOMMERCE_SIGNAL_BONUS;
        }
        if structure.total_paths < SMALL_SAMPLE_PATHS {
            confidence -= SMALL_SAMPLE_PENALTY;
        }
        if structure.single_segment_fraction() > FLAT_SITE_FRACTION {
            confidence -= FLAT_SITE_PENALTY;
        }
        let confidence = (confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE) * 10.0).round() / 10.0;

        tracing::debug!(
            website_type = website_type.as_str(),
            confidence,
            max_score,
            second_score,
            unique_paths = unique.len(),
            "Classified website"
        );

        Classification {
            website_type,
            confidence,
            pattern_scores: scores,
            structure,
            ecommerce_signals,
        }
    }

    /// Keyword and regex scores per category, before structural boosts.
    pub fn pattern_scores(&self, unique_paths: &[String]) -> BTreeMap<WebsiteType, f64> {
        let mut scores = BTreeMap::new();

        for (rules, regexes) in catalog::compiled_catalog() {
            let mut score = 0.0;
            for (keyword, weight) in rules.keywords {
                let hits = unique_paths.iter().filter(|p| p.contains(keyword)).count();
                score += weight * hits as f64;
            }
            for regex in regexes {
                let hits = unique_paths.iter().filter(|p| regex.is_match(p)).count();
                score += catalog::PATTERN_WEIGHT * hits as f64;
            }
            scores.insert(rules.website_type, score);
        }

        scores
    }
}

/// Classify with the default catalog.
pub fn classify<S: AsRef<str>>(paths: &[S]) -> Classification {
    Classifier::new().classify(paths)
}

fn apply_structural_boosts(scores: &mut BTreeMap<WebsiteType, f64>, stats: &UrlStructureStats) {
    let mut boost = |website_type: WebsiteType, amount: f64| {
        *scores.entry(website_type).or_insert(0.0) += amount;
    };

    boost(WebsiteType::Ecommerce, 2.0 * stats.product_paths as f64);
    boost(WebsiteType::News, 2.0 * stats.date_paths as f64);
    boost(WebsiteType::Blog, stats.date_paths as f64);
    for website_type in [
        WebsiteType::Ecommerce,
        WebsiteType::Directory,
        WebsiteType::Marketplace,
    ] {
        boost(website_type, 1.5 * stats.search_paths as f64);
    }

    let deep_fraction = stats.deep_fraction();
    if deep_fraction > DEEP_SITE_FRACTION {
        boost(WebsiteType::Saas, 10.0 * deep_fraction);
    }
}

/// Highest scoring category and the top two scores.
///
/// Scores iterate in declaration order and only a strictly greater score
/// replaces the leader, so ties go to the earlier category. All-zero scores
/// yield [`WebsiteType::General`].
fn pick_winner(scores: &BTreeMap<WebsiteType, f64>) -> (WebsiteType, f64, f64) {
    let mut winner = WebsiteType::General;
    let mut max = 0.0;
    let mut second = 0.0;

    for (website_type, score) in scores {
        if *score > max {
            second = max;
            max = *score;
            winner = *website_type;
        } else if *score > second {
            second = *score;
        }
    }

    (winner, max, second)
}

fn has_ecommerce_signals(unique_paths: &[String], stats: &UrlStructureStats) -> bool {
    let has = |needles: &[&str]| {
        unique_paths
            .iter()
            .any(|p| needles.iter().any(|needle| p.contains(needle)))
    };
    let cart = has(&["/cart", "/basket", "/bag"]);
    let checkout = has(&["/checkout", "/payment", "/order"]);

    (cart && checkout) || (cart && stats.product_paths > 0)
}
