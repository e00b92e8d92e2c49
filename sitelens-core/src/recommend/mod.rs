//! Heuristic recommendations
//!
//! Recommendations come from one of two places:
//! - [`local_recommendations`]: deterministic rules over the classification
//!   and the aggregate metrics. Always available.
//! - [`RecommendationClient`]: an optional remote backend. Any failure or
//!   timeout there falls back to the local rules.
//!
//! ## Local rules
//!
//! | Rule | Trigger | Priority |
//! |------|---------|----------|
//! | `install-tracking` | no real data in the window | High |
//! | `reduce-bounce` | bounce rate > 60% | High |
//! | `fix-exit-page` | top exit page > 70% exit rate with 5+ visits | High |
//! | `funnel-drop-off` | any funnel stage loses > 50% of visitors | High |
//! | `increase-engagement` | average session < 30s | Medium |
//! | `diversify-traffic` | direct traffic > 60% of visitors | Low |
//! | `clarify-site-structure` | classification confidence < 40 | Low |
//!
//! Plus category-specific suggestions for the detected [`WebsiteType`].

mod client;

pub use client::{RecommendationClient, RecommendationRequest, RemoteRecommendations};

use crate::classify::{Classification, WebsiteType};
use crate::types::{AggregateResult, DIRECT_SOURCE};
use serde::{Deserialize, Serialize};

const HIGH_BOUNCE_RATE: f64 = 60.0;
const HIGH_EXIT_RATE: f64 = 70.0;
const MIN_EXIT_VISITS: u64 = 5;
const HIGH_DROP_OFF_RATE: f64 = 50.0;
const SHORT_SESSION_SECS: f64 = 30.0;
const DIRECT_TRAFFIC_SHARE: f64 = 0.6;
const LOW_CONFIDENCE: f64 = 40.0;

/// Area a recommendation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    Engagement,
    Conversion,
    Acquisition,
    Content,
    Tracking,
    #[default]
    General,
}

/// Urgency, most urgent first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// A single suggestion shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub category: RecommendationCategory,
    #[serde(default)]
    pub priority: Priority,
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

impl Recommendation {
    fn new(
        id: &str,
        category: RecommendationCategory,
        priority: Priority,
        title: &str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            id: id.to_string(),
            category,
            priority,
            title: title.to_string(),
            detail: detail.into(),
        }
    }
}

/// Where a set of recommendations came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    Remote,
    Local,
}

/// Rule-based recommendations, sorted by priority then id.
pub fn local_recommendations(
    classification: &Classification,
    aggregate: Option<&AggregateResult>,
) -> Vec<Recommendation> {
    use Priority::*;
    use RecommendationCategory::*;

    let mut recs = category_recommendations(classification.website_type);

    if classification.confidence < LOW_CONFIDENCE {
        recs.push(Recommendation::new(
            "clarify-site-structure",
            Content,
            Low,
            "Clarify your site structure",
            "Descriptive, consistent URL paths make the site easier to navigate and classify.",
        ));
    }

    match aggregate {
        Some(aggregate) if aggregate.real_data => recs.extend(metric_recommendations(aggregate)),
        _ => recs.push(Recommendation::new(
            "install-tracking",
            Tracking,
            High,
            "Verify the tracking snippet",
            "No page views were recorded in this window.",
        )),
    }

    recs.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
    recs
}

fn metric_recommendations(aggregate: &AggregateResult) -> Vec<Recommendation> {
    use Priority::*;
    use RecommendationCategory::*;

    let mut recs = Vec::new();
    let metrics = &aggregate.metrics;

    if metrics.bounce_rate > HIGH_BOUNCE_RATE {
        recs.push(Recommendation::new(
            "reduce-bounce",
            Engagement,
            High,
            "Reduce your bounce rate",
            format!(
                "{:.1}% of sessions view a single page. Add clear next steps to landing pages.",
                metrics.bounce_rate
            ),
        ));
    }

    if metrics.total_sessions > 0 && metrics.avg_session_duration < SHORT_SESSION_SECS {
        recs.push(Recommendation::new(
            "increase-engagement",
            Engagement,
            Medium,
            "Keep visitors around longer",
            format!(
                "Multi-page sessions last {:.0}s on average.",
                metrics.avg_session_duration
            ),
        ));
    }

    if let Some(page) = aggregate
        .exit_pages
        .iter()
        .find(|p| p.exit_rate > HIGH_EXIT_RATE && p.visits >= MIN_EXIT_VISITS)
    {
        recs.push(Recommendation::new(
            "fix-exit-page",
            Conversion,
            High,
            "Review your top exit page",
            format!(
                "{} ends {:.1}% of the visits that reach it.",
                page.path, page.exit_rate
            ),
        ));
    }

    if let Some(stage) = aggregate
        .funnel
        .iter()
        .filter(|s| s.drop_off_rate > HIGH_DROP_OFF_RATE)
        .max_by(|a, b| a.drop_off_rate.total_cmp(&b.drop_off_rate))
    {
        recs.push(Recommendation::new(
            "funnel-drop-off",
            Conversion,
            High,
            "Fix the biggest funnel leak",
            format!(
                "{:.1}% of visitors drop off before reaching {}.",
                stage.drop_off_rate, stage.path
            ),
        ));
    }

    let direct = aggregate
        .traffic_sources
        .iter()
        .find(|s| s.source == DIRECT_SOURCE)
        .map_or(0, |s| s.visitors);
    if metrics.total_visitors > 0
        && direct as f64 / metrics.total_visitors as f64 > DIRECT_TRAFFIC_SHARE
    {
        recs.push(Recommendation::new(
            "diversify-traffic",
            Acquisition,
            Low,
            "Diversify traffic sources",
            "Most visitors arrive directly. Tag campaigns with utm_source to measure them.",
        ));
    }

    recs
}

fn category_recommendations(website_type: WebsiteType) -> Vec<Recommendation> {
    use Priority::*;
    use RecommendationCategory::*;

    match website_type {
        WebsiteType::Ecommerce | WebsiteType::Marketplace => vec![
            Recommendation::new(
                "cart-recovery",
                Conversion,
                Medium,
                "Recover abandoned carts",
                "Follow up on carts that never reached checkout.",
            ),
            Recommendation::new(
                "product-pages",
                Content,
                Low,
                "Strengthen product pages",
                "Reviews, clear pricing and shipping details reduce hesitation.",
            ),
        ],
        WebsiteType::Saas => vec![Recommendation::new(
            "pricing-to-signup",
            Conversion,
            Medium,
            "Shorten the path from pricing to signup",
            "Link every plan directly to a trial or signup form.",
        )],
        WebsiteType::Blog | WebsiteType::News => vec![
            Recommendation::new(
                "related-content",
                Engagement,
                Medium,
                "Surface related articles",
                "Readers who see a next article are less likely to leave.",
            ),
            Recommendation::new(
                "newsletter-capture",
                Acquisition,
                Low,
                "Capture returning readers",
                "Offer a newsletter signup on article pages.",
            ),
        ],
        WebsiteType::Restaurant => vec![Recommendation::new(
            "online-reservations",
            Conversion,
            Medium,
            "Make reservations one click away",
            "Put the reservation or ordering link on the menu page.",
        )],
        WebsiteType::Nonprofit => vec![Recommendation::new(
            "donation-flow",
            Conversion,
            Medium,
            "Simplify the donation flow",
            "Fewer fields on the donate page lift completed gifts.",
        )],
        WebsiteType::Portfolio | WebsiteType::Agency | WebsiteType::Legal => vec![Recommendation::new(
            "contact-cta",
            Conversion,
            Medium,
            "Add a contact call to action",
            "Every case study or project page should end with a way to get in touch.",
        )],
        WebsiteType::General => Vec::new(),
        _ => vec![Recommendation::new(
            "primary-cta",
            Conversion,
            Medium,
            "Highlight the primary action",
            format!(
                "Make the main {} action visible above the fold.",
                website_type.label()
            ),
        )],
    }
}
