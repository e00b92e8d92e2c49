//! Analytics service
//!
//! Ties an [`EventStore`] to the aggregation pipeline, the classifier, the
//! recommendation pipeline and two [`ResultCache`]s. This is the entry point
//! dashboards call.
//!
//! Failures never surface to the caller here: an unreachable event store
//! yields an empty aggregate (not cached), and a failing recommendation
//! backend falls back to local rules.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analytics::{compute_aggregate, AggregateOptions};
use crate::cache::ResultCache;
use crate::classify::{Classification, Classifier};
use crate::config::Config;
use crate::error::Result;
use crate::recommend::{
    local_recommendations, Recommendation, RecommendationClient, RecommendationRequest,
    RecommendationSource,
};
use crate::store::EventStore;
use crate::types::{AggregateResult, Event, TimeWindow};

const MIN_REMOTE_CONFIDENCE: f64 = 20.0;
const MAX_REMOTE_CONFIDENCE: f64 = 99.0;

/// Caller's network conditions.
///
/// `Constrained` callers get local classification and recommendations only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkProfile {
    #[default]
    Standard,
    Constrained,
}

/// Cache key for aggregates and reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportKey {
    pub site_id: String,
    pub window: TimeWindow,
    pub profile: NetworkProfile,
}

impl ReportKey {
    pub fn new(site_id: &str, window: TimeWindow, profile: NetworkProfile) -> Self {
        Self {
            site_id: site_id.to_string(),
            window,
            profile,
        }
    }
}

/// Everything a dashboard shows for one site and window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub aggregate: AggregateResult,
    pub classification: Classification,
    pub recommendations: Vec<Recommendation>,
    pub recommendation_source: RecommendationSource,
}

/// Classification and recommendations after the remote backend had its say.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationOutcome {
    pub classification: Classification,
    pub recommendations: Vec<Recommendation>,
    pub source: RecommendationSource,
}

/// Aggregation service over an event store.
pub struct AnalyticsService {
    store: Arc<dyn EventStore>,
    options: AggregateOptions,
    lookback: chrono::Duration,
    classifier: Classifier,
    recommender: Option<RecommendationClient>,
    aggregates: ResultCache<ReportKey, AggregateResult>,
    reports: ResultCache<ReportKey, AnalyticsReport>,
}

impl AnalyticsService {
    /// Create a service from configuration.
    ///
    /// The remote recommendation client is only built when
    /// `[recommendations]` is enabled and has an endpoint.
    pub fn new(store: Arc<dyn EventStore>, config: &Config) -> Result<Self> {
        config.validate()?;

        let recommender = if config.recommendations.is_ready() {
            Some(RecommendationClient::new(config.recommendations.clone())?)
        } else {
            None
        };

        let ttl = config.analytics.cache_ttl();
        Ok(Self {
            store,
            options: AggregateOptions::from_config(
                &config.analytics,
                config.attribution.estimates(),
            )?,
            lookback: config.analytics.lookback(),
            classifier: Classifier::new(),
            recommender,
            aggregates: ResultCache::new(ttl),
            reports: ResultCache::new(ttl),
        })
    }

    /// Whether a remote recommendation backend is configured.
    pub fn has_remote_recommendations(&self) -> bool {
        self.recommender.is_some()
    }

    /// Aggregate metrics for a site and window, served from cache when fresh.
    pub async fn aggregate(
        &self,
        site_id: &str,
        window: TimeWindow,
        profile: NetworkProfile,
    ) -> AggregateResult {
        let key = ReportKey::new(site_id, window, profile);
        if let Some(cached) = self.aggregates.get(&key) {
            tracing::debug!(site_id, "Aggregate cache hit");
            return cached;
        }

        match self.compute(site_id, &window).await {
            Some((_, aggregate)) => {
                self.aggregates.insert(key, aggregate.clone());
                aggregate
            }
            None => AggregateResult::empty(),
        }
    }

    /// Full dashboard report: aggregate, classification and recommendations.
    pub async fn report(
        &self,
        site_id: &str,
        domain: &str,
        window: TimeWindow,
        profile: NetworkProfile,
    ) -> AnalyticsReport {
        let key = ReportKey::new(site_id, window, profile);
        if let Some(cached) = self.reports.get(&key) {
            tracing::debug!(site_id, "Report cache hit");
            return cached;
        }

        let Some((events, aggregate)) = self.compute(site_id, &window).await else {
            let paths: [&str; 0] = [];
            let classification = self.classifier.classify(&paths);
            let recommendations = local_recommendations(&classification, None);
            return AnalyticsReport {
                aggregate: AggregateResult::empty(),
                classification,
                recommendations,
                recommendation_source: RecommendationSource::Local,
            };
        };
        self.aggregates.insert(key.clone(), aggregate.clone());

        let paths: Vec<&str> = events.iter().map(|e| e.path.as_str()).collect();
        let classification = self.classifier.classify(&paths);
        let outcome = self
            .recommendations(domain, &paths, classification, Some(&aggregate), profile)
            .await;

        let report = AnalyticsReport {
            aggregate,
            classification: outcome.classification,
            recommendations: outcome.recommendations,
            recommendation_source: outcome.source,
        };
        self.reports.insert(key, report.clone());
        report
    }

    /// Recommendations for a classified site.
    ///
    /// Tries the remote backend for `Standard` callers when one is
    /// configured. Any remote failure or timeout falls back to
    /// [`local_recommendations`]. A remote verdict on a known category
    /// replaces the local one.
    pub async fn recommendations<S: AsRef<str>>(
        &self,
        domain: &str,
        paths: &[S],
        classification: Classification,
        aggregate: Option<&AggregateResult>,
        profile: NetworkProfile,
    ) -> RecommendationOutcome {
        let mut classification = classification;

        let remote = match (&self.recommender, profile) {
            (Some(client), NetworkProfile::Standard) => {
                let request = RecommendationRequest::new(domain, paths, &classification);
                match client.fetch(&request).await {
                    Ok(remote) => Some(remote),
                    Err(e) => {
                        tracing::warn!(
                            domain,
                            error = %e,
                            "Remote recommendations failed, using local rules"
                        );
                        None
                    }
                }
            }
            _ => None,
        };

        if let Some(remote) = remote {
            if let Some((website_type, confidence)) = remote.verdict() {
                classification.website_type = website_type;
                classification.confidence = (confidence
                    .clamp(MIN_REMOTE_CONFIDENCE, MAX_REMOTE_CONFIDENCE)
                    * 10.0)
                    .round()
                    / 10.0;
            }
            if !remote.recommendations.is_empty() {
                tracing::debug!(
                    domain,
                    count = remote.recommendations.len(),
                    "Using remote recommendations"
                );
                return RecommendationOutcome {
                    classification,
                    recommendations: remote.recommendations,
                    source: RecommendationSource::Remote,
                };
            }
        }

        let recommendations = local_recommendations(&classification, aggregate);
        RecommendationOutcome {
            classification,
            recommendations,
            source: RecommendationSource::Local,
        }
    }

    /// Drop cached aggregates and reports for a site and window, every
    /// profile included. Returns the number of entries removed.
    pub fn invalidate(&self, site_id: &str, window: TimeWindow) -> usize {
        let matches = |key: &ReportKey| key.site_id == site_id && key.window == window;
        let removed =
            self.aggregates.invalidate_where(matches) + self.reports.invalidate_where(matches);
        tracing::debug!(site_id, removed, "Invalidated cached results");
        removed
    }

    /// Evict expired entries from both caches.
    pub fn purge_expired(&self) -> usize {
        self.aggregates.purge_expired() + self.reports.purge_expired()
    }

    /// Fetch the window and run the pipeline. `None` when the current
    /// window could not be fetched.
    async fn compute(
        &self,
        site_id: &str,
        window: &TimeWindow,
    ) -> Option<(Vec<Event>, AggregateResult)> {
        let events = match self.store.fetch_events(site_id, window).await {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(
                    site_id,
                    error = %e,
                    "Event fetch failed, returning empty aggregate"
                );
                return None;
            }
        };

        let historical = self.historical_visitors(site_id, window).await;
        let aggregate = compute_aggregate(&events, &historical, &self.options);

        tracing::info!(
            site_id,
            events = events.len(),
            visitors = aggregate.metrics.total_visitors,
            sessions = aggregate.metrics.total_sessions,
            real_data = aggregate.real_data,
            "Computed aggregate"
        );

        Some((events, aggregate))
    }

    /// Visitor ids seen in the lookback window that ends where `window` starts.
    async fn historical_visitors(&self, site_id: &str, window: &TimeWindow) -> HashSet<String> {
        if self.lookback <= chrono::Duration::zero() {
            return HashSet::new();
        }

        let previous = window.previous(self.lookback);
        match self.store.fetch_events(site_id, &previous).await {
            Ok(events) => events.into_iter().map(|e| e.visitor_id).collect(),
            Err(e) => {
                tracing::warn!(
                    site_id,
                    error = %e,
                    "Historical fetch failed, treating all visitors as new"
                );
                HashSet::new()
            }
        }
    }
}
