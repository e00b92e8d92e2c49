//! HTTP client for the remote recommendation backend
//!
//! Posts a site's path sample and local classification scores, and expects a
//! JSON body with recommendations (and optionally a category verdict) back.
//! Every call is bounded by the configured timeout (12s by default).

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::Recommendation;
use crate::classify::{Classification, UrlStructureStats, WebsiteType};
use crate::config::RecommendationConfig;
use crate::error::{Error, Result};

/// Maximum number of distinct paths sent to the backend.
const MAX_REQUEST_PATHS: usize = 200;

/// Request body for the recommendation POST
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub domain: String,
    pub paths: Vec<String>,
    pub page_views: u64,
    pub url_structure_stats: UrlStructureStats,
    pub pattern_scores: BTreeMap<WebsiteType, f64>,
}

impl RecommendationRequest {
    /// Build a request from observed paths and their local classification.
    ///
    /// Paths are de-duplicated (first seen wins) and capped.
    pub fn new<S: AsRef<str>>(domain: &str, paths: &[S], classification: &Classification) -> Self {
        let mut seen = std::collections::HashSet::new();
        let unique: Vec<String> = paths
            .iter()
            .map(|p| p.as_ref().to_string())
            .filter(|p| seen.insert(p.clone()))
            .take(MAX_REQUEST_PATHS)
            .collect();

        Self {
            domain: domain.to_string(),
            paths: unique,
            page_views: paths.len() as u64,
            url_structure_stats: classification.structure.clone(),
            pattern_scores: classification.pattern_scores.clone(),
        }
    }
}

/// Response body from the recommendation backend
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecommendations {
    /// Backend's category verdict, if it made one
    #[serde(default)]
    pub website_type: Option<String>,
    /// Backend's confidence in `website_type`
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

impl RemoteRecommendations {
    /// The backend's verdict, when it names a known category.
    pub fn verdict(&self) -> Option<(WebsiteType, f64)> {
        let website_type = self.website_type.as_deref()?.parse().ok()?;
        let confidence = self.confidence.filter(|c| c.is_finite())?;
        Some((website_type, confidence))
    }
}

/// HTTP client for the recommendation backend
pub struct RecommendationClient {
    http_client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl RecommendationClient {
    /// Create a new client from configuration
    ///
    /// Returns an error if the configuration is invalid or missing required fields.
    pub fn new(config: RecommendationConfig) -> Result<Self> {
        config.validate()?;

        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| Error::Config("recommendations.endpoint is required".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &config.api_key {
            let auth_value = format!("Bearer {}", api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
            );
        }

        let timeout = config.timeout();
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST the request and parse the response.
    ///
    /// Aborts with [`Error::Timeout`] once the configured timeout elapses.
    pub async fn fetch(&self, request: &RecommendationRequest) -> Result<RemoteRecommendations> {
        match tokio::time::timeout(self.timeout, self.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.timeout)),
        }
    }

    async fn send(&self, request: &RecommendationRequest) -> Result<RemoteRecommendations> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(self.timeout)
                } else {
                    Error::Recommendation(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::Recommendation(format!("failed to parse response: {}", e)))
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Recommendation(format!(
                "API error ({}): {}",
                status, error_text
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;

    #[test]
    fn test_client_requires_valid_config() {
        let config = RecommendationConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(RecommendationClient::new(config).is_err());
        // Disabled and unconfigured: nothing to talk to
        assert!(RecommendationClient::new(RecommendationConfig::default()).is_err());
    }

    #[test]
    fn test_client_with_valid_config() {
        let config = RecommendationConfig {
            enabled: true,
            endpoint: Some("https://recs.example.com/v1/recommend".to_string()),
            api_key: Some("rk_test".to_string()),
            ..Default::default()
        };
        let client = RecommendationClient::new(config).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(12));
    }

    #[test]
    fn test_request_payload_shape() {
        let paths = vec!["/", "/cart", "/", "/checkout"];
        let classification = classify(&paths);
        let request = RecommendationRequest::new("shop.example.com", &paths, &classification);

        assert_eq!(request.paths, vec!["/", "/cart", "/checkout"]);
        assert_eq!(request.page_views, 4);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["domain"], "shop.example.com");
        assert_eq!(json["pageViews"], 4);
        assert!(json["urlStructureStats"]["uniquePaths"].is_number());
        assert!(json["patternScores"]["ecommerce"].is_number());
    }

    #[test]
    fn test_remote_verdict() {
        let body = r#"{"websiteType":"saas","confidence":72.5,"recommendations":[]}"#;
        let remote: RemoteRecommendations = serde_json::from_str(body).unwrap();
        assert_eq!(remote.verdict(), Some((WebsiteType::Saas, 72.5)));

        let body = r#"{"websiteType":"spaceship","recommendations":[]}"#;
        let remote: RemoteRecommendations = serde_json::from_str(body).unwrap();
        assert_eq!(remote.verdict(), None);
    }
}
