//! Integration tests for the sitelens aggregation pipeline and service
//!
//! Pipeline tests run `compute_aggregate` on hand-built event lists. Service
//! tests go through `AnalyticsService` with an in-memory store, and use
//! mockito to stand in for the hosted event store and the remote
//! recommendation backend.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sitelens_core::analytics::{self, sessions};
use mockito::Matcher;
use sitelens_core::config::{EventStoreConfig, RecommendationConfig};
use sitelens_core::recommend::{RecommendationClient, RecommendationRequest};
use sitelens_core::{
    classify, compute_aggregate, AggregateOptions, AggregateResult, AnalyticsService, Config,
    Error, Event, EventStore, HttpEventStore, MemoryEventStore, NetworkProfile, RecommendationSource, Result,
    TimeWindow, WebsiteType,
};

fn ts(day: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, h, m, 0).unwrap()
}

fn may_window() -> TimeWindow {
    TimeWindow::new(ts(10, 0, 0), ts(11, 0, 0)).unwrap()
}

fn run(events: &[Event]) -> AggregateResult {
    compute_aggregate(events, &HashSet::new(), &AggregateOptions::default())
}

fn shop_events() -> Vec<Event> {
    let mut events = Vec::new();
    for v in 0..12 {
        let visitor = format!("v{v}");
        let start = ts(10, 8, 0) + Duration::minutes(v * 7);
        let journey: &[&str] = match v % 3 {
            0 => &["/", "/product/1", "/cart", "/checkout"],
            1 => &["/", "/product/2", "/cart"],
            _ => &["/"],
        };
        for (i, path) in journey.iter().enumerate() {
            let at = start + Duration::minutes(i as i64 * 2);
            let mut event = Event::page_view(&visitor, *path, at);
            event.time_on_page = Some(30.0);
            if v % 2 == 0 {
                event.utm_source = Some("google".to_string());
            }
            events.push(event);
        }
    }
    events
}

/// Store that fails every fetch.
struct UnreachableStore;

#[async_trait]
impl EventStore for UnreachableStore {
    async fn fetch_events(&self, _site_id: &str, _window: &TimeWindow) -> Result<Vec<Event>> {
        Err(Error::EventStore("connection refused".to_string()))
    }
}

/// Store that serves the current window but fails any fetch ending at or
/// before `cutoff`.
struct NoHistoryStore {
    inner: MemoryEventStore,
    cutoff: DateTime<Utc>,
}

#[async_trait]
impl EventStore for NoHistoryStore {
    async fn fetch_events(&self, site_id: &str, window: &TimeWindow) -> Result<Vec<Event>> {
        if window.end <= self.cutoff {
            return Err(Error::EventStore("archive offline".to_string()));
        }
        self.inner.fetch_events(site_id, window).await
    }
}

fn remote_config(endpoint: String) -> Config {
    Config {
        recommendations: RecommendationConfig {
            enabled: true,
            endpoint: Some(endpoint),
            api_key: Some("rk_test".to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

// ============================================
// End-to-end pipeline
// ============================================

#[test]
fn test_empty_window() {
    let result = run(&[]);

    assert!(!result.real_data);
    assert_eq!(result.metrics.total_visitors, 0);
    assert_eq!(result.metrics.bounce_rate, 0.0);
    assert_eq!(result.metrics.pages_per_visit, 0.0);
    assert!(result.exit_pages.is_empty());
    assert!(result.traffic_sources.is_empty());
    assert!(result.funnel.is_empty());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["realData"], false);
}

#[test]
fn test_single_bounce_visit() {
    let result = run(&[Event::page_view("v1", "/", ts(10, 9, 0))]);

    assert!(result.real_data);
    assert_eq!(result.metrics.total_visitors, 1);
    assert_eq!(result.metrics.total_sessions, 1);
    assert_eq!(result.metrics.bounce_rate, 100.0);
    assert_eq!(result.metrics.avg_session_duration, 0.0);
    assert_eq!(result.metrics.total_page_views, 1);
}

#[test]
fn test_single_checkout_journey() {
    let events = vec![
        Event::page_view("v1", "/", ts(10, 9, 0)),
        Event::page_view("v1", "/cart", ts(10, 9, 5)),
        Event::page_view("v1", "/checkout", ts(10, 9, 10)),
    ];
    let result = run(&events);

    assert_eq!(result.metrics.total_sessions, 1);
    assert_eq!(result.metrics.bounce_rate, 0.0);
    assert_eq!(result.metrics.pages_per_visit, 3.0);
    assert_eq!(result.metrics.avg_session_duration, 600.0);

    let paths: Vec<_> = result.funnel.iter().map(|s| s.path.as_str()).collect();
    assert_eq!(paths, vec!["/", "/cart", "/checkout"]);
    for stage in &result.funnel {
        assert_eq!(stage.visitors, 1);
        assert_eq!(stage.drop_off_count, 0);
        assert_eq!(stage.drop_off_rate, 0.0);
    }
}

#[test]
fn test_repeated_store_paths_classify_as_ecommerce() {
    let mut paths = Vec::new();
    for _ in 0..25 {
        paths.extend(["/product/1", "/product/2", "/cart", "/checkout"]);
    }
    let classification = classify(&paths);

    assert_eq!(classification.website_type, WebsiteType::Ecommerce);
    assert!(classification.confidence > 50.0);
    assert!(classification.ecommerce_signals);
}

#[test]
fn test_long_gap_splits_session() {
    let events = vec![
        Event::page_view("v1", "/", ts(10, 9, 0)),
        Event::page_view("v1", "/pricing", ts(10, 9, 40)),
    ];
    let sessions = sessions::reconstruct(&events);
    assert_eq!(sessions.len(), 2);

    let result = run(&events);
    assert_eq!(result.metrics.total_sessions, 2);
    assert_eq!(result.metrics.bounce_rate, 100.0);
}

// ============================================
// Pipeline properties
// ============================================

#[test]
fn test_sessions_partition_events() {
    let events = shop_events();
    let sessions = sessions::reconstruct(&events);

    let total: usize = sessions.iter().map(|s| s.event_count()).sum();
    assert_eq!(total, events.len());

    let gap = sessions::default_session_gap();
    for session in &sessions {
        assert!(session.events.iter().all(|e| e.visitor_id == session.visitor_id));
        for pair in session.events.windows(2) {
            assert!(pair[1].timestamp >= pair[0].timestamp);
            assert!(pair[1].timestamp - pair[0].timestamp <= gap);
        }
    }
}

#[test]
fn test_gap_boundary_is_exclusive() {
    let at_gap = vec![
        Event::page_view("v1", "/", ts(10, 9, 0)),
        Event::page_view("v1", "/a", ts(10, 9, 30)),
    ];
    assert_eq!(sessions::reconstruct(&at_gap).len(), 1);

    let past_gap = vec![
        Event::page_view("v1", "/", ts(10, 9, 0)),
        Event::page_view("v1", "/a", ts(10, 9, 30) + Duration::seconds(1)),
    ];
    assert_eq!(sessions::reconstruct(&past_gap).len(), 2);
}

#[test]
fn test_aggregate_is_idempotent_and_order_independent() {
    let events = shop_events();
    let first = run(&events);
    let second = run(&events);
    assert_eq!(first, second);

    let mut reversed = events.clone();
    reversed.reverse();
    let third = run(&reversed);
    assert_eq!(first.metrics, third.metrics);
    assert_eq!(first.funnel, third.funnel);
    assert_eq!(first.traffic_sources, third.traffic_sources);
}

#[test]
fn test_rates_are_bounded() {
    let result = run(&shop_events());

    assert!((0.0..=100.0).contains(&result.metrics.bounce_rate));
    for page in &result.exit_pages {
        assert!((0.0..=100.0).contains(&page.exit_rate));
        assert!(page.exits <= page.visits);
    }
    for source in &result.traffic_sources {
        assert!((0.0..=100.0).contains(&source.bounce_rate));
        assert!(source.bounced_visitors <= source.visitors);
    }
    for stage in &result.funnel {
        assert!((0.0..=100.0).contains(&stage.drop_off_rate));
    }
    assert_eq!(result.funnel[0].drop_off_count, 0);
    assert_eq!(result.funnel[0].drop_off_rate, 0.0);
}

#[test]
fn test_shop_funnel_and_sources() {
    let result = run(&shop_events());

    // 4 visitors each take the 4-step and 3-step journeys, 4 bounce on "/"
    assert_eq!(result.metrics.total_visitors, 12);
    assert_eq!(result.funnel[0].path, "/");
    assert_eq!(result.funnel[0].visitors, 12);

    let google = result
        .traffic_sources
        .iter()
        .find(|s| s.source == "google")
        .unwrap();
    let direct = result
        .traffic_sources
        .iter()
        .find(|s| s.source == "direct")
        .unwrap();
    assert_eq!(google.visitors + direct.visitors, 12);
    assert_eq!(google.visitors, 6);
}

#[test]
fn test_analytics_free_functions_agree_with_pipeline() {
    let events = shop_events();
    let result = run(&events);
    assert_eq!(analytics::aggregate(&events, &HashSet::new()), result.metrics);
    assert_eq!(analytics::exit_pages(&events), result.exit_pages);
    assert_eq!(analytics::funnel(&events), result.funnel);
}

// ============================================
// Service
// ============================================

#[tokio::test]
async fn test_service_caches_until_invalidated() {
    let store = Arc::new(MemoryEventStore::new());
    store.insert("site", vec![Event::page_view("v1", "/", ts(10, 9, 0))]);
    let service = AnalyticsService::new(store.clone(), &Config::default()).unwrap();

    let first = service
        .aggregate("site", may_window(), NetworkProfile::Standard)
        .await;
    assert_eq!(first.metrics.total_visitors, 1);

    store.insert("site", vec![Event::page_view("v2", "/", ts(10, 10, 0))]);
    let cached = service
        .aggregate("site", may_window(), NetworkProfile::Standard)
        .await;
    assert_eq!(cached, first);

    service.invalidate("site", may_window());
    let fresh = service
        .aggregate("site", may_window(), NetworkProfile::Standard)
        .await;
    assert_eq!(fresh.metrics.total_visitors, 2);
}

#[tokio::test]
async fn test_service_returning_visitors_at_window_edge() {
    let window = may_window();
    let store = Arc::new(MemoryEventStore::new());
    store.insert(
        "site",
        vec![
            // seen yesterday and today
            Event::page_view("v1", "/", window.start - Duration::hours(1)),
            Event::page_view("v1", "/", window.start + Duration::hours(1)),
            // first event exactly at the window start
            Event::page_view("v2", "/", window.start),
            // at the very start of the lookback window
            Event::page_view("v3", "/", window.start - Duration::days(30)),
            Event::page_view("v3", "/", window.start + Duration::hours(2)),
            // exactly at the window end, outside it
            Event::page_view("v4", "/", window.end),
        ],
    );
    let service = AnalyticsService::new(store, &Config::default()).unwrap();

    let result = service
        .aggregate("site", window, NetworkProfile::Standard)
        .await;
    assert_eq!(result.metrics.total_visitors, 3);
    assert_eq!(result.metrics.returning_visitors, 2);
    assert_eq!(result.metrics.new_visitors, 1);
}

#[tokio::test]
async fn test_service_unreachable_store_returns_empty_uncached() {
    let service = AnalyticsService::new(Arc::new(UnreachableStore), &Config::default()).unwrap();

    let result = service
        .aggregate("site", may_window(), NetworkProfile::Standard)
        .await;
    assert_eq!(result, AggregateResult::empty());
    assert_eq!(service.invalidate("site", may_window()), 0);

    let report = service
        .report("site", "site.example.com", may_window(), NetworkProfile::Standard)
        .await;
    assert!(!report.aggregate.real_data);
    assert_eq!(report.recommendation_source, RecommendationSource::Local);
    assert!(report.recommendations.iter().any(|r| r.id == "install-tracking"));
}

#[tokio::test]
async fn test_service_history_failure_counts_everyone_as_new() {
    let window = may_window();
    let inner = MemoryEventStore::new();
    inner.insert(
        "site",
        vec![
            Event::page_view("v1", "/", window.start - Duration::hours(1)),
            Event::page_view("v1", "/", window.start + Duration::hours(1)),
        ],
    );
    let store = NoHistoryStore {
        inner,
        cutoff: window.start,
    };
    let service = AnalyticsService::new(Arc::new(store), &Config::default()).unwrap();

    let result = service
        .aggregate("site", window, NetworkProfile::Standard)
        .await;
    assert!(result.real_data);
    assert_eq!(result.metrics.new_visitors, 1);
    assert_eq!(result.metrics.returning_visitors, 0);
}

#[tokio::test]
async fn test_service_report_without_backend() {
    let store = Arc::new(MemoryEventStore::new());
    store.insert("shop", shop_events());
    let service = AnalyticsService::new(store, &Config::default()).unwrap();

    let report = service
        .report("shop", "shop.example.com", may_window(), NetworkProfile::Standard)
        .await;
    assert_eq!(report.classification.website_type, WebsiteType::Ecommerce);
    assert_eq!(report.recommendation_source, RecommendationSource::Local);
    assert!(report.recommendations.iter().any(|r| r.id == "cart-recovery"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["recommendationSource"], "local");
    assert_eq!(json["classification"]["websiteType"], "ecommerce");
}

// ============================================
// HTTP event store
// ============================================

fn http_store(base_url: String) -> Arc<HttpEventStore> {
    let config = EventStoreConfig {
        base_url: Some(base_url),
        api_key: Some("sk_test".to_string()),
        ..Default::default()
    };
    Arc::new(HttpEventStore::new(&config).unwrap())
}

fn window_query(window: &TimeWindow) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("start".to_string(), window.start.to_rfc3339()),
        Matcher::UrlEncoded("end".to_string(), window.end.to_rfc3339()),
    ])
}

#[tokio::test]
async fn test_http_store_fetches_window_with_bearer_token() {
    let window = may_window();
    let previous = window.previous(Duration::days(30));

    let mut server = mockito::Server::new_async().await;
    let current_mock = server
        .mock("GET", "/sites/shop/events")
        .match_query(window_query(&window))
        .match_header("authorization", "Bearer sk_test")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[
                {"visitorId": "v1", "path": "/", "timestamp": "2024-05-10T09:00:00Z"},
                {"visitorId": "v1", "path": "/cart", "timestamp": "2024-05-10T09:02:00Z",
                 "utmSource": "google", "timeOnPage": 40},
                {"visitorId": "v2", "path": "/", "timestamp": "2024-05-10T11:00:00Z"}
            ]"#,
        )
        .expect(1)
        .create_async()
        .await;
    let history_mock = server
        .mock("GET", "/sites/shop/events")
        .match_query(window_query(&previous))
        .match_header("authorization", "Bearer sk_test")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"visitorId": "v1", "path": "/", "timestamp": "2024-04-20T12:00:00Z"}]"#)
        .expect(1)
        .create_async()
        .await;

    let service = AnalyticsService::new(http_store(server.url()), &Config::default()).unwrap();
    let result = service
        .aggregate("shop", window, NetworkProfile::Standard)
        .await;

    current_mock.assert_async().await;
    history_mock.assert_async().await;
    assert!(result.real_data);
    assert_eq!(result.metrics.total_visitors, 2);
    assert_eq!(result.metrics.total_page_views, 3);
    assert_eq!(result.metrics.returning_visitors, 1);
    assert!(result.traffic_sources.iter().any(|s| s.source == "google"));
}

#[tokio::test]
async fn test_http_store_malformed_body_returns_empty() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/sites/shop/events")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("not json")
        .expect(2)
        .create_async()
        .await;

    let store = http_store(server.url());
    let service = AnalyticsService::new(store.clone(), &Config::default()).unwrap();
    let result = service
        .aggregate("shop", may_window(), NetworkProfile::Standard)
        .await;
    assert_eq!(result, AggregateResult::empty());

    let direct = store.fetch_events("shop", &may_window()).await;
    assert!(matches!(direct, Err(Error::Json(_))));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_store_server_error_returns_empty() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/sites/shop/events")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("upstream unavailable")
        .expect(2)
        .create_async()
        .await;

    let store = http_store(server.url());
    let service = AnalyticsService::new(store.clone(), &Config::default()).unwrap();
    let result = service
        .aggregate("shop", may_window(), NetworkProfile::Standard)
        .await;
    assert_eq!(result, AggregateResult::empty());
    // failed fetches are not cached
    assert_eq!(service.invalidate("shop", may_window()), 0);

    let direct = store.fetch_events("shop", &may_window()).await;
    assert!(matches!(direct, Err(Error::EventStore(message)) if message.contains("500")));
    mock.assert_async().await;
}

// ============================================
// Remote recommendations
// ============================================

#[tokio::test]
async fn test_remote_recommendations_override() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/recommend")
        .match_header("authorization", "Bearer rk_test")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "websiteType": "saas",
                "confidence": 150,
                "recommendations": [
                    {"id": "remote-1", "title": "Speed up checkout", "priority": "high"}
                ]
            }"#,
        )
        .create_async()
        .await;

    let store = Arc::new(MemoryEventStore::new());
    store.insert("shop", shop_events());
    let config = remote_config(format!("{}/recommend", server.url()));
    let service = AnalyticsService::new(store, &config).unwrap();
    assert!(service.has_remote_recommendations());

    let report = service
        .report("shop", "shop.example.com", may_window(), NetworkProfile::Standard)
        .await;

    mock.assert_async().await;
    assert_eq!(report.recommendation_source, RecommendationSource::Remote);
    assert_eq!(report.classification.website_type, WebsiteType::Saas);
    assert_eq!(report.classification.confidence, 99.0);
    assert_eq!(report.recommendations.len(), 1);
    assert_eq!(report.recommendations[0].id, "remote-1");
}

#[tokio::test]
async fn test_remote_error_falls_back_to_local() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/recommend")
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let store = Arc::new(MemoryEventStore::new());
    store.insert("shop", shop_events());
    let config = remote_config(format!("{}/recommend", server.url()));
    let service = AnalyticsService::new(store, &config).unwrap();

    let report = service
        .report("shop", "shop.example.com", may_window(), NetworkProfile::Standard)
        .await;

    mock.assert_async().await;
    assert_eq!(report.recommendation_source, RecommendationSource::Local);
    assert_eq!(report.classification.website_type, WebsiteType::Ecommerce);
    assert!(!report.recommendations.is_empty());
}

#[tokio::test]
async fn test_constrained_profile_skips_remote() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/recommend")
        .with_status(200)
        .with_body(r#"{"recommendations": []}"#)
        .expect(0)
        .create_async()
        .await;

    let store = Arc::new(MemoryEventStore::new());
    store.insert("shop", shop_events());
    let config = remote_config(format!("{}/recommend", server.url()));
    let service = AnalyticsService::new(store, &config).unwrap();

    let report = service
        .report("shop", "shop.example.com", may_window(), NetworkProfile::Constrained)
        .await;

    mock.assert_async().await;
    assert_eq!(report.recommendation_source, RecommendationSource::Local);
}

#[tokio::test]
async fn test_unresponsive_backend_times_out() {
    // Accepts connections but never answers
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}/recommend", listener.local_addr().unwrap());

    let client = RecommendationClient::new(RecommendationConfig {
        enabled: true,
        endpoint: Some(endpoint),
        api_key: None,
        timeout_secs: 1,
    })
    .unwrap();

    let paths = ["/", "/pricing"];
    let request = RecommendationRequest::new("slow.example.com", &paths, &classify(&paths));
    let result = client.fetch(&request).await;

    assert!(matches!(result, Err(Error::Timeout(_))));
    drop(listener);
}
