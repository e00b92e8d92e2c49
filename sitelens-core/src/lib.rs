//! # sitelens-core
//!
//! Core library for sitelens - a website traffic analytics engine.
//!
//! This library provides:
//! - Session reconstruction and visitor/engagement metrics
//! - Exit-page, traffic-source and conversion-funnel analysis
//! - Website-type classification from URL structure
//! - Heuristic recommendations with an optional remote backend
//! - A TTL result cache and an event-store adapter layer
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three layers:
//! - **Layer 0 (Raw):** Page-view events held by an [`EventStore`]
//! - **Layer 1 (Aggregate):** Sessions, metrics, exit pages, sources, funnel
//! - **Layer 2 (Insight):** Classification and recommendations
//!
//! [`AnalyticsService`] runs all three per request and caches the results.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sitelens_core::{AnalyticsService, Config, MemoryEventStore, NetworkProfile, TimeWindow};
//!
//! # async fn run() -> sitelens_core::Result<()> {
//! let config = Config::load()?;
//! let store = Arc::new(MemoryEventStore::new());
//! let service = AnalyticsService::new(store, &config)?;
//!
//! let window = TimeWindow::last_days(chrono::Utc::now(), 7);
//! let report = service
//!     .report("site-1", "shop.example.com", window, NetworkProfile::Standard)
//!     .await;
//! println!("{} visitors", report.aggregate.metrics.total_visitors);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{compute_aggregate, AggregateOptions};
pub use cache::ResultCache;
pub use classify::{classify, Classification, Classifier, WebsiteType};
pub use config::Config;
pub use error::{Error, Result};
pub use recommend::{Recommendation, RecommendationSource};
pub use service::{AnalyticsReport, AnalyticsService, NetworkProfile};
pub use store::{EventStore, HttpEventStore, MemoryEventStore};
pub use types::*;

// Public modules
pub mod analytics;
pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod logging;
pub mod recommend;
pub mod service;
pub mod store;
pub mod types;
