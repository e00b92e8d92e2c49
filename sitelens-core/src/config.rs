//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/sitelens/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/sitelens/` (~/.config/sitelens/)
//! - State/Logs: `$XDG_STATE_HOME/sitelens/` (~/.local/state/sitelens/)

use crate::analytics::{SourceEstimate, SourceEstimates};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Aggregation and caching configuration
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Traffic-source cost/conversion estimates
    #[serde(default)]
    pub attribution: AttributionConfig,

    /// Remote recommendation backend (optional)
    #[serde(default)]
    pub recommendations: RecommendationConfig,

    /// Event store HTTP adapter
    #[serde(default)]
    pub event_store: EventStoreConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upper bound for `analytics.session_gap_secs` (one day)
pub const MAX_SESSION_GAP_SECS: u64 = 86_400;

/// Upper bound for `analytics.lookback_days` (ten years)
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

/// Aggregation and caching configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    /// Inactivity gap that splits sessions
    #[serde(default = "default_session_gap_secs")]
    pub session_gap_secs: u64,

    /// How long computed aggregates stay cached
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Number of exit pages reported
    #[serde(default = "default_exit_page_limit")]
    pub exit_page_limit: usize,

    /// Maximum funnel depth
    #[serde(default = "default_funnel_max_stages")]
    pub funnel_max_stages: usize,

    /// Length of the older window used to detect returning visitors
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            session_gap_secs: default_session_gap_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            exit_page_limit: default_exit_page_limit(),
            funnel_max_stages: default_funnel_max_stages(),
            lookback_days: default_lookback_days(),
        }
    }
}

impl AnalyticsConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::days(self.lookback_days as i64)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.session_gap_secs == 0 {
            return Err(Error::Config(
                "analytics.session_gap_secs must be greater than 0".to_string(),
            ));
        }
        if self.session_gap_secs > MAX_SESSION_GAP_SECS {
            return Err(Error::Config(format!(
                "analytics.session_gap_secs must be at most {}",
                MAX_SESSION_GAP_SECS
            )));
        }
        if self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(Error::Config(format!(
                "analytics.lookback_days must be at most {}",
                MAX_LOOKBACK_DAYS
            )));
        }
        if self.funnel_max_stages == 0 {
            return Err(Error::Config(
                "analytics.funnel_max_stages must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_session_gap_secs() -> u64 {
    1800
}

fn default_cache_ttl_secs() -> u64 {
    30
}

fn default_exit_page_limit() -> usize {
    10
}

fn default_funnel_max_stages() -> usize {
    4
}

fn default_lookback_days() -> u32 {
    30
}

/// Overrides for the built-in traffic-source estimates
///
/// ```toml
/// [attribution]
/// average_order_value = 80.0
///
/// [attribution.sources.partner]
/// cost_per_acquisition = 4.0
/// conversion_rate = 0.06
/// ```
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AttributionConfig {
    /// Assumed value of one conversion
    pub average_order_value: Option<f64>,

    /// Estimate used for sources that match no entry
    pub fallback: Option<SourceEstimate>,

    /// Per-source overrides, merged over the built-in table
    #[serde(default)]
    pub sources: HashMap<String, SourceEstimate>,
}

impl AttributionConfig {
    /// Built-in estimates with this config applied on top.
    pub fn estimates(&self) -> SourceEstimates {
        let mut estimates = SourceEstimates::default();
        if let Some(aov) = self.average_order_value {
            estimates.average_order_value = aov;
        }
        if let Some(fallback) = self.fallback {
            estimates.fallback = fallback;
        }
        for (source, estimate) in &self.sources {
            estimates.set(source, *estimate);
        }
        estimates
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if matches!(self.average_order_value, Some(aov) if aov < 0.0) {
            return Err(Error::Config(
                "attribution.average_order_value must not be negative".to_string(),
            ));
        }
        let entries = self
            .sources
            .iter()
            .map(|(source, estimate)| (source.as_str(), estimate))
            .chain(self.fallback.as_ref().map(|estimate| ("fallback", estimate)));

        for (source, estimate) in entries {
            if !(0.0..=1.0).contains(&estimate.conversion_rate) {
                return Err(Error::Config(format!(
                    "attribution.sources.{source}.conversion_rate must be between 0 and 1"
                )));
            }
            if estimate.cost_per_acquisition < 0.0 {
                return Err(Error::Config(format!(
                    "attribution.sources.{source}.cost_per_acquisition must not be negative"
                )));
            }
        }
        Ok(())
    }
}

/// Remote recommendation backend configuration
///
/// When enabled, sitelens posts classification inputs to the backend and
/// falls back to local recommendations on any failure.
#[derive(Debug, Deserialize, Clone)]
pub struct RecommendationConfig {
    /// Enable/disable the remote backend
    #[serde(default)]
    pub enabled: bool,

    /// Endpoint receiving the POST (e.g., `https://api.example.com/recommendations`)
    pub endpoint: Option<String>,

    /// Bearer token
    pub api_key: Option<String>,

    /// Client-side timeout in seconds
    #[serde(default = "default_recommendation_timeout")]
    pub timeout_secs: u64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            api_key: None,
            timeout_secs: default_recommendation_timeout(),
        }
    }
}

impl RecommendationConfig {
    /// Check if the backend is properly configured and enabled
    pub fn is_ready(&self) -> bool {
        self.enabled && self.endpoint.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.endpoint.is_none() {
            return Err(Error::Config(
                "recommendations.endpoint is required when recommendations are enabled"
                    .to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "recommendations.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_recommendation_timeout() -> u64 {
    12
}

/// Event store HTTP adapter configuration
#[derive(Debug, Deserialize, Clone)]
pub struct EventStoreConfig {
    /// Base URL of the event query service
    pub base_url: Option<String>,

    /// Bearer token
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_event_store_timeout")]
    pub timeout_secs: u64,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: default_event_store_timeout(),
        }
    }
}

fn default_event_store_timeout() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.analytics.validate()?;
        self.attribution.validate()?;
        self.recommendations.validate()
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/sitelens/config.toml` (~/.config/sitelens/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("sitelens").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/sitelens/` (~/.local/state/sitelens/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("sitelens")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/sitelens/sitelens.log` (~/.local/state/sitelens/sitelens.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("sitelens.log")
    }
}
