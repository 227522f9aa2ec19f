//! Screen configuration: the validated `RunConfig` and the TOML file it comes from.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use watchlist_core::data::ASX_CODE_COLUMN;
use watchlist_core::domain::{LookbackPeriod, UnknownPeriod};

/// Default number of concurrent fetches.
pub const DEFAULT_CONCURRENCY: usize = 30;
/// Default low-period window, in observations.
pub const DEFAULT_LOW_WINDOW: usize = 30;

/// Errors raised while building a configuration. Always fatal, always
/// before any symbol is fetched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    InvalidPeriod(#[from] UnknownPeriod),

    #[error("low_window must be a positive number of observations")]
    ZeroLowWindow,

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("fetch timeout must be greater than zero")]
    ZeroTimeout,

    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
}

/// Immutable, validated parameters for one screen run.
///
/// Only constructible through [`RunConfig::new`] and the `with_*` methods,
/// all of which validate, so a `RunConfig` in hand is always usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    period: LookbackPeriod,
    low_window: usize,
    concurrency: usize,
    fetch_timeout: Duration,
    poll_interval: Duration,
}

impl RunConfig {
    pub fn new(
        period: LookbackPeriod,
        low_window: usize,
        concurrency: usize,
    ) -> Result<Self, ConfigError> {
        if low_window == 0 {
            return Err(ConfigError::ZeroLowWindow);
        }
        if concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(Self {
            period,
            low_window,
            concurrency,
            fetch_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
        })
    }

    /// Per-call bound on each provider request.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        self.fetch_timeout = timeout;
        Ok(self)
    }

    /// How often the scheduler wakes to check for cancellation.
    pub fn with_poll_interval(mut self, interval: Duration) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        self.poll_interval = interval;
        Ok(self)
    }

    pub fn period(&self) -> LookbackPeriod {
        self.period
    }

    pub fn low_window(&self) -> usize {
        self.low_window
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            period: LookbackPeriod::Max,
            low_window: DEFAULT_LOW_WINDOW,
            concurrency: DEFAULT_CONCURRENCY,
            fetch_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
        }
    }
}

// ─── File configuration ──────────────────────────────────────────────

/// Serializable screen configuration (`watchlist.toml`).
///
/// Every field has a default, so an empty file is valid. CLI flags
/// override individual fields before [`ScreenConfig::run_config`] is called.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub screen: ScreenSection,
    pub scheduler: SchedulerSection,
    pub provider: ProviderSection,
    pub universe: UniverseSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenSection {
    /// Provider lookback range: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max.
    pub period: String,
    /// The low must fall within this many most-recent observations.
    pub low_window: usize,
}

impl Default for ScreenSection {
    fn default() -> Self {
        Self {
            period: LookbackPeriod::Max.to_string(),
            low_window: DEFAULT_LOW_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub concurrency: usize,
    pub poll_interval_ms: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            poll_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    pub timeout_secs: u64,
    /// Retries inside the provider client; the screen itself never retries.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub breaker_cooldown_secs: u64,
    /// Appended to every universe ticker before fetching (`.AX` for ASX on Yahoo).
    pub suffix: String,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 2,
            retry_base_delay_ms: 500,
            breaker_cooldown_secs: 30 * 60,
            suffix: ".AX".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseSection {
    /// CSV file path or `http(s)://` URL.
    pub source: String,
    pub column: String,
}

impl Default for UniverseSection {
    fn default() -> Self {
        Self {
            source: "data/ASX_Listed_Companies.csv".into(),
            column: ASX_CODE_COLUMN.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub path: PathBuf,
    /// Prefix written before each ticker (`ASX` → `ASX:BHP`). Empty for none.
    pub exchange_tag: String,
    pub sort: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("output/watchlist.txt"),
            exchange_tag: "ASX".into(),
            sort: true,
        }
    }
}

impl ScreenConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate into the immutable per-run configuration.
    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        let period: LookbackPeriod = self.screen.period.parse()?;
        RunConfig::new(period, self.screen.low_window, self.scheduler.concurrency)?
            .with_fetch_timeout(Duration::from_secs(self.provider.timeout_secs))?
            .with_poll_interval(Duration::from_millis(self.scheduler.poll_interval_ms))
    }
}
