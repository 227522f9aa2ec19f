//! Series provider trait and structured fetch errors.
//!
//! The SeriesProvider trait abstracts over market-data sources (Yahoo Finance,
//! in-memory fixtures) so the screening pipeline can swap implementations and
//! mock for tests.

use std::time::Duration;

use thiserror::Error;

use crate::domain::{LookbackPeriod, PriceSeries, Symbol};

/// Per-symbol fetch failure.
///
/// Always recoverable at the run level: the worker records it as an outcome
/// and moves on. `Display` is the human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("fetch error: {0}")]
    Other(String),
}

/// Source of historical closing prices.
///
/// Implementations turn every provider-side failure into a [`FetchError`]
/// and return an empty [`PriceSeries`] when the symbol exists but has no
/// observations in range. Shared across worker threads, hence `Send + Sync`.
pub trait SeriesProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the daily closing-price series for `symbol` over `period`.
    fn fetch(&self, symbol: &Symbol, period: LookbackPeriod) -> Result<PriceSeries, FetchError>;

    /// Remaining time during which the provider refuses every request
    /// (an open circuit breaker). `None` while requests are accepted.
    fn blocked_for(&self) -> Option<Duration> {
        None
    }
}
