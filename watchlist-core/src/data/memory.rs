//! In-memory series provider for tests and offline fixture runs.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Deserialize;

use super::provider::{FetchError, SeriesProvider};
use crate::domain::{LookbackPeriod, PricePoint, PriceSeries, Symbol};

/// Serves canned responses keyed by symbol. Unknown symbols fail with
/// `SymbolNotFound`, like a real provider would.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    responses: HashMap<Symbol, Result<PriceSeries, FetchError>>,
    latency: Duration,
    calls: AtomicUsize,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `series` for its symbol.
    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.responses.insert(series.symbol().clone(), Ok(series));
        self
    }

    /// Fail every fetch of `symbol` with `error`.
    pub fn with_error(mut self, symbol: Symbol, error: FetchError) -> Self {
        self.responses.insert(symbol, Err(error));
        self
    }

    /// Simulated network latency applied to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of `fetch` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Load fixtures from JSON: `{"BHP.AX": [["2024-01-02T00:00:00Z", 41.2], ...]}`.
    pub fn from_json_str(content: &str) -> Result<Self, FetchError> {
        #[derive(Deserialize)]
        struct Fixture(HashMap<Symbol, Vec<(chrono::DateTime<chrono::Utc>, f64)>>);

        let Fixture(map) = serde_json::from_str(content)
            .map_err(|e| FetchError::Other(format!("parse fixture JSON: {e}")))?;

        Ok(map.into_iter().fold(Self::new(), |provider, (symbol, rows)| {
            let points = rows
                .into_iter()
                .map(|(ts, close)| PricePoint::new(ts, close))
                .collect();
            provider.with_series(PriceSeries::new(symbol, points))
        }))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, FetchError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FetchError::Other(format!("read fixture {}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }
}

impl SeriesProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn fetch(&self, symbol: &Symbol, _period: LookbackPeriod) -> Result<PriceSeries, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        self.responses
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| {
                Err(FetchError::SymbolNotFound {
                    symbol: symbol.to_string(),
                })
            })
    }
}
