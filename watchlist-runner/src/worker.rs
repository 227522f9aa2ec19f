//! Screen worker: fetch → evaluate for a single symbol.

use std::fmt;
use std::time::Instant;

use watchlist_core::criterion::{evaluate, price_extremes};
use watchlist_core::data::{FetchError, SeriesProvider};
use watchlist_core::domain::Symbol;

use crate::config::RunConfig;

/// Result of screening one symbol. Produced once per symbol per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenOutcome {
    Pass(Symbol),
    Fail(Symbol),
    FetchError { symbol: Symbol, reason: String },
}

impl ScreenOutcome {
    pub fn symbol(&self) -> &Symbol {
        match self {
            ScreenOutcome::Pass(s) | ScreenOutcome::Fail(s) => s,
            ScreenOutcome::FetchError { symbol, .. } => symbol,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, ScreenOutcome::Pass(_))
    }

    pub fn is_fetch_error(&self) -> bool {
        matches!(self, ScreenOutcome::FetchError { .. })
    }
}

impl fmt::Display for ScreenOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenOutcome::Pass(s) => write!(f, "PASS {s}"),
            ScreenOutcome::Fail(s) => write!(f, "FAIL {s}"),
            ScreenOutcome::FetchError { symbol, reason } => write!(f, "ERROR {symbol}: {reason}"),
        }
    }
}

/// Screen one symbol: fetch its series, then evaluate the criterion.
///
/// Never fails. A fetch error becomes [`ScreenOutcome::FetchError`], and so
/// does a fetch that returns after `config.fetch_timeout()`. An empty series,
/// or one shorter than the low window, becomes [`ScreenOutcome::Fail`].
pub fn screen(provider: &dyn SeriesProvider, symbol: &Symbol, config: &RunConfig) -> ScreenOutcome {
    let started = Instant::now();
    let fetched = provider.fetch(symbol, config.period());
    let elapsed = started.elapsed();

    // A result arriving after the deadline is a timeout even when the
    // provider does not bound its own calls.
    let fetched = match fetched {
        Ok(_) if elapsed > config.fetch_timeout() => Err(FetchError::Timeout(format!(
            "{symbol} after {:.3}s (limit {:.3}s)",
            elapsed.as_secs_f64(),
            config.fetch_timeout().as_secs_f64()
        ))),
        other => other,
    };

    let series = match fetched {
        Ok(series) => series,
        Err(e) => {
            tracing::debug!(%symbol, provider = provider.name(), error = %e, "fetch failed");
            return ScreenOutcome::FetchError {
                symbol: symbol.clone(),
                reason: e.to_string(),
            };
        }
    };

    let Some(extremes) = price_extremes(&series) else {
        tracing::debug!(%symbol, "no observations in range");
        return ScreenOutcome::Fail(symbol.clone());
    };

    let passed = evaluate(&series, config.low_window());
    tracing::debug!(
        %symbol,
        observations = series.len(),
        high = extremes.high,
        low = extremes.low,
        low_index = extremes.index_of_low,
        passed,
        "screened"
    );

    if passed {
        ScreenOutcome::Pass(symbol.clone())
    } else {
        ScreenOutcome::Fail(symbol.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use watchlist_core::data::InMemoryProvider;
    use watchlist_core::domain::{LookbackPeriod, PricePoint, PriceSeries};

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn series(symbol: &str, closes: &[f64]) -> PriceSeries {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint::new(base + Duration::days(i as i64), c))
            .collect();
        PriceSeries::new(sym(symbol), points)
    }

    fn config(window: usize) -> RunConfig {
        RunConfig::new(LookbackPeriod::Max, window, 1).unwrap()
    }

    #[test]
    fn pass_and_fail() {
        let provider = InMemoryProvider::new()
            .with_series(series("UP", &[4.0, 3.0, 1.0]))
            .with_series(series("FLAT", &[1.0, 1.1, 1.0]));
        assert_eq!(screen(&provider, &sym("UP"), &config(2)), ScreenOutcome::Pass(sym("UP")));
        assert_eq!(screen(&provider, &sym("FLAT"), &config(2)), ScreenOutcome::Fail(sym("FLAT")));
    }

    #[test]
    fn fetch_error_is_contained() {
        let provider =
            InMemoryProvider::new().with_error(sym("DOWN"), FetchError::Timeout("30s".into()));
        let outcome = screen(&provider, &sym("DOWN"), &config(2));
        assert!(outcome.is_fetch_error());
        assert_eq!(outcome.symbol(), &sym("DOWN"));
        match outcome {
            ScreenOutcome::FetchError { reason, .. } => assert!(reason.contains("timed out")),
            other => panic!("unexpected outcome: {other}"),
        }
    }

    #[test]
    fn fetch_slower_than_timeout_is_a_timeout() {
        let provider = InMemoryProvider::new()
            .with_series(series("SLOW", &[4.0, 3.0, 1.0]))
            .with_latency(std::time::Duration::from_millis(150));
        let config = config(2)
            .with_fetch_timeout(std::time::Duration::from_millis(10))
            .unwrap();

        match screen(&provider, &sym("SLOW"), &config) {
            ScreenOutcome::FetchError { symbol, reason } => {
                assert_eq!(symbol, sym("SLOW"));
                assert!(reason.contains("timed out"), "{reason}");
            }
            other => panic!("expected a timeout, got {other}"),
        }
    }

    #[test]
    fn fetch_within_timeout_is_evaluated() {
        let provider = InMemoryProvider::new()
            .with_series(series("UP", &[4.0, 3.0, 1.0]))
            .with_latency(std::time::Duration::from_millis(5));
        let config = config(2)
            .with_fetch_timeout(std::time::Duration::from_secs(5))
            .unwrap();
        assert_eq!(screen(&provider, &sym("UP"), &config), ScreenOutcome::Pass(sym("UP")));
    }

    #[test]
    fn empty_series_fails_not_errors() {
        let provider = InMemoryProvider::new().with_series(PriceSeries::empty(sym("NEW")));
        assert_eq!(screen(&provider, &sym("NEW"), &config(1)), ScreenOutcome::Fail(sym("NEW")));
    }

    #[test]
    fn short_series_fails() {
        let provider = InMemoryProvider::new().with_series(series("SHORT", &[4.0, 1.0]));
        assert_eq!(
            screen(&provider, &sym("SHORT"), &config(30)),
            ScreenOutcome::Fail(sym("SHORT"))
        );
    }

    #[test]
    fn display_is_readable() {
        let e = ScreenOutcome::FetchError {
            symbol: sym("X"),
            reason: "timeout".into(),
        };
        assert_eq!(e.to_string(), "ERROR X: timeout");
        assert_eq!(ScreenOutcome::Pass(sym("A")).to_string(), "PASS A");
    }
}
