//! Yahoo Finance series provider.
//!
//! Fetches daily closes from Yahoo's v8 chart API using the `range` parameter
//! (`1mo`, `max`, ...). Each request is bounded by the client timeout. 429, 5xx,
//! connect errors and timeouts are retried with exponential backoff, and all
//! workers share one circuit breaker.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{FetchError, SeriesProvider};
use crate::domain::{LookbackPeriod, PricePoint, PriceSeries, Symbol};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Yahoo Finance series provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    /// Build a provider whose every request is bounded by `timeout`.
    pub fn new(circuit_breaker: Arc<CircuitBreaker>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Override the provider-internal retry policy.
    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    /// Point at a different chart endpoint (mirrors, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn chart_url(&self, symbol: &Symbol, period: LookbackPeriod) -> String {
        format!(
            "{}/{symbol}?range={period}&interval=1d&includePrePost=false",
            self.base_url
        )
    }

    /// Parse a chart API body into a series.
    ///
    /// A result without timestamps is a valid symbol with no data in range and
    /// yields an empty series. Observations with no close are skipped.
    fn parse_response(symbol: &Symbol, body: &str) -> Result<PriceSeries, FetchError> {
        let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
            FetchError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;

        let result = match (resp.chart.result, resp.chart.error) {
            (Some(result), _) => result,
            (None, Some(err)) if err.code == "Not Found" => {
                return Err(FetchError::SymbolNotFound {
                    symbol: symbol.to_string(),
                })
            }
            (None, Some(err)) => {
                return Err(FetchError::ResponseFormatChanged(format!(
                    "{}: {}",
                    err.code, err.description
                )))
            }
            (None, None) => {
                return Err(FetchError::ResponseFormatChanged(
                    "empty result with no error".into(),
                ))
            }
        };

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::ResponseFormatChanged("result array is empty".into()))?;

        let Some(timestamps) = data.timestamp else {
            return Ok(PriceSeries::empty(symbol.clone()));
        };

        let closes = data
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default();

        let mut points = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let Some(close) = closes.get(i).copied().flatten() else {
                continue;
            };
            if !close.is_finite() {
                continue;
            }
            let timestamp = chrono::DateTime::from_timestamp(ts, 0).ok_or_else(|| {
                FetchError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
            })?;
            points.push(PricePoint::new(timestamp, close));
        }

        Ok(PriceSeries::new(symbol.clone(), points))
    }

    /// Execute the request with provider-internal retry and circuit breaker logic.
    fn fetch_with_retry(
        &self,
        symbol: &Symbol,
        period: LookbackPeriod,
    ) -> Result<PriceSeries, FetchError> {
        let url = self.chart_url(symbol, period);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(FetchError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_timeout() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(FetchError::Timeout(format!(
                        "{symbol} after {}s",
                        self.timeout.as_secs_f64()
                    )));
                    continue;
                }
                Err(e) if e.is_connect() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(FetchError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(FetchError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(FetchError::CircuitBreakerTripped);
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(FetchError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(FetchError::AuthenticationRequired(
                    "Yahoo Finance requires authentication".into(),
                ));
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(FetchError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }

            if status.is_server_error() {
                self.circuit_breaker.record_failure();
                last_error = Some(FetchError::Other(format!("HTTP {status} for {symbol}")));
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::Other(format!("HTTP {status} for {symbol}")));
            }

            let body = resp.text().map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(format!("{symbol} while reading body"))
                } else {
                    FetchError::NetworkUnreachable(e.to_string())
                }
            })?;

            let series = Self::parse_response(symbol, &body)?;
            self.circuit_breaker.record_success();
            return Ok(series);
        }

        Err(last_error.unwrap_or_else(|| FetchError::Other("max retries exceeded".into())))
    }
}

impl SeriesProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(&self, symbol: &Symbol, period: LookbackPeriod) -> Result<PriceSeries, FetchError> {
        self.fetch_with_retry(symbol, period)
    }

    fn blocked_for(&self) -> Option<Duration> {
        if self.circuit_breaker.is_allowed() {
            None
        } else {
            Some(self.circuit_breaker.remaining_cooldown())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    #[test]
    fn chart_url_uses_range() {
        let provider = YahooProvider::new(
            Arc::new(CircuitBreaker::default_provider()),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_base_url("http://localhost:9/chart/");
        assert_eq!(
            provider.chart_url(&sym("BHP.AX"), LookbackPeriod::OneYear),
            "http://localhost:9/chart/BHP.AX?range=1y&interval=1d&includePrePost=false"
        );
    }

    #[test]
    fn parses_closes_and_skips_gaps() {
        let body = r#"{"chart":{"result":[{
            "timestamp":[1704067200,1704153600,1704240000],
            "indicators":{"quote":[{"close":[10.5,null,9.75]}]}
        }],"error":null}}"#;
        let series = YahooProvider::parse_response(&sym("BHP.AX"), body).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].close, 10.5);
        assert_eq!(series.points()[1].close, 9.75);
        assert!(series.points()[0].timestamp < series.points()[1].timestamp);
    }

    #[test]
    fn missing_timestamps_is_empty_series() {
        let body = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        let series = YahooProvider::parse_response(&sym("NEW.AX"), body).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.symbol().as_str(), "NEW.AX");
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = YahooProvider::parse_response(&sym("GONE.AX"), body).unwrap_err();
        assert_eq!(
            err,
            FetchError::SymbolNotFound {
                symbol: "GONE.AX".into()
            }
        );
    }

    #[test]
    fn other_chart_error_is_format_change() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        let err = YahooProvider::parse_response(&sym("X"), body).unwrap_err();
        assert!(matches!(err, FetchError::ResponseFormatChanged(_)));
    }

    #[test]
    fn malformed_json_is_format_change() {
        let err = YahooProvider::parse_response(&sym("X"), "<html>").unwrap_err();
        assert!(matches!(err, FetchError::ResponseFormatChanged(_)));
    }

    #[test]
    fn open_breaker_fails_fast() {
        let breaker = Arc::new(CircuitBreaker::default_provider());
        breaker.trip();
        let provider = YahooProvider::new(Arc::clone(&breaker), Duration::from_secs(1))
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        assert!(provider.blocked_for().is_some_and(|d| d > Duration::ZERO));
        let err = provider.fetch(&sym("BHP.AX"), LookbackPeriod::Max).unwrap_err();
        assert_eq!(err, FetchError::CircuitBreakerTripped);
    }
}
