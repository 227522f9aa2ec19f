//! Screen pipeline: wires universe, scheduler, aggregator, and output.
//!
//! Two entry points:
//! - `load_symbols()`: resolves the configured universe into provider symbols.
//! - `run_screen()`: schedules every symbol and aggregates the outcomes into a
//!   `Watchlist`. Cancellation discards partial results.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use watchlist_core::data::{SeriesProvider, Universe, UniverseError};
use watchlist_core::domain::Symbol;

use crate::aggregate::{collect_watchlist, Watchlist};
use crate::config::{ConfigError, RunConfig, ScreenConfig};
use crate::output::OutputError;
use crate::progress::ScreenProgress;
use crate::scheduler::{CancelToken, ScheduleError, Scheduler};

/// Errors from a screen run. All are fatal to the run.
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("universe error: {0}")]
    Universe(#[from] UniverseError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

impl ScreenError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScreenError::Schedule(ScheduleError::Cancelled { .. }))
    }
}

/// Load the configured universe and apply the provider suffix.
pub fn load_symbols(config: &ScreenConfig) -> Result<Vec<Symbol>, ScreenError> {
    let timeout = Duration::from_secs(config.provider.timeout_secs.max(1));
    let universe = Universe::load(&config.universe.source, &config.universe.column, timeout)?
        .with_suffix(&config.provider.suffix);
    tracing::info!(
        source = %config.universe.source,
        symbols = universe.len(),
        "universe loaded"
    );
    Ok(universe.into_symbols())
}

/// Screen `symbols` and return the passing ones.
///
/// Per-symbol fetch failures are logged and skipped. If the provider is
/// refusing requests when the run ends, the remaining cooldown is recorded on
/// the watchlist. A cancellation through `cancel` returns
/// `ScreenError::Schedule(ScheduleError::Cancelled)` and no watchlist.
pub fn run_screen(
    symbols: &[Symbol],
    provider: Arc<dyn SeriesProvider>,
    config: &RunConfig,
    cancel: CancelToken,
    progress: &dyn ScreenProgress,
) -> Result<Watchlist, ScreenError> {
    let started = Instant::now();
    tracing::info!(
        symbols = symbols.len(),
        provider = provider.name(),
        period = %config.period(),
        low_window = config.low_window(),
        concurrency = config.concurrency(),
        "screen starting"
    );

    let scheduler = Scheduler::new(config.clone()).with_cancel(cancel);
    let stream = scheduler.run_all(symbols, Arc::clone(&provider), progress)?;
    let mut watchlist = collect_watchlist(stream)?;

    if let Some(remaining) = provider.blocked_for() {
        tracing::warn!(
            provider = provider.name(),
            fetch_errors = watchlist.fetch_errors(),
            cooldown_secs = remaining.as_secs(),
            "provider refused requests during the screen; fetch errors include breaker refusals"
        );
        watchlist.set_provider_blocked_for(Some(remaining));
    }

    tracing::info!(
        screened = watchlist.screened(),
        passed = watchlist.len(),
        failed = watchlist.failed(),
        fetch_errors = watchlist.fetch_errors(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "screen finished"
    );
    Ok(watchlist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use watchlist_core::data::InMemoryProvider;
    use watchlist_core::domain::LookbackPeriod;

    #[test]
    fn load_symbols_applies_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("asx.csv");
        std::fs::write(&csv, "Company name,ASX code\nBHP Group,BHP\nCommonwealth Bank,CBA\n").unwrap();

        let mut config = ScreenConfig::default();
        config.universe.source = csv.display().to_string();
        let symbols = load_symbols(&config).unwrap();
        let names: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["BHP.AX", "CBA.AX"]);
    }

    #[test]
    fn missing_universe_is_universe_error() {
        let mut config = ScreenConfig::default();
        config.universe.source = "/nonexistent/asx.csv".into();
        assert!(matches!(load_symbols(&config), Err(ScreenError::Universe(_))));
    }

    #[test]
    fn available_provider_leaves_no_cooldown() {
        let symbols = vec![Symbol::parse("A").unwrap()];
        let config = RunConfig::new(LookbackPeriod::Max, 30, 1).unwrap();
        let watchlist = run_screen(
            &symbols,
            Arc::new(InMemoryProvider::new()),
            &config,
            CancelToken::new(),
            &NoProgress,
        )
        .unwrap();
        assert_eq!(watchlist.provider_blocked_for(), None);
        assert_eq!(watchlist.fetch_errors(), 1);
    }

    #[test]
    fn cancelled_run_reports_cancellation() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let symbols = vec![Symbol::parse("A").unwrap()];
        let config = RunConfig::new(LookbackPeriod::Max, 30, 1).unwrap();
        let err = run_screen(
            &symbols,
            Arc::new(InMemoryProvider::new()),
            &config,
            cancel,
            &NoProgress,
        )
        .unwrap_err();
        assert!(err.is_cancelled());
    }
}
