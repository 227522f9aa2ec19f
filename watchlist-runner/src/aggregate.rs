//! Aggregation of screen outcomes into the final watchlist.

use std::collections::HashSet;
use std::time::Duration;

use watchlist_core::domain::Symbol;

use crate::scheduler::ScheduleError;
use crate::worker::ScreenOutcome;

/// Symbols that passed the screen, in the order their outcomes arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Watchlist {
    symbols: Vec<Symbol>,
    screened: usize,
    failed: usize,
    fetch_errors: usize,
    provider_blocked_for: Option<Duration>,
}

impl Watchlist {
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn into_symbols(self) -> Vec<Symbol> {
        self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Number of outcomes consumed, duplicates included.
    pub fn screened(&self) -> usize {
        self.screened
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn fetch_errors(&self) -> usize {
        self.fetch_errors
    }

    /// Remaining provider cooldown when the run ended with the provider
    /// refusing requests. Fetch errors after that point are breaker refusals.
    pub fn provider_blocked_for(&self) -> Option<Duration> {
        self.provider_blocked_for
    }

    pub(crate) fn set_provider_blocked_for(&mut self, remaining: Option<Duration>) {
        self.provider_blocked_for = remaining;
    }
}

/// Incremental aggregator; dedupes passes by symbol, first seen wins.
#[derive(Debug, Default)]
pub struct Aggregator {
    watchlist: Watchlist,
    seen: HashSet<Symbol>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: ScreenOutcome) {
        self.watchlist.screened += 1;
        match outcome {
            ScreenOutcome::Pass(symbol) => {
                if self.seen.insert(symbol.clone()) {
                    self.watchlist.symbols.push(symbol);
                }
            }
            ScreenOutcome::Fail(_) => self.watchlist.failed += 1,
            ScreenOutcome::FetchError { symbol, reason } => {
                tracing::debug!(%symbol, %reason, "skipped after fetch error");
                self.watchlist.fetch_errors += 1;
            }
        }
    }

    pub fn finish(self) -> Watchlist {
        self.watchlist
    }
}

/// Keep the passing symbols of a complete set of outcomes.
pub fn aggregate<I>(outcomes: I) -> Watchlist
where
    I: IntoIterator<Item = ScreenOutcome>,
{
    let mut agg = Aggregator::new();
    for outcome in outcomes {
        agg.record(outcome);
    }
    agg.finish()
}

/// Aggregate a scheduler stream. A cancellation or worker-loss error
/// discards everything collected so far and is returned instead.
pub fn collect_watchlist<I>(outcomes: I) -> Result<Watchlist, ScheduleError>
where
    I: IntoIterator<Item = Result<ScreenOutcome, ScheduleError>>,
{
    let mut agg = Aggregator::new();
    for outcome in outcomes {
        agg.record(outcome?);
    }
    Ok(agg.finish())
}
