//! Watchlist Runner: screen orchestration over a symbol universe.
//!
//! This crate builds on `watchlist-core` to provide:
//! - Validated run configuration and the `watchlist.toml` file format
//! - The per-symbol screen worker
//! - A bounded, cancellable parallel scheduler
//! - Progress observers
//! - Outcome aggregation and watchlist output
//! - The `run_screen` pipeline used by the CLI

pub mod aggregate;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod scheduler;
pub mod worker;

pub use aggregate::{aggregate, collect_watchlist, Aggregator, Watchlist};
pub use config::{ConfigError, RunConfig, ScreenConfig};
pub use output::{format_watchlist, write_watchlist, OutputError, OutputFormat};
pub use pipeline::{load_symbols, run_screen, ScreenError};
pub use progress::{LogProgress, NoProgress, RecordingProgress, ScreenProgress};
pub use scheduler::{CancelToken, OutcomeStream, ScheduleError, Scheduler};
pub use worker::{screen, ScreenOutcome};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn run_config_is_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
    }

    #[test]
    fn screen_outcome_is_send_sync() {
        assert_send::<ScreenOutcome>();
        assert_sync::<ScreenOutcome>();
    }

    #[test]
    fn cancel_token_is_send_sync() {
        assert_send::<CancelToken>();
        assert_sync::<CancelToken>();
    }

    #[test]
    fn watchlist_is_send_sync() {
        assert_send::<Watchlist>();
        assert_sync::<Watchlist>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<ScheduleError>();
        assert_sync::<ScheduleError>();
        assert_send::<ScreenError>();
        assert_sync::<ScreenError>();
    }
}
