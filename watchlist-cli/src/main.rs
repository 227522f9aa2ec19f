//! Watchlist CLI: screen a symbol universe for stocks that have doubled off a recent low.
//!
//! Commands:
//! - `screen`: screen every symbol in the universe and write the watchlist
//! - `check`: screen a few symbols and print each decision with its high and low

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use watchlist_core::criterion::{evaluate, price_extremes};
use watchlist_core::data::{CircuitBreaker, InMemoryProvider, SeriesProvider, YahooProvider};
use watchlist_core::domain::Symbol;
use watchlist_runner::{
    format_watchlist, load_symbols, run_screen, write_watchlist, CancelToken, LogProgress,
    OutputFormat, RunConfig, ScreenConfig,
};

#[derive(Parser)]
#[command(
    name = "watchlist",
    version,
    about = "Watchlist: find stocks that have doubled off a recent low"
)]
struct Cli {
    /// Log every symbol decision at debug level. Overrides RUST_LOG.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen the universe and write the watchlist file.
    Screen {
        #[command(flatten)]
        common: CommonArgs,

        /// Universe CSV path or http(s) URL.
        #[arg(long)]
        universe: Option<String>,

        /// CSV column holding the tickers.
        #[arg(long)]
        column: Option<String>,

        /// Maximum concurrent fetches.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Watchlist output file.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Exchange prefix written before each ticker. Empty for none.
        #[arg(long)]
        exchange_tag: Option<String>,

        /// Keep completion order instead of sorting alphabetically.
        #[arg(long, default_value_t = false)]
        no_sort: bool,
    },
    /// Screen the given symbols and print each decision.
    Check {
        /// Symbols to check (e.g., BHP CBA). The provider suffix is appended.
        #[arg(required = true)]
        symbols: Vec<String>,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Path to a TOML config file. Flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Provider suffix appended to each ticker (e.g., .AX).
    #[arg(long)]
    suffix: Option<String>,

    /// Lookback period: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max.
    #[arg(long)]
    period: Option<String>,

    /// The low must fall within this many most-recent observations.
    #[arg(long)]
    low_window: Option<usize>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Serve prices from a JSON fixture instead of Yahoo Finance (offline).
    #[arg(long)]
    fixture: Option<PathBuf>,
}

impl CommonArgs {
    fn load_config(&self) -> Result<ScreenConfig> {
        let mut config = match &self.config {
            Some(path) => ScreenConfig::from_file(path)?,
            None => ScreenConfig::default(),
        };
        if let Some(suffix) = &self.suffix {
            config.provider.suffix = suffix.clone();
        }
        if let Some(period) = &self.period {
            config.screen.period = period.clone();
        }
        if let Some(low_window) = self.low_window {
            config.screen.low_window = low_window;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.provider.timeout_secs = timeout_secs;
        }
        Ok(config)
    }

    /// Build the provider from the validated run config, so its client
    /// timeout is `run_config.fetch_timeout()`.
    fn build_provider(
        &self,
        config: &ScreenConfig,
        run_config: &RunConfig,
    ) -> Result<Arc<dyn SeriesProvider>> {
        if let Some(path) = &self.fixture {
            return Ok(Arc::new(InMemoryProvider::from_json_file(path)?));
        }
        let breaker = Arc::new(CircuitBreaker::new(Duration::from_secs(
            config.provider.breaker_cooldown_secs,
        )));
        let provider = YahooProvider::new(breaker, run_config.fetch_timeout())?
            .with_retries(
                config.provider.max_retries,
                Duration::from_millis(config.provider.retry_base_delay_ms),
            );
        Ok(Arc::new(provider))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Screen {
            common,
            universe,
            column,
            concurrency,
            output,
            exchange_tag,
            no_sort,
        } => {
            let mut config = common.load_config()?;
            if let Some(universe) = universe {
                config.universe.source = universe;
            }
            if let Some(column) = column {
                config.universe.column = column;
            }
            if let Some(concurrency) = concurrency {
                config.scheduler.concurrency = concurrency;
            }
            if let Some(output) = output {
                config.output.path = output;
            }
            if let Some(tag) = exchange_tag {
                config.output.exchange_tag = tag;
            }
            if no_sort {
                config.output.sort = false;
            }
            run_screen_cmd(&common, &config)
        }
        Commands::Check { symbols, common } => {
            let config = common.load_config()?;
            run_check_cmd(&common, &config, &symbols)
        }
    }
}

/// Filter directives: `--verbose` wins over `RUST_LOG`, which wins over `info`.
fn filter_directives(verbose: bool, rust_log: Option<String>) -> String {
    if verbose {
        return "debug".into();
    }
    rust_log
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| "info".into())
}

fn init_logging(verbose: bool) {
    let directives = filter_directives(verbose, std::env::var(EnvFilter::DEFAULT_ENV).ok());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Cancel the token on Ctrl-C. The listener thread lives until process exit.
fn cancel_on_ctrl_c(cancel: CancelToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build signal runtime")?;
    std::thread::Builder::new()
        .name("watchlist-ctrl-c".into())
        .spawn(move || {
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupt received, cancelling screen");
                    cancel.cancel();
                }
            });
        })
        .context("spawn signal listener")?;
    Ok(())
}

fn run_screen_cmd(common: &CommonArgs, config: &ScreenConfig) -> Result<()> {
    // Validate everything before touching the network.
    let run_config = config.run_config()?;
    let symbols = load_symbols(config)?;
    let provider = common.build_provider(config, &run_config)?;

    let cancel = CancelToken::new();
    cancel_on_ctrl_c(cancel.clone())?;

    let progress = LogProgress::default();
    // A cancelled run is an error: nothing is written.
    let watchlist = run_screen(&symbols, provider, &run_config, cancel, &progress)?;

    let format = OutputFormat::from_section(&config.output, &config.provider.suffix);
    let contents = format_watchlist(&watchlist, &format);
    write_watchlist(&config.output.path, &contents)?;

    println!("{contents}");
    eprintln!(
        "{} of {} symbols passed ({} fetch errors). Watchlist saved to: {}",
        watchlist.len(),
        watchlist.screened(),
        watchlist.fetch_errors(),
        config.output.path.display()
    );
    if let Some(remaining) = watchlist.provider_blocked_for() {
        eprintln!(
            "Warning: the data provider is refusing requests for another {}s; \
             fetch errors above include those refusals. Re-run after the cooldown.",
            remaining.as_secs()
        );
    }
    Ok(())
}

fn run_check_cmd(common: &CommonArgs, config: &ScreenConfig, raw: &[String]) -> Result<()> {
    let run_config = config.run_config()?;
    let provider = common.build_provider(config, &run_config)?;
    let period = run_config.period();

    let mut failures = 0usize;
    for raw_symbol in raw {
        let Some(symbol) = Symbol::parse(raw_symbol) else {
            bail!("invalid symbol: {raw_symbol:?}");
        };
        let symbol = symbol.with_suffix(&config.provider.suffix);

        let series = match provider.fetch(&symbol, period) {
            Ok(series) => series,
            Err(e) => {
                failures += 1;
                println!("{:<6} {symbol}: {e}", "ERROR");
                continue;
            }
        };

        let verdict = if evaluate(&series, run_config.low_window()) {
            "PASS"
        } else {
            "FAIL"
        };
        match price_extremes(&series) {
            Some(x) => println!(
                "{verdict:<6} {symbol}: high {:.4}, low {:.4} on {} (observation {}/{})",
                x.high,
                x.low,
                x.time_of_low.format("%Y-%m-%d"),
                x.index_of_low + 1,
                series.len()
            ),
            None => println!("{verdict:<6} {symbol}: no observations in range"),
        }
    }

    if failures == raw.len() {
        bail!("every fetch failed");
    }
    Ok(())
}
