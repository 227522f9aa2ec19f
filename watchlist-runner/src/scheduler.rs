//! Parallel scheduler: bounded fan-out of the screen worker over a universe.
//!
//! Each symbol is submitted as a job to a private rayon pool with exactly
//! `concurrency` threads, so at most that many fetches are in flight. Jobs
//! send their outcome over an mpsc channel and the caller pulls outcomes from
//! an [`OutcomeStream`] in completion order.
//!
//! Cancellation is cooperative. The stream polls a [`CancelToken`] every
//! `poll_interval` while waiting. Once cancelled it raises the run's stop
//! flag so queued jobs return without fetching, drops the pool without
//! joining in-flight requests, and yields [`ScheduleError::Cancelled`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use watchlist_core::data::SeriesProvider;
use watchlist_core::domain::Symbol;

use crate::config::RunConfig;
use crate::progress::ScreenProgress;
use crate::worker::{screen, ScreenOutcome};

/// Run-fatal scheduling errors.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("screen cancelled after {completed}/{total} symbols; no watchlist produced")]
    Cancelled { completed: usize, total: usize },

    #[error("worker pool stopped after {completed}/{total} outcomes")]
    WorkerLost { completed: usize, total: usize },

    #[error("failed to build worker pool: {0}")]
    PoolBuild(String),
}

/// Shared cancellation flag. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Dispatches the screen worker over a symbol list with bounded concurrency.
pub struct Scheduler {
    config: Arc<RunConfig>,
    cancel: CancelToken,
}

impl Scheduler {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config: Arc::new(config),
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally owned cancel token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Submit every symbol and return the completion-ordered outcome stream.
    ///
    /// Work starts immediately. The stream yields exactly one `Ok` per
    /// symbol, or ends with a single `Err` if the run is cancelled or the
    /// pool dies.
    pub fn run_all<'p>(
        &self,
        symbols: &[Symbol],
        provider: Arc<dyn SeriesProvider>,
        progress: &'p dyn ScreenProgress,
    ) -> Result<OutcomeStream<'p>, ScheduleError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.concurrency())
            .thread_name(|i| format!("watchlist-screen-{i}"))
            .build()
            .map_err(|e| ScheduleError::PoolBuild(e.to_string()))?;

        let total = symbols.len();
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();

        progress.on_start(total);
        tracing::debug!(
            total,
            concurrency = self.config.concurrency(),
            period = %self.config.period(),
            "submitting screen jobs"
        );

        for symbol in symbols.iter().cloned() {
            let tx = tx.clone();
            let provider = Arc::clone(&provider);
            let config = Arc::clone(&self.config);
            let stop = Arc::clone(&stop);

            pool.spawn(move || {
                if stop.load(Ordering::SeqCst) {
                    return;
                }
                // A panicking provider must not abort the pool.
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    screen(&*provider, &symbol, &config)
                }))
                .unwrap_or_else(|_| ScreenOutcome::FetchError {
                    symbol: symbol.clone(),
                    reason: "worker panicked while screening".into(),
                });
                if stop.load(Ordering::SeqCst) {
                    return;
                }
                // The receiver is gone only if the stream was dropped.
                let _ = tx.send(outcome);
            });
        }
        drop(tx);

        Ok(OutcomeStream {
            rx,
            pool: Some(pool),
            stop,
            cancel: self.cancel.clone(),
            progress,
            poll_interval: self.config.poll_interval(),
            completed: 0,
            total,
            finished: false,
        })
    }

    /// Run to completion and collect every outcome in completion order.
    pub fn run_to_completion(
        &self,
        symbols: &[Symbol],
        provider: Arc<dyn SeriesProvider>,
        progress: &dyn ScreenProgress,
    ) -> Result<Vec<ScreenOutcome>, ScheduleError> {
        self.run_all(symbols, provider, progress)?.collect()
    }
}

/// Lazy, completion-ordered stream of screen outcomes.
pub struct OutcomeStream<'p> {
    rx: Receiver<ScreenOutcome>,
    pool: Option<rayon::ThreadPool>,
    stop: Arc<AtomicBool>,
    cancel: CancelToken,
    progress: &'p dyn ScreenProgress,
    poll_interval: Duration,
    completed: usize,
    total: usize,
    finished: bool,
}

impl OutcomeStream<'_> {
    /// Stop admitting work and release the pool without waiting for it.
    fn shut_down(&mut self, interrupted: bool) {
        self.stop.store(true, Ordering::SeqCst);
        // Dropping a rayon pool signals its threads to exit once their
        // current job returns; it does not block.
        self.pool.take();
        self.finished = true;
        self.progress
            .on_finish(self.completed, self.total, interrupted);
    }
}

impl Iterator for OutcomeStream<'_> {
    type Item = Result<ScreenOutcome, ScheduleError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            if self.completed == self.total {
                self.shut_down(false);
                return None;
            }

            if self.cancel.is_cancelled() {
                let (completed, total) = (self.completed, self.total);
                self.shut_down(true);
                tracing::debug!(completed, total, "screen cancelled");
                return Some(Err(ScheduleError::Cancelled { completed, total }));
            }

            match self.rx.recv_timeout(self.poll_interval) {
                Ok(outcome) => {
                    self.completed += 1;
                    self.progress
                        .on_outcome(self.completed, self.total, &outcome);
                    return Some(Ok(outcome));
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    let (completed, total) = (self.completed, self.total);
                    self.shut_down(true);
                    return Some(Err(ScheduleError::WorkerLost { completed, total }));
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            (0, Some(0))
        } else {
            (0, Some(self.total - self.completed + 1))
        }
    }
}

impl Drop for OutcomeStream<'_> {
    fn drop(&mut self) {
        // Abandoned mid-run: keep queued jobs from fetching.
        self.stop.store(true, Ordering::SeqCst);
    }
}
