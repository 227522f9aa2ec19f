//! Progress observers for a running screen.

use std::sync::Mutex;

use crate::worker::ScreenOutcome;

/// Receives progress as the scheduler's outcome stream is consumed.
///
/// Called on the consuming thread, after each outcome and before it is
/// handed to the caller. `completed` increases by exactly one per call.
pub trait ScreenProgress {
    /// Called once before any outcome, with the number of symbols submitted.
    fn on_start(&self, _total: usize) {}

    /// Called after each outcome.
    fn on_outcome(&self, completed: usize, total: usize, outcome: &ScreenOutcome);

    /// Called once when the stream ends, normally or through cancellation.
    fn on_finish(&self, _completed: usize, _total: usize, _interrupted: bool) {}
}

/// Discards all progress.
pub struct NoProgress;

impl ScreenProgress for NoProgress {
    fn on_outcome(&self, _completed: usize, _total: usize, _outcome: &ScreenOutcome) {}
}

/// Logs a progress line every `every` outcomes and at the end.
pub struct LogProgress {
    every: usize,
}

impl LogProgress {
    pub fn new(every: usize) -> Self {
        Self { every: every.max(1) }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ScreenProgress for LogProgress {
    fn on_outcome(&self, completed: usize, total: usize, outcome: &ScreenOutcome) {
        if let ScreenOutcome::Pass(symbol) = outcome {
            tracing::info!(%symbol, "passed");
        }
        if completed % self.every == 0 || completed == total {
            let pct = completed as f64 / total.max(1) as f64 * 100.0;
            tracing::info!("[{completed}/{total}] {pct:.0}% screened");
        }
    }

    fn on_finish(&self, completed: usize, total: usize, interrupted: bool) {
        if interrupted {
            tracing::warn!("screen interrupted after {completed}/{total} symbols");
        }
    }
}

/// Records every `(completed, total)` pair. Useful for asserting ordering in tests.
#[derive(Default)]
pub struct RecordingProgress {
    started: Mutex<Option<usize>>,
    events: Mutex<Vec<(usize, usize)>>,
    finished: Mutex<Option<(usize, bool)>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> Option<usize> {
        *self.started.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn events(&self) -> Vec<(usize, usize)> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// `(completed, interrupted)` reported at the end, if the stream has ended.
    pub fn finished(&self) -> Option<(usize, bool)> {
        *self.finished.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ScreenProgress for RecordingProgress {
    fn on_start(&self, total: usize) {
        *self.started.lock().unwrap_or_else(|e| e.into_inner()) = Some(total);
    }

    fn on_outcome(&self, completed: usize, total: usize, _outcome: &ScreenOutcome) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((completed, total));
    }

    fn on_finish(&self, completed: usize, _total: usize, interrupted: bool) {
        *self.finished.lock().unwrap_or_else(|e| e.into_inner()) = Some((completed, interrupted));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchlist_core::domain::Symbol;

    #[test]
    fn recording_progress_captures_calls() {
        let p = RecordingProgress::new();
        let outcome = ScreenOutcome::Fail(Symbol::parse("X").unwrap());
        p.on_start(2);
        p.on_outcome(1, 2, &outcome);
        p.on_outcome(2, 2, &outcome);
        p.on_finish(2, 2, false);
        assert_eq!(p.started(), Some(2));
        assert_eq!(p.events(), vec![(1, 2), (2, 2)]);
        assert_eq!(p.finished(), Some((2, false)));
    }

    #[test]
    fn log_progress_clamps_interval() {
        let p = LogProgress::new(0);
        let outcome = ScreenOutcome::Pass(Symbol::parse("X").unwrap());
        // every == 1 after clamping: must not divide by zero.
        p.on_outcome(1, 1, &outcome);
        p.on_finish(1, 1, false);
    }
}
