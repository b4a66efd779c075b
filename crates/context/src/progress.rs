use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Cumulative `(current, total)` progress with a derived rate and ETA.
/// Logs at most once per `log_interval` to avoid flooding stderr on tight
/// loops, per spec §4.1.
pub struct ProgressTracker {
    state: Mutex<State>,
    log_interval: Duration,
}

struct State {
    current: u64,
    total: u64,
    started_at: Instant,
    last_logged_at: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub current: u64,
    pub total: u64,
    pub rate_per_sec: f64,
    pub eta_seconds: Option<f64>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::with_log_interval(Duration::from_secs(5))
    }

    pub fn with_log_interval(log_interval: Duration) -> Self {
        Self {
            state: Mutex::new(State {
                current: 0,
                total: 0,
                started_at: Instant::now(),
                last_logged_at: None,
            }),
            log_interval,
        }
    }

    pub fn reset(&self, total: u64) {
        let mut state = self.state.lock().unwrap();
        state.current = 0;
        state.total = total;
        state.started_at = Instant::now();
        state.last_logged_at = None;
    }

    /// Advances `current` to `processed` (not by delta) and logs a
    /// progress line if at least `log_interval` has elapsed since the
    /// last log, matching the Transformer's "call per chunk completion"
    /// contract from spec §4.4.
    pub fn update_progress(&self, processed: u64, total: u64) -> ProgressSnapshot {
        let mut state = self.state.lock().unwrap();
        state.current = processed;
        state.total = total;

        let elapsed = state.started_at.elapsed().as_secs_f64();
        let rate_per_sec = if elapsed > 0.0 { state.current as f64 / elapsed } else { 0.0 };
        let eta_seconds = if rate_per_sec > 0.0 && state.total > state.current {
            Some((state.total - state.current) as f64 / rate_per_sec)
        } else {
            None
        };

        let snapshot = ProgressSnapshot {
            current: state.current,
            total: state.total,
            rate_per_sec,
            eta_seconds,
        };

        let should_log = match state.last_logged_at {
            None => true,
            Some(last) => last.elapsed() >= self.log_interval,
        } || state.current >= state.total;

        if should_log {
            state.last_logged_at = Some(Instant::now());
            tracing::info!(
                current = snapshot.current,
                total = snapshot.total,
                rate_per_sec = snapshot.rate_per_sec,
                eta_seconds = snapshot.eta_seconds,
                "progress"
            );
        }

        snapshot
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state.lock().unwrap();
        let elapsed = state.started_at.elapsed().as_secs_f64();
        let rate_per_sec = if elapsed > 0.0 { state.current as f64 / elapsed } else { 0.0 };
        ProgressSnapshot {
            current: state.current,
            total: state.total,
            rate_per_sec,
            eta_seconds: None,
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_cumulative_progress() {
        let tracker = ProgressTracker::new();
        let snap = tracker.update_progress(5, 10);
        assert_eq!(snap.current, 5);
        assert_eq!(snap.total, 10);
    }

    #[test]
    fn does_not_log_every_update_within_interval() {
        let tracker = ProgressTracker::with_log_interval(Duration::from_secs(3600));
        tracker.update_progress(1, 100);
        // Second call within the interval should not log again, but must
        // still update the snapshot correctly -- this exercises the
        // same code path without asserting on stderr content.
        let snap = tracker.update_progress(2, 100);
        assert_eq!(snap.current, 2);
    }
}
