use std::collections::VecDeque;

/// Sliding-window length in milliseconds.
const WINDOW_MS: u64 = 60_000;

#[derive(Debug)]
/// Sliding 60-second admission control over outbound deliveries.
///
/// Pure state plus caller-supplied time: the limiter never sleeps, callers
/// own any waiting when an admission is denied.
pub struct RateLimiter {
    window: VecDeque<u64>,
    limit: usize,
}

impl RateLimiter {
    pub fn new(limit: usize) -> Self {
        Self {
            window: VecDeque::new(),
            limit,
        }
    }

    /// Prunes stamps older than the trailing window, then admits and records
    /// `now_unix_ms` when the window has room.
    pub fn admit(&mut self, now_unix_ms: u64) -> bool {
        self.prune(now_unix_ms);
        if self.window.len() < self.limit {
            self.window.push_back(now_unix_ms);
            return true;
        }
        false
    }

    /// Number of admissions still inside the trailing window.
    pub fn occupancy(&mut self, now_unix_ms: u64) -> usize {
        self.prune(now_unix_ms);
        self.window.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn prune(&mut self, now_unix_ms: u64) {
        let cutoff = now_unix_ms.saturating_sub(WINDOW_MS);
        while matches!(self.window.front(), Some(stamp) if *stamp <= cutoff) {
            self.window.pop_front();
        }
    }
}
