//! Sliding window of request timestamps for one identity.

use std::collections::VecDeque;

// == Rate Window ==
/// Ordered request timestamps (Unix milliseconds), oldest at the front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateWindow {
    hits: VecDeque<u64>,
    /// Window length of the most recent check against this identity.
    window_ms: u64,
}

impl RateWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every timestamp at or before `window_start`.
    pub fn purge(&mut self, window_start: u64) {
        while self.hits.front().is_some_and(|&ts| ts <= window_start) {
            self.hits.pop_front();
        }
    }

    /// Appends a request timestamp.
    ///
    /// Timestamps arrive in clock order; a clock that steps backwards is
    /// clamped to the newest recorded value so the window stays sorted.
    pub fn record(&mut self, now_ms: u64) {
        let ts = self.hits.back().map_or(now_ms, |&last| now_ms.max(last));
        self.hits.push_back(ts);
    }

    pub fn count(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn oldest(&self) -> Option<u64> {
        self.hits.front().copied()
    }

    pub fn newest(&self) -> Option<u64> {
        self.hits.back().copied()
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn set_window_ms(&mut self, window_ms: u64) {
        self.window_ms = window_ms;
    }
}
