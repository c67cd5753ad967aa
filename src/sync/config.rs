//! Sync channel configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing of reconnects, polling and rendezvous backup polls.
///
/// Durations are kept in milliseconds so the config reads naturally in
/// JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// First reconnect delay; doubles on every further attempt.
    pub backoff_base_ms: u64,

    /// Upper bound for a single reconnect delay.
    pub backoff_max_ms: u64,

    /// Reconnect attempts after a failure before falling back to polling.
    pub max_retries: u32,

    /// Interval between polls while polling.
    pub poll_interval_ms: u64,

    /// Consecutive failed polls before the channel reports lost sync.
    pub max_poll_failures: u32,

    /// Interval of the backup poll a rendezvous runs next to its live feed.
    pub rendezvous_poll_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backoff_base_ms: 1_000,
            backoff_max_ms: 30_000,
            max_retries: 3,
            poll_interval_ms: 2_500,
            max_poll_failures: 5,
            rendezvous_poll_ms: 3_000,
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    #[must_use]
    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn rendezvous_poll(&self) -> Duration {
        Duration::from_millis(self.rendezvous_poll_ms)
    }

    #[must_use]
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base_ms = base.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn with_max_poll_failures(mut self, failures: u32) -> Self {
        self.max_poll_failures = failures;
        self
    }

    #[must_use]
    pub fn with_rendezvous_poll(mut self, interval: Duration) -> Self {
        self.rendezvous_poll_ms = interval.as_millis() as u64;
        self
    }
}
