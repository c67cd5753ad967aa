use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Turn timer and auto-play settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// Length of the action phase before `END_TURN` is sent.
    pub turn_seconds: u32,

    /// Send `END_TURN` as soon as the action budget is used up.
    pub auto_end_on_exhausted_budget: bool,

    /// Send `RESOLVE_KNOWLEDGE` when my turn starts.
    pub auto_resolve_knowledge: bool,

    /// Retries when an automatic action fails transiently (busy or not persisted).
    pub retries: u32,

    pub retry_delay_ms: u64,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            turn_seconds: 60,
            auto_end_on_exhausted_budget: true,
            auto_resolve_knowledge: true,
            retries: 3,
            retry_delay_ms: 200,
        }
    }
}

impl TurnConfig {
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    #[must_use]
    pub fn with_turn_seconds(mut self, seconds: u32) -> Self {
        self.turn_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_auto_end(mut self, enabled: bool) -> Self {
        self.auto_end_on_exhausted_budget = enabled;
        self
    }

    #[must_use]
    pub fn with_auto_resolve(mut self, enabled: bool) -> Self {
        self.auto_resolve_knowledge = enabled;
        self
    }

    #[must_use]
    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TurnConfig::default();
        assert_eq!(config.turn_seconds, 60);
        assert!(config.auto_end_on_exhausted_budget);
        assert!(config.auto_resolve_knowledge);
        assert_eq!(config.retry_delay(), Duration::from_millis(200));
    }

    #[test]
    fn test_builder() {
        let config = TurnConfig::default()
            .with_turn_seconds(5)
            .with_auto_end(false)
            .with_retries(1, Duration::from_millis(50));
        assert_eq!(config.turn_seconds, 5);
        assert!(!config.auto_end_on_exhausted_budget);
        assert_eq!(config.retries, 1);
        assert_eq!(config.retry_delay_ms, 50);
    }
}
