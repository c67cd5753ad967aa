//! Match configuration.
//!
//! `MatchConfig` fixes the per-match rule constants. Every client of a match
//! must use the same values, since both run the reducer on their own side.
//! The values most likely to be tuned live here instead of in the rules code.

use serde::{Deserialize, Serialize};

/// Number of creatures each player brings to a match.
pub const CREATURES_PER_PLAYER: usize = 3;

/// Rule constants for a match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Action-phase moves allowed per turn.
    pub actions_per_turn: u8,

    /// Maximum knowledge cards a hand may hold.
    pub hand_limit: usize,

    /// Face-up knowledge cards in the shared market.
    pub market_size: usize,

    /// Knowledge cards dealt to each hand at match start.
    pub starting_hand_size: usize,

    /// Power each player starts with. A player at 0 power is eliminated.
    pub starting_power: u32,

    /// Copies of every catalog template shuffled into the shared deck.
    pub copies_per_template: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            actions_per_turn: 2,
            hand_limit: 5,
            market_size: 4,
            starting_hand_size: 2,
            starting_power: 20,
            copies_per_template: 3,
        }
    }
}

impl MatchConfig {
    /// Set the per-turn action budget.
    #[must_use]
    pub fn with_actions_per_turn(mut self, actions: u8) -> Self {
        self.actions_per_turn = actions;
        self
    }

    /// Set the hand limit.
    #[must_use]
    pub fn with_hand_limit(mut self, limit: usize) -> Self {
        self.hand_limit = limit;
        self
    }

    /// Set the market size.
    #[must_use]
    pub fn with_market_size(mut self, size: usize) -> Self {
        self.market_size = size;
        self
    }

    /// Set the starting hand size.
    #[must_use]
    pub fn with_starting_hand_size(mut self, size: usize) -> Self {
        self.starting_hand_size = size;
        self
    }

    /// Set the starting power.
    #[must_use]
    pub fn with_starting_power(mut self, power: u32) -> Self {
        self.starting_power = power;
        self
    }

    /// Set the number of deck copies per template.
    #[must_use]
    pub fn with_copies_per_template(mut self, copies: usize) -> Self {
        self.copies_per_template = copies;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MatchConfig::default();
        assert_eq!(config.actions_per_turn, 2);
        assert_eq!(config.hand_limit, 5);
        assert_eq!(config.starting_power, 20);
    }

    #[test]
    fn test_builder_pattern() {
        let config = MatchConfig::default()
            .with_actions_per_turn(3)
            .with_hand_limit(7)
            .with_starting_power(5);

        assert_eq!(config.actions_per_turn, 3);
        assert_eq!(config.hand_limit, 7);
        assert_eq!(config.starting_power, 5);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: MatchConfig = serde_json::from_str(r#"{"hand_limit": 3}"#).unwrap();
        assert_eq!(config.hand_limit, 3);
        assert_eq!(config.actions_per_turn, 2);
        assert_eq!(config.market_size, 4);
    }
}
