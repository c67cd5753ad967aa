//! Combat resolution.
//!
//! When a creature rotates to 270 it attacks the opposing creature in the
//! mirrored slot. The attacker's knowledge decides the raw damage (through
//! its effect handler); a `CombatResolver` turns raw damage and the two
//! creatures' wisdom into a `Strike`.

use crate::core::{PlayerId, ABSORBED_LOG_MARKER};

/// Outcome of one attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Strike {
    pub raw: u32,
    pub defense: u32,
}

impl Strike {
    /// Damage that gets through. Never negative.
    #[must_use]
    pub fn damage(&self) -> u32 {
        self.raw.saturating_sub(self.defense)
    }

    #[must_use]
    pub fn is_absorbed(&self) -> bool {
        self.damage() == 0
    }

    /// Log line describing the hit on `defender`.
    #[must_use]
    pub fn describe(&self, defender: &PlayerId) -> String {
        if self.is_absorbed() {
            format!(
                "Combat: {defender} {ABSORBED_LOG_MARKER} (raw {} - defense {})",
                self.raw, self.defense
            )
        } else {
            format!(
                "Combat: {defender} takes {} damage (raw {} - defense {})",
                self.damage(),
                self.raw,
                self.defense
            )
        }
    }
}

/// Turns raw damage into a `Strike`.
pub trait CombatResolver: Send + Sync {
    /// `defender_wisdom` is `None` when the mirrored slot has no creature.
    fn resolve(&self, raw: u32, attacker_wisdom: u32, defender_wisdom: Option<u32>) -> Strike;
}

/// Defense is half the defender's wisdom, rounded down.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultCombat;

impl CombatResolver for DefaultCombat {
    fn resolve(&self, raw: u32, _attacker_wisdom: u32, defender_wisdom: Option<u32>) -> Strike {
        Strike {
            raw,
            defense: defender_wisdom.map_or(0, |w| w / 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_clamps_at_zero() {
        let strike = Strike { raw: 2, defense: 5 };
        assert_eq!(strike.damage(), 0);
        assert!(strike.is_absorbed());
    }

    #[test]
    fn test_default_combat_halves_wisdom() {
        let strike = DefaultCombat.resolve(6, 4, Some(5));
        assert_eq!(strike, Strike { raw: 6, defense: 2 });
        assert_eq!(strike.damage(), 4);

        let undefended = DefaultCombat.resolve(6, 4, None);
        assert_eq!(undefended.damage(), 6);
    }

    #[test]
    fn test_log_lines() {
        let bob = PlayerId::new("bob");
        assert_eq!(
            Strike { raw: 6, defense: 2 }.describe(&bob),
            "Combat: bob takes 4 damage (raw 6 - defense 2)"
        );
        assert_eq!(
            Strike { raw: 1, defense: 2 }.describe(&bob),
            "Combat: bob absorbs all damage (raw 1 - defense 2)"
        );
    }
}
