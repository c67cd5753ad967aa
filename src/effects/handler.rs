//! Effect handlers: per-tag behavior of knowledge cards.
//!
//! A handler is looked up by the card's `EffectTag` and called at fixed
//! points of a card's life on the field:
//!
//! - `on_entry`: once, when the card is summoned
//! - `on_tick`: every knowledge phase the card survives
//! - `combat_damage`: raw damage when the holding creature attacks
//! - `on_complete`: once, when the card reaches its lifetime and leaves
//!
//! All hooks default to doing nothing, so a handler only overrides the
//! points it cares about.

use crate::cards::KnowledgeTemplate;
use crate::core::{MatchState, Phase, PlayerId, Seat};

/// Mutable view of the match handed to effect hooks.
pub struct EffectContext<'a> {
    pub state: &'a mut MatchState,

    /// Seat of the player whose field holds the card.
    pub owner: Seat,

    pub template: &'a KnowledgeTemplate,
}

impl<'a> EffectContext<'a> {
    pub fn new(state: &'a mut MatchState, owner: Seat, template: &'a KnowledgeTemplate) -> Self {
        Self {
            state,
            owner,
            template,
        }
    }

    #[must_use]
    pub fn owner_id(&self) -> &PlayerId {
        &self.state.players[self.owner].id
    }

    #[must_use]
    pub fn opponent(&self) -> Seat {
        self.owner.other()
    }

    /// Add power to a seat.
    pub fn gain_power(&mut self, seat: Seat, amount: u32) {
        let player = &mut self.state.players[seat];
        player.power = player.power.saturating_add(amount);
    }

    /// Remove power from a seat, stopping at 0.
    pub fn lose_power(&mut self, seat: Seat, amount: u32) {
        let player = &mut self.state.players[seat];
        player.power = player.power.saturating_sub(amount);
    }

    /// End the match with the card's owner as winner.
    pub fn claim_victory(&mut self) {
        if self.state.winner.is_none() {
            self.state.winner = Some(self.owner_id().clone());
            self.state.phase = Phase::End;
        }
    }

    pub fn log(&mut self, line: impl Into<String>) {
        self.state.push_log(line);
    }
}

/// Behavior attached to an effect tag.
pub trait EffectHandler: Send + Sync {
    /// Called once when the card is summoned onto a slot.
    fn on_entry(&self, _ctx: &mut EffectContext<'_>) {}

    /// Called each knowledge phase after the card rotates, unless it completes.
    fn on_tick(&self, _ctx: &mut EffectContext<'_>) {}

    /// Raw damage the card adds when its creature becomes ready.
    fn combat_damage(&self, _template: &KnowledgeTemplate) -> u32 {
        0
    }

    /// Called once when the card reaches its lifetime, before it leaves the field.
    fn on_complete(&self, _ctx: &mut EffectContext<'_>) {}
}

/// Deals the template magnitude as raw combat damage.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrikeEffect;

impl EffectHandler for StrikeEffect {
    fn combat_damage(&self, template: &KnowledgeTemplate) -> u32 {
        template.magnitude
    }
}

/// Restores the template magnitude to the owner on entry.
#[derive(Clone, Copy, Debug, Default)]
pub struct MendEffect;

impl EffectHandler for MendEffect {
    fn on_entry(&self, ctx: &mut EffectContext<'_>) {
        let amount = ctx.template.magnitude;
        ctx.gain_power(ctx.owner, amount);
        let line = format!("{} restores {} power with {}", ctx.owner_id(), amount, ctx.template.name);
        ctx.log(line);
    }
}

/// Drains the template magnitude from the opponent on entry.
#[derive(Clone, Copy, Debug, Default)]
pub struct DrainEffect;

impl EffectHandler for DrainEffect {
    fn on_entry(&self, ctx: &mut EffectContext<'_>) {
        let amount = ctx.template.magnitude;
        let target = ctx.opponent();
        ctx.lose_power(target, amount);
        let line = format!(
            "{} drains {} power from {} with {}",
            ctx.owner_id(),
            amount,
            ctx.state.players[target].id,
            ctx.template.name
        );
        ctx.log(line);
    }
}

/// Wins the match for its owner once it completes.
#[derive(Clone, Copy, Debug, Default)]
pub struct FinalEffect;

impl EffectHandler for FinalEffect {
    fn on_complete(&self, ctx: &mut EffectContext<'_>) {
        let line = format!("{} completes {}", ctx.owner_id(), ctx.template.name);
        ctx.log(line);
        ctx.claim_victory();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::EffectTag;
    use crate::core::{MatchId, TemplateId};
    use crate::rules::{MatchRules, MatchSetup};

    fn state() -> MatchState {
        MatchRules::standard().deal(&MatchSetup::standard(
            MatchId::new("fx"),
            PlayerId::new("alice"),
            PlayerId::new("bob"),
        ))
    }

    #[test]
    fn test_mend_restores_owner_power() {
        let mut state = state();
        let template = KnowledgeTemplate::new(TemplateId::new(4), "Mend", 2, EffectTag::MEND)
            .with_magnitude(3);

        MendEffect.on_entry(&mut EffectContext::new(&mut state, Seat::First, &template));

        assert_eq!(state.players[Seat::First].power, 23);
        assert_eq!(state.players[Seat::Second].power, 20);
        assert!(state.log.last().unwrap().contains("restores 3 power"));
    }

    #[test]
    fn test_drain_saturates_at_zero() {
        let mut state = state();
        state.players[Seat::Second].power = 1;
        let template = KnowledgeTemplate::new(TemplateId::new(5), "Siphon", 2, EffectTag::DRAIN)
            .with_magnitude(2);

        DrainEffect.on_entry(&mut EffectContext::new(&mut state, Seat::First, &template));

        assert_eq!(state.players[Seat::Second].power, 0);
    }

    #[test]
    fn test_final_claims_victory_once() {
        let mut state = state();
        let template = KnowledgeTemplate::new(TemplateId::new(6), "Last Word", 6, EffectTag::FINAL);

        FinalEffect.on_complete(&mut EffectContext::new(&mut state, Seat::Second, &template));
        FinalEffect.on_complete(&mut EffectContext::new(&mut state, Seat::First, &template));

        assert_eq!(state.winner, Some(PlayerId::new("bob")));
        assert_eq!(state.phase, Phase::End);
    }

    #[test]
    fn test_strike_damage_is_magnitude() {
        let template = KnowledgeTemplate::new(TemplateId::new(2), "Lance", 3, EffectTag::STRIKE)
            .with_magnitude(6);
        assert_eq!(StrikeEffect.combat_damage(&template), 6);
        assert_eq!(MendEffect.combat_damage(&template), 0);
    }
}
