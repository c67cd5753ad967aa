//! The match state machine.
//!
//! `MatchRules` bundles everything the reducer consults (rule constants,
//! knowledge catalog, effect handlers, combat resolver) and exposes:
//!
//! - `validate`: is this action legal right now?
//! - `reduce`: the next state, assuming the action is legal
//! - `apply`: both, in that order
//! - `legal_actions`: every legal action for a seat
//!
//! `reduce` is pure. It never reads a clock or draws randomness, so the same
//! state and action always produce the same next state on every client.

use crate::cards::{KnowledgeInstance, KnowledgeRegistry};
use crate::core::{
    Action, ActionKind, CreatureId, InstanceId, MatchConfig, MatchState, Phase, Seat, TemplateId,
    FULL_ROTATION, READY_ROTATION, ROTATION_STEP,
};
use crate::effects::{CombatResolver, DefaultCombat, EffectContext, EffectRegistry};

use super::error::ValidationError;
use super::setup::MatchSetup;

/// Rules of a match.
///
/// ## Example
///
/// ```
/// use ccg_duel::core::{Action, MatchId, Phase, PlayerId};
/// use ccg_duel::rules::{MatchRules, MatchSetup};
///
/// let rules = MatchRules::standard();
/// let alice = PlayerId::new("alice");
/// let state = rules.deal(&MatchSetup::standard(MatchId::new("m-1"), alice.clone(), PlayerId::new("bob")));
///
/// let next = rules.apply(&state, &Action::resolve_knowledge(alice)).unwrap();
/// assert_eq!(next.phase, Phase::Action);
/// ```
pub struct MatchRules {
    config: MatchConfig,
    knowledge: KnowledgeRegistry,
    effects: EffectRegistry,
    combat: Box<dyn CombatResolver>,
}

impl MatchRules {
    /// Create rules with the default combat resolver.
    #[must_use]
    pub fn new(config: MatchConfig, knowledge: KnowledgeRegistry, effects: EffectRegistry) -> Self {
        Self {
            config,
            knowledge,
            effects,
            combat: Box::new(DefaultCombat),
        }
    }

    /// Default constants, the starter catalog and the built-in effects.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(
            MatchConfig::default(),
            KnowledgeRegistry::standard(),
            EffectRegistry::standard(),
        )
    }

    /// Replace the combat resolver (builder pattern).
    #[must_use]
    pub fn with_combat(mut self, combat: impl CombatResolver + 'static) -> Self {
        self.combat = Box::new(combat);
        self
    }

    #[must_use]
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    #[must_use]
    pub fn knowledge(&self) -> &KnowledgeRegistry {
        &self.knowledge
    }

    #[must_use]
    pub fn effects(&self) -> &EffectRegistry {
        &self.effects
    }

    /// Deal the initial state for a setup.
    #[must_use]
    pub fn deal(&self, setup: &MatchSetup) -> MatchState {
        setup.deal(&self.config, &self.knowledge)
    }

    // === Validation ===

    /// Check an action against the current state.
    pub fn validate(&self, state: &MatchState, action: &Action) -> Result<(), ValidationError> {
        let kind = action.kind();
        let Some(player) = action.player() else {
            return Err(ValidationError::NotAPlayerMove);
        };

        if state.is_finished() {
            return Err(ValidationError::MatchFinished);
        }

        let seat = state
            .seat_of(player)
            .ok_or_else(|| ValidationError::UnknownPlayer(player.clone()))?;
        if seat != state.current_player_index {
            return Err(ValidationError::NotYourTurn(player.clone()));
        }

        if let Some(expected) = kind.required_phase() {
            if state.phase != expected {
                return Err(ValidationError::WrongPhase {
                    action: kind,
                    expected,
                    actual: state.phase,
                });
            }
        }

        if kind.consumes_action() && state.actions_taken_this_turn >= state.actions_per_turn {
            return Err(ValidationError::ActionBudgetExhausted {
                budget: state.actions_per_turn,
            });
        }

        match action {
            Action::RotateCreature { creature_id, .. } => {
                self.owned_creature(state, seat, *creature_id)?;
                Ok(())
            }
            Action::SummonKnowledge {
                knowledge_id,
                instance_id,
                creature_id,
                ..
            } => self.validate_summon(state, seat, *knowledge_id, *instance_id, *creature_id),
            Action::DrawKnowledge {
                knowledge_id,
                instance_id,
                ..
            } => {
                if !state.market.iter().any(|k| k.matches(*knowledge_id, *instance_id)) {
                    return Err(ValidationError::NotInMarket(*instance_id));
                }
                if state.players[seat].hand.len() >= self.config.hand_limit {
                    return Err(ValidationError::HandFull {
                        limit: self.config.hand_limit,
                    });
                }
                Ok(())
            }
            Action::ResolveKnowledge { .. } | Action::EndTurn { .. } => Ok(()),
            Action::SetState { .. } => Err(ValidationError::NotAPlayerMove),
        }
    }

    /// `validate(..).is_ok()`.
    #[must_use]
    pub fn is_valid_action(&self, state: &MatchState, action: &Action) -> bool {
        self.validate(state, action).is_ok()
    }

    fn owned_creature(
        &self,
        state: &MatchState,
        seat: Seat,
        creature_id: CreatureId,
    ) -> Result<usize, ValidationError> {
        if let Some(index) = state.players[seat].creature_index(creature_id) {
            return Ok(index);
        }
        let opponent = &state.players[seat.other()];
        if opponent.creature_index(creature_id).is_some() {
            return Err(ValidationError::NotOwner {
                creature: creature_id,
                owner: opponent.id.clone(),
            });
        }
        Err(ValidationError::CreatureNotFound(creature_id))
    }

    fn validate_summon(
        &self,
        state: &MatchState,
        seat: Seat,
        knowledge_id: TemplateId,
        instance_id: InstanceId,
        creature_id: CreatureId,
    ) -> Result<(), ValidationError> {
        let player = &state.players[seat];
        let hand_index = player
            .hand_index(knowledge_id, instance_id)
            .ok_or(ValidationError::KnowledgeNotInHand(instance_id))?;
        let index = self.owned_creature(state, seat, creature_id)?;

        if player.field[index].knowledge.is_some() {
            return Err(ValidationError::SlotOccupied(creature_id));
        }

        let wisdom = player.creatures[index].wisdom;
        let cost = player.hand[hand_index].cost;
        if wisdom < cost {
            return Err(ValidationError::InsufficientWisdom { wisdom, cost });
        }
        Ok(())
    }

    // === Reduction ===

    /// Compute the state after a legal action.
    ///
    /// The action must have passed `validate`; callers reject invalid
    /// actions before reaching here. A finished match is returned unchanged.
    /// `SetState` yields its snapshot.
    #[must_use]
    pub fn reduce(&self, state: &MatchState, action: &Action) -> MatchState {
        if state.is_finished() {
            return state.clone();
        }
        if let Action::SetState { snapshot } = action {
            return snapshot.as_ref().clone();
        }
        let Some(seat) = action.player().and_then(|p| state.seat_of(p)) else {
            return state.clone();
        };

        let mut next = state.clone();
        match action {
            Action::RotateCreature { creature_id, .. } => {
                self.rotate(&mut next, seat, *creature_id);
            }
            Action::SummonKnowledge {
                knowledge_id,
                instance_id,
                creature_id,
                ..
            } => {
                self.summon(&mut next, seat, *knowledge_id, *instance_id, *creature_id);
            }
            Action::DrawKnowledge {
                knowledge_id,
                instance_id,
                ..
            } => {
                self.draw(&mut next, seat, *knowledge_id, *instance_id);
            }
            Action::ResolveKnowledge { .. } => self.resolve_knowledge(&mut next, seat),
            Action::EndTurn { .. } => Self::end_turn(&mut next, seat),
            Action::SetState { .. } => {}
        }

        if action.kind().consumes_action() {
            next.actions_taken_this_turn = next.actions_taken_this_turn.saturating_add(1);
        }
        Self::settle_winner(&mut next, seat);
        next
    }

    /// Validate, then reduce.
    pub fn apply(&self, state: &MatchState, action: &Action) -> Result<MatchState, ValidationError> {
        self.validate(state, action)?;
        Ok(self.reduce(state, action))
    }

    fn rotate(&self, next: &mut MatchState, seat: Seat, creature_id: CreatureId) {
        let player = &mut next.players[seat];
        let Some(index) = player.creature_index(creature_id) else {
            return;
        };
        let creature = &mut player.creatures[index];
        creature.rotation = (creature.rotation + ROTATION_STEP) % FULL_ROTATION;
        let line = format!("{} rotates {} to {}", player.id, creature.name, creature.rotation);
        let ready = creature.rotation == READY_ROTATION;
        next.push_log(line);

        if ready {
            self.attack(next, seat, index);
        }
    }

    /// The creature in `index` attacks the mirrored slot of the opponent.
    fn attack(&self, next: &mut MatchState, seat: Seat, index: usize) {
        let attacker = &next.players[seat];
        let Some(knowledge) = attacker.field[index].knowledge.as_ref() else {
            return;
        };
        let Some(template) = self.knowledge.get(knowledge.template_id) else {
            return;
        };
        let raw = self
            .effects
            .get(&template.effect)
            .map_or(0, |handler| handler.combat_damage(template));
        let attacker_wisdom = attacker.creatures[index].wisdom;

        let defender_seat = seat.other();
        let defender_wisdom = next.players[defender_seat].creatures.get(index).map(|c| c.wisdom);
        let strike = self.combat.resolve(raw, attacker_wisdom, defender_wisdom);

        let defender = &mut next.players[defender_seat];
        defender.power = defender.power.saturating_sub(strike.damage());
        let line = strike.describe(&defender.id);
        next.push_log(line);
    }

    fn summon(
        &self,
        next: &mut MatchState,
        seat: Seat,
        knowledge_id: TemplateId,
        instance_id: InstanceId,
        creature_id: CreatureId,
    ) {
        let player = &mut next.players[seat];
        let (Some(hand_index), Some(index)) = (
            player.hand_index(knowledge_id, instance_id),
            player.creature_index(creature_id),
        ) else {
            return;
        };

        let mut card = player.hand.remove(hand_index);
        card.rotation = 0;
        player.field[index].knowledge = Some(card);
        let Some(template) = self.knowledge.get(knowledge_id) else {
            return;
        };
        let line = format!(
            "{} summons {} onto {}",
            player.id, template.name, player.creatures[index].name
        );
        next.push_log(line);

        if let Some(handler) = self.effects.get(&template.effect) {
            handler.on_entry(&mut EffectContext::new(next, seat, template));
        }
    }

    fn draw(&self, next: &mut MatchState, seat: Seat, knowledge_id: TemplateId, instance_id: InstanceId) {
        let Some(position) = next.market.iter().position(|k| k.matches(knowledge_id, instance_id)) else {
            return;
        };
        let card = next.market.remove(position);

        if let Some(template) = next.deck.pop_front().and_then(|id| self.knowledge.get(id)) {
            let fresh = KnowledgeInstance::mint(template, next.mint_instance_id());
            next.market.insert(position, fresh);
        }

        let name = self
            .knowledge
            .get(knowledge_id)
            .map_or_else(|| knowledge_id.to_string(), |t| t.name.clone());
        let player = &mut next.players[seat];
        player.hand.push(card);
        let line = format!("{} draws {}", player.id, name);
        next.push_log(line);
    }

    /// Rotate every knowledge on the actor's field and run its hooks.
    fn resolve_knowledge(&self, next: &mut MatchState, seat: Seat) {
        for index in 0..next.players[seat].field.len() {
            if next.is_finished() {
                break;
            }
            let Some(card) = next.players[seat].field[index].knowledge.as_mut() else {
                continue;
            };
            card.rotation += ROTATION_STEP;
            let rotation = card.rotation;
            let Some(template) = self.knowledge.get(card.template_id) else {
                continue;
            };
            let handler = self.effects.get(&template.effect);

            if rotation >= template.lifetime.min(FULL_ROTATION) {
                if let Some(handler) = handler {
                    handler.on_complete(&mut EffectContext::new(next, seat, template));
                }
                next.players[seat].field[index].knowledge = None;
                let line = format!("{}'s {} is spent", next.players[seat].id, template.name);
                next.push_log(line);
            } else if let Some(handler) = handler {
                handler.on_tick(&mut EffectContext::new(next, seat, template));
            }
        }

        if !next.is_finished() {
            next.phase = Phase::Action;
        }
        let line = format!("{} resolves knowledge", next.players[seat].id);
        next.push_log(line);
    }

    fn end_turn(next: &mut MatchState, seat: Seat) {
        let line = format!("{} ends turn {}", next.players[seat].id, next.turn);
        next.push_log(line);

        next.actions_taken_this_turn = 0;
        next.current_player_index = seat.other();
        if next.current_player_index == Seat::First {
            next.turn += 1;
        }
        next.phase = Phase::Knowledge;
    }

    /// Decide the winner after a reduction by `actor`.
    ///
    /// Effects may already have named one. Otherwise a player at 0 power is
    /// eliminated; if both are, the actor wins.
    fn settle_winner(next: &mut MatchState, actor: Seat) {
        if next.winner.is_none() {
            let first_out = next.players[Seat::First].is_eliminated();
            let second_out = next.players[Seat::Second].is_eliminated();
            let winner = match (first_out, second_out) {
                (true, true) => Some(actor),
                (true, false) => Some(Seat::Second),
                (false, true) => Some(Seat::First),
                (false, false) => None,
            };
            next.winner = winner.map(|seat| next.players[seat].id.clone());
        }

        if let Some(winner) = next.winner.clone() {
            next.phase = Phase::End;
            next.push_log(format!("{winner} wins the match"));
        }
    }

    // === Enumeration ===

    /// Every legal action for a seat, `EndTurn` last.
    #[must_use]
    pub fn legal_actions(&self, state: &MatchState, seat: Seat) -> Vec<Action> {
        if state.is_finished() || seat != state.current_player_index {
            return Vec::new();
        }
        let player = &state.players[seat];
        let actor = player.id.clone();

        match state.phase {
            Phase::Knowledge => vec![Action::resolve_knowledge(actor)],
            Phase::End => Vec::new(),
            Phase::Action => {
                let mut actions = Vec::new();

                if state.actions_remaining() > 0 {
                    for creature in &player.creatures {
                        actions.push(Action::rotate(actor.clone(), creature.id));
                    }

                    for card in &player.hand {
                        for (creature, slot) in player.creatures.iter().zip(&player.field) {
                            if slot.knowledge.is_none() && creature.wisdom >= card.cost {
                                actions.push(Action::summon(
                                    actor.clone(),
                                    card.template_id,
                                    card.instance_id,
                                    creature.id,
                                ));
                            }
                        }
                    }

                    if player.hand.len() < self.config.hand_limit {
                        for card in &state.market {
                            actions.push(Action::draw(actor.clone(), card.template_id, card.instance_id));
                        }
                    }
                }

                actions.push(Action::end_turn(actor));
                actions
            }
        }
    }

    /// Legal action kinds for a seat, without payloads.
    #[must_use]
    pub fn legal_kinds(&self, state: &MatchState, seat: Seat) -> Vec<ActionKind> {
        let mut kinds: Vec<ActionKind> = self
            .legal_actions(state, seat)
            .iter()
            .map(Action::kind)
            .collect();
        kinds.dedup();
        kinds
    }
}

impl std::fmt::Debug for MatchRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchRules")
            .field("config", &self.config)
            .field("knowledge", &self.knowledge.len())
            .field("effects", &self.effects)
            .finish_non_exhaustive()
    }
}
