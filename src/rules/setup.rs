//! Match setup and the initial deal.
//!
//! The deal is a pure function of the setup, the catalog and the seed. The
//! default seed comes from the match id, so two clients that both find the
//! record missing compute the same initial state and whichever write lands
//! last changes nothing.

use im::Vector;

use crate::cards::{KnowledgeInstance, KnowledgeRegistry};
use crate::core::{
    Creature, CreatureId, GameRng, MatchConfig, MatchId, MatchState, Phase, PlayerId, PlayerState,
    Seat, Seats, TemplateId, InstanceId, CREATURES_PER_PLAYER,
};

/// A creature a player brings to the match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatureSpec {
    pub name: String,
    pub wisdom: u32,
}

impl CreatureSpec {
    pub fn new(name: impl Into<String>, wisdom: u32) -> Self {
        Self {
            name: name.into(),
            wisdom,
        }
    }
}

/// One seat's participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerSetup {
    pub id: PlayerId,
    pub creatures: [CreatureSpec; CREATURES_PER_PLAYER],
}

impl PlayerSetup {
    pub fn new(id: PlayerId, creatures: [CreatureSpec; CREATURES_PER_PLAYER]) -> Self {
        Self { id, creatures }
    }

    /// A player with the starter creatures.
    pub fn standard(id: PlayerId) -> Self {
        Self::new(
            id,
            [
                CreatureSpec::new("Fox", 2),
                CreatureSpec::new("Owl", 4),
                CreatureSpec::new("Tortoise", 6),
            ],
        )
    }
}

/// Everything needed to deal a match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchSetup {
    pub match_id: MatchId,
    pub players: Seats<PlayerSetup>,
    pub seed: u64,
}

impl MatchSetup {
    /// Seat 0 moves first. The seed defaults to one derived from the match id.
    pub fn new(match_id: MatchId, first: PlayerSetup, second: PlayerSetup) -> Self {
        let seed = GameRng::seed_for(&match_id);
        Self {
            match_id,
            players: Seats::from_array([first, second]),
            seed,
        }
    }

    /// Two players with the starter creatures.
    pub fn standard(match_id: MatchId, first: PlayerId, second: PlayerId) -> Self {
        Self::new(match_id, PlayerSetup::standard(first), PlayerSetup::standard(second))
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Deal the initial state.
    ///
    /// The deck holds `copies_per_template` copies of every catalog entry in
    /// shuffled order. Hands are dealt first (seat 0 then seat 1), then the
    /// market; what is left stays in the deck as template ids.
    #[must_use]
    pub fn deal(&self, config: &MatchConfig, catalog: &KnowledgeRegistry) -> MatchState {
        let mut rng = GameRng::new(self.seed);
        let mut deck: Vec<TemplateId> = catalog
            .ids()
            .into_iter()
            .flat_map(|id| std::iter::repeat(id).take(config.copies_per_template))
            .collect();
        rng.shuffle(&mut deck);
        let mut deck: Vector<TemplateId> = deck.into_iter().collect();
        let mut next_id = InstanceId::new(0);

        let mut draw = |deck: &mut Vector<TemplateId>| -> Option<KnowledgeInstance> {
            let template = deck.pop_front().and_then(|id| catalog.get(id))?;
            let instance = KnowledgeInstance::mint(template, next_id);
            next_id = next_id.next();
            Some(instance)
        };

        let mut players = Seats::new(|seat| {
            let setup = &self.players[seat];
            let base = (seat.index() * CREATURES_PER_PLAYER) as u32 + 1;
            let creatures = setup.creatures.iter().enumerate().map(|(i, spec)| {
                Creature::new(CreatureId::new(base + i as u32), setup.id.clone(), spec.name.clone(), spec.wisdom)
            });
            PlayerState::new(setup.id.clone(), config.starting_power, creatures)
        });

        let hand_size = config.starting_hand_size.min(config.hand_limit);
        for seat in Seat::BOTH {
            for _ in 0..hand_size {
                if let Some(card) = draw(&mut deck) {
                    players[seat].hand.push(card);
                }
            }
        }

        let market: Vec<KnowledgeInstance> =
            (0..config.market_size).filter_map(|_| draw(&mut deck)).collect();

        let mut log = Vector::new();
        log.push_back(format!(
            "Match {} begins: {} vs {}",
            self.match_id, players[Seat::First].id, players[Seat::Second].id
        ));

        MatchState {
            match_id: self.match_id.clone(),
            players,
            market,
            deck,
            turn: 1,
            current_player_index: Seat::First,
            phase: Phase::Knowledge,
            actions_taken_this_turn: 0,
            actions_per_turn: config.actions_per_turn,
            winner: None,
            log,
            next_instance_id: next_id,
            seed: self.seed,
        }
    }
}
