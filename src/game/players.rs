use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::board::{EdgeId, VertexId};
use crate::game::resources::{ResourceBundle, ResourceError};
use crate::types::{Color, DevelopmentCard};

// Piece pools per player. Remaining counts are derived from the placed sets.
pub const MAX_ROADS: usize = 15;
pub const MAX_SETTLEMENTS: usize = 5;
pub const MAX_CITIES: usize = 4;

/// A development card in a player's hand. The purchase turn enforces the
/// cannot-play-on-the-turn-it-was-bought rule per card instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevCard {
    pub kind: DevelopmentCard,
    pub bought_on_turn: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub color: Color,
    pub resources: ResourceBundle,
    pub dev_cards: Vec<DevCard>,
    pub roads: BTreeSet<EdgeId>,
    pub settlements: BTreeSet<VertexId>,
    pub cities: BTreeSet<VertexId>,
    pub knights_played: u8,
    pub played_dev_card_this_turn: bool,
}

impl PlayerState {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            resources: ResourceBundle::empty(),
            dev_cards: Vec::new(),
            roads: BTreeSet::new(),
            settlements: BTreeSet::new(),
            cities: BTreeSet::new(),
            knights_played: 0,
            played_dev_card_this_turn: false,
        }
    }

    pub fn gain(&mut self, bundle: &ResourceBundle) {
        self.resources.add_bundle(bundle);
    }

    pub fn spend(&mut self, bundle: &ResourceBundle) -> Result<(), ResourceError> {
        self.resources.subtract_bundle(bundle)
    }

    pub fn hand_size(&self) -> u32 {
        self.resources.total()
    }

    pub fn roads_remaining(&self) -> usize {
        MAX_ROADS - self.roads.len()
    }

    pub fn settlements_remaining(&self) -> usize {
        MAX_SETTLEMENTS - self.settlements.len()
    }

    pub fn cities_remaining(&self) -> usize {
        MAX_CITIES - self.cities.len()
    }

    pub fn owns_building(&self, vertex: VertexId) -> bool {
        self.settlements.contains(&vertex) || self.cities.contains(&vertex)
    }

    pub fn add_dev_card(&mut self, kind: DevelopmentCard, bought_on_turn: u32) {
        self.dev_cards.push(DevCard {
            kind,
            bought_on_turn,
        });
    }

    /// Victory-point cards are revealed as soon as they are drawn.
    pub fn victory_card_count(&self) -> u8 {
        self.dev_cards
            .iter()
            .filter(|card| card.kind == DevelopmentCard::VictoryPoint)
            .count() as u8
    }

    pub fn record_dev_card_play(&mut self, kind: DevelopmentCard) {
        if kind == DevelopmentCard::Knight {
            self.knights_played += 1;
        }
        self.played_dev_card_this_turn = true;
    }

    pub fn reset_for_new_turn(&mut self) {
        self.played_dev_card_this_turn = false;
    }
}
