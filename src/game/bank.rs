use rand::seq::SliceRandom;

use crate::game::resources::{ResourceBundle, ResourceError};
use crate::types::{DevelopmentCard, Resource};

/// Starting stock of each resource in the bank.
pub const BANK_STOCK_PER_RESOURCE: u8 = 19;

/// The shared resource pool and the development-card draw pile. The pile is
/// shuffled once at game start and only ever popped after that.
#[derive(Debug, Clone)]
pub struct Bank {
    resources: ResourceBundle,
    development_deck: Vec<DevelopmentCard>,
}

impl Bank {
    pub fn standard(rng: &mut impl rand::Rng) -> Self {
        let mut deck = build_development_deck();
        deck.shuffle(rng);
        Self {
            resources: ResourceBundle::from_counts([BANK_STOCK_PER_RESOURCE; 5]),
            development_deck: deck,
        }
    }

    /// Rebuild a bank from persisted stock and remaining deck order.
    pub fn restore(resources: ResourceBundle, development_deck: Vec<DevelopmentCard>) -> Self {
        Self {
            resources,
            development_deck,
        }
    }

    pub fn stock(&self) -> &ResourceBundle {
        &self.resources
    }

    pub fn available(&self, resource: Resource) -> u8 {
        self.resources.get(resource)
    }

    pub fn receive(&mut self, bundle: &ResourceBundle) {
        self.resources.add_bundle(bundle);
    }

    pub fn dispense(&mut self, bundle: &ResourceBundle) -> Result<(), ResourceError> {
        self.resources.subtract_bundle(bundle)
    }

    pub fn draw_development_card(&mut self) -> Option<DevelopmentCard> {
        self.development_deck.pop()
    }

    pub fn development_deck(&self) -> &[DevelopmentCard] {
        &self.development_deck
    }

    pub fn development_deck_len(&self) -> usize {
        self.development_deck.len()
    }
}

fn build_development_deck() -> Vec<DevelopmentCard> {
    use DevelopmentCard::*;
    const DISTRIBUTION: &[(DevelopmentCard, usize)] = &[
        (Knight, 14),
        (VictoryPoint, 5),
        (RoadBuilding, 2),
        (YearOfPlenty, 2),
        (Monopoly, 2),
    ];

    let mut deck = Vec::with_capacity(25);
    for (card, count) in DISTRIBUTION {
        deck.extend(std::iter::repeat(*card).take(*count));
    }
    deck
}
