use crate::game::action::Action;
use crate::game::game::Game;
use crate::game::resources::{
    ResourceBundle, CITY_COST, DEV_CARD_COST, ROAD_COST, SETTLEMENT_COST,
};
use crate::players::BasePlayer;
use crate::types::Resource;

/// A deterministic build-first heuristic: upgrade to cities, then expand,
/// then draw cards, trading with the bank toward whatever the cheapest
/// unmet build is missing.
#[derive(Clone, Default)]
pub struct GreedyPlayer;

impl BasePlayer for GreedyPlayer {
    fn decide(&self, game: &Game, actions: &[Action]) -> Option<Action> {
        let player = game.state.current_player;
        let hand = game.state.players.get(player)?.resources;
        let wanted = missing_for_next_target(&hand);

        let mut best: Option<(&Action, i32)> = None;
        for action in actions {
            let score = score_action(action, &wanted);
            if score < 0 {
                continue;
            }
            match best {
                Some((_, current)) if current >= score => {}
                _ => best = Some((action, score)),
            }
        }
        best.map(|(action, _)| action.clone())
    }
}

fn score_action(action: &Action, wanted: &[Resource]) -> i32 {
    match action {
        Action::BuildCity { .. } => 90,
        Action::BuildSettlement { .. } => 80,
        Action::PlayDevelopmentCard { .. } => 70,
        Action::BuildRoad { .. } => 60,
        Action::BuyDevelopmentCard => 50,
        Action::BankTrade { receive, .. } => {
            if wanted.contains(receive) {
                40
            } else {
                -1
            }
        }
        Action::MoveRobber { victim: Some(_), .. } => 30,
        Action::MoveRobber { victim: None, .. } => 20,
        Action::DiscardResources { .. } | Action::RollDice { .. } => 10,
        Action::FinishTrading => 5,
        Action::EndTurn => 0,
        // Player trades need a negotiating driver; the bot never offers.
        Action::PlayerTrade { .. } => -1,
    }
}

/// What the hand still lacks for the most valuable build it cannot yet
/// afford, in city > settlement > road > card order.
fn missing_for_next_target(hand: &ResourceBundle) -> Vec<Resource> {
    for target in [&CITY_COST, &SETTLEMENT_COST, &ROAD_COST, &DEV_CARD_COST] {
        if hand.covers(target) {
            continue;
        }
        return target
            .iter_nonzero()
            .filter(|&(resource, need)| hand.get(resource) < need)
            .map(|(resource, _)| resource)
            .collect();
    }
    Vec::new()
}
