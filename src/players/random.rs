use rand::seq::SliceRandom;

use crate::game::action::Action;
use crate::game::game::Game;
use crate::players::BasePlayer;

/// Picks uniformly among the legal actions.
#[derive(Clone, Default)]
pub struct RandomPlayer;

impl BasePlayer for RandomPlayer {
    fn decide(&self, _game: &Game, actions: &[Action]) -> Option<Action> {
        let mut rng = rand::thread_rng();
        actions.choose(&mut rng).cloned()
    }
}
