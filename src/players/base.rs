use crate::game::action::Action;
use crate::game::game::Game;

/// A decision source for one seat: pick among the engine's legal actions.
pub trait BasePlayer {
    fn decide(&self, game: &Game, actions: &[Action]) -> Option<Action>;
}
