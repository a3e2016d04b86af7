use uuid::Uuid;

use crate::error::EngineError;
use crate::game::action::Action;
use crate::game::state::{GameConfig, GameState, TurnPhase};
use crate::players::BasePlayer;
use crate::types::Color;

/// Safety valve for bot games that stall without a winner.
pub const TURN_LIMIT: u32 = 1000;

/// One running game plus its identity. Drivers either call
/// `state.apply` themselves or hand the loop to `play`/`play_turns`.
pub struct Game {
    pub id: Uuid,
    pub state: GameState,
}

impl Game {
    pub fn new(config: GameConfig) -> Result<Self, EngineError> {
        Ok(Self {
            id: Uuid::new_v4(),
            state: GameState::new(config)?,
        })
    }

    pub fn from_state(state: GameState) -> Self {
        Self {
            id: Uuid::new_v4(),
            state,
        }
    }

    /// Let the current actor take one action. Returns the action taken, or
    /// `None` when the game is over or the actor passed.
    pub fn play_tick<P: BasePlayer>(&mut self, players: &[P]) -> Option<Action> {
        if self.winner().is_some() {
            return None;
        }
        let current = self.state.current_player;
        let actor = players.get(current)?;
        let actions = self.state.legal_actions();
        if actions.is_empty() {
            return None;
        }
        let action = actor.decide(self, &actions)?;
        match self.state.apply(current, action.clone()) {
            Ok(_) => Some(action),
            Err(_) => None,
        }
    }

    /// Drive bots until someone wins or the turn limit trips.
    pub fn play<P: BasePlayer>(&mut self, players: &[P]) -> Option<Color> {
        while self.winner().is_none() && self.state.turn < TURN_LIMIT {
            if self.play_tick(players).is_none() {
                break;
            }
        }
        self.winner()
    }

    /// Advance at most `turns` full turns with bot control; the `autoplay`
    /// surface. Returns how many turns actually elapsed.
    pub fn play_turns<P: BasePlayer>(&mut self, players: &[P], turns: u32) -> u32 {
        let start = self.state.turn;
        let target = start.saturating_add(turns).min(TURN_LIMIT);
        while self.winner().is_none() && self.state.turn < target {
            if self.play_tick(players).is_none() {
                break;
            }
        }
        self.state.turn - start
    }

    pub fn winner(&self) -> Option<Color> {
        match self.state.phase {
            TurnPhase::GameOver {
                winner: Some(winner),
            } => self.state.players.get(winner).map(|p| p.color),
            _ => None,
        }
    }
}
