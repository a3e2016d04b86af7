//! Shared helpers for the integration tests.
#![allow(dead_code)]

use hexhaven::game::{Action, GameConfig, GameState, ResourceBundle, TurnPhase};
use hexhaven::types::Resource;

pub fn new_game(num_players: usize, seed: u64) -> GameState {
    GameState::new(GameConfig {
        num_players,
        seed,
        ..GameConfig::default()
    })
    .expect("default config is valid")
}

/// Drive the setup phase to completion with the first legal placement at
/// every step.
pub fn complete_setup(game: &mut GameState) {
    let mut guard = 0;
    while matches!(game.phase, TurnPhase::Setup(_)) {
        assert!(guard < 100, "setup should finish within 100 placements");
        let player = game.current_player;
        let action = game
            .legal_actions()
            .into_iter()
            .next()
            .expect("setup always offers a placement");
        game.apply(player, action).expect("legal placement applies");
        guard += 1;
    }
    assert!(matches!(game.phase, TurnPhase::Roll));
}

/// Roll pinned dice for the current player and close the trade window,
/// leaving the game in the build phase.
pub fn advance_to_build(game: &mut GameState, dice: (u8, u8)) {
    assert_ne!(dice.0 + dice.1, 7, "helper is for production rolls only");
    let player = game.current_player;
    game.apply(player, Action::RollDice { dice: Some(dice) })
        .expect("roll applies");
    game.apply(player, Action::FinishTrading)
        .expect("trade window closes");
}

/// End the current player's turn from the trade or build phase.
pub fn end_turn(game: &mut GameState) {
    let player = game.current_player;
    game.apply(player, Action::EndTurn).expect("turn ends");
}

/// Move cards from the bank to a player, preserving the conservation law.
pub fn grant(game: &mut GameState, player: usize, bundle: ResourceBundle) {
    game.bank.dispense(&bundle).expect("bank covers the grant");
    game.players[player].gain(&bundle);
}

/// Return a player's whole hand to the bank.
pub fn clear_hand(game: &mut GameState, player: usize) {
    let hand = game.players[player].resources;
    game.bank.receive(&hand);
    game.players[player]
        .spend(&hand)
        .expect("a hand covers itself");
}

pub fn assert_conservation(game: &GameState) {
    for resource in Resource::ALL {
        assert_eq!(
            game.total_resources_in_play(resource),
            19,
            "conservation violated for {resource}"
        );
    }
}
