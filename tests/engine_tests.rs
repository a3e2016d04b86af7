//! Engine flows: setup, production, discards, robbery, trading, building,
//! development cards, scoring and victory.

mod common;

use common::*;

use hexhaven::board::{EdgeId, VertexId};
use hexhaven::error::{EngineError, PlacementError};
use hexhaven::game::{
    Action, DevCard, DevCardPlay, Game, GameConfig, GameEvent, GameState, ResourceBundle,
    TurnPhase, ROAD_COST,
};
use hexhaven::players::GreedyPlayer;
use hexhaven::types::{BuildingKind, DevelopmentCard, Resource};

#[test]
fn bad_configs_produce_no_game() {
    for num_players in [0, 1, 5] {
        let result = GameState::new(GameConfig {
            num_players,
            ..GameConfig::default()
        });
        assert!(matches!(result, Err(EngineError::ConfigError(_))));
    }
    let result = GameState::new(GameConfig {
        vps_to_win: 2,
        ..GameConfig::default()
    });
    assert!(matches!(result, Err(EngineError::ConfigError(_))));
}

#[test]
fn setup_runs_serpentine_and_hands_over_to_roll() {
    let mut game = new_game(4, 11);

    let mut actors = Vec::new();
    while matches!(game.phase, TurnPhase::Setup(_)) {
        actors.push(game.current_player);
        let player = game.current_player;
        let action = game.legal_actions().into_iter().next().expect("placement");
        game.apply(player, action).expect("placement applies");
    }
    let expected: Vec<usize> = vec![0, 0, 1, 1, 2, 2, 3, 3, 3, 3, 2, 2, 1, 1, 0, 0];
    assert_eq!(actors, expected);

    assert!(matches!(game.phase, TurnPhase::Roll));
    assert_eq!(game.current_player, 0);
    for (index, player) in game.players.iter().enumerate() {
        assert_eq!(player.settlements.len(), 2);
        assert_eq!(player.roads.len(), 2);
        assert_eq!(game.victory_points(index), 2);
    }
    assert_conservation(&game);
}

#[test]
fn out_of_turn_and_out_of_phase_actions_are_rejected() {
    let mut game = new_game(4, 11);
    complete_setup(&mut game);

    // Player 1 cannot act on player 0's turn.
    assert!(matches!(
        game.apply(1, Action::RollDice { dice: None }),
        Err(EngineError::IllegalAction(_))
    ));
    // Nothing but rolling is allowed before the roll.
    assert!(matches!(
        game.apply(0, Action::EndTurn),
        Err(EngineError::IllegalAction(_))
    ));
    assert!(matches!(
        game.apply(0, Action::BuyDevelopmentCard),
        Err(EngineError::IllegalAction(_))
    ));
    // A player index off the roster is rejected outright.
    assert!(matches!(
        game.apply(9, Action::RollDice { dice: None }),
        Err(EngineError::IllegalAction(_))
    ));
}

#[test]
fn pinned_roll_pays_every_adjacent_building_and_conserves() {
    let mut game = new_game(4, 5);
    complete_setup(&mut game);

    let hands_before: Vec<ResourceBundle> =
        game.players.iter().map(|p| p.resources).collect();
    let bank_before = *game.bank.stock();

    let roller = game.current_player;
    let events = game
        .apply(roller, Action::RollDice { dice: Some((2, 4)) })
        .expect("roll applies");
    assert!(matches!(game.phase, TurnPhase::Trade));
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::DiceRolled { sum: 6, .. })));

    // Recompute the expected payout independently: one card per adjacent
    // settlement of every un-robbed hex with token 6. The bank is near full
    // after setup, so the shortage rule cannot trigger here.
    let mut expected: Vec<ResourceBundle> =
        vec![ResourceBundle::empty(); game.players.len()];
    for hex in game.board.hexes() {
        if hex.token != Some(6) || hex.id == game.robber_hex {
            continue;
        }
        let resource = hex.resource.expect("tokened hex produces");
        for vertex in &hex.vertices {
            if let Some(building) = game.buildings.get(vertex) {
                expected[building.owner].add(resource, 1);
            }
        }
    }

    let mut paid_total = ResourceBundle::empty();
    for (index, player) in game.players.iter().enumerate() {
        let mut anticipated = hands_before[index];
        anticipated.add_bundle(&expected[index]);
        assert_eq!(player.resources, anticipated, "payout for player {index}");
        paid_total.add_bundle(&expected[index]);
    }
    let mut bank_after = bank_before;
    bank_after
        .subtract_bundle(&paid_total)
        .expect("bank covered the payout");
    assert_eq!(*game.bank.stock(), bank_after);
    assert_conservation(&game);
}

#[test]
fn rolled_seven_gates_everything_behind_the_discard() {
    let mut game = new_game(4, 11);
    complete_setup(&mut game);
    for player in 0..4 {
        clear_hand(&mut game, player);
    }
    // Eight cards puts player 0 over the limit; everyone else stays at zero.
    grant(&mut game, 0, ResourceBundle::from_counts([4, 4, 0, 0, 0]));

    let roller = game.current_player;
    let events = game
        .apply(roller, Action::RollDice { dice: Some((3, 4)) })
        .expect("roll applies");
    assert!(matches!(game.phase, TurnPhase::Discard));
    assert_eq!(game.current_player, 0);
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::DiscardRequired { player: 0, count: 4 })));

    // Main actions stay rejected until the discard resolves.
    assert!(matches!(
        game.apply(0, Action::EndTurn),
        Err(EngineError::IllegalAction(_))
    ));
    assert!(matches!(
        game.apply(0, Action::BuildRoad { edge: 0 }),
        Err(EngineError::IllegalAction(_))
    ));
    // A player who owes nothing cannot discard.
    assert!(matches!(
        game.apply(
            1,
            Action::DiscardResources {
                resources: ResourceBundle::empty()
            }
        ),
        Err(EngineError::IllegalAction(_))
    ));
    // Wrong count is rejected.
    assert!(matches!(
        game.apply(
            0,
            Action::DiscardResources {
                resources: ResourceBundle::from_counts([1, 0, 0, 0, 0])
            }
        ),
        Err(EngineError::IllegalAction(_))
    ));
    // Right count of cards the player does not hold is rejected.
    assert!(matches!(
        game.apply(
            0,
            Action::DiscardResources {
                resources: ResourceBundle::from_counts([0, 0, 4, 0, 0])
            }
        ),
        Err(EngineError::InsufficientResources(_))
    ));

    // The offered canonical bundle is half the hand and applies cleanly.
    let offered = game.legal_actions();
    let Some(Action::DiscardResources { resources }) = offered.first().cloned() else {
        panic!("discard phase offers a discard");
    };
    assert_eq!(resources.total(), 4);
    game.apply(0, Action::DiscardResources { resources })
        .expect("discard applies");
    assert_eq!(game.players[0].hand_size(), 4);

    // Discards done, the robber must move, and not back onto its hex.
    assert!(matches!(game.phase, TurnPhase::MoveRobber));
    assert_eq!(game.current_player, roller);
    assert!(matches!(
        game.apply(roller, Action::FinishTrading),
        Err(EngineError::IllegalAction(_))
    ));
    assert!(matches!(
        game.apply(
            roller,
            Action::MoveRobber {
                hex: game.robber_hex,
                victim: None
            }
        ),
        Err(EngineError::IllegalPlacement(PlacementError::RobberMustMove))
    ));

    let target = game
        .board
        .hexes()
        .iter()
        .find(|hex| hex.id != game.robber_hex)
        .expect("another hex exists")
        .id;
    game.apply(
        roller,
        Action::MoveRobber {
            hex: target,
            victim: None,
        },
    )
    .expect("robber moves");
    assert_eq!(game.robber_hex, target);
    assert!(matches!(game.phase, TurnPhase::Trade));
    assert_conservation(&game);
}

#[test]
fn robber_steals_one_random_card_from_the_victim() {
    let mut game = new_game(4, 11);
    complete_setup(&mut game);
    for player in 0..4 {
        clear_hand(&mut game, player);
    }
    grant(&mut game, 0, ResourceBundle::from_counts([4, 4, 0, 0, 0]));
    // Player 1 keeps a small hand so there is someone worth robbing.
    grant(&mut game, 1, ResourceBundle::from_counts([2, 2, 0, 0, 0]));

    let roller = game.current_player;
    game.apply(roller, Action::RollDice { dice: Some((3, 4)) })
        .expect("roll applies");
    let offered = game.legal_actions();
    let Some(Action::DiscardResources { resources }) = offered.first().cloned() else {
        panic!("discard offered");
    };
    game.apply(0, Action::DiscardResources { resources })
        .expect("discard applies");

    // Find a hex where some opponent of the roller owns a building and
    // still holds cards; only player 0 holds cards now.
    let candidate = game.board.hexes().iter().find_map(|hex| {
        if hex.id == game.robber_hex {
            return None;
        }
        hex.vertices.iter().find_map(|vertex| {
            game.buildings.get(vertex).and_then(|b| {
                (b.owner != roller && game.players[b.owner].hand_size() > 0)
                    .then_some((hex.id, b.owner))
            })
        })
    });
    let Some((target, victim)) = candidate else {
        // Nothing stealable on this seed; robbing without a victim is the
        // only legal shape then.
        return;
    };

    // An ineligible victim is rejected before anything moves.
    let uninvolved = (0..4)
        .find(|&p| p != roller && game.players[p].hand_size() == 0)
        .expect("someone has no cards");
    assert!(matches!(
        game.apply(
            roller,
            Action::MoveRobber {
                hex: target,
                victim: Some(uninvolved)
            }
        ),
        Err(EngineError::IllegalPlacement(PlacementError::InvalidVictim))
    ));

    let victim_before = game.players[victim].hand_size();
    let thief_before = game.players[roller].hand_size();
    let events = game
        .apply(
            roller,
            Action::MoveRobber {
                hex: target,
                victim: Some(victim),
            },
        )
        .expect("robbery applies");
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::RobberMoved { stolen: Some(_), .. })));
    assert_eq!(game.players[victim].hand_size(), victim_before - 1);
    assert_eq!(game.players[roller].hand_size(), thief_before + 1);
    assert_conservation(&game);
}

#[test]
fn settlement_respects_the_distance_rule_without_mutating_state() {
    let mut game = new_game(4, 3);

    // Player 0 places the first settlement and road.
    let first = game.legal_actions().into_iter().next().expect("placement");
    let Action::BuildSettlement { vertex: occupied } = first.clone() else {
        panic!("setup starts with a settlement");
    };
    game.apply(0, first).expect("settlement places");
    let road = game.legal_actions().into_iter().next().expect("road");
    game.apply(0, road).expect("road places");

    // Player 1 may neither reuse the vertex nor settle next door.
    let neighbor = game
        .board
        .vertex(occupied)
        .expect("vertex exists")
        .neighbors[0];
    assert!(game.is_vertex_free(neighbor));
    assert!(!game.is_vertex_legal_for_settlement(1, neighbor));

    let before = game.to_snapshot();
    assert!(matches!(
        game.apply(1, Action::BuildSettlement { vertex: neighbor }),
        Err(EngineError::IllegalPlacement(
            PlacementError::TooCloseToBuilding
        ))
    ));
    assert_eq!(game.to_snapshot(), before, "failed action left a trace");

    assert!(matches!(
        game.apply(1, Action::BuildSettlement { vertex: occupied }),
        Err(EngineError::IllegalPlacement(PlacementError::VertexOccupied(
            _
        )))
    ));
    assert_eq!(game.to_snapshot(), before, "failed action left a trace");
}

/// A simple path of `length` free edges starting at `start`, avoiding
/// vertices that carry buildings or touch existing roads, so each placed
/// edge extends the owner's longest path by exactly one. With `clean_end`
/// the final vertex must also satisfy the settlement distance rule.
fn find_isolated_chain(
    game: &GameState,
    start: VertexId,
    length: usize,
    clean_end: bool,
) -> Option<Vec<EdgeId>> {
    fn extend(
        game: &GameState,
        current: VertexId,
        length: usize,
        clean_end: bool,
        path: &mut Vec<EdgeId>,
        visited: &mut Vec<VertexId>,
    ) -> bool {
        if path.len() == length {
            if !clean_end {
                return true;
            }
            let neighbors = &game.board.vertex(current).expect("vertex exists").neighbors;
            return !game.buildings.contains_key(&current)
                && neighbors
                    .iter()
                    .all(|neighbor| !game.buildings.contains_key(neighbor));
        }
        let Some(vertex) = game.board.vertex(current) else {
            return false;
        };
        for &edge_id in &vertex.edges {
            if path.contains(&edge_id) || game.road_owners.contains_key(&edge_id) {
                continue;
            }
            let next = game
                .board
                .edge(edge_id)
                .expect("edge exists")
                .other_endpoint(current);
            if visited.contains(&next) || game.buildings.contains_key(&next) {
                continue;
            }
            let next_touches_road = game
                .board
                .vertex(next)
                .expect("vertex exists")
                .edges
                .iter()
                .any(|e| game.road_owners.contains_key(e));
            if next_touches_road {
                continue;
            }
            path.push(edge_id);
            visited.push(next);
            if extend(game, next, length, clean_end, path, visited) {
                return true;
            }
            path.pop();
            visited.pop();
        }
        false
    }

    let mut path = Vec::new();
    let mut visited = vec![start];
    extend(game, start, length, clean_end, &mut path, &mut visited).then_some(path)
}

fn build_chain_roads(game: &mut GameState, player: usize, edges: &[EdgeId]) {
    for &edge in edges {
        grant(game, player, ROAD_COST);
        game.apply(player, Action::BuildRoad { edge })
            .expect("chain road builds");
    }
}

/// First settlement of the player with room for an isolated chain.
fn chain_from_settlement(
    game: &GameState,
    player: usize,
    length: usize,
    clean_end: bool,
) -> (VertexId, Vec<EdgeId>) {
    game.players[player]
        .settlements
        .iter()
        .find_map(|&start| {
            find_isolated_chain(game, start, length, clean_end).map(|chain| (start, chain))
        })
        .expect("some settlement has room for the chain")
}

#[test]
fn longest_road_needs_five_ties_keep_the_holder_and_strict_gain_takes_it() {
    let mut game = new_game(2, 23);
    complete_setup(&mut game);

    // Player 0 passes the first turn.
    let p0 = game.current_player;
    assert_eq!(p0, 0);
    game.apply(0, Action::RollDice { dice: Some((1, 1)) })
        .expect("roll applies");
    end_turn(&mut game);

    // Player 1 chains roads off a settlement until the title threshold.
    advance_to_build(&mut game, (1, 2));
    let (_, chain_1) = chain_from_settlement(&game, 1, 6, false);
    let mut built = 0;
    for &edge in &chain_1 {
        grant(&mut game, 1, ROAD_COST);
        let lengths_before = game.longest_road_length(1);
        game.apply(1, Action::BuildRoad { edge }).expect("road builds");
        built += 1;
        assert!(
            game.longest_road_length(1) >= lengths_before,
            "own roads never shorten the path"
        );
        if game.longest_road_length(1) >= 5 {
            break;
        }
    }
    assert!(built <= chain_1.len());
    let held_length = game.longest_road_length(1);
    assert!(held_length >= 5);
    assert_eq!(game.longest_road_holder, Some(1));
    assert_eq!(game.victory_points(1), 2 + 2, "settlements plus the title");
    end_turn(&mut game);

    // Player 0 matches the length exactly: the holder keeps the title.
    advance_to_build(&mut game, (1, 2));
    let (_, chain_0) = chain_from_settlement(&game, 0, held_length as usize + 1, false);
    let mut remaining = chain_0.iter().copied();
    while game.longest_road_length(0) < held_length {
        let edge = remaining.next().expect("chain long enough to tie");
        build_chain_roads(&mut game, 0, &[edge]);
    }
    assert_eq!(game.longest_road_length(0), held_length);
    assert_eq!(
        game.longest_road_holder,
        Some(1),
        "a tie never unseats the holder"
    );

    // One more segment beats the holder outright.
    let edge = remaining.next().expect("one spare edge");
    let events_len_before = {
        grant(&mut game, 0, ROAD_COST);
        let events = game
            .apply(0, Action::BuildRoad { edge })
            .expect("winning road builds");
        events
            .iter()
            .filter(|e| matches!(e, GameEvent::LongestRoadChanged { holder: Some(0), .. }))
            .count()
    };
    assert_eq!(events_len_before, 1, "the takeover is announced");
    assert_eq!(game.longest_road_holder, Some(0));
    assert_eq!(game.victory_points(0), 2 + 2);
    assert_eq!(game.victory_points(1), 2);
    assert_conservation(&game);
}

#[test]
fn bank_and_port_trades_respect_entitled_rates() {
    let mut game = new_game(4, 17);
    complete_setup(&mut game);

    let player = game.current_player;
    game.apply(player, Action::RollDice { dice: Some((1, 2)) })
        .expect("roll applies");
    assert!(matches!(game.phase, TurnPhase::Trade));

    clear_hand(&mut game, player);
    let entitled = game.best_trade_rate(player, Resource::Wood);
    assert!((2..=4).contains(&entitled));
    grant(
        &mut game,
        player,
        ResourceBundle::single(Resource::Wood, entitled),
    );

    // Claiming a better rate than the ports allow is rejected.
    assert!(matches!(
        game.apply(
            player,
            Action::BankTrade {
                give: Resource::Wood,
                receive: Resource::Ore,
                rate: Some(entitled - 1),
            }
        ),
        Err(EngineError::IllegalAction(_))
    ));
    // Trading a resource for itself is rejected.
    assert!(matches!(
        game.apply(
            player,
            Action::BankTrade {
                give: Resource::Wood,
                receive: Resource::Wood,
                rate: None,
            }
        ),
        Err(EngineError::IllegalAction(_))
    ));

    game.apply(
        player,
        Action::BankTrade {
            give: Resource::Wood,
            receive: Resource::Ore,
            rate: None,
        },
    )
    .expect("trade applies");
    assert_eq!(
        game.players[player].resources,
        ResourceBundle::single(Resource::Ore, 1)
    );
    assert_conservation(&game);

    // The same trade again no longer covers the give side; nothing moves.
    let before = game.to_snapshot();
    assert!(matches!(
        game.apply(
            player,
            Action::BankTrade {
                give: Resource::Wood,
                receive: Resource::Ore,
                rate: None,
            }
        ),
        Err(EngineError::InsufficientResources(_))
    ));
    assert_eq!(game.to_snapshot(), before);
}

#[test]
fn player_trades_swap_atomically_or_not_at_all() {
    let mut game = new_game(4, 17);
    complete_setup(&mut game);
    let player = game.current_player;
    game.apply(player, Action::RollDice { dice: Some((1, 2)) })
        .expect("roll applies");

    clear_hand(&mut game, player);
    clear_hand(&mut game, 1);
    grant(&mut game, player, ResourceBundle::single(Resource::Wood, 1));
    grant(&mut game, 1, ResourceBundle::single(Resource::Sheep, 1));

    // Trading with oneself or for nothing is rejected.
    assert!(matches!(
        game.apply(
            player,
            Action::PlayerTrade {
                partner: player,
                give: ResourceBundle::single(Resource::Wood, 1),
                receive: ResourceBundle::single(Resource::Sheep, 1),
            }
        ),
        Err(EngineError::IllegalAction(_))
    ));
    assert!(matches!(
        game.apply(
            player,
            Action::PlayerTrade {
                partner: 1,
                give: ResourceBundle::empty(),
                receive: ResourceBundle::single(Resource::Sheep, 1),
            }
        ),
        Err(EngineError::IllegalAction(_))
    ));

    game.apply(
        player,
        Action::PlayerTrade {
            partner: 1,
            give: ResourceBundle::single(Resource::Wood, 1),
            receive: ResourceBundle::single(Resource::Sheep, 1),
        },
    )
    .expect("swap applies");
    assert_eq!(
        game.players[player].resources,
        ResourceBundle::single(Resource::Sheep, 1)
    );
    assert_eq!(
        game.players[1].resources,
        ResourceBundle::single(Resource::Wood, 1)
    );

    // The partner cannot pay: the whole swap is refused.
    let before = game.to_snapshot();
    assert!(matches!(
        game.apply(
            player,
            Action::PlayerTrade {
                partner: 1,
                give: ResourceBundle::single(Resource::Sheep, 1),
                receive: ResourceBundle::single(Resource::Ore, 1),
            }
        ),
        Err(EngineError::InsufficientResources(_))
    ));
    assert_eq!(game.to_snapshot(), before);
    assert_conservation(&game);
}

#[test]
fn knight_bought_this_turn_waits_and_three_plays_take_the_army() {
    let mut game = new_game(2, 21);
    complete_setup(&mut game);

    advance_to_build(&mut game, (1, 1));
    for _ in 0..3 {
        game.players[0].dev_cards.push(DevCard {
            kind: DevelopmentCard::Knight,
            bought_on_turn: game.turn,
        });
    }
    let robber_target = |game: &GameState| {
        game.board
            .hexes()
            .iter()
            .find(|hex| hex.id != game.robber_hex)
            .expect("another hex")
            .id
    };

    // Fresh from the shop, the card stays in the hand.
    let target = robber_target(&game);
    assert!(matches!(
        game.apply(
            0,
            Action::PlayDevelopmentCard {
                index: 0,
                play: DevCardPlay::Knight {
                    hex: target,
                    victim: None
                },
            }
        ),
        Err(EngineError::CardNotPlayable(_))
    ));

    for round in 0..3 {
        // Cycle to player 0's next build phase.
        end_turn(&mut game);
        game.apply(1, Action::RollDice { dice: Some((1, 2)) })
            .expect("roll applies");
        end_turn(&mut game);
        advance_to_build(&mut game, (1, 1));

        let target = robber_target(&game);
        game.apply(
            0,
            Action::PlayDevelopmentCard {
                index: 0,
                play: DevCardPlay::Knight {
                    hex: target,
                    victim: None,
                },
            },
        )
        .expect("a matured knight plays");
        assert_eq!(game.players[0].knights_played as usize, round + 1);

        if round == 0 {
            // One development card per turn.
            let target = robber_target(&game);
            assert!(matches!(
                game.apply(
                    0,
                    Action::PlayDevelopmentCard {
                        index: 0,
                        play: DevCardPlay::Knight {
                            hex: target,
                            victim: None
                        },
                    }
                ),
                Err(EngineError::CardNotPlayable(_))
            ));
        }
    }

    assert_eq!(game.largest_army_holder, Some(0));
    assert_eq!(game.victory_points(0), 2 + 2, "settlements plus the army");
    assert_eq!(game.victory_points(1), 2);
}

#[test]
fn victory_point_cards_score_but_never_play() {
    let mut game = new_game(2, 29);
    complete_setup(&mut game);
    advance_to_build(&mut game, (1, 1));

    let base = game.victory_points(0);
    game.players[0].dev_cards.push(DevCard {
        kind: DevelopmentCard::VictoryPoint,
        bought_on_turn: 0,
    });
    assert_eq!(game.victory_points(0), base + 1);
    assert!(matches!(
        game.apply(
            0,
            Action::PlayDevelopmentCard {
                index: 0,
                play: DevCardPlay::Monopoly {
                    resource: Resource::Wood
                },
            }
        ),
        Err(EngineError::CardNotPlayable(_))
    ));
}

#[test]
fn buying_development_cards_drains_the_deck_then_fails() {
    let mut game = new_game(2, 31);
    complete_setup(&mut game);
    advance_to_build(&mut game, (1, 1));

    clear_hand(&mut game, 0);
    grant(
        &mut game,
        0,
        ResourceBundle::from_counts([0, 0, 1, 1, 1]),
    );
    let deck_before = game.bank.development_deck_len();
    let events = game
        .apply(0, Action::BuyDevelopmentCard)
        .expect("purchase applies");
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::DevelopmentCardBought { player: 0 })));
    assert_eq!(game.bank.development_deck_len(), deck_before - 1);
    assert_eq!(game.players[0].dev_cards.len(), 1);
    assert_eq!(game.players[0].dev_cards[0].bought_on_turn, game.turn);
    assert_eq!(game.players[0].hand_size(), 0);
    assert_conservation(&game);

    // Affording another card does not help once the deck is gone.
    while game.bank.draw_development_card().is_some() {}
    grant(
        &mut game,
        0,
        ResourceBundle::from_counts([0, 0, 1, 1, 1]),
    );
    assert!(matches!(
        game.apply(0, Action::BuyDevelopmentCard),
        Err(EngineError::DeckEmpty)
    ));
}

#[test]
fn piece_pools_are_finite() {
    let game = new_game(2, 9);
    let mut snapshot = game.to_snapshot();
    snapshot.phase = TurnPhase::Build;
    snapshot.players[0].roads = (0..15).collect();
    let mut state = GameState::from_snapshot(&snapshot).expect("snapshot loads");
    assert!(matches!(
        state.apply(0, Action::BuildRoad { edge: 20 }),
        Err(EngineError::OutOfStock(BuildingKind::Road))
    ));

    let mut snapshot = game.to_snapshot();
    snapshot.phase = TurnPhase::Build;
    snapshot.players[0].settlements = vec![0, 10, 20, 30, 40];
    let mut state = GameState::from_snapshot(&snapshot).expect("snapshot loads");
    assert!(matches!(
        state.apply(0, Action::BuildSettlement { vertex: 50 }),
        Err(EngineError::OutOfStock(BuildingKind::Settlement))
    ));
}

#[test]
fn reaching_the_target_ends_the_game_immediately() {
    let mut game = GameState::new(GameConfig {
        num_players: 2,
        vps_to_win: 3,
        seed: 37,
        ..GameConfig::default()
    })
    .expect("config is valid");
    complete_setup(&mut game);
    assert_eq!(game.victory_points(0), 2);

    advance_to_build(&mut game, (1, 1));
    let (start, chain) = chain_from_settlement(&game, 0, 2, true);
    build_chain_roads(&mut game, 0, &chain);

    // The far end of the two-road spur satisfies the distance rule.
    let mut frontier = start;
    for &edge in &chain {
        frontier = game
            .board
            .edge(edge)
            .expect("edge exists")
            .other_endpoint(frontier);
    }
    grant(
        &mut game,
        0,
        ResourceBundle::from_counts([1, 1, 1, 1, 0]),
    );
    let events = game
        .apply(0, Action::BuildSettlement { vertex: frontier })
        .expect("winning settlement builds");
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::GameWon { winner: 0 })));
    assert!(matches!(
        game.phase,
        TurnPhase::GameOver { winner: Some(0) }
    ));
    assert_eq!(game.victory_points(0), 3);
    assert!(game.legal_actions().is_empty());
    assert!(matches!(
        game.apply(1, Action::RollDice { dice: None }),
        Err(EngineError::IllegalAction(_))
    ));
}

#[test]
fn greedy_bots_preserve_every_invariant_over_a_long_game() {
    let config = GameConfig {
        num_players: 4,
        seed: 1234,
        ..GameConfig::default()
    };
    let mut game = Game::new(config).expect("game starts");
    let bots = vec![GreedyPlayer, GreedyPlayer, GreedyPlayer, GreedyPlayer];

    for _ in 0..400 {
        if game.play_tick(&bots).is_none() {
            break;
        }
        assert_conservation(&game.state);
    }
    assert!(
        !matches!(game.state.phase, TurnPhase::Setup(_)),
        "bots clear setup comfortably within 400 ticks"
    );

    // The distance rule held throughout.
    for (&vertex, _) in &game.state.buildings {
        for neighbor in &game.state.board.vertex(vertex).expect("on board").neighbors {
            assert!(
                !game.state.buildings.contains_key(neighbor),
                "buildings on adjacent vertices {vertex} and {neighbor}"
            );
        }
    }
}
