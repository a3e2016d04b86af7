use std::collections::{BTreeMap, BTreeSet, HashSet};

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::board::{Board, BoardLayout, EdgeId, HexId, VertexId};
use crate::error::{EngineError, PlacementError};
use crate::game::action::{Action, DevCardPlay, GameEvent};
use crate::game::bank::Bank;
use crate::game::players::PlayerState;
use crate::game::resources::{
    ResourceBundle, ResourceError, CITY_COST, DEV_CARD_COST, ROAD_COST, SETTLEMENT_COST,
};
use crate::types::{BuildingKind, Color, DevelopmentCard, Resource};

/// Hand size above which a rolled 7 forces a discard.
pub const DISCARD_LIMIT: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub num_players: usize,
    pub radius: u8,
    pub vps_to_win: u8,
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            num_players: 4,
            radius: 2,
            vps_to_win: 10,
            seed: 42,
        }
    }
}

/// Where in the turn cycle the game currently is. Discard and MoveRobber
/// only occur on the tail of a rolled 7.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TurnPhase {
    Setup(SetupState),
    Roll,
    Discard,
    MoveRobber,
    Trade,
    Build,
    GameOver { winner: Option<usize> },
}

/// A settlement or city sitting on a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub owner: usize,
    pub kind: BuildingKind,
}

#[derive(Debug, Clone)]
pub struct GameState {
    pub config: GameConfig,
    pub board: Board,
    pub players: Vec<PlayerState>,
    pub bank: Bank,
    pub phase: TurnPhase,
    pub current_player: usize,
    pub(crate) turn_owner: usize,
    pub turn: u32,
    pub robber_hex: HexId,
    pub dice_history: Vec<(u8, u8)>,
    pub buildings: BTreeMap<VertexId, Building>,
    pub road_owners: BTreeMap<EdgeId, usize>,
    pub(crate) pending_discards: BTreeMap<usize, u8>,
    pub(crate) setup_road_anchor: Option<VertexId>,
    pub longest_road_holder: Option<usize>,
    pub(crate) longest_road_lengths: Vec<u8>,
    pub largest_army_holder: Option<usize>,
    pub(crate) rng: StdRng,
}

impl GameState {
    /// Start a fresh game on a randomized standard board for the config's
    /// radius. Fails with `ConfigError` and produces no game on a bad setup.
    pub fn new(config: GameConfig) -> Result<Self, EngineError> {
        Self::new_with_layout(config, None)
    }

    /// Start a fresh game on an explicit layout (fixed boards for tests and
    /// scenario replays).
    pub fn new_with_layout(
        mut config: GameConfig,
        layout: Option<BoardLayout>,
    ) -> Result<Self, EngineError> {
        if !(2..=4).contains(&config.num_players) {
            return Err(EngineError::ConfigError(format!(
                "{} players requested, the game supports 2-4",
                config.num_players
            )));
        }
        if config.vps_to_win < 3 {
            return Err(EngineError::ConfigError(
                "victory target must be at least 3 points".into(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let layout = layout.unwrap_or_else(|| BoardLayout::for_radius(config.radius));
        config.radius = layout.radius;
        let board = Board::generate(&layout, &mut rng)?;
        let robber_hex = board.initial_robber_hex();
        let bank = Bank::standard(&mut rng);
        let players: Vec<PlayerState> = Color::ORDERED
            .iter()
            .take(config.num_players)
            .map(|&color| PlayerState::new(color))
            .collect();
        let setup = SetupState::new(config.num_players);
        let current_player = setup.current_player().unwrap_or(0);
        let num_players = config.num_players;

        Ok(Self {
            config,
            board,
            players,
            bank,
            phase: TurnPhase::Setup(setup),
            current_player,
            turn_owner: current_player,
            turn: 0,
            robber_hex,
            dice_history: Vec::new(),
            buildings: BTreeMap::new(),
            road_owners: BTreeMap::new(),
            pending_discards: BTreeMap::new(),
            setup_road_anchor: None,
            longest_road_holder: None,
            longest_road_lengths: vec![0; num_players],
            largest_army_holder: None,
            rng,
        })
    }

    /// Apply one action for `player`. Either the whole mutation commits and
    /// the resulting events are returned, or a typed error is returned and
    /// the state is untouched.
    pub fn apply(&mut self, player: usize, action: Action) -> Result<Vec<GameEvent>, EngineError> {
        if matches!(self.phase, TurnPhase::GameOver { .. }) {
            return Err(EngineError::IllegalAction("the game is over"));
        }
        if player >= self.players.len() {
            return Err(EngineError::IllegalAction("no such player"));
        }

        let mut events = Vec::new();
        match self.phase {
            TurnPhase::Setup(_) => self.apply_setup(player, action, &mut events)?,
            TurnPhase::Roll => {
                self.require_turn(player)?;
                self.apply_roll(player, action, &mut events)?;
            }
            TurnPhase::Discard => self.apply_discard(player, action, &mut events)?,
            TurnPhase::MoveRobber => {
                self.require_turn(player)?;
                self.apply_move_robber(player, action, &mut events)?;
            }
            TurnPhase::Trade => {
                self.require_turn(player)?;
                self.apply_trade_phase(player, action, &mut events)?;
            }
            TurnPhase::Build => {
                self.require_turn(player)?;
                self.apply_build_phase(player, action, &mut events)?;
            }
            TurnPhase::GameOver { .. } => unreachable!("rejected above"),
        }

        self.check_victory(&mut events);
        Ok(events)
    }

    fn require_turn(&self, player: usize) -> Result<(), EngineError> {
        if player != self.current_player {
            return Err(EngineError::IllegalAction("not your turn"));
        }
        Ok(())
    }

    // --- setup ------------------------------------------------------------

    fn apply_setup(
        &mut self,
        player: usize,
        action: Action,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), EngineError> {
        let (expected, awaiting_road, second_settlement) = match &self.phase {
            TurnPhase::Setup(setup) => match setup.current_player() {
                Some(expected) => (
                    expected,
                    setup.awaiting_road(),
                    setup.is_second_settlement(),
                ),
                None => return Err(EngineError::IllegalAction("setup is already complete")),
            },
            _ => unreachable!("caller checked the phase"),
        };
        if player != expected {
            return Err(EngineError::IllegalAction("not your turn"));
        }

        match action {
            Action::BuildSettlement { vertex } if !awaiting_road => {
                self.validate_settlement_site(player, vertex, false)?;
                self.place_settlement_piece(player, vertex);
                events.push(GameEvent::SettlementBuilt { player, vertex });
                if second_settlement {
                    self.grant_starting_resources(player, vertex, events);
                }
                self.setup_road_anchor = Some(vertex);
                self.refresh_longest_road(events);
            }
            Action::BuildRoad { edge } if awaiting_road => {
                let anchor = self
                    .setup_road_anchor
                    .ok_or(EngineError::IllegalAction("no settlement to anchor the road"))?;
                let touches_anchor = self
                    .board
                    .edge(edge)
                    .ok_or(PlacementError::UnknownEdge(edge))?
                    .touches(anchor);
                if !touches_anchor {
                    return Err(PlacementError::NotConnected.into());
                }
                self.validate_road_site(player, edge, false, None)?;
                self.place_road_piece(player, edge);
                events.push(GameEvent::RoadBuilt { player, edge });
                self.setup_road_anchor = None;
                self.refresh_longest_road(events);
            }
            _ => {
                return Err(EngineError::IllegalAction(
                    "setup expects the next placement",
                ));
            }
        }

        let (next_player, complete) = match &mut self.phase {
            TurnPhase::Setup(setup) => {
                setup.advance();
                (setup.current_player(), setup.is_complete())
            }
            _ => unreachable!("caller checked the phase"),
        };
        if complete {
            self.phase = TurnPhase::Roll;
            self.current_player = 0;
            self.turn_owner = 0;
        } else {
            self.current_player = next_player.unwrap_or(0);
            self.turn_owner = self.current_player;
        }
        Ok(())
    }

    /// The second setup settlement pays out one card per adjacent producing
    /// hex, per-resource bank stock permitting.
    fn grant_starting_resources(
        &mut self,
        player: usize,
        vertex: VertexId,
        events: &mut Vec<GameEvent>,
    ) {
        let produced: Vec<Resource> = self
            .board
            .adjacent_hexes(vertex)
            .filter_map(|hex| hex.resource)
            .collect();
        let mut granted = ResourceBundle::empty();
        for resource in produced {
            let single = ResourceBundle::single(resource, 1);
            if self.bank.dispense(&single).is_ok() {
                self.players[player].gain(&single);
                granted.add(resource, 1);
            }
        }
        if !granted.is_empty() {
            events.push(GameEvent::StartingResourcesGranted {
                player,
                resources: granted,
            });
        }
    }

    // --- roll and production ---------------------------------------------

    fn apply_roll(
        &mut self,
        player: usize,
        action: Action,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), EngineError> {
        let Action::RollDice { dice } = action else {
            return Err(EngineError::IllegalAction("roll the dice first"));
        };
        let (d1, d2) = match dice {
            Some((d1, d2)) => {
                if !(1..=6).contains(&d1) || !(1..=6).contains(&d2) {
                    return Err(EngineError::IllegalAction("pinned dice must be 1-6"));
                }
                (d1, d2)
            }
            None => (self.roll_die(), self.roll_die()),
        };
        let sum = d1 + d2;
        self.dice_history.push((d1, d2));
        events.push(GameEvent::DiceRolled {
            player,
            dice: (d1, d2),
            sum,
        });

        if sum == 7 {
            self.pending_discards = self
                .players
                .iter()
                .enumerate()
                .filter(|(_, p)| p.hand_size() > DISCARD_LIMIT)
                .map(|(idx, p)| (idx, (p.hand_size() / 2) as u8))
                .collect();
            if let Some((&first, _)) = self.pending_discards.iter().next() {
                for (&owing, &count) in &self.pending_discards {
                    events.push(GameEvent::DiscardRequired {
                        player: owing,
                        count,
                    });
                }
                self.phase = TurnPhase::Discard;
                self.current_player = first;
            } else {
                self.phase = TurnPhase::MoveRobber;
            }
        } else {
            self.distribute_production(sum, events);
            self.phase = TurnPhase::Trade;
        }
        Ok(())
    }

    /// Pay out every hex with the rolled token. If the bank cannot cover all
    /// claims on a resource nobody receives it, unless a single player is
    /// the only claimant, who takes what stock remains.
    fn distribute_production(&mut self, sum: u8, events: &mut Vec<GameEvent>) {
        let num_players = self.players.len();
        let mut claims: Vec<ResourceBundle> = vec![ResourceBundle::empty(); num_players];
        for hex in self.board.hexes() {
            if hex.token != Some(sum) || hex.id == self.robber_hex {
                continue;
            }
            let Some(resource) = hex.resource else {
                continue;
            };
            for &vertex in &hex.vertices {
                if let Some(building) = self.buildings.get(&vertex) {
                    let amount = match building.kind {
                        BuildingKind::City => 2,
                        _ => 1,
                    };
                    claims[building.owner].add(resource, amount);
                }
            }
        }

        let mut payouts: Vec<ResourceBundle> = vec![ResourceBundle::empty(); num_players];
        for resource in Resource::ALL {
            let claimants: Vec<usize> = (0..num_players)
                .filter(|&p| claims[p].get(resource) > 0)
                .collect();
            if claimants.is_empty() {
                continue;
            }
            let claimed: u32 = claimants
                .iter()
                .map(|&p| claims[p].get(resource) as u32)
                .sum();
            let stock = self.bank.available(resource) as u32;
            if claimed <= stock {
                for &p in &claimants {
                    payouts[p].add(resource, claims[p].get(resource));
                }
            } else if let [only] = claimants.as_slice() {
                let amount = claims[*only].get(resource).min(stock as u8);
                if amount > 0 {
                    payouts[*only].add(resource, amount);
                } else {
                    events.push(GameEvent::ProductionShorted { resource });
                }
            } else {
                events.push(GameEvent::ProductionShorted { resource });
            }
        }

        for (player, bundle) in payouts.iter().enumerate() {
            if bundle.is_empty() {
                continue;
            }
            if self.bank.dispense(bundle).is_ok() {
                self.players[player].gain(bundle);
                events.push(GameEvent::ProductionPaid {
                    player,
                    resources: *bundle,
                });
            }
        }
    }

    // --- discard and robber ----------------------------------------------

    fn apply_discard(
        &mut self,
        player: usize,
        action: Action,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), EngineError> {
        let Action::DiscardResources { resources } = action else {
            return Err(EngineError::IllegalAction(
                "discards must be resolved before anything else",
            ));
        };
        let Some(&required) = self.pending_discards.get(&player) else {
            return Err(EngineError::IllegalAction("you owe no discard"));
        };
        if resources.total() != required as u32 {
            return Err(EngineError::IllegalAction(
                "discard exactly half your hand, rounded down",
            ));
        }
        self.players[player].spend(&resources)?;
        self.bank.receive(&resources);
        self.pending_discards.remove(&player);
        events.push(GameEvent::ResourcesDiscarded { player, resources });

        if let Some((&next, _)) = self.pending_discards.iter().next() {
            self.current_player = next;
        } else {
            self.phase = TurnPhase::MoveRobber;
            self.current_player = self.turn_owner;
        }
        Ok(())
    }

    fn apply_move_robber(
        &mut self,
        player: usize,
        action: Action,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), EngineError> {
        let Action::MoveRobber { hex, victim } = action else {
            return Err(EngineError::IllegalAction("the robber must be moved"));
        };
        let event = self.move_robber(player, hex, victim)?;
        events.push(event);
        self.phase = TurnPhase::Trade;
        self.current_player = self.turn_owner;
        Ok(())
    }

    /// Validate and perform a robber move plus optional steal. Shared by the
    /// post-seven phase and the Knight card.
    fn move_robber(
        &mut self,
        player: usize,
        hex: HexId,
        victim: Option<usize>,
    ) -> Result<GameEvent, EngineError> {
        let target_vertices = self
            .board
            .hex(hex)
            .ok_or(PlacementError::UnknownHex(hex))?
            .vertices;
        if hex == self.robber_hex {
            return Err(PlacementError::RobberMustMove.into());
        }
        if let Some(victim_idx) = victim {
            let eligible = victim_idx < self.players.len()
                && victim_idx != player
                && self.players[victim_idx].hand_size() > 0
                && target_vertices.iter().any(|vertex| {
                    self.buildings
                        .get(vertex)
                        .is_some_and(|b| b.owner == victim_idx)
                });
            if !eligible {
                return Err(PlacementError::InvalidVictim.into());
            }
        }

        self.robber_hex = hex;
        let stolen = victim.and_then(|victim_idx| self.steal_random_card(player, victim_idx));
        Ok(GameEvent::RobberMoved {
            player,
            hex,
            victim,
            stolen,
        })
    }

    fn steal_random_card(&mut self, thief: usize, victim: usize) -> Option<Resource> {
        let hand = self.players[victim].resources;
        let total = hand.total();
        if total == 0 {
            return None;
        }
        let mut pick = self.rng.gen_range(0..total);
        let mut chosen = None;
        for (resource, count) in hand.iter_nonzero() {
            if pick < count as u32 {
                chosen = Some(resource);
                break;
            }
            pick -= count as u32;
        }
        let resource = chosen?;
        self.players[victim].resources.subtract(resource, 1).ok()?;
        self.players[thief].resources.add(resource, 1);
        Some(resource)
    }

    // --- trading ----------------------------------------------------------

    fn apply_trade_phase(
        &mut self,
        player: usize,
        action: Action,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), EngineError> {
        match action {
            Action::BankTrade {
                give,
                receive,
                rate,
            } => self.bank_trade(player, give, receive, rate, events),
            Action::PlayerTrade {
                partner,
                give,
                receive,
            } => self.player_trade(player, partner, give, receive, events),
            Action::FinishTrading => {
                self.phase = TurnPhase::Build;
                Ok(())
            }
            Action::EndTurn => {
                self.end_turn(events);
                Ok(())
            }
            _ => Err(EngineError::IllegalAction(
                "only trading is allowed in the trade window",
            )),
        }
    }

    fn bank_trade(
        &mut self,
        player: usize,
        give: Resource,
        receive: Resource,
        rate: Option<u8>,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), EngineError> {
        if give == receive {
            return Err(EngineError::IllegalAction(
                "give and receive must be different resources",
            ));
        }
        let entitled = self.best_trade_rate(player, give);
        let rate = rate.unwrap_or(entitled);
        if rate < entitled {
            return Err(EngineError::IllegalAction(
                "rate is better than your ports allow",
            ));
        }
        if self.bank.available(receive) == 0 {
            return Err(ResourceError::Shortage {
                resource: receive,
                available: 0,
                requested: 1,
            }
            .into());
        }
        let gave = ResourceBundle::single(give, rate);
        let received = ResourceBundle::single(receive, 1);
        self.players[player].spend(&gave)?;
        self.bank.receive(&gave);
        if self.bank.dispense(&received).is_ok() {
            self.players[player].gain(&received);
        }
        events.push(GameEvent::Traded {
            player,
            partner: None,
            gave,
            received,
        });
        Ok(())
    }

    fn player_trade(
        &mut self,
        player: usize,
        partner: usize,
        give: ResourceBundle,
        receive: ResourceBundle,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), EngineError> {
        if partner >= self.players.len() || partner == player {
            return Err(EngineError::IllegalAction("invalid trade partner"));
        }
        if give.is_empty() || receive.is_empty() {
            return Err(EngineError::IllegalAction(
                "a trade must move resources both ways",
            ));
        }
        if !self.players[player].resources.covers(&give)
            || !self.players[partner].resources.covers(&receive)
        {
            return Err(ResourceError::BundleShortage.into());
        }
        self.players[player].spend(&give)?;
        self.players[partner].spend(&receive)?;
        self.players[player].gain(&receive);
        self.players[partner].gain(&give);
        events.push(GameEvent::Traded {
            player,
            partner: Some(partner),
            gave: give,
            received: receive,
        });
        Ok(())
    }

    /// Best maritime rate for giving a resource: 2 with a matching port,
    /// else 3 with a generic port, else the bank's 4.
    pub fn best_trade_rate(&self, player: usize, give: Resource) -> u8 {
        let mut rate = 4;
        for port in self.board.ports() {
            let reachable = self.players[player].owns_building(port.vertices.0)
                || self.players[player].owns_building(port.vertices.1);
            if !reachable {
                continue;
            }
            match port.resource {
                None => rate = rate.min(port.rate),
                Some(resource) if resource == give => rate = rate.min(port.rate),
                Some(_) => {}
            }
        }
        rate
    }

    // --- building and development cards ----------------------------------

    fn apply_build_phase(
        &mut self,
        player: usize,
        action: Action,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), EngineError> {
        match action {
            Action::BuildRoad { edge } => {
                self.validate_road_site(player, edge, true, None)?;
                self.pay(player, &ROAD_COST)?;
                self.place_road_piece(player, edge);
                events.push(GameEvent::RoadBuilt { player, edge });
                self.refresh_longest_road(events);
                Ok(())
            }
            Action::BuildSettlement { vertex } => {
                self.validate_settlement_site(player, vertex, true)?;
                if !self.players[player].resources.covers(&SETTLEMENT_COST) {
                    return Err(ResourceError::BundleShortage.into());
                }
                self.pay(player, &SETTLEMENT_COST)?;
                self.place_settlement_piece(player, vertex);
                events.push(GameEvent::SettlementBuilt { player, vertex });
                self.refresh_longest_road(events);
                Ok(())
            }
            Action::BuildCity { vertex } => {
                if self.players[player].cities_remaining() == 0 {
                    return Err(EngineError::OutOfStock(BuildingKind::City));
                }
                if !self.players[player].settlements.contains(&vertex) {
                    return Err(PlacementError::NotYourSettlement(vertex).into());
                }
                self.pay(player, &CITY_COST)?;
                self.players[player].settlements.remove(&vertex);
                self.players[player].cities.insert(vertex);
                self.buildings.insert(
                    vertex,
                    Building {
                        owner: player,
                        kind: BuildingKind::City,
                    },
                );
                events.push(GameEvent::CityBuilt { player, vertex });
                Ok(())
            }
            Action::BuyDevelopmentCard => self.buy_development_card(player, events),
            Action::PlayDevelopmentCard { index, play } => {
                self.play_development_card(player, index, play, events)
            }
            Action::EndTurn => {
                self.end_turn(events);
                Ok(())
            }
            _ => Err(EngineError::IllegalAction(
                "the trade window is already closed",
            )),
        }
    }

    fn buy_development_card(
        &mut self,
        player: usize,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), EngineError> {
        if self.bank.development_deck_len() == 0 {
            return Err(EngineError::DeckEmpty);
        }
        if !self.players[player].resources.covers(&DEV_CARD_COST) {
            return Err(ResourceError::BundleShortage.into());
        }
        self.pay(player, &DEV_CARD_COST)?;
        let card = self
            .bank
            .draw_development_card()
            .ok_or(EngineError::DeckEmpty)?;
        self.players[player].add_dev_card(card, self.turn);
        events.push(GameEvent::DevelopmentCardBought { player });
        Ok(())
    }

    fn play_development_card(
        &mut self,
        player: usize,
        index: usize,
        play: DevCardPlay,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), EngineError> {
        let card = *self.players[player]
            .dev_cards
            .get(index)
            .ok_or(EngineError::CardNotPlayable("no card at that index"))?;
        if self.players[player].played_dev_card_this_turn {
            return Err(EngineError::CardNotPlayable(
                "only one development card per turn",
            ));
        }
        if card.kind == DevelopmentCard::VictoryPoint {
            return Err(EngineError::CardNotPlayable(
                "victory point cards score from the hand",
            ));
        }
        if card.bought_on_turn == self.turn {
            return Err(EngineError::CardNotPlayable(
                "cannot play a card bought this turn",
            ));
        }
        if play.card() != card.kind {
            return Err(EngineError::IllegalAction(
                "arguments do not match the chosen card",
            ));
        }

        match play {
            DevCardPlay::Knight { hex, victim } => {
                let robber_event = self.move_robber(player, hex, victim)?;
                self.players[player].dev_cards.remove(index);
                self.players[player].record_dev_card_play(DevelopmentCard::Knight);
                events.push(GameEvent::DevelopmentCardPlayed {
                    player,
                    card: DevelopmentCard::Knight,
                });
                events.push(robber_event);
                self.refresh_largest_army(events);
            }
            DevCardPlay::RoadBuilding { edges: (first, second) } => {
                if first == second {
                    return Err(EngineError::IllegalAction(
                        "road building needs two distinct edges",
                    ));
                }
                if self.players[player].roads_remaining() < 2 {
                    return Err(EngineError::OutOfStock(BuildingKind::Road));
                }
                self.validate_road_site(player, first, true, None)?;
                self.validate_road_site(player, second, true, Some(first))?;
                self.players[player].dev_cards.remove(index);
                self.players[player].record_dev_card_play(DevelopmentCard::RoadBuilding);
                events.push(GameEvent::DevelopmentCardPlayed {
                    player,
                    card: DevelopmentCard::RoadBuilding,
                });
                self.place_road_piece(player, first);
                events.push(GameEvent::RoadBuilt {
                    player,
                    edge: first,
                });
                self.place_road_piece(player, second);
                events.push(GameEvent::RoadBuilt {
                    player,
                    edge: second,
                });
                self.refresh_longest_road(events);
            }
            DevCardPlay::YearOfPlenty { first, second } => {
                let mut bundle = ResourceBundle::single(first, 1);
                bundle.add(second, 1);
                if !self.bank.stock().covers(&bundle) {
                    return Err(ResourceError::BundleShortage.into());
                }
                self.players[player].dev_cards.remove(index);
                self.players[player].record_dev_card_play(DevelopmentCard::YearOfPlenty);
                if self.bank.dispense(&bundle).is_ok() {
                    self.players[player].gain(&bundle);
                }
                events.push(GameEvent::DevelopmentCardPlayed {
                    player,
                    card: DevelopmentCard::YearOfPlenty,
                });
            }
            DevCardPlay::Monopoly { resource } => {
                self.players[player].dev_cards.remove(index);
                self.players[player].record_dev_card_play(DevelopmentCard::Monopoly);
                let mut taken: u8 = 0;
                for other in 0..self.players.len() {
                    if other == player {
                        continue;
                    }
                    let amount = self.players[other].resources.get(resource);
                    if amount > 0 && self.players[other].resources.subtract(resource, amount).is_ok()
                    {
                        taken = taken.saturating_add(amount);
                    }
                }
                self.players[player].resources.add(resource, taken);
                events.push(GameEvent::DevelopmentCardPlayed {
                    player,
                    card: DevelopmentCard::Monopoly,
                });
                events.push(GameEvent::MonopolyClaimed {
                    player,
                    resource,
                    total: taken,
                });
            }
        }
        Ok(())
    }

    fn end_turn(&mut self, events: &mut Vec<GameEvent>) {
        self.players[self.current_player].reset_for_new_turn();
        self.current_player = (self.current_player + 1) % self.players.len();
        self.turn_owner = self.current_player;
        self.turn += 1;
        self.phase = TurnPhase::Roll;
        events.push(GameEvent::TurnEnded {
            next_player: self.current_player,
        });
    }

    fn check_victory(&mut self, events: &mut Vec<GameEvent>) {
        if matches!(self.phase, TurnPhase::GameOver { .. }) {
            return;
        }
        for player in 0..self.players.len() {
            if self.victory_points(player) >= self.config.vps_to_win {
                self.phase = TurnPhase::GameOver {
                    winner: Some(player),
                };
                events.push(GameEvent::GameWon { winner: player });
                return;
            }
        }
    }

    // --- placement validation and mutation helpers ------------------------

    /// Move a cost from a player to the bank, atomically.
    fn pay(&mut self, player: usize, cost: &ResourceBundle) -> Result<(), EngineError> {
        self.players[player].spend(cost)?;
        self.bank.receive(cost);
        Ok(())
    }

    fn validate_settlement_site(
        &self,
        player: usize,
        vertex: VertexId,
        require_network: bool,
    ) -> Result<(), EngineError> {
        if self.players[player].settlements_remaining() == 0 {
            return Err(EngineError::OutOfStock(BuildingKind::Settlement));
        }
        let site = self
            .board
            .vertex(vertex)
            .ok_or(PlacementError::UnknownVertex(vertex))?;
        if self.buildings.contains_key(&vertex) {
            return Err(PlacementError::VertexOccupied(vertex).into());
        }
        for neighbor in &site.neighbors {
            if self.buildings.contains_key(neighbor) {
                return Err(PlacementError::TooCloseToBuilding.into());
            }
        }
        if require_network {
            let touches_own_road = site
                .edges
                .iter()
                .any(|edge| self.road_owners.get(edge) == Some(&player));
            if !touches_own_road {
                return Err(PlacementError::NotConnected.into());
            }
        }
        Ok(())
    }

    /// `extra` is treated as an already-owned road, so the second edge of a
    /// Road Building play can chain off the first before it exists.
    fn validate_road_site(
        &self,
        player: usize,
        edge: EdgeId,
        require_network: bool,
        extra: Option<EdgeId>,
    ) -> Result<(), EngineError> {
        if self.players[player].roads_remaining() == 0 {
            return Err(EngineError::OutOfStock(BuildingKind::Road));
        }
        let site = self
            .board
            .edge(edge)
            .ok_or(PlacementError::UnknownEdge(edge))?;
        if self.road_owners.contains_key(&edge) || extra == Some(edge) {
            return Err(PlacementError::EdgeOccupied(edge).into());
        }
        if require_network {
            let (a, b) = site.vertices;
            let owns_endpoint = self.players[player].owns_building(a)
                || self.players[player].owns_building(b);
            let owns_road = |candidate: EdgeId| {
                candidate != edge
                    && (self.road_owners.get(&candidate) == Some(&player)
                        || extra == Some(candidate))
            };
            let touches_road = [a, b].iter().any(|&endpoint| {
                self.board
                    .vertex(endpoint)
                    .map(|v| v.edges.iter().any(|&candidate| owns_road(candidate)))
                    .unwrap_or(false)
            });
            if !owns_endpoint && !touches_road {
                return Err(PlacementError::NotConnected.into());
            }
        }
        Ok(())
    }

    fn place_settlement_piece(&mut self, player: usize, vertex: VertexId) {
        self.players[player].settlements.insert(vertex);
        self.buildings.insert(
            vertex,
            Building {
                owner: player,
                kind: BuildingKind::Settlement,
            },
        );
    }

    fn place_road_piece(&mut self, player: usize, edge: EdgeId) {
        self.players[player].roads.insert(edge);
        self.road_owners.insert(edge, player);
    }

    fn roll_die(&mut self) -> u8 {
        self.rng.gen_range(1..=6)
    }

    // --- public queries ---------------------------------------------------

    pub fn is_vertex_free(&self, vertex: VertexId) -> bool {
        self.board.vertex(vertex).is_some() && !self.buildings.contains_key(&vertex)
    }

    /// Settlement legality for the current phase: the network requirement is
    /// relaxed during setup.
    pub fn is_vertex_legal_for_settlement(&self, player: usize, vertex: VertexId) -> bool {
        let require_network = !matches!(self.phase, TurnPhase::Setup(_));
        self.validate_settlement_site(player, vertex, require_network)
            .is_ok()
    }

    pub fn is_edge_legal_for_road(&self, player: usize, edge: EdgeId) -> bool {
        let require_network = !matches!(self.phase, TurnPhase::Setup(_));
        self.validate_road_site(player, edge, require_network, None)
            .is_ok()
    }

    /// Cards of one resource currently in play, players plus bank. Constant
    /// for every reachable state.
    pub fn total_resources_in_play(&self, resource: Resource) -> u32 {
        let held: u32 = self
            .players
            .iter()
            .map(|p| p.resources.get(resource) as u32)
            .sum();
        held + self.bank.available(resource) as u32
    }
}

// --- legal action enumeration --------------------------------------------

impl GameState {
    /// Every action the current actor could legally take, for bots and UI
    /// affordance. For discards a single canonical bundle is offered; the
    /// driver may substitute any other legal split.
    pub fn legal_actions(&self) -> Vec<Action> {
        match &self.phase {
            TurnPhase::Setup(setup) => self.legal_setup_actions(setup),
            TurnPhase::Roll => vec![Action::RollDice { dice: None }],
            TurnPhase::Discard => self.legal_discard_actions(),
            TurnPhase::MoveRobber => self.legal_robber_actions(),
            TurnPhase::Trade => self.legal_trade_actions(),
            TurnPhase::Build => self.legal_build_actions(),
            TurnPhase::GameOver { .. } => Vec::new(),
        }
    }

    fn legal_setup_actions(&self, setup: &SetupState) -> Vec<Action> {
        let Some(player) = setup.current_player() else {
            return Vec::new();
        };
        let mut actions = Vec::new();
        if setup.awaiting_road() {
            if let Some(anchor) = self.setup_road_anchor {
                if let Some(vertex) = self.board.vertex(anchor) {
                    for &edge in &vertex.edges {
                        if self.validate_road_site(player, edge, false, None).is_ok() {
                            actions.push(Action::BuildRoad { edge });
                        }
                    }
                }
            }
        } else {
            for vertex in self.board.vertices() {
                if self
                    .validate_settlement_site(player, vertex.id, false)
                    .is_ok()
                {
                    actions.push(Action::BuildSettlement { vertex: vertex.id });
                }
            }
        }
        actions
    }

    fn legal_discard_actions(&self) -> Vec<Action> {
        let Some(&required) = self.pending_discards.get(&self.current_player) else {
            return Vec::new();
        };
        let hand = self.players[self.current_player].resources;
        let mut counts: Vec<(Resource, u8)> = hand.iter_nonzero().collect();
        counts.sort_by_key(|&(resource, count)| (std::cmp::Reverse(count), resource));
        let mut bundle = ResourceBundle::empty();
        let mut remaining = required;
        for (resource, count) in counts {
            let take = count.min(remaining);
            bundle.add(resource, take);
            remaining -= take;
            if remaining == 0 {
                break;
            }
        }
        vec![Action::DiscardResources { resources: bundle }]
    }

    fn legal_robber_actions(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        for hex in self.board.hexes() {
            if hex.id == self.robber_hex {
                continue;
            }
            let victims = self.robbery_victims_at(hex.id);
            if victims.is_empty() {
                actions.push(Action::MoveRobber {
                    hex: hex.id,
                    victim: None,
                });
            } else {
                for victim in victims {
                    actions.push(Action::MoveRobber {
                        hex: hex.id,
                        victim: Some(victim),
                    });
                }
            }
        }
        actions
    }

    /// Players who own a building on the hex, are not the mover, and hold at
    /// least one card.
    fn robbery_victims_at(&self, hex: HexId) -> BTreeSet<usize> {
        let Some(hex) = self.board.hex(hex) else {
            return BTreeSet::new();
        };
        hex.vertices
            .iter()
            .filter_map(|vertex| self.buildings.get(vertex))
            .map(|building| building.owner)
            .filter(|&owner| {
                owner != self.current_player && self.players[owner].hand_size() > 0
            })
            .collect()
    }

    fn legal_trade_actions(&self) -> Vec<Action> {
        let player = self.current_player;
        let mut actions = vec![Action::FinishTrading, Action::EndTurn];
        for give in Resource::ALL {
            let rate = self.best_trade_rate(player, give);
            if self.players[player].resources.get(give) < rate {
                continue;
            }
            for receive in Resource::ALL {
                if receive == give || self.bank.available(receive) == 0 {
                    continue;
                }
                actions.push(Action::BankTrade {
                    give,
                    receive,
                    rate: None,
                });
            }
        }
        actions
    }

    fn legal_build_actions(&self) -> Vec<Action> {
        let player = self.current_player;
        let state = &self.players[player];
        let mut actions = vec![Action::EndTurn];

        if state.roads_remaining() > 0 && state.resources.covers(&ROAD_COST) {
            for edge in self.board.edges() {
                if self.validate_road_site(player, edge.id, true, None).is_ok() {
                    actions.push(Action::BuildRoad { edge: edge.id });
                }
            }
        }
        if state.settlements_remaining() > 0 && state.resources.covers(&SETTLEMENT_COST) {
            for vertex in self.board.vertices() {
                if self
                    .validate_settlement_site(player, vertex.id, true)
                    .is_ok()
                {
                    actions.push(Action::BuildSettlement { vertex: vertex.id });
                }
            }
        }
        if state.cities_remaining() > 0 && state.resources.covers(&CITY_COST) {
            for &vertex in &state.settlements {
                actions.push(Action::BuildCity { vertex });
            }
        }
        if self.bank.development_deck_len() > 0 && state.resources.covers(&DEV_CARD_COST) {
            actions.push(Action::BuyDevelopmentCard);
        }
        if !state.played_dev_card_this_turn {
            actions.extend(self.legal_dev_card_plays(player));
        }
        actions
    }

    fn legal_dev_card_plays(&self, player: usize) -> Vec<Action> {
        let mut actions = Vec::new();
        let mut offered: HashSet<DevelopmentCard> = HashSet::new();
        for (index, card) in self.players[player].dev_cards.iter().enumerate() {
            if card.bought_on_turn == self.turn
                || card.kind == DevelopmentCard::VictoryPoint
                || !offered.insert(card.kind)
            {
                continue;
            }
            match card.kind {
                DevelopmentCard::Knight => {
                    for hex in self.board.hexes() {
                        if hex.id == self.robber_hex {
                            continue;
                        }
                        let victims = self.robbery_victims_at(hex.id);
                        if victims.is_empty() {
                            actions.push(Action::PlayDevelopmentCard {
                                index,
                                play: DevCardPlay::Knight {
                                    hex: hex.id,
                                    victim: None,
                                },
                            });
                        } else {
                            for victim in victims {
                                actions.push(Action::PlayDevelopmentCard {
                                    index,
                                    play: DevCardPlay::Knight {
                                        hex: hex.id,
                                        victim: Some(victim),
                                    },
                                });
                            }
                        }
                    }
                }
                DevelopmentCard::RoadBuilding => {
                    if let Some(edges) = self.first_free_road_pair(player) {
                        actions.push(Action::PlayDevelopmentCard {
                            index,
                            play: DevCardPlay::RoadBuilding { edges },
                        });
                    }
                }
                DevelopmentCard::YearOfPlenty => {
                    for (i, first) in Resource::ALL.into_iter().enumerate() {
                        for second in Resource::ALL.into_iter().skip(i) {
                            let mut bundle = ResourceBundle::single(first, 1);
                            bundle.add(second, 1);
                            if self.bank.stock().covers(&bundle) {
                                actions.push(Action::PlayDevelopmentCard {
                                    index,
                                    play: DevCardPlay::YearOfPlenty { first, second },
                                });
                            }
                        }
                    }
                }
                DevelopmentCard::Monopoly => {
                    for resource in Resource::ALL {
                        actions.push(Action::PlayDevelopmentCard {
                            index,
                            play: DevCardPlay::Monopoly { resource },
                        });
                    }
                }
                DevelopmentCard::VictoryPoint => unreachable!("filtered above"),
            }
        }
        actions
    }

    /// One legal pair of free roads for a Road Building play, the second
    /// allowed to chain off the first.
    fn first_free_road_pair(&self, player: usize) -> Option<(EdgeId, EdgeId)> {
        if self.players[player].roads_remaining() < 2 {
            return None;
        }
        for first in self.board.edges() {
            if self
                .validate_road_site(player, first.id, true, None)
                .is_err()
            {
                continue;
            }
            for second in self.board.edges() {
                if second.id == first.id {
                    continue;
                }
                if self
                    .validate_road_site(player, second.id, true, Some(first.id))
                    .is_ok()
                {
                    return Some((first.id, second.id));
                }
            }
        }
        None
    }
}

// --- setup bookkeeping -----------------------------------------------------

/// Serpentine placement order: each player places settlement+road forward,
/// then again in reverse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupState {
    pub(crate) steps: Vec<SetupStep>,
    pub(crate) cursor: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SetupStep {
    pub(crate) player: usize,
    pub(crate) placement: SetupPlacement,
    pub(crate) second_round: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum SetupPlacement {
    Settlement,
    Road,
}

impl SetupState {
    pub(crate) fn new(num_players: usize) -> Self {
        let mut steps = Vec::with_capacity(num_players * 4);
        for round in [false, true] {
            let order: Vec<usize> = if round {
                (0..num_players).rev().collect()
            } else {
                (0..num_players).collect()
            };
            for player in order {
                steps.push(SetupStep {
                    player,
                    placement: SetupPlacement::Settlement,
                    second_round: round,
                });
                steps.push(SetupStep {
                    player,
                    placement: SetupPlacement::Road,
                    second_round: round,
                });
            }
        }
        Self { steps, cursor: 0 }
    }

    pub fn current_player(&self) -> Option<usize> {
        self.steps.get(self.cursor).map(|step| step.player)
    }

    pub(crate) fn awaiting_road(&self) -> bool {
        self.steps
            .get(self.cursor)
            .map(|step| step.placement == SetupPlacement::Road)
            .unwrap_or(false)
    }

    pub(crate) fn is_second_settlement(&self) -> bool {
        self.steps
            .get(self.cursor)
            .map(|step| step.second_round && step.placement == SetupPlacement::Settlement)
            .unwrap_or(false)
    }

    pub(crate) fn advance(&mut self) {
        if self.cursor < self.steps.len() {
            self.cursor += 1;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.steps.len()
    }
}
