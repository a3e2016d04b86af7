//! Save/load: the full game state as a tree of plain values, plus thin file
//! wrappers. Loading validates everything and never produces a partial game.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::board::{Board, BoardLayout, EdgeId, HexId, PortSpec, VertexId};
use crate::error::EngineError;
use crate::game::bank::{Bank, BANK_STOCK_PER_RESOURCE};
use crate::game::players::{DevCard, PlayerState, MAX_CITIES, MAX_ROADS, MAX_SETTLEMENTS};
use crate::game::resources::ResourceBundle;
use crate::game::state::{Building, GameConfig, GameState, TurnPhase};
use crate::types::{BuildingKind, Color, DevelopmentCard, Resource};

/// The persisted shape of a game. Round-trips exactly:
/// `GameState::from_snapshot(&s.to_snapshot())` is state-equal to `s`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub config: GameConfig,
    pub board: BoardSnapshot,
    pub players: Vec<PlayerSnapshot>,
    pub bank_stock: ResourceBundle,
    pub development_deck: Vec<DevelopmentCard>,
    pub phase: TurnPhase,
    pub current_player: usize,
    pub turn_owner: usize,
    pub turn: u32,
    pub robber_hex: HexId,
    pub dice_history: Vec<(u8, u8)>,
    pub pending_discards: BTreeMap<usize, u8>,
    pub setup_road_anchor: Option<VertexId>,
    pub longest_road_holder: Option<usize>,
    pub largest_army_holder: Option<usize>,
}

/// Board layout only: the graph itself is regenerated from the radius, so
/// ids stay stable without persisting the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub radius: u8,
    pub hexes: Vec<HexSnapshot>,
    pub ports: Vec<PortSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HexSnapshot {
    pub resource: Option<Resource>,
    pub token: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub color: Color,
    pub resources: ResourceBundle,
    pub dev_cards: Vec<DevCard>,
    pub roads: Vec<EdgeId>,
    pub settlements: Vec<VertexId>,
    pub cities: Vec<VertexId>,
    pub knights_played: u8,
    pub played_dev_card_this_turn: bool,
}

impl GameState {
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            config: self.config.clone(),
            board: BoardSnapshot {
                radius: self.board.radius(),
                hexes: self
                    .board
                    .hexes()
                    .iter()
                    .map(|hex| HexSnapshot {
                        resource: hex.resource,
                        token: hex.token,
                    })
                    .collect(),
                ports: self
                    .board
                    .ports()
                    .iter()
                    .map(|port| PortSpec {
                        edge: port.edge,
                        rate: port.rate,
                        resource: port.resource,
                    })
                    .collect(),
            },
            players: self
                .players
                .iter()
                .map(|player| PlayerSnapshot {
                    color: player.color,
                    resources: player.resources,
                    dev_cards: player.dev_cards.clone(),
                    roads: player.roads.iter().copied().collect(),
                    settlements: player.settlements.iter().copied().collect(),
                    cities: player.cities.iter().copied().collect(),
                    knights_played: player.knights_played,
                    played_dev_card_this_turn: player.played_dev_card_this_turn,
                })
                .collect(),
            bank_stock: *self.bank.stock(),
            development_deck: self.bank.development_deck().to_vec(),
            phase: self.phase.clone(),
            current_player: self.current_player,
            turn_owner: self.turn_owner,
            turn: self.turn,
            robber_hex: self.robber_hex,
            dice_history: self.dice_history.clone(),
            pending_discards: self.pending_discards.clone(),
            setup_road_anchor: self.setup_road_anchor,
            longest_road_holder: self.longest_road_holder,
            largest_army_holder: self.largest_army_holder,
        }
    }

    /// Rebuild a game from a snapshot. Every field is validated; any
    /// inconsistency fails with `CorruptSnapshot` and no state is produced.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self, EngineError> {
        let config = snapshot.config.clone();
        if !(2..=4).contains(&config.num_players) {
            return Err(corrupt("player count out of range"));
        }
        if snapshot.players.len() != config.num_players {
            return Err(corrupt("player list does not match configured count"));
        }
        if config.radius != snapshot.board.radius {
            return Err(corrupt("config radius disagrees with board radius"));
        }

        let board = restore_board(&snapshot.board)?;
        let num_players = config.num_players;
        let num_vertices = board.vertices().len() as u32;
        let num_edges = board.edges().len() as u32;

        if board.hex(snapshot.robber_hex).is_none() {
            return Err(corrupt("robber is off the board"));
        }
        if snapshot.current_player >= num_players || snapshot.turn_owner >= num_players {
            return Err(corrupt("active player index out of range"));
        }
        for holder in [snapshot.longest_road_holder, snapshot.largest_army_holder]
            .into_iter()
            .flatten()
        {
            if holder >= num_players {
                return Err(corrupt("title holder out of range"));
            }
        }
        for (&player, &count) in &snapshot.pending_discards {
            if player >= num_players || count == 0 {
                return Err(corrupt("pending discard entry is invalid"));
            }
        }
        match &snapshot.phase {
            TurnPhase::Setup(setup) => {
                if setup.cursor > setup.steps.len()
                    || setup.steps.iter().any(|step| step.player >= num_players)
                {
                    return Err(corrupt("setup progress is inconsistent"));
                }
            }
            TurnPhase::GameOver { winner: Some(winner) } if *winner >= num_players => {
                return Err(corrupt("winner out of range"));
            }
            _ => {}
        }
        if let Some(anchor) = snapshot.setup_road_anchor {
            if u32::from(anchor) >= num_vertices {
                return Err(corrupt("setup road anchor is off the board"));
            }
        }
        for (d1, d2) in &snapshot.dice_history {
            if !(1..=6).contains(d1) || !(1..=6).contains(d2) {
                return Err(corrupt("impossible dice in history"));
            }
        }

        // Rebuild players and derive the occupancy maps, rejecting any
        // double-claimed vertex or edge.
        let mut players = Vec::with_capacity(num_players);
        let mut buildings: BTreeMap<VertexId, Building> = BTreeMap::new();
        let mut road_owners: BTreeMap<EdgeId, usize> = BTreeMap::new();
        for (index, persisted) in snapshot.players.iter().enumerate() {
            if persisted.settlements.len() > MAX_SETTLEMENTS
                || persisted.cities.len() > MAX_CITIES
                || persisted.roads.len() > MAX_ROADS
            {
                return Err(corrupt("player exceeds piece pool"));
            }
            let mut player = PlayerState::new(persisted.color);
            player.resources = persisted.resources;
            player.dev_cards = persisted.dev_cards.clone();
            player.knights_played = persisted.knights_played;
            player.played_dev_card_this_turn = persisted.played_dev_card_this_turn;

            for (&vertex, kind) in persisted
                .settlements
                .iter()
                .map(|v| (v, BuildingKind::Settlement))
                .chain(persisted.cities.iter().map(|v| (v, BuildingKind::City)))
            {
                if u32::from(vertex) >= num_vertices {
                    return Err(corrupt("building is off the board"));
                }
                let claimed = buildings
                    .insert(
                        vertex,
                        Building {
                            owner: index,
                            kind,
                        },
                    )
                    .is_some();
                if claimed {
                    return Err(corrupt("vertex claimed twice"));
                }
                match kind {
                    BuildingKind::Settlement => player.settlements.insert(vertex),
                    _ => player.cities.insert(vertex),
                };
            }
            for &edge in &persisted.roads {
                if u32::from(edge) >= num_edges {
                    return Err(corrupt("road is off the board"));
                }
                if road_owners.insert(edge, index).is_some() {
                    return Err(corrupt("edge claimed twice"));
                }
                player.roads.insert(edge);
            }
            players.push(player);
        }

        // Conservation law: every resource type still totals the bank's
        // initial stock.
        for resource in Resource::ALL {
            let held: u32 = players
                .iter()
                .map(|p| p.resources.get(resource) as u32)
                .sum();
            if held + snapshot.bank_stock.get(resource) as u32
                != BANK_STOCK_PER_RESOURCE as u32
            {
                return Err(corrupt("resource conservation violated"));
            }
        }

        let bank = Bank::restore(snapshot.bank_stock, snapshot.development_deck.clone());
        let rng = StdRng::seed_from_u64(config.seed.wrapping_add(snapshot.turn as u64));
        let mut state = GameState {
            config,
            board,
            players,
            bank,
            phase: snapshot.phase.clone(),
            current_player: snapshot.current_player,
            turn_owner: snapshot.turn_owner,
            turn: snapshot.turn,
            robber_hex: snapshot.robber_hex,
            dice_history: snapshot.dice_history.clone(),
            buildings,
            road_owners,
            pending_discards: snapshot.pending_discards.clone(),
            setup_road_anchor: snapshot.setup_road_anchor,
            longest_road_holder: snapshot.longest_road_holder,
            longest_road_lengths: vec![0; num_players],
            largest_army_holder: snapshot.largest_army_holder,
            rng,
        };
        // Cached lengths are derived; the holders stay as persisted because
        // of the tie-retention rule.
        state.recompute_road_lengths();
        Ok(state)
    }

    /// Thin file wrapper over the snapshot, pretty JSON.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(io::BufWriter::new(file), &self.to_snapshot())
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))
    }

    /// Load a game from a snapshot file. Any read, parse or validation
    /// failure is a `CorruptSnapshot`; no partial state is produced.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let file = std::fs::File::open(path)
            .map_err(|err| corrupt(&format!("cannot open snapshot: {err}")))?;
        let snapshot: Snapshot = serde_json::from_reader(io::BufReader::new(file))
            .map_err(|err| corrupt(&format!("cannot parse snapshot: {err}")))?;
        Self::from_snapshot(&snapshot)
    }
}

fn restore_board(snapshot: &BoardSnapshot) -> Result<Board, EngineError> {
    for hex in &snapshot.hexes {
        match (hex.resource, hex.token) {
            (None, Some(_)) => return Err(corrupt("desert hex carries a token")),
            (Some(_), None) => return Err(corrupt("producing hex is missing its token")),
            _ => {}
        }
    }
    let layout = BoardLayout {
        radius: snapshot.radius,
        resources: snapshot.hexes.iter().map(|hex| hex.resource).collect(),
        tokens: snapshot.hexes.iter().filter_map(|hex| hex.token).collect(),
        ports: Some(snapshot.ports.clone()),
        shuffle: false,
    };
    // The rng is unused with a pinned, unshuffled layout.
    let mut rng = StdRng::seed_from_u64(0);
    Board::generate(&layout, &mut rng)
        .map_err(|err| corrupt(&format!("board does not reconstruct: {err}")))
}

fn corrupt(message: &str) -> EngineError {
    EngineError::CorruptSnapshot(message.to_string())
}
