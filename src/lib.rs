#![warn(clippy::all)]
#![deny(rust_2018_idioms)]

pub mod board;
pub mod coords;
pub mod error;
pub mod game;
pub mod players;
pub mod types;

pub use board::{Board, BoardLayout, EdgeId, HexId, Port, PortSpec, VertexId};
pub use error::{EngineError, PlacementError};
pub use game::{
    Action, DevCardPlay, Game, GameConfig, GameEvent, GameState, ResourceBundle, Snapshot,
    TurnPhase,
};
pub use players::{BasePlayer, GreedyPlayer, RandomPlayer};
pub use types::{BuildingKind, Color, DevelopmentCard, Resource};
