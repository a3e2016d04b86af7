pub mod action;
pub mod bank;
pub mod game;
pub mod players;
pub mod resources;
pub mod scoring;
pub mod snapshot;
pub mod state;

pub use action::{Action, DevCardPlay, GameEvent};
pub use bank::{Bank, BANK_STOCK_PER_RESOURCE};
pub use game::{Game, TURN_LIMIT};
pub use players::{DevCard, PlayerState, MAX_CITIES, MAX_ROADS, MAX_SETTLEMENTS};
pub use resources::{
    ResourceBundle, ResourceError, CITY_COST, DEV_CARD_COST, ROAD_COST, SETTLEMENT_COST,
};
pub use scoring::{LARGEST_ARMY_MINIMUM, LONGEST_ROAD_MINIMUM};
pub use snapshot::{BoardSnapshot, HexSnapshot, PlayerSnapshot, Snapshot};
pub use state::{Building, GameConfig, GameState, SetupState, TurnPhase, DISCARD_LIMIT};
