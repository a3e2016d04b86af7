use crate::board::{EdgeId, HexId, VertexId};
use crate::game::resources::ResourceError;
use crate::types::BuildingKind;

/// Every way the engine can reject a request. All variants are recoverable:
/// the driver reports the message and the game state is untouched.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    ConfigError(String),
    #[error("action not allowed: {0}")]
    IllegalAction(&'static str),
    #[error("illegal placement: {0}")]
    IllegalPlacement(#[from] PlacementError),
    #[error("insufficient resources: {0}")]
    InsufficientResources(#[from] ResourceError),
    #[error("no {0} pieces left")]
    OutOfStock(BuildingKind),
    #[error("development deck is empty")]
    DeckEmpty,
    #[error("card not playable: {0}")]
    CardNotPlayable(&'static str),
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

/// Graph-rule violations surfaced by settlement/road/robber placement.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error("vertex {0} is not on the board")]
    UnknownVertex(VertexId),
    #[error("edge {0} is not on the board")]
    UnknownEdge(EdgeId),
    #[error("hex {0} is not on the board")]
    UnknownHex(HexId),
    #[error("vertex {0} is already occupied")]
    VertexOccupied(VertexId),
    #[error("another building is within one edge")]
    TooCloseToBuilding,
    #[error("placement does not connect to your network")]
    NotConnected,
    #[error("edge {0} already carries a road")]
    EdgeOccupied(EdgeId),
    #[error("no settlement of yours on vertex {0}")]
    NotYourSettlement(VertexId),
    #[error("robber must move to a different hex")]
    RobberMustMove,
    #[error("chosen victim cannot be robbed at that hex")]
    InvalidVictim,
}
