use serde::{Deserialize, Serialize};

use crate::board::{EdgeId, HexId, VertexId};
use crate::game::resources::ResourceBundle;
use crate::types::{DevelopmentCard, Resource};

/// Everything a driver can ask the engine to do. The resolver dispatches on
/// this closed set exhaustively; invalid requests are rejected without
/// mutating state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Roll for production. `dice` pins the dice for replays and tests;
    /// `None` rolls with the game rng.
    RollDice { dice: Option<(u8, u8)> },
    /// Hand the named cards back to the bank after a rolled 7.
    DiscardResources { resources: ResourceBundle },
    /// Move the robber and optionally rob one adjacent building owner.
    MoveRobber { hex: HexId, victim: Option<usize> },
    BuildRoad { edge: EdgeId },
    BuildSettlement { vertex: VertexId },
    BuildCity { vertex: VertexId },
    BuyDevelopmentCard,
    /// Play the hand card at `index` with its required arguments.
    PlayDevelopmentCard { index: usize, play: DevCardPlay },
    /// Trade with the bank, through a port when one improves the rate. An
    /// explicit rate may be worse than the entitled one, never better.
    BankTrade {
        give: Resource,
        receive: Resource,
        rate: Option<u8>,
    },
    /// Swap bundles with another player. Agreement is supplied by the
    /// driver; the engine checks both sides can pay and swaps atomically.
    PlayerTrade {
        partner: usize,
        give: ResourceBundle,
        receive: ResourceBundle,
    },
    /// Close the trade window and move on to building.
    FinishTrading,
    EndTurn,
}

/// Arguments for the playable development cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DevCardPlay {
    Knight {
        hex: HexId,
        victim: Option<usize>,
    },
    RoadBuilding {
        edges: (EdgeId, EdgeId),
    },
    YearOfPlenty {
        first: Resource,
        second: Resource,
    },
    Monopoly {
        resource: Resource,
    },
}

impl DevCardPlay {
    pub fn card(&self) -> DevelopmentCard {
        match self {
            DevCardPlay::Knight { .. } => DevelopmentCard::Knight,
            DevCardPlay::RoadBuilding { .. } => DevelopmentCard::RoadBuilding,
            DevCardPlay::YearOfPlenty { .. } => DevelopmentCard::YearOfPlenty,
            DevCardPlay::Monopoly { .. } => DevelopmentCard::Monopoly,
        }
    }
}

/// What actually happened when an action resolved. Returned to the driver
/// for rendering and logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    DiceRolled {
        player: usize,
        dice: (u8, u8),
        sum: u8,
    },
    ProductionPaid {
        player: usize,
        resources: ResourceBundle,
    },
    /// The bank could not cover every claim on a resource, so nobody was
    /// paid for it this roll.
    ProductionShorted {
        resource: Resource,
    },
    StartingResourcesGranted {
        player: usize,
        resources: ResourceBundle,
    },
    DiscardRequired {
        player: usize,
        count: u8,
    },
    ResourcesDiscarded {
        player: usize,
        resources: ResourceBundle,
    },
    RobberMoved {
        player: usize,
        hex: HexId,
        victim: Option<usize>,
        stolen: Option<Resource>,
    },
    RoadBuilt {
        player: usize,
        edge: EdgeId,
    },
    SettlementBuilt {
        player: usize,
        vertex: VertexId,
    },
    CityBuilt {
        player: usize,
        vertex: VertexId,
    },
    DevelopmentCardBought {
        player: usize,
    },
    DevelopmentCardPlayed {
        player: usize,
        card: DevelopmentCard,
    },
    MonopolyClaimed {
        player: usize,
        resource: Resource,
        total: u8,
    },
    Traded {
        player: usize,
        partner: Option<usize>,
        gave: ResourceBundle,
        received: ResourceBundle,
    },
    LongestRoadChanged {
        holder: Option<usize>,
        length: u8,
    },
    LargestArmyChanged {
        holder: Option<usize>,
        size: u8,
    },
    TurnEnded {
        next_player: usize,
    },
    GameWon {
        winner: usize,
    },
}
