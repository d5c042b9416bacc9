//! Socket message payloads
//!
//! Everything pushed to a client is one variant of [`SocketMessage`],
//! serialized as `{"type": "...", "data": ...}`.

use gobloks_core::{GameStatus, Owner, PieceSet, PlayerId, PlayerStatus, Placement};
use serde::{Deserialize, Serialize};

/// Public view of one seat
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub pid: PlayerId,
    pub name: String,
    pub color: String,
    pub status: PlayerStatus,
    /// Clock remaining in milliseconds, absent for untimed games
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SocketMessage {
    PlayerUpdate(Vec<PlayerSummary>),
    BoardState(Vec<Vec<Owner>>),
    PrivateGameState {
        pid: PlayerId,
        pieces: PieceSet,
        hints: u32,
    },
    ChatMessage {
        /// Sender, or 0 for system notices
        origin: PlayerId,
        message: String,
    },
    GameStatus {
        turn: PlayerId,
        status: GameStatus,
    },
    BoardUpdate {
        owner: PlayerId,
        #[serde(rename = "placedCells")]
        placed_cells: Placement,
    },
}

impl SocketMessage {
    pub fn system(message: impl Into<String>) -> Self {
        SocketMessage::ChatMessage { origin: 0, message: message.into() }
    }
}

/// What a client may send over its socket
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    Chat { message: String },
}
