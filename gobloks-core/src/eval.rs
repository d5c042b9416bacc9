//! Position evaluation
//!
//! Mobility is the number of distinct legal placements a player has. It is
//! recomputed here from a full search, independent of any incrementally
//! maintained cache, so it doubles as an audit of that cache.

use crate::board::PlayerId;
use crate::game::GameState;
use crate::piece::PieceSet;
use crate::search::search;
use serde::{Deserialize, Serialize};

/// One player's standing in an evaluated position
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEval {
    pub pid: PlayerId,
    pub mobility: usize,
    pub remaining_cells: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub turn: PlayerId,
    pub players: Vec<PlayerEval>,
}

impl Evaluation {
    pub fn player(&self, pid: PlayerId) -> Option<&PlayerEval> {
        self.players.iter().find(|p| p.pid == pid)
    }

    /// Player with the most legal placements, lowest id on ties
    pub fn most_mobile(&self) -> Option<PlayerId> {
        self.players
            .iter()
            .max_by(|a, b| a.mobility.cmp(&b.mobility).then(b.pid.cmp(&a.pid)))
            .map(|p| p.pid)
    }
}

pub fn evaluate(state: &GameState, inventories: &[(PlayerId, PieceSet)]) -> Evaluation {
    let players = inventories
        .iter()
        .map(|(pid, pieces)| PlayerEval {
            pid: *pid,
            mobility: search(&state.board, *pid, pieces, false).len(),
            remaining_cells: pieces.total_cells(),
        })
        .collect();
    Evaluation { turn: state.turn, players }
}
