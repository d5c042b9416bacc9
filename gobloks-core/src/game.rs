//! Game state, status flags and scoring

use crate::board::{Board, PlayerId, PID_NONE};
use crate::piece::PieceSet;
use serde::{Deserialize, Serialize};

// ============================================================================
// STATUS FLAGS
// ============================================================================

/// Per-player status bits
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerStatus(pub u8);

impl PlayerStatus {
    pub const JOINED: u8 = 1;
    pub const CONNECTED: u8 = 2;
    pub const DISABLED: u8 = 4;
    pub const TIMED_OUT: u8 = 8;
    pub const WINNER: u8 = 16;
    pub const DRAWN: u8 = 32;

    pub fn has(self, flags: u8) -> bool {
        self.0 & flags == flags
    }

    pub fn has_any(self, flags: u8) -> bool {
        self.0 & flags != 0
    }

    pub fn set(&mut self, flags: u8) {
        self.0 |= flags;
    }

    pub fn clear(&mut self, flags: u8) {
        self.0 &= !flags;
    }

    /// Joined and still allowed to move
    pub fn is_active(self) -> bool {
        self.has(Self::JOINED) && !self.has_any(Self::DISABLED)
    }
}

/// Per-game status bits
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameStatus(pub u8);

impl GameStatus {
    pub const FULL: u8 = 1;
    pub const IN_PROGRESS: u8 = 2;
    pub const COMPLETE: u8 = 4;

    pub fn has(self, flags: u8) -> bool {
        self.0 & flags == flags
    }

    pub fn set(&mut self, flags: u8) {
        self.0 |= flags;
    }

    pub fn clear(&mut self, flags: u8) {
        self.0 &= !flags;
    }

    pub fn label(self) -> &'static str {
        if self.has(Self::COMPLETE) {
            "complete"
        } else if self.has(Self::IN_PROGRESS) {
            "in progress"
        } else if self.has(Self::FULL) {
            "full"
        } else {
            "waiting"
        }
    }
}

// ============================================================================
// GAME STATE
// ============================================================================

/// Everything that changes as pieces are placed. Cloning gives an
/// independent copy suitable for analysis off the game lock.
#[derive(Clone, Debug)]
pub struct GameState {
    pub board: Board,
    pub turn: PlayerId,
    pub status: GameStatus,
}

impl GameState {
    pub fn new(board: Board) -> Self {
        Self { board, turn: PID_NONE, status: GameStatus::default() }
    }

    pub fn is_complete(&self) -> bool {
        self.status.has(GameStatus::COMPLETE)
    }
}

/// Next player after `current` in seat order that passes `eligible`,
/// wrapping around and considering `current` itself last
pub fn next_in_rotation(
    seats: &[PlayerId],
    current: PlayerId,
    mut eligible: impl FnMut(PlayerId) -> bool,
) -> Option<PlayerId> {
    if seats.is_empty() {
        return None;
    }
    let start = seats
        .iter()
        .position(|&pid| pid == current)
        .map(|i| i + 1)
        .unwrap_or(0);
    (0..seats.len())
        .map(|offset| seats[(start + offset) % seats.len()])
        .find(|&pid| eligible(pid))
}

/// Players with the fewest unplaced cells
pub fn winners<'a>(inventories: impl IntoIterator<Item = (PlayerId, &'a PieceSet)>) -> Vec<PlayerId> {
    let scores: Vec<(PlayerId, usize)> = inventories
        .into_iter()
        .map(|(pid, pieces)| (pid, pieces.total_cells()))
        .collect();
    let Some(best) = scores.iter().map(|&(_, score)| score).min() else {
        return Vec::new();
    };
    scores
        .into_iter()
        .filter(|&(_, score)| score == best)
        .map(|(pid, _)| pid)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
