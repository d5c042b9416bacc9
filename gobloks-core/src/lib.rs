//! Gobloks Core - Pieces, board geometry and placement search
//!
//! This crate provides the rules engine for Gobloks:
//! - Polyomino bitboards with canonical hashing
//! - Concurrent enumeration of every piece up to a degree
//! - Circular board with per-player origins and corner-touch legality
//! - Parallel search for legal placements
//! - Game state, status flags and scoring

pub mod board;
pub mod circle;
pub mod eval;
pub mod game;
pub mod generator;
pub mod piece;
pub mod search;

// Re-exports for convenient access
pub use board::{Board, BoardError, Owner, PlayerId, Point, PID_NONE};
pub use eval::{evaluate, Evaluation, PlayerEval};
pub use game::{next_in_rotation, winners, GameState, GameStatus, PlayerStatus};
pub use generator::{generate_next_pieces, generate_piece_set, GeneratedPieces};
pub use piece::{Axis, Piece, PieceError, PieceSet, MAX_DEGREE};
pub use search::{has_placement, search, search_from, Placement};
