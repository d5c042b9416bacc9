//! Board snapshot endpoint

use crate::game::lock_game;
use crate::routes::ApiError;
use crate::state::ServerState;
use crate::store::GameId;
use axum::{
    extract::{Path, State},
    Json,
};
use gobloks_core::{GameStatus, Owner, PlayerId, Point};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct BoardInfo {
    pub gid: GameId,
    pub radius: i32,
    pub diameter: usize,
    pub turn: PlayerId,
    pub status: GameStatus,
    pub origins: Vec<(PlayerId, Point)>,
    pub layout: Vec<Vec<Owner>>,
}

/// Get the full board of one game, for spectators and reloads
pub async fn get_board(
    State(state): State<Arc<ServerState>>,
    Path(gid): Path<GameId>,
) -> Result<Json<BoardInfo>, ApiError> {
    let game = state
        .manager
        .find(gid)
        .ok_or_else(|| ApiError::NotFound(format!("game not found: {}", gid)))?;
    let game = lock_game(&game);
    let board = &game.state().board;

    Ok(Json(BoardInfo {
        gid,
        radius: board.radius(),
        diameter: board.diameter(),
        turn: game.turn(),
        status: game.status(),
        origins: board
            .players()
            .into_iter()
            .filter_map(|pid| board.origin(pid).map(|p| (pid, p)))
            .collect(),
        layout: board.snapshot(),
    }))
}
