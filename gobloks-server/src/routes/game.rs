//! Game lifecycle and move endpoints

use crate::config::GameConfig;
use crate::game::lock_game;
use crate::routes::{ApiError, PlayerSession, ACCESS_TOKEN};
use crate::state::ServerState;
use crate::store::{GameId, GameRecord};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use gobloks_core::{PlayerId, Point};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Lobby page size
const PAGE_SIZE: usize = 20;

/// Create a game from a config body
pub async fn create_game(
    State(state): State<Arc<ServerState>>,
    Json(config): Json<GameConfig>,
) -> Result<impl IntoResponse, ApiError> {
    let gid = state.manager.create(config)?;
    Ok((StatusCode::CREATED, Json(json!({ "gid": gid }))))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
}

/// Public games still waiting for players
pub async fn list_games(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<GameRecord>> {
    Json(state.manager.waiting_games(query.page.unwrap_or(0), PAGE_SIZE))
}

#[derive(Deserialize)]
pub struct JoinRequest {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Serialize)]
pub struct JoinResponse {
    pub gid: GameId,
    pub pid: PlayerId,
    pub token: String,
}

/// Take the next free seat. The token comes back in the body and the
/// `Access-Token` header.
pub async fn join_game(
    State(state): State<Arc<ServerState>>,
    Path(gid): Path<GameId>,
    Json(req): Json<JoinRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    let (pid, token) = state.manager.join(gid, name, &req.color)?;
    let header = HeaderValue::from_str(&token).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [(HeaderName::from_static(ACCESS_TOKEN), header)],
        Json(JoinResponse { gid, pid, token }),
    ))
}

#[derive(Deserialize)]
pub struct PlaceRequest {
    pub coordinates: Vec<Point>,
}

/// Place a piece covering the given cells
pub async fn place_piece(
    State(state): State<Arc<ServerState>>,
    PlayerSession(session): PlayerSession,
    Json(req): Json<PlaceRequest>,
) -> Result<StatusCode, ApiError> {
    let game = state
        .manager
        .find(session.gid)
        .ok_or_else(|| ApiError::NotFound(format!("game not found: {}", session.gid)))?;
    lock_game(&game).place_piece(session.pid, &req.coordinates)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Spend a hint
pub async fn get_hint(
    State(state): State<Arc<ServerState>>,
    PlayerSession(session): PlayerSession,
) -> Result<Json<Point>, ApiError> {
    let game = state
        .manager
        .find(session.gid)
        .ok_or_else(|| ApiError::NotFound(format!("game not found: {}", session.gid)))?;
    let hint = lock_game(&game).hint(session.pid)?;
    Ok(Json(hint))
}
