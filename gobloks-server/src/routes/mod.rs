//! HTTP route handlers

pub mod board;
pub mod game;
pub mod pieces;
pub mod play;
pub mod status;

use crate::game::{ActionError, GameError};
use crate::manager::Session;
use crate::state::ServerState;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Header carrying the session token
pub const ACCESS_TOKEN: &str = "access-token";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("missing or unknown access token")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl From<ActionError> for ApiError {
    fn from(e: ActionError) -> Self {
        ApiError::Conflict(e.to_string())
    }
}

impl From<GameError> for ApiError {
    fn from(e: GameError) -> Self {
        match e {
            GameError::Config(_) | GameError::Piece(_) | GameError::Board(_) => {
                ApiError::BadRequest(e.to_string())
            }
            GameError::NotFound(_) => ApiError::NotFound(e.to_string()),
            GameError::Action(action) => action.into(),
            GameError::Store(_) | GameError::Spawn(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// The player a request speaks for, resolved from the `Access-Token` header
#[derive(Clone, Copy, Debug)]
pub struct PlayerSession(pub Session);

#[axum::async_trait]
impl FromRequestParts<Arc<ServerState>> for PlayerSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ServerState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(ACCESS_TOKEN)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;
        state
            .manager
            .resolve_token(token)
            .map(PlayerSession)
            .ok_or(ApiError::Unauthorized)
    }
}
