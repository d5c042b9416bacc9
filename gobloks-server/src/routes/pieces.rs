//! Piece set preview
//!
//! Lets the lobby show which shapes a given block degree hands out.

use crate::routes::ApiError;
use axum::{extract::Query, Json};
use gobloks_core::{generate_piece_set, Piece};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct PiecesQuery {
    pub degree: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PiecesResponse {
    pub degree: usize,
    pub count: usize,
    pub total_cells: usize,
    pub pieces: Vec<Piece>,
}

/// Get every piece up to `degree` (default 5)
pub async fn get_pieces(Query(query): Query<PiecesQuery>) -> Result<Json<PiecesResponse>, ApiError> {
    let degree = query.degree.unwrap_or(5);
    let generated =
        generate_piece_set(degree).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(PiecesResponse {
        degree,
        count: generated.pieces.len(),
        total_cells: generated.total_cells,
        pieces: generated.pieces.sorted(),
    }))
}
