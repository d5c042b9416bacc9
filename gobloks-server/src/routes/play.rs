//! Game websocket
//!
//! One socket per seated player. Game events arrive on an unbounded
//! channel registered with the game; the socket task forwards them and
//! relays chat back in. Closing the socket starts the player's
//! disconnect grace period.

use crate::game::{lock_game, SharedGame};
use crate::manager::Session;
use crate::messages::ClientMessage;
use crate::routes::ApiError;
use crate::state::ServerState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Deserialize)]
pub struct PlayQuery {
    pub token: String,
}

/// Upgrade to a websocket for the player owning `token`
pub async fn play_socket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
    Query(query): Query<PlayQuery>,
) -> Result<Response, ApiError> {
    let session = state
        .manager
        .resolve_token(&query.token)
        .ok_or(ApiError::Unauthorized)?;
    let game = state
        .manager
        .find(session.gid)
        .ok_or_else(|| ApiError::NotFound(format!("game not found: {}", session.gid)))?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, game, session)))
}

async fn handle_socket(mut socket: WebSocket, game: SharedGame, session: Session) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let connected = lock_game(&game).connect_socket(session.pid, tx);
    let conn = match connected {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(gid = session.gid, pid = session.pid, error = %e, "socket rejected");
            return;
        }
    };

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                let Some(msg) = outbound else { break };
                let text = match serde_json::to_string(&*msg) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to encode socket message");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(ClientMessage::Chat { message }) => {
                            lock_game(&game).chat(session.pid, &message);
                        }
                        Err(e) => {
                            tracing::debug!(pid = session.pid, error = %e, "ignoring malformed client message");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    }

    lock_game(&game).disconnect_socket(session.pid, conn);
}
