//! Integration tests for gobloks-server API

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use gobloks_server::{create_router, ServerConfig, ServerState, ACCESS_TOKEN};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_app() -> Router {
    let config = ServerConfig::default();
    let state = Arc::new(ServerState::new(config.clone()));
    create_router(&config, state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, headers, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header(ACCESS_TOKEN, token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn create_game(app: &Router, config: Value) -> u64 {
    let (status, _, json) = send(app, json_request("POST", "/api/games", config, None)).await;
    assert_eq!(status, StatusCode::CREATED);
    json["gid"].as_u64().unwrap()
}

async fn join(app: &Router, gid: u64, name: &str) -> (u64, String) {
    let uri = format!("/api/games/{}/join", gid);
    let body = json!({ "name": name, "color": "#123456" });
    let (status, headers, json) = send(app, json_request("POST", &uri, body, None)).await;
    assert_eq!(status, StatusCode::OK);
    let token = json["token"].as_str().unwrap().to_string();
    assert_eq!(headers.get(ACCESS_TOKEN).unwrap().to_str().unwrap(), token);
    (json["pid"].as_u64().unwrap(), token)
}

async fn origin_of(app: &Router, gid: u64, pid: u64) -> Value {
    let (status, _, board) = send(app, get(&format!("/api/games/{}/board", gid))).await;
    assert_eq!(status, StatusCode::OK);
    board["origins"]
        .as_array()
        .unwrap()
        .iter()
        .find(|entry| entry[0] == pid)
        .map(|entry| entry[1].clone())
        .unwrap()
}

#[tokio::test]
async fn test_status_endpoint() {
    let app = test_app();
    let (status, _, json) = send(&app, get("/api/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["engine"], "gobloks");
    assert_eq!(json["games"], 0);
}

#[tokio::test]
async fn test_pieces_endpoint() {
    let app = test_app();

    let (status, _, json) = send(&app, get("/api/pieces?degree=4")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 9);
    assert_eq!(json["totalCells"], 29);
    assert_eq!(json["pieces"][0]["body"], 1);

    let (status, _, json) = send(&app, get("/api/pieces?degree=9")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("degree"));
}

#[tokio::test]
async fn test_create_and_list() {
    let app = test_app();

    let (status, _, _) = send(
        &app,
        json_request("POST", "/api/games", json!({ "players": 0 }), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let gid = create_game(&app, json!({ "players": 2, "blockDegree": 3 })).await;
    let (status, _, json) = send(&app, get("/api/games?page=0")).await;
    assert_eq!(status, StatusCode::OK);
    let games = json.as_array().unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0]["gid"], gid);
    assert_eq!(games[0]["config"]["blockDegree"], 3);

    let (_, _, json) = send(&app, get("/api/games?page=1")).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_join_unknown_game() {
    let app = test_app();
    let body = json!({ "name": "ana" });
    let (status, _, _) = send(&app, json_request("POST", "/api/games/42/join", body, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_place_requires_token() {
    let app = test_app();
    let body = json!({ "coordinates": [{ "x": 0, "y": 0 }] });

    let (status, _, _) = send(&app, json_request("PUT", "/api/place", body.clone(), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(&app, json_request("PUT", "/api/place", body, Some("bogus"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_play_flow() {
    let app = test_app();
    let gid = create_game(&app, json!({ "players": 2, "blockDegree": 3, "hints": 1 })).await;
    let (pid1, token1) = join(&app, gid, "ana").await;
    assert_eq!(pid1, 1);

    let origin = origin_of(&app, gid, 1).await;
    let place = json!({ "coordinates": [origin.clone()] });

    // second seat still empty
    let (status, _, json) =
        send(&app, json_request("PUT", "/api/place", place.clone(), Some(&token1))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "waiting for all players");

    let (_, token2) = join(&app, gid, "bo").await;
    let (_, _, lobby) = send(&app, get("/api/games")).await;
    assert!(lobby.as_array().unwrap().is_empty());

    let (status, _, hint) = send(&app, json_request("GET", "/api/hint", json!({}), Some(&token1))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hint, origin);
    let (status, _, json) = send(&app, json_request("GET", "/api/hint", json!({}), Some(&token1))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "no more hints");

    let (status, _, json) =
        send(&app, json_request("PUT", "/api/place", place.clone(), Some(&token2))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "not your turn");

    let (status, _, _) =
        send(&app, json_request("PUT", "/api/place", place.clone(), Some(&token1))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, _, board) = send(&app, get(&format!("/api/games/{}/board", gid))).await;
    assert_eq!(board["turn"], 2);
    let x = origin["x"].as_u64().unwrap() as usize;
    let y = origin["y"].as_u64().unwrap() as usize;
    assert_eq!(board["layout"][x][y], 1);
}

#[tokio::test]
async fn test_oversized_clock_rejected() {
    let app = test_app();
    let body = json!({ "players": 2, "timeControlSeconds": u64::MAX });
    let (status, _, json) = send(&app, json_request("POST", "/api/games", body, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("time control"));

    let body = json!({ "players": 2, "timeControlSeconds": 60, "timeBonusSeconds": u64::MAX });
    let (status, _, _) = send(&app, json_request("POST", "/api/games", body, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, _, lobby) = send(&app, get("/api/games")).await;
    assert!(lobby.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_extreme_coordinates_rejected() {
    let app = test_app();
    let gid = create_game(&app, json!({ "players": 2, "blockDegree": 3 })).await;
    let (_, token) = join(&app, gid, "ana").await;
    join(&app, gid, "bo").await;

    let far = json!({ "coordinates": [
        { "x": i32::MAX, "y": 0 },
        { "x": i32::MIN, "y": 0 },
    ] });
    let (status, _, json) = send(&app, json_request("PUT", "/api/place", far, Some(&token))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "invalid placement");

    let negative = json!({ "coordinates": [{ "x": -3, "y": -3 }] });
    let (status, _, _) =
        send(&app, json_request("PUT", "/api/place", negative, Some(&token))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // the game is still playable afterwards
    let (status, _, board) = send(&app, get(&format!("/api/games/{}/board", gid))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["turn"], 1);
}
