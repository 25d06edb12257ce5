//! Shared fixtures for integration tests
//!
//! Provides the reference upstream payload (three sports, LeBron James, one
//! Points projection at 27.5) both as raw JSON and as a ready-to-serve
//! fixture upstream on an ephemeral local port.

#![allow(dead_code)]

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use propfeed::data::RawPayload;

/// Fixture body for the `/leagues` endpoint
pub const LEAGUES_JSON: &str = r#"{
    "data": [
        {"type": "league", "id": "7", "attributes": {"name": "NBA", "active": true}},
        {"type": "league", "id": "2", "attributes": {"name": "NFL", "active": true}},
        {"type": "league", "id": "4", "attributes": {"name": "NHL", "active": true}}
    ]
}"#;

/// Fixture body for the `/projections` endpoint
pub const PROJECTIONS_JSON: &str = r#"{
    "data": [
        {
            "type": "projection",
            "id": "proj-1",
            "attributes": {
                "stat_type": "Points",
                "line_score": 27.5,
                "start_time": "2026-01-15T19:30:00Z",
                "is_active": true
            },
            "relationships": {
                "new_player": {"data": {"type": "new_player", "id": "lebron-1"}},
                "league": {"data": {"type": "league", "id": "7"}},
                "game": {"data": {"type": "game", "id": "game-1"}}
            }
        }
    ],
    "included": [
        {
            "type": "new_player",
            "id": "lebron-1",
            "attributes": {"name": "LeBron James", "team": "LAL", "position": "F"}
        },
        {
            "type": "game",
            "id": "game-1",
            "attributes": {"home_team": "LAL", "away_team": "BOS", "status": "scheduled"}
        }
    ]
}"#;

/// Returns the reference scenario as a raw payload
pub fn scenario_payload() -> RawPayload {
    RawPayload {
        leagues: LEAGUES_JSON.to_string(),
        projections: PROJECTIONS_JSON.to_string(),
    }
}

/// Serves the fixture payload on an ephemeral local port
///
/// Returns the base URL to point the upstream client at and the server task
/// handle; abort the handle to simulate the upstream going away.
pub async fn spawn_fixture_upstream() -> (String, JoinHandle<()>) {
    let app = Router::new()
        .route("/leagues", get(|| async { LEAGUES_JSON }))
        .route("/projections", get(|| async { PROJECTIONS_JSON }));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fixture upstream");
    let addr = listener.local_addr().expect("Fixture has a local addr");

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}"), handle)
}
