//! Thin HTTP surface over the cache core
//!
//! Route declarations and response shaping only; every handler is a direct
//! call into the [`QueryEngine`] or the scheduler handle and returns plain
//! JSON of the core's data structures. CORS is permissive.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/sports` | List all sports |
//! | `GET` | `/api/sports/{id}` | Get one sport |
//! | `GET` | `/api/players` | List players, `?sport_id=` optional |
//! | `GET` | `/api/players/{name}` | Get one player by name |
//! | `GET` | `/api/projections` | List projections, filtered and optionally paginated |
//! | `GET` | `/api/games` | List games, `?sport_id=` optional |
//! | `GET` | `/api/games/{id}` | Get one game |
//! | `POST` | `/api/refresh` | Trigger a coalesced refresh |
//! | `GET` | `/api/status` | Scheduler health |

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::data::Projection;
use crate::query::{ProjectionFilter, QueryEngine};
use crate::scheduler::SchedulerHandle;

/// Shared state injected into every handler
#[derive(Clone)]
pub struct AppState {
    /// Read side of the cache
    pub query: QueryEngine,
    /// Trigger/status handle of the refresh scheduler
    pub scheduler: SchedulerHandle,
}

/// Errors surfaced by the HTTP layer
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested entity does not exist in the current snapshot
    #[error("not found: {0}")]
    NotFound(String),

    /// A query parameter failed validation
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::InvalidParameter(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

/// Query parameters for the player and game listing endpoints
#[derive(Debug, Deserialize)]
pub struct SportQuery {
    /// Restrict the listing to one sport
    pub sport_id: Option<u32>,
}

/// Query parameters for the projections listing endpoint
#[derive(Debug, Deserialize)]
pub struct ProjectionsQuery {
    /// Restrict to one sport by ID
    pub sport_id: Option<u32>,
    /// Restrict to one player by case-insensitive exact name
    pub player_name: Option<String>,
    /// Restrict to one stat type, case-insensitive
    pub stat_type: Option<String>,
    /// Restrict to projections attached to one game
    pub game_id: Option<String>,
    /// Page number, starting from 1; paginates when given with `page_size`
    pub page: Option<u32>,
    /// Items per page (1-100); paginates when given with `page`
    pub page_size: Option<u32>,
}

/// One page of projections plus pagination metadata
#[derive(Debug, Serialize)]
pub struct ProjectionPage {
    /// Projections on this page
    pub projections: Vec<Projection>,
    /// Page number, starting from 1
    pub page: u32,
    /// Requested items per page
    pub page_size: u32,
    /// Total matching projections across all pages
    pub total_items: usize,
    /// Total number of pages
    pub total_pages: u32,
}

/// Response body for `POST /api/refresh`
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// Whether this request queued a new trigger (false = coalesced into a
    /// pending or in-flight cycle)
    pub triggered: bool,
}

/// Build the complete router for the service
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/api/sports", get(list_sports))
        .route("/api/sports/{id}", get(get_sport))
        .route("/api/players", get(list_players))
        .route("/api/players/{name}", get(get_player))
        .route("/api/projections", get(list_projections))
        .route("/api/games", get(list_games))
        .route("/api/games/{id}", get(get_game))
        .route("/api/refresh", post(force_refresh))
        .route("/api/status", get(status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "propfeed - cached fantasy sports projections API"
    }))
}

async fn list_sports(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.query.list_sports())
}

async fn get_sport(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .query
        .get_sport(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("sport {id}")))
}

async fn list_players(
    State(state): State<AppState>,
    Query(params): Query<SportQuery>,
) -> impl IntoResponse {
    Json(state.query.list_players(params.sport_id))
}

async fn get_player(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .query
        .get_player(&name)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("player '{name}'")))
}

async fn list_projections(
    State(state): State<AppState>,
    Query(params): Query<ProjectionsQuery>,
) -> Result<Response, ApiError> {
    let filter = ProjectionFilter {
        sport_id: params.sport_id,
        player_name: params.player_name,
        stat_type: params.stat_type,
        game_id: params.game_id,
    };
    let projections = state.query.list_projections(&filter);

    match (params.page, params.page_size) {
        (Some(page), Some(page_size)) => {
            Ok(Json(paginate(projections, page, page_size)?).into_response())
        }
        (None, None) => Ok(Json(projections).into_response()),
        _ => Err(ApiError::InvalidParameter(
            "page and page_size must be supplied together".to_string(),
        )),
    }
}

/// Slices one page out of the full result set
///
/// A page past the end yields an empty page with intact metadata rather
/// than an error.
fn paginate(
    projections: Vec<Projection>,
    page: u32,
    page_size: u32,
) -> Result<ProjectionPage, ApiError> {
    if page < 1 {
        return Err(ApiError::InvalidParameter(
            "page must be at least 1".to_string(),
        ));
    }
    if !(1..=100).contains(&page_size) {
        return Err(ApiError::InvalidParameter(
            "page_size must be between 1 and 100".to_string(),
        ));
    }

    let total_items = projections.len();
    let total_pages = total_items.div_ceil(page_size as usize) as u32;
    let start = (page as usize - 1).saturating_mul(page_size as usize);
    let projections = projections
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .collect();

    Ok(ProjectionPage {
        projections,
        page,
        page_size,
        total_items,
        total_pages,
    })
}

async fn list_games(
    State(state): State<AppState>,
    Query(params): Query<SportQuery>,
) -> impl IntoResponse {
    Json(state.query.list_games(params.sport_id))
}

async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .query
        .get_game(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("game '{id}'")))
}

async fn force_refresh(State(state): State<AppState>) -> impl IntoResponse {
    let triggered = state.scheduler.force_refresh();
    Json(RefreshResponse { triggered })
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scheduler.status())
}
