use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    error::ApiError,
    extract::{OptionalJson, ValidJson, ValidQuery},
    state::AppState,
};
use shared::models::api_response::ApiResponse;
use shared::models::game::{CreateGameRequest, Game, GameDetails, GameStatus};
use shared::models::game_state::MoveOutcome;
use shared::models::move_request::MoveRequest;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/games", post(create_game).get(list_games))
        .route("/games/{id}", get(get_game))
        .route("/games/{id}/move", post(submit_move))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListGamesQuery {
    pub limit: Option<u32>,
    pub status: Option<GameStatus>,
}

async fn create_game(
    State(state): State<AppState>,
    OptionalJson(request): OptionalJson<CreateGameRequest>,
) -> Result<Json<ApiResponse<Game>>, ApiError> {
    let time_control = request.and_then(|r| r.time_control);
    let game = state
        .game_service
        .create_game(time_control)
        .await
        .map_err(|e| {
            warn!("Failed to create game: {}", e);
            ApiError::from(e)
        })?;
    Ok(Json(ApiResponse::ok(game)))
}

async fn list_games(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListGamesQuery>,
) -> Result<Json<ApiResponse<Vec<Game>>>, ApiError> {
    let games = state
        .game_service
        .list_games(query.status, query.limit)
        .await?;
    Ok(Json(ApiResponse::ok(games)))
}

async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<ApiResponse<GameDetails>>, ApiError> {
    let details = state.game_service.get_game(&game_id).await?;
    Ok(Json(ApiResponse::ok(details)))
}

async fn submit_move(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    ValidJson(request): ValidJson<MoveRequest>,
) -> Result<Json<ApiResponse<MoveOutcome>>, ApiError> {
    let outcome = state
        .move_coordinator
        .submit_move(&game_id, &request)
        .await
        .map_err(|e| {
            debug!(
                "Move {}{} rejected for game {}: {}",
                request.from, request.to, game_id, e
            );
            ApiError::from(e)
        })?;
    Ok(Json(ApiResponse::ok(outcome)))
}
