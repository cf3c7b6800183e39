use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::error;

use crate::{
    error::ApiError, extract::ValidJson, middleware::current_user::CurrentUser, state::AppState,
};
use shared::models::api_response::ApiResponse;
use shared::models::user::{RegisterUserRequest, UpdateProfileRequest, UserProfile};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/profile", get(get_profile).put(update_profile))
}

async fn register(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<RegisterUserRequest>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let username = request.username.clone();
    let profile = state.user_service.register(request).await.map_err(|e| {
        error!("Failed to register user {}: {}", username, e);
        ApiError::from(e)
    })?;
    Ok(Json(ApiResponse::ok(profile)))
}

async fn get_profile(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let profile = state.user_service.get_profile(current_user.id()).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

async fn update_profile(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ValidJson(update): ValidJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let profile = state
        .user_service
        .update_profile(current_user.id(), update)
        .await?;
    Ok(Json(ApiResponse::ok(profile)))
}
