use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::controllers::user_controllers::models::{CreateUserRequest, UserResponse};
use crate::models::user_models::NewUser;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let name = payload.name.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    if name.is_empty() {
        return Err(AppError::ValidationError("Name is required".to_string()));
    }

    if !email.contains('@') {
        return Err(AppError::ValidationError("A valid email is required".to_string()));
    }

    if payload.password_hash.is_empty() {
        return Err(AppError::ValidationError("Password hash is required".to_string()));
    }

    let user = state
        .store
        .create_user(NewUser {
            name,
            email,
            password_hash: payload.password_hash,
        })
        .await?;

    info!(user = %user.id, "User created");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}
