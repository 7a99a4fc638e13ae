use axum::{extract::State, Json};

use crate::controllers::user_controllers::models::UserResponse;
use crate::state::AppState;
use crate::utils::error::AppResult;

pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserResponse>>> {
    let users = state.store.list_users().await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}
