use axum::{extract::State, http::StatusCode, Json};
use mongodb::bson::oid::ObjectId;

use crate::controllers::vote_controllers::models::{CastVoteRequest, VoteResponse};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

/// Records a vote and answers once it is committed and tallied. Pushing the
/// new tally to observers happens in the background.
pub async fn cast_vote(
    State(state): State<AppState>,
    Json(payload): Json<CastVoteRequest>,
) -> AppResult<(StatusCode, Json<VoteResponse>)> {
    let user_id = ObjectId::parse_str(&payload.user_id)
        .map_err(|_| AppError::BadRequest("Invalid user id".to_string()))?;

    let poll_option_id = ObjectId::parse_str(&payload.poll_option_id)
        .map_err(|_| AppError::BadRequest("Invalid poll option id".to_string()))?;

    let vote = state.votes.submit_vote(user_id, poll_option_id).await?;

    Ok((StatusCode::CREATED, Json(VoteResponse::from(vote))))
}
