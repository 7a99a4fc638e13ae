use axum::{extract::State, http::StatusCode, Json};
use mongodb::bson::oid::ObjectId;
use tracing::info;

use crate::controllers::poll_controllers::models::{CreatePollRequest, PollResponse};
use crate::models::poll_models::NewPoll;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

pub async fn create_poll(
    State(state): State<AppState>,
    Json(payload): Json<CreatePollRequest>,
) -> AppResult<(StatusCode, Json<PollResponse>)> {
    let question = payload.question.trim().to_string();
    if question.is_empty() {
        return Err(AppError::ValidationError("Question is required".to_string()));
    }

    let options = validate_options(&payload.options)?;

    let creator_id = ObjectId::parse_str(&payload.creator_id)
        .map_err(|e| AppError::BadRequest(format!("Invalid creatorId: {}", e)))?;

    let poll = state
        .store
        .create_poll_with_options(NewPoll {
            question,
            creator_id,
            options,
        })
        .await?;

    info!(poll = %poll.id, options = poll.options.len(), "Poll created");

    Ok((StatusCode::CREATED, Json(PollResponse::from(poll))))
}

/// Trims option texts and requires at least two, all distinct.
fn validate_options(raw: &[String]) -> AppResult<Vec<String>> {
    let options: Vec<String> = raw.iter().map(|opt| opt.trim().to_string()).collect();

    if options.iter().any(|opt| opt.is_empty()) {
        return Err(AppError::ValidationError("Poll options cannot be empty".to_string()));
    }

    if options.len() < 2 {
        return Err(AppError::ValidationError(
            "Enter at least 2 options for the user to select from".to_string(),
        ));
    }

    let mut deduped: Vec<&String> = Vec::with_capacity(options.len());
    for option in &options {
        if !deduped.contains(&option) {
            deduped.push(option);
        }
    }

    if deduped.len() != options.len() {
        return Err(AppError::ValidationError("Poll options must be unique".to_string()));
    }

    Ok(options)
}
