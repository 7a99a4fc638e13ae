use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::db::StoreError;
use crate::services::{tally::TallyError, vote_ledger::VoteError};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message) = match self {
            AppError::DatabaseError(msg) => {
                error!("Database error: {}", msg);
                ("DATABASE_ERROR", "Database operation failed".to_string())
            }
            AppError::ValidationError(msg) => ("VALIDATION_ERROR", msg),
            AppError::NotFound(msg) => ("NOT_FOUND", msg),
            AppError::Conflict(msg) => ("CONFLICT", msg),
            AppError::BadRequest(msg) => ("BAD_REQUEST", msg),
            AppError::Unavailable(msg) => {
                warn!("Store unavailable: {}", msg);
                (
                    "UNAVAILABLE",
                    "Service temporarily unavailable, try again".to_string(),
                )
            }
            AppError::InternalError(msg) => {
                error!("Internal error: {}", msg);
                ("INTERNAL_ERROR", "An internal error occurred".to_string())
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
            details: None,
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConstraintViolation(msg) => AppError::Conflict(msg),
            StoreError::MissingReference(reference) => {
                AppError::NotFound(format!("{} not found", reference))
            }
            StoreError::Unavailable(msg) => AppError::Unavailable(msg),
        }
    }
}

impl From<VoteError> for AppError {
    fn from(err: VoteError) -> Self {
        match err {
            VoteError::DuplicateVote => {
                AppError::Conflict("User has already voted for this option".to_string())
            }
            VoteError::UnknownOption => AppError::NotFound("Poll option not found".to_string()),
            VoteError::UnknownUser => AppError::NotFound("User not found".to_string()),
            VoteError::StoreUnavailable(msg) => AppError::Unavailable(msg),
        }
    }
}

impl From<TallyError> for AppError {
    fn from(err: TallyError) -> Self {
        match err {
            TallyError::UnknownPoll => AppError::NotFound("Poll not found".to_string()),
            TallyError::StoreUnavailable(msg) => AppError::Unavailable(msg),
        }
    }
}
