use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::vote_models::Vote;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub user_id: String,
    pub poll_option_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub id: String,
    pub user_id: String,
    pub poll_option_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<Vote> for VoteResponse {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id.to_hex(),
            user_id: vote.user_id.to_hex(),
            poll_option_id: vote.poll_option_id.to_hex(),
            created_at: vote.created_at,
        }
    }
}
