use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::poll_models::{Poll, PollWithCreator};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub question: String,
    pub options: Vec<String>,
    pub creator_id: String,
}

#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OptionResponse {
    pub id: String,
    pub poll_id: String,
    pub text: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct CreatorResponse {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub id: String,
    pub question: String,
    pub creator_id: String,
    pub options: Vec<OptionResponse>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<CreatorResponse>,
}

impl From<Poll> for PollResponse {
    fn from(poll: Poll) -> Self {
        let poll_id = poll.id.to_hex();
        Self {
            options: poll
                .options
                .into_iter()
                .map(|option| OptionResponse {
                    id: option.id.to_hex(),
                    poll_id: poll_id.clone(),
                    text: option.text,
                })
                .collect(),
            id: poll_id,
            question: poll.question,
            creator_id: poll.creator_id.to_hex(),
            created_at: poll.created_at,
            creator: None,
        }
    }
}

impl From<PollWithCreator> for PollResponse {
    fn from(listed: PollWithCreator) -> Self {
        let mut response = PollResponse::from(listed.poll);
        response.creator = listed.creator.map(|creator| CreatorResponse {
            id: creator.id.to_hex(),
            name: creator.name,
        });
        response
    }
}
