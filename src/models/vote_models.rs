use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub poll_option_id: ObjectId,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(user_id: ObjectId, poll_option_id: ObjectId) -> Self {
        Self {
            id: ObjectId::new(),
            user_id,
            poll_option_id,
            created_at: Utc::now(),
        }
    }
}
