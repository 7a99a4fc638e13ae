use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A poll document. Options are embedded in creation order, so a poll and
/// its options are always written together.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Poll {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub question: String,
    pub creator_id: ObjectId,
    pub options: Vec<PollOption>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PollOption {
    pub id: ObjectId,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct NewPoll {
    pub question: String,
    pub creator_id: ObjectId,
    pub options: Vec<String>,
}

/// An option looked up on its own, together with the poll that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOption {
    pub id: ObjectId,
    pub poll_id: ObjectId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorSummary {
    pub id: ObjectId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct PollWithCreator {
    pub poll: Poll,
    pub creator: Option<CreatorSummary>,
}

impl Poll {
    pub fn option(&self, option_id: &ObjectId) -> Option<&PollOption> {
        self.options.iter().find(|option| option.id == *option_id)
    }
}
