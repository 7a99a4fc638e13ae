use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use tracing::info;

use super::{DurableStore, Reference, StoreError, StoreResult};
use crate::models::{
    poll_models::{CreatorSummary, NewPoll, Poll, PollOption, PollWithCreator, ResolvedOption},
    tally_models::{OptionCount, PollCounts},
    user_models::{NewUser, User},
    vote_models::Vote,
};

const DUPLICATE_KEY: i32 = 11000;

const USERS: &str = "users";
const POLLS: &str = "polls";
const VOTES: &str = "votes";

pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Wraps the database and makes sure the unique indexes the vote path
    /// depends on exist.
    pub async fn new(db: Database) -> StoreResult<Self> {
        let store = Self { db };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> StoreResult<()> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;

        self.votes()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "poll_option_id": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;

        self.polls()
            .create_index(IndexModel::builder().keys(doc! { "options.id": 1 }).build())
            .await?;

        info!("Database indexes ensured");
        Ok(())
    }

    fn users(&self) -> Collection<User> {
        self.db.collection::<User>(USERS)
    }

    fn polls(&self) -> Collection<Poll> {
        self.db.collection::<Poll>(POLLS)
    }

    fn votes(&self) -> Collection<Vote> {
        self.db.collection::<Vote>(VOTES)
    }

    async fn user_exists(&self, user_id: ObjectId) -> StoreResult<bool> {
        Ok(self.users().find_one(doc! { "_id": user_id }).await?.is_some())
    }

    async fn poll_owning(&self, option_id: ObjectId) -> StoreResult<Option<Poll>> {
        Ok(self.polls().find_one(doc! { "options.id": option_id }).await?)
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == DUPLICATE_KEY,
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

impl From<MongoError> for StoreError {
    fn from(err: MongoError) -> Self {
        if is_duplicate_key(&err) {
            StoreError::ConstraintViolation(err.to_string())
        } else {
            StoreError::Unavailable(err.to_string())
        }
    }
}

fn count_of(group: &Document) -> u64 {
    match group.get("count") {
        Some(Bson::Int32(n)) => *n as u64,
        Some(Bson::Int64(n)) => *n as u64,
        _ => 0,
    }
}

#[async_trait]
impl DurableStore for MongoStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let user = User {
            id: ObjectId::new(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: Utc::now(),
        };

        self.users().insert_one(&user).await?;
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let cursor = self.users().find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn create_poll_with_options(&self, new_poll: NewPoll) -> StoreResult<Poll> {
        if !self.user_exists(new_poll.creator_id).await? {
            return Err(StoreError::MissingReference(Reference::Creator));
        }

        let poll = Poll {
            id: ObjectId::new(),
            question: new_poll.question,
            creator_id: new_poll.creator_id,
            options: new_poll
                .options
                .into_iter()
                .map(|text| PollOption {
                    id: ObjectId::new(),
                    text,
                })
                .collect(),
            created_at: Utc::now(),
        };

        // Options live inside the poll document, so this single insert is
        // atomic for the poll and all of its options.
        self.polls().insert_one(&poll).await?;
        Ok(poll)
    }

    async fn list_polls_with_options_and_creator(&self) -> StoreResult<Vec<PollWithCreator>> {
        let polls: Vec<Poll> = self.polls().find(doc! {}).await?.try_collect().await?;

        let mut creator_ids: Vec<ObjectId> = polls.iter().map(|poll| poll.creator_id).collect();
        creator_ids.sort();
        creator_ids.dedup();

        let creators: HashMap<ObjectId, String> = self
            .users()
            .find(doc! { "_id": { "$in": creator_ids } })
            .await?
            .try_collect::<Vec<User>>()
            .await?
            .into_iter()
            .map(|user| (user.id, user.name))
            .collect();

        Ok(polls
            .into_iter()
            .map(|poll| {
                let creator = creators.get(&poll.creator_id).map(|name| CreatorSummary {
                    id: poll.creator_id,
                    name: name.clone(),
                });
                PollWithCreator { poll, creator }
            })
            .collect())
    }

    async fn create_vote(&self, user_id: ObjectId, poll_option_id: ObjectId) -> StoreResult<Vote> {
        if !self.user_exists(user_id).await? {
            return Err(StoreError::MissingReference(Reference::User));
        }
        if self.poll_owning(poll_option_id).await?.is_none() {
            return Err(StoreError::MissingReference(Reference::PollOption));
        }

        // The unique (user_id, poll_option_id) index decides duplicates.
        let vote = Vote::new(user_id, poll_option_id);
        self.votes().insert_one(&vote).await?;
        Ok(vote)
    }

    async fn get_option_by_id(&self, option_id: ObjectId) -> StoreResult<Option<ResolvedOption>> {
        let poll = match self.poll_owning(option_id).await? {
            Some(poll) => poll,
            None => return Ok(None),
        };

        Ok(poll.option(&option_id).map(|option| ResolvedOption {
            id: option.id,
            poll_id: poll.id,
            text: option.text.clone(),
        }))
    }

    async fn get_poll_with_option_counts(&self, poll_id: ObjectId) -> StoreResult<Option<PollCounts>> {
        let poll = match self.polls().find_one(doc! { "_id": poll_id }).await? {
            Some(poll) => poll,
            None => return Ok(None),
        };

        let option_ids: Vec<ObjectId> = poll.options.iter().map(|option| option.id).collect();
        let pipeline = vec![
            doc! { "$match": { "poll_option_id": { "$in": option_ids } } },
            doc! { "$group": { "_id": "$poll_option_id", "count": { "$sum": 1 } } },
        ];

        let groups: Vec<Document> = self
            .db
            .collection::<Document>(VOTES)
            .aggregate(pipeline)
            .await?
            .try_collect()
            .await?;

        let mut counts: HashMap<ObjectId, u64> = HashMap::with_capacity(groups.len());
        for group in &groups {
            if let Ok(option_id) = group.get_object_id("_id") {
                counts.insert(option_id, count_of(group));
            }
        }

        Ok(Some(PollCounts {
            poll_id: poll.id,
            options: poll
                .options
                .into_iter()
                .map(|option| OptionCount {
                    votes: counts.get(&option.id).copied().unwrap_or(0),
                    option_id: option.id,
                    text: option.text,
                })
                .collect(),
        }))
    }
}
