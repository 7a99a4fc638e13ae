use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use parking_lot::Mutex;

use super::{DurableStore, Reference, StoreError, StoreResult};
use crate::models::{
    poll_models::{CreatorSummary, NewPoll, Poll, PollOption, PollWithCreator, ResolvedOption},
    tally_models::{OptionCount, PollCounts},
    user_models::{NewUser, User},
    vote_models::Vote,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    emails: HashSet<String>,
    polls: Vec<Poll>,
    // option id -> index into `polls`
    option_owner: HashMap<ObjectId, usize>,
    votes: Vec<Vote>,
    vote_keys: HashSet<(ObjectId, ObjectId)>,
    option_votes: HashMap<ObjectId, u64>,
}

/// Process-local store. A single lock over every table gives the same
/// uniqueness and read-consistency guarantees the database provides.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vote_count(&self) -> usize {
        self.tables.lock().votes.len()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.lock();

        if !tables.emails.insert(new_user.email.clone()) {
            return Err(StoreError::ConstraintViolation(format!(
                "email {} already registered",
                new_user.email
            )));
        }

        let user = User {
            id: ObjectId::new(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());

        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.tables.lock().users.clone())
    }

    async fn create_poll_with_options(&self, new_poll: NewPoll) -> StoreResult<Poll> {
        let mut tables = self.tables.lock();

        if !tables.users.iter().any(|user| user.id == new_poll.creator_id) {
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

        let index = tables.polls.len();
        for option in &poll.options {
            tables.option_owner.insert(option.id, index);
        }
        tables.polls.push(poll.clone());

        Ok(poll)
    }

    async fn list_polls_with_options_and_creator(&self) -> StoreResult<Vec<PollWithCreator>> {
        let tables = self.tables.lock();

        Ok(tables
            .polls
            .iter()
            .map(|poll| PollWithCreator {
                poll: poll.clone(),
                creator: tables
                    .users
                    .iter()
                    .find(|user| user.id == poll.creator_id)
                    .map(|user| CreatorSummary {
                        id: user.id,
                        name: user.name.clone(),
                    }),
            })
            .collect())
    }

    async fn create_vote(&self, user_id: ObjectId, poll_option_id: ObjectId) -> StoreResult<Vote> {
        let mut tables = self.tables.lock();

        if !tables.users.iter().any(|user| user.id == user_id) {
            return Err(StoreError::MissingReference(Reference::User));
        }
        if !tables.option_owner.contains_key(&poll_option_id) {
            return Err(StoreError::MissingReference(Reference::PollOption));
        }
        if !tables.vote_keys.insert((user_id, poll_option_id)) {
            return Err(StoreError::ConstraintViolation(format!(
                "user {} already voted for option {}",
                user_id, poll_option_id
            )));
        }

        let vote = Vote::new(user_id, poll_option_id);
        *tables.option_votes.entry(poll_option_id).or_default() += 1;
        tables.votes.push(vote.clone());

        Ok(vote)
    }

    async fn get_option_by_id(&self, option_id: ObjectId) -> StoreResult<Option<ResolvedOption>> {
        let tables = self.tables.lock();

        Ok(tables.option_owner.get(&option_id).and_then(|&index| {
            let poll = &tables.polls[index];
            poll.option(&option_id).map(|option| ResolvedOption {
                id: option.id,
                poll_id: poll.id,
                text: option.text.clone(),
            })
        }))
    }

    async fn get_poll_with_option_counts(&self, poll_id: ObjectId) -> StoreResult<Option<PollCounts>> {
        let tables = self.tables.lock();

        Ok(tables
            .polls
            .iter()
            .find(|poll| poll.id == poll_id)
            .map(|poll| PollCounts {
                poll_id: poll.id,
                options: poll
                    .options
                    .iter()
                    .map(|option| OptionCount {
                        option_id: option.id,
                        text: option.text.clone(),
                        votes: tables.option_votes.get(&option.id).copied().unwrap_or(0),
                    })
                    .collect(),
            }))
    }
}
