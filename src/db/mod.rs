//! Persistence for users, polls, options and votes.
//!
//! Everything above this module talks to a [`DurableStore`]. Its two
//! guarantees the vote path leans on are the uniqueness of `(user, option)`
//! pairs, surfaced as [`StoreError::ConstraintViolation`], and a single
//! consistent read of a poll's per-option counts.

use std::fmt;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use crate::models::{
    poll_models::{NewPoll, Poll, PollWithCreator, ResolvedOption},
    tally_models::PollCounts,
    user_models::{NewUser, User},
    vote_models::Vote,
};

pub mod connection;
pub mod memory_store;
pub mod mongo_store;

/// The record a dangling reference pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    User,
    Creator,
    PollOption,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::User => write!(f, "user"),
            Reference::Creator => write!(f, "creator"),
            Reference::PollOption => write!(f, "poll option"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("uniqueness constraint violated: {0}")]
    ConstraintViolation(String),
    #[error("referenced {0} does not exist")]
    MissingReference(Reference),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Fails with `ConstraintViolation` when the email is taken.
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Writes the poll and all of its options as one unit.
    async fn create_poll_with_options(&self, new_poll: NewPoll) -> StoreResult<Poll>;

    async fn list_polls_with_options_and_creator(&self) -> StoreResult<Vec<PollWithCreator>>;

    /// Inserts a vote. A second vote for the same `(user_id, poll_option_id)`
    /// fails with `ConstraintViolation`; nothing is written on any error.
    async fn create_vote(&self, user_id: ObjectId, poll_option_id: ObjectId) -> StoreResult<Vote>;

    async fn get_option_by_id(&self, option_id: ObjectId) -> StoreResult<Option<ResolvedOption>>;

    /// Per-option counts for a poll in option order, reflecting every vote
    /// committed before the call. `None` when the poll does not exist.
    async fn get_poll_with_option_counts(&self, poll_id: ObjectId) -> StoreResult<Option<PollCounts>>;
}
