use std::{sync::Arc, time::Duration};

use mongodb::bson::oid::ObjectId;
use thiserror::Error;
use tracing::{debug, error};

use super::bounded;
use crate::db::{DurableStore, Reference, StoreError};
use crate::models::vote_models::Vote;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VoteError {
    #[error("user has already voted for this option")]
    DuplicateVote,
    #[error("poll option does not exist")]
    UnknownOption,
    #[error("user does not exist")]
    UnknownUser,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for VoteError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConstraintViolation(_) => VoteError::DuplicateVote,
            StoreError::MissingReference(Reference::User) => VoteError::UnknownUser,
            StoreError::MissingReference(_) => VoteError::UnknownOption,
            StoreError::Unavailable(msg) => VoteError::StoreUnavailable(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteReceipt {
    pub vote: Vote,
    pub poll_id: ObjectId,
}

/// Records single votes. The store's `(user, option)` uniqueness constraint is
/// the only duplicate check; nothing is looked up before the insert.
pub struct VoteLedger {
    store: Arc<dyn DurableStore>,
    timeout: Duration,
}

impl VoteLedger {
    pub fn new(store: Arc<dyn DurableStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn submit_vote(
        &self,
        user_id: ObjectId,
        poll_option_id: ObjectId,
    ) -> Result<VoteReceipt, VoteError> {
        let vote = bounded(self.timeout, self.store.create_vote(user_id, poll_option_id))
            .await
            .map_err(|e| {
                let err = VoteError::from(e);
                match &err {
                    VoteError::StoreUnavailable(msg) => error!("Vote insert failed: {}", msg),
                    other => debug!(%user_id, %poll_option_id, "Vote rejected: {}", other),
                }
                err
            })?;

        // The vote is committed at this point. A failed lookup still reports
        // unavailability; a retry will answer with DuplicateVote.
        let option = bounded(self.timeout, self.store.get_option_by_id(poll_option_id))
            .await
            .map_err(|e| {
                error!(vote = %vote.id, "Option lookup after insert failed: {}", e);
                VoteError::from(e)
            })?
            .ok_or(VoteError::UnknownOption)?;

        debug!(vote = %vote.id, poll = %option.poll_id, "Vote recorded");

        Ok(VoteReceipt {
            vote,
            poll_id: option.poll_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_store::MemoryStore;
    use crate::services::testing::{another_user, seed, FlakyStore};

    const LIMIT: Duration = Duration::from_millis(500);

    #[tokio::test]
    async fn test_vote_returns_owning_poll() {
        let store = Arc::new(MemoryStore::new());
        let (user, poll) = seed(&*store).await;
        let ledger = VoteLedger::new(store.clone(), LIMIT);

        let receipt = ledger.submit_vote(user.id, poll.options[0].id).await.unwrap();
        assert_eq!(receipt.poll_id, poll.id);
        assert_eq!(receipt.vote.user_id, user.id);
        assert_eq!(receipt.vote.poll_option_id, poll.options[0].id);
    }

    #[tokio::test]
    async fn test_repeat_vote_is_duplicate() {
        let store = Arc::new(MemoryStore::new());
        let (user, poll) = seed(&*store).await;
        let ledger = VoteLedger::new(store.clone(), LIMIT);

        ledger.submit_vote(user.id, poll.options[0].id).await.unwrap();
        let err = ledger.submit_vote(user.id, poll.options[0].id).await.unwrap_err();

        assert_eq!(err, VoteError::DuplicateVote);
        assert_eq!(store.vote_count(), 1);
    }

    #[tokio::test]
    async fn test_same_user_may_vote_other_options_of_a_poll() {
        let store = Arc::new(MemoryStore::new());
        let (user, poll) = seed(&*store).await;
        let ledger = VoteLedger::new(store.clone(), LIMIT);

        ledger.submit_vote(user.id, poll.options[0].id).await.unwrap();
        ledger.submit_vote(user.id, poll.options[1].id).await.unwrap();
        assert_eq!(store.vote_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_references() {
        let store = Arc::new(MemoryStore::new());
        let (user, poll) = seed(&*store).await;
        let ledger = VoteLedger::new(store.clone(), LIMIT);

        assert_eq!(
            ledger.submit_vote(user.id, ObjectId::new()).await.unwrap_err(),
            VoteError::UnknownOption
        );
        assert_eq!(
            ledger.submit_vote(ObjectId::new(), poll.options[0].id).await.unwrap_err(),
            VoteError::UnknownUser
        );
        assert_eq!(store.vote_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_identical_votes_succeed_once() {
        let store = Arc::new(MemoryStore::new());
        let (_, poll) = seed(&*store).await;
        let voter = another_user(&*store, "Bob").await;
        let ledger = Arc::new(VoteLedger::new(store.clone(), LIMIT));
        let option = poll.options[1].id;
        let voter_id = voter.id;

        let attempts: Vec<_> = (0..32)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.submit_vote(voter_id, option).await })
            })
            .collect();

        let mut accepted = 0;
        let mut duplicates = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(VoteError::DuplicateVote) => duplicates += 1,
                Err(other) => panic!("unexpected outcome: {other}"),
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(duplicates, 31);
        assert_eq!(store.vote_count(), 1);
    }

    #[tokio::test]
    async fn test_store_outage_is_unavailable() {
        let store = FlakyStore::new();
        let (user, poll) = seed(&*store).await;
        store.set_offline(true);
        let ledger = VoteLedger::new(store.clone(), LIMIT);

        let err = ledger.submit_vote(user.id, poll.options[0].id).await.unwrap_err();
        assert!(matches!(err, VoteError::StoreUnavailable(_)));
        assert_eq!(store.inner.vote_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_times_out() {
        let store = FlakyStore::new();
        let (user, poll) = seed(&*store).await;
        store.set_delay(Duration::from_secs(30));
        let ledger = VoteLedger::new(store.clone(), LIMIT);

        let err = ledger.submit_vote(user.id, poll.options[0].id).await.unwrap_err();
        assert!(matches!(err, VoteError::StoreUnavailable(msg) if msg.contains("500ms")));
        assert_eq!(store.inner.vote_count(), 0);
    }
}
