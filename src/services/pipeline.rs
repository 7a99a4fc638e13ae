use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use tracing::{error, info, warn};

use super::{
    broadcast::Broadcaster,
    tally::{TallyAggregator, TallyError},
    vote_ledger::{VoteError, VoteLedger},
};
use crate::models::vote_models::Vote;

/// Accepts a vote, recomputes the poll's tally and queues it for broadcast.
#[derive(Clone)]
pub struct VotePipeline {
    ledger: Arc<VoteLedger>,
    tally: Arc<TallyAggregator>,
    broadcaster: Broadcaster,
}

impl VotePipeline {
    pub fn new(ledger: Arc<VoteLedger>, tally: Arc<TallyAggregator>, broadcaster: Broadcaster) -> Self {
        Self {
            ledger,
            tally,
            broadcaster,
        }
    }

    /// Runs the whole vote path on its own task. If the caller goes away
    /// mid-request the store writes and the broadcast still complete; only
    /// the answer is lost.
    pub async fn submit_vote(&self, user_id: ObjectId, poll_option_id: ObjectId) -> Result<Vote, VoteError> {
        let pipeline = self.clone();
        let task = tokio::spawn(async move { pipeline.run(user_id, poll_option_id).await });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!("Vote task failed: {}", e);
                Err(VoteError::StoreUnavailable(e.to_string()))
            }
        }
    }

    /// A failure after the insert committed (option lookup or tally read)
    /// reports `StoreUnavailable` and broadcasts nothing. The vote stays
    /// recorded, so a retry answers `DuplicateVote`.
    async fn run(&self, user_id: ObjectId, poll_option_id: ObjectId) -> Result<Vote, VoteError> {
        let receipt = self.ledger.submit_vote(user_id, poll_option_id).await?;

        let snapshot = self.tally.compute_tally(receipt.poll_id).await.map_err(|e| {
            warn!(
                vote = %receipt.vote.id,
                poll = %receipt.poll_id,
                "Vote recorded but tally unavailable: {}", e
            );
            match e {
                TallyError::StoreUnavailable(msg) => VoteError::StoreUnavailable(msg),
                TallyError::UnknownPoll => {
                    VoteError::StoreUnavailable("poll missing after vote insert".to_string())
                }
            }
        })?;
        self.broadcaster.broadcast(snapshot);

        info!(vote = %receipt.vote.id, poll = %receipt.poll_id, "Vote accepted");
        Ok(receipt.vote)
    }
}
