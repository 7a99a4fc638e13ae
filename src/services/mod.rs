//! The vote-ingestion and live-tally pipeline.
//!
//! A vote goes through [`vote_ledger::VoteLedger`], the resulting tally is
//! read by [`tally::TallyAggregator`], and [`broadcast::Broadcaster`] hands it
//! to a dispatcher task that pushes it to every live member of the
//! [`subscribers::SubscriberRegistry`]. [`pipeline::VotePipeline`] ties the
//! steps together for the transport layer.

use std::{future::Future, time::Duration};

use tokio::time::timeout;

use crate::db::{StoreError, StoreResult};

pub mod broadcast;
pub mod pipeline;
pub mod subscribers;
pub mod tally;
pub mod vote_ledger;

/// Runs a store call, giving up after `limit`.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Unavailable(format!(
            "store did not answer within {}ms",
            limit.as_millis()
        ))),
    }
}
