use std::{sync::Arc, time::Duration};

use mongodb::bson::oid::ObjectId;
use thiserror::Error;
use tracing::error;

use super::bounded;
use crate::db::{DurableStore, StoreError};
use crate::models::tally_models::TallySnapshot;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TallyError {
    #[error("poll does not exist")]
    UnknownPoll,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Reads the current per-option counts of a poll. Holds no state of its own,
/// so it can be called from any number of tasks at once.
pub struct TallyAggregator {
    store: Arc<dyn DurableStore>,
    timeout: Duration,
}

impl TallyAggregator {
    pub fn new(store: Arc<dyn DurableStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn compute_tally(&self, poll_id: ObjectId) -> Result<TallySnapshot, TallyError> {
        let counts = bounded(self.timeout, self.store.get_poll_with_option_counts(poll_id))
            .await
            .map_err(|e| {
                error!(poll = %poll_id, "Tally read failed: {}", e);
                match e {
                    StoreError::Unavailable(msg) => TallyError::StoreUnavailable(msg),
                    other => TallyError::StoreUnavailable(other.to_string()),
                }
            })?
            .ok_or(TallyError::UnknownPoll)?;

        Ok(TallySnapshot::from(counts))
    }
}
