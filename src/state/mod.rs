use std::sync::Arc;

use crate::db::DurableStore;
use crate::services::{
    broadcast::Broadcaster, pipeline::VotePipeline, subscribers::SubscriberRegistry,
    tally::TallyAggregator, vote_ledger::VoteLedger,
};
use crate::utils::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DurableStore>,
    pub votes: VotePipeline,
    pub tally: Arc<TallyAggregator>,
    pub registry: Arc<SubscriberRegistry>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the vote pipeline around `store` and starts the broadcast
    /// dispatcher. Must be called inside a tokio runtime.
    pub fn new(store: Arc<dyn DurableStore>, config: Config) -> Self {
        let registry = Arc::new(SubscriberRegistry::new(config.subscriber_queue));
        let (broadcaster, _dispatcher) = Broadcaster::spawn(registry.clone());

        let ledger = Arc::new(VoteLedger::new(store.clone(), config.store_timeout));
        let tally = Arc::new(TallyAggregator::new(store.clone(), config.store_timeout));
        let votes = VotePipeline::new(ledger, tally.clone(), broadcaster);

        Self {
            store,
            votes,
            tally,
            registry,
            config: Arc::new(config),
        }
    }
}
