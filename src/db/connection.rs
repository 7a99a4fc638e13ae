use std::sync::Arc;

use mongodb::{options::ClientOptions, Client, Database};
use tracing::info;

use super::{memory_store::MemoryStore, mongo_store::MongoStore, DurableStore};
use crate::utils::config::{Config, StoreBackend};
use crate::utils::error::{AppError, AppResult};

pub async fn init_db(config: &Config) -> AppResult<Database> {
    let mongo_uri = config
        .mongo_uri
        .as_deref()
        .ok_or_else(|| AppError::InternalError("MONGO_URI must be set in .env".to_string()))?;

    let mut client_options = ClientOptions::parse(mongo_uri)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to parse MongoDB URI: {}", e)))?;

    client_options.app_name = Some("pollcast".to_string());

    let client = Client::with_options(client_options)
        .map_err(|e| AppError::DatabaseError(format!("Failed to initialize MongoDB client: {}", e)))?;

    info!(db = %config.db_name, "Database connection successful");

    Ok(client.database(&config.db_name))
}

pub async fn init_store(config: &Config) -> AppResult<Arc<dyn DurableStore>> {
    match config.store_backend {
        StoreBackend::Mongo => {
            let db = init_db(config).await?;
            let store = MongoStore::new(db).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            info!("Using in-memory store, data will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
