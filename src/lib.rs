pub mod config;
pub mod db;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod parsers;
pub mod routes;
pub mod services;

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::db::SqliteStore;
use crate::services::fetcher::ContentFetcher;
use crate::services::ingestion::Ingestor;

/// Ingestor wired to the production fetcher and store.
pub type ScanIngestor = Ingestor<ContentFetcher, SqliteStore>;

/// Shared application state passed to all Axum handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: SqliteStore,
    pub ingestor: Arc<ScanIngestor>,
    /// Slots for requests being served; see `middleware::concurrency`.
    pub request_slots: Arc<Semaphore>,
    pub config: config::AppConfig,
}

impl AppState {
    pub fn new(store: SqliteStore, fetcher: ContentFetcher, config: config::AppConfig) -> Self {
        Self {
            ingestor: Arc::new(Ingestor::new(fetcher, store.clone())),
            request_slots: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            store,
            config,
        }
    }
}
