use std::sync::Arc;

use common::document::DocumentStore;
use common::storage::BlobStore;
use sea_orm::DatabaseConnection;

use crate::activity::ActivityDispatcher;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub documents: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub activity: ActivityDispatcher,
}
