mod error;
mod memory;
mod traits;

#[cfg(feature = "sea-orm")]
pub mod entity;
#[cfg(feature = "sea-orm")]
mod sql;

use std::sync::Arc;

pub use error::DocumentError;
pub use memory::MemoryDocumentStore;
#[cfg(feature = "sea-orm")]
pub use sql::SqlDocumentStore;
pub use traits::{Document, DocumentStore, DocumentUpdate, merge_documents};

use crate::config::{DocumentBackend, DocumentsConfig};

/// Collection names shared by the server and the logger.
pub mod collections {
    pub const ACTIVITY_LOGS: &str = "activity_logs";
    pub const AUDIT_RECORDS: &str = "audit_records";
    pub const EVENTS_MIRROR: &str = "events_mirror";
    pub const EVENT_STATS: &str = "event_stats";
    pub const DAILY_SUMMARIES: &str = "daily_summaries";
    /// Activity messages that could not be applied after every retry.
    pub const FAILED_ACTIVITY: &str = "failed_activity";
}

/// Open the document store selected by `config`.
///
/// The SQL backend uses `config.url`, falling back to `default_url`
/// (normally the relational database URL).
#[cfg(feature = "sea-orm")]
pub async fn open_store(
    config: &DocumentsConfig,
    default_url: &str,
) -> Result<Arc<dyn DocumentStore>, DocumentError> {
    match config.backend {
        DocumentBackend::Memory => Ok(Arc::new(MemoryDocumentStore::new())),
        DocumentBackend::Sql => {
            let url = config.url.as_deref().unwrap_or(default_url);
            tracing::info!("Opening SQL document store");
            Ok(Arc::new(SqlDocumentStore::connect(url).await?))
        }
    }
}

/// Open the document store selected by `config`.
///
/// Without the `sea-orm` feature only the in-memory backend is available.
#[cfg(not(feature = "sea-orm"))]
pub async fn open_store(
    config: &DocumentsConfig,
    _default_url: &str,
) -> Result<Arc<dyn DocumentStore>, DocumentError> {
    match config.backend {
        DocumentBackend::Memory => Ok(Arc::new(MemoryDocumentStore::new())),
        DocumentBackend::Sql => Err(DocumentError::Backend(
            "SQL document backend requires the `sea-orm` feature".into(),
        )),
    }
}
