use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use common::document::open_store;
use common::storage::BlobStore;
use common::storage::filesystem::FilesystemBlobStore;
use common::storage::s3::S3BlobStore;
use mq::{MqConfig, init_mq};
use server::activity::ActivityDispatcher;
use server::config::{AppConfig, StorageBackend};
use server::state::AppState;
use server::{build_router, database, seed};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = database::init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    seed::ensure_indexes(&db).await?;
    seed::promote_bootstrap_admin(&db, &config.auth)
        .await
        .context("Failed to promote bootstrap admin")?;

    let documents = open_store(&config.documents, &config.database.url)
        .await
        .context("Failed to open document store")?;

    let blobs: Arc<dyn BlobStore> = match config.storage.backend {
        StorageBackend::Filesystem => Arc::new(
            FilesystemBlobStore::new(config.storage.path.clone(), config.storage.max_image_size)
                .await
                .context("Failed to open image storage")?,
        ),
        StorageBackend::S3 => {
            let s3 = config
                .storage
                .s3
                .as_ref()
                .context("storage.s3 must be set when storage.backend = \"s3\"")?;
            Arc::new(
                S3BlobStore::new(s3, config.storage.max_image_size)
                    .context("Failed to configure S3 image storage")?,
            )
        }
    };

    let activity = if config.mq.enabled {
        let mq = init_mq(MqConfig::from(&config.mq))
            .await
            .context("Failed to initialize MQ")?;
        info!(queue = %config.mq.activity_queue, "Publishing activity to MQ");
        ActivityDispatcher::queued(Arc::new(mq), config.mq.activity_queue.clone())
    } else {
        info!("MQ disabled, recording activity in-process");
        ActivityDispatcher::inline(documents.clone())
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState {
        db,
        config,
        documents,
        blobs,
        activity,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Rollcall listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
