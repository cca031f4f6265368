use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::activity::ActivityMessage;
use common::document::open_store;
use common::retry::RetryTracker;
use logger::{LoggerAppConfig, handle_message, spawn_summary_task};
use mq::{BroccoliError, BrokerMessage, MqConfig, init_mq};
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let config = LoggerAppConfig::load().context("Failed to load config")?;
    info!(queue = %config.mq.activity_queue, "Activity logger starting");

    let store = open_store(&config.documents, &config.database.url)
        .await
        .context("Failed to open document store")?;

    let mq = init_mq(MqConfig::from(&config.mq))
        .await
        .context("Failed to initialize MQ")?;
    info!(max_retries = config.retry.max_retries, "MQ connected");

    let summary_task = (config.summary.interval_secs > 0).then(|| {
        spawn_summary_task(
            store.clone(),
            Duration::from_secs(config.summary.interval_secs),
            config.summary.options(),
        )
    });

    let policy = Arc::new(config.retry.clone());
    let tracker = Arc::new(Mutex::new(RetryTracker::new(config.retry.max_retries)));

    let consume = mq.process_messages(
        &config.mq.activity_queue,
        Some(1),
        None,
        move |message: BrokerMessage<ActivityMessage>| {
            let store = Arc::clone(&store);
            let policy = Arc::clone(&policy);
            let tracker = Arc::clone(&tracker);
            async move {
                handle_message(store.as_ref(), &policy, &tracker, &message.payload)
                    .await
                    .map(|_| ())
                    .map_err(|e| BroccoliError::Job(e.to_string()))
            }
        },
    );

    tokio::select! {
        result = consume => {
            if let Err(e) = result {
                error!(error = %e, "Activity logger stopped unexpectedly");
            }
        }
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
    }

    if let Some(task) = summary_task {
        task.abort();
    }
    info!("Activity logger stopped");
    Ok(())
}
