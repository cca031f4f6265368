use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::activity::{self, ActivityMessage};
use common::document::{DocumentStore, collections};
use common::retry::{RetryDecision, RetryPolicy, RetryTracker};
use common::summary::{SummaryOptions, generate_daily_summary};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Every retry failed; the message was parked in `failed_activity`.
    Abandoned,
}

/// Apply one activity message, retrying with backoff.
///
/// Returns an error only when the message could neither be applied nor
/// parked, in which case the queue should redeliver it.
pub async fn handle_message(
    store: &dyn DocumentStore,
    policy: &RetryPolicy,
    tracker: &Mutex<RetryTracker>,
    message: &ActivityMessage,
) -> Result<Outcome> {
    loop {
        let err = match activity::apply(store, message).await {
            Ok(()) => {
                tracker.lock().await.clear(&message.id);
                info!(id = %message.id, action = message.label(), "Activity recorded");
                return Ok(Outcome::Applied);
            }
            Err(e) => e,
        };

        let decision = tracker
            .lock()
            .await
            .record_failure(&message.id, &err.to_string());
        match decision {
            RetryDecision::Retry { attempt } => {
                let delay = policy.backoff(attempt);
                warn!(
                    id = %message.id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying activity message"
                );
                tokio::time::sleep(delay).await;
            }
            RetryDecision::Exhausted { history } => {
                error!(
                    id = %message.id,
                    retry_count = history.len(),
                    error = %err,
                    "Max retries exhausted, parking activity message"
                );
                store
                    .set(
                        collections::FAILED_ACTIVITY,
                        &message.id,
                        json!({
                            "message": message,
                            "error": err.to_string(),
                            "retry_history": history,
                        }),
                        false,
                    )
                    .await?;
                return Ok(Outcome::Abandoned);
            }
        }
    }
}

/// Regenerate the daily summary every `interval`, starting immediately.
pub fn spawn_summary_task(
    store: Arc<dyn DocumentStore>,
    interval: Duration,
    options: SummaryOptions,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = generate_daily_summary(store.as_ref(), Utc::now(), &options).await {
                error!(error = %e, "Failed to generate daily summary");
            }
        }
    })
}
