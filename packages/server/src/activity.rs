use std::sync::Arc;

use common::activity::{self, ActivityMessage};
use common::document::DocumentStore;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Hands activity messages off the request path.
///
/// Messages go through a channel to one background task, so they are
/// published (queue mode) or applied to the document store (inline mode)
/// in the order they were dispatched.
#[derive(Clone)]
pub struct ActivityDispatcher {
    tx: mpsc::UnboundedSender<ActivityMessage>,
}

enum Sink {
    Queue { mq: Arc<mq::Mq>, queue: String },
    Inline(Arc<dyn DocumentStore>),
}

impl Sink {
    async fn deliver(&self, message: ActivityMessage) {
        let label = message.label();
        match self {
            Sink::Queue { mq, queue } => {
                if let Err(e) = mq::publish(mq, queue, &message).await {
                    warn!(id = %message.id, action = %label, error = %e, "Failed to publish activity");
                } else {
                    debug!(id = %message.id, action = %label, queue = %queue, "Activity published");
                }
            }
            Sink::Inline(store) => {
                if let Err(e) = activity::apply(store.as_ref(), &message).await {
                    warn!(id = %message.id, action = %label, error = %e, "Failed to record activity");
                }
            }
        }
    }
}

impl ActivityDispatcher {
    pub fn queued(mq: Arc<mq::Mq>, queue: impl Into<String>) -> Self {
        Self::spawn(Sink::Queue {
            mq,
            queue: queue.into(),
        })
    }

    pub fn inline(store: Arc<dyn DocumentStore>) -> Self {
        Self::spawn(Sink::Inline(store))
    }

    /// Must be called inside a Tokio runtime.
    fn spawn(sink: Sink) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<ActivityMessage>();
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                sink.deliver(message).await;
            }
            debug!("Activity channel closed");
        });
        Self { tx }
    }

    /// Never blocks and never fails; errors are logged and dropped.
    pub fn dispatch(&self, message: ActivityMessage) {
        if let Err(e) = self.tx.send(message) {
            warn!(id = %e.0.id, "Activity worker stopped, message dropped");
        }
    }
}
