use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Retry settings for applying activity messages.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first failure. Default: 3.
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,
    /// Delay before the first retry. Default: 500ms.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound on any single delay. Default: 30s.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u8 {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u8) -> Duration {
        calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms)
    }
}

/// A failed attempt, kept so an abandoned message carries its history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryAttempt {
    /// 1-based attempt number.
    pub attempt: u8,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl RetryAttempt {
    pub fn new(attempt: u8, error: impl Into<String>) -> Self {
        Self {
            attempt,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    Retry { attempt: u8 },
    Exhausted { history: Vec<RetryAttempt> },
}

/// Failure history per message id.
#[derive(Debug, Default)]
pub struct RetryTracker {
    history: HashMap<String, Vec<RetryAttempt>>,
    max_retries: u8,
}

impl RetryTracker {
    pub fn new(max_retries: u8) -> Self {
        Self {
            history: HashMap::new(),
            max_retries,
        }
    }

    /// Record a failure and decide whether the message gets another attempt.
    ///
    /// Once exhausted the message is forgotten and its full history returned.
    pub fn record_failure(&mut self, id: &str, error: &str) -> RetryDecision {
        let attempts = self.history.entry(id.to_string()).or_default();
        let attempt = attempts.len() as u8 + 1;
        attempts.push(RetryAttempt::new(attempt, error));

        if attempt <= self.max_retries {
            RetryDecision::Retry { attempt }
        } else {
            RetryDecision::Exhausted {
                history: self.history.remove(id).unwrap_or_default(),
            }
        }
    }

    pub fn clear(&mut self, id: &str) {
        self.history.remove(id);
    }

    pub fn attempts(&self, id: &str) -> usize {
        self.history.get(id).map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Exponential backoff with 0-25% jitter, capped at `max_ms`.
pub fn calculate_backoff(attempt: u8, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow((attempt - 1) as u32));
    let jitter = if delay_ms > 0 {
        rand::rng().random_range(0..=delay_ms / 4)
    } else {
        0
    };

    Duration::from_millis(delay_ms.saturating_add(jitter).min(max_ms))
}
