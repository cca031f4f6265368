//! Daily summary of the most popular upcoming events.

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::document::{DocumentError, DocumentStore, collections};

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryOptions {
    /// How far ahead an event may start and still count. Default: 7 days.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    /// Number of events kept in `top_events`. Default: 5.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_window_days() -> i64 {
    7
}
fn default_top_n() -> usize {
    5
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            top_n: default_top_n(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SummaryEvent {
    pub event_id: i64,
    pub title: Option<String>,
    pub location: Option<String>,
    pub start_time: String,
    pub going_count: i64,
}

/// Stored at `daily_summaries/{date}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DailySummary {
    /// UTC date, `YYYY-MM-DD`.
    pub date: String,
    pub generated_at: String,
    /// Number of events starting inside the window, before truncation.
    pub upcoming_count: usize,
    pub top_events: Vec<SummaryEvent>,
    pub window_days: i64,
}

/// Accepts RFC 3339 and naive ISO timestamps; naive ones are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Keep events starting within `[now, now + window]`, most attended first,
/// earliest first among equals.
pub fn rank_upcoming(
    mut candidates: Vec<(DateTime<Utc>, SummaryEvent)>,
    now: DateTime<Utc>,
    window_days: i64,
) -> Vec<SummaryEvent> {
    let horizon = now + Duration::days(window_days);
    candidates.retain(|(start, _)| *start >= now && *start <= horizon);
    candidates.sort_by(|(a_start, a), (b_start, b)| {
        b.going_count
            .cmp(&a.going_count)
            .then_with(|| a_start.cmp(b_start))
    });
    candidates.into_iter().map(|(_, event)| event).collect()
}

/// Build the summary for `now`'s UTC date and store it with merge semantics.
pub async fn generate_daily_summary(
    store: &dyn DocumentStore,
    now: DateTime<Utc>,
    options: &SummaryOptions,
) -> Result<DailySummary, DocumentError> {
    let mut candidates = Vec::new();
    for doc in store.all(collections::EVENTS_MIRROR).await? {
        let Some(raw_start) = doc.data.get("start_time").and_then(Value::as_str) else {
            continue;
        };
        let Some(start) = parse_timestamp(raw_start) else {
            continue;
        };

        let event_id = match doc.data.get("event_id") {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => doc.id.parse().ok(),
        };
        let Some(event_id) = event_id else {
            continue;
        };
        let going_count = store
            .get(collections::EVENT_STATS, &event_id.to_string())
            .await?
            .and_then(|stats| stats.data.get("going_count").and_then(Value::as_i64))
            .unwrap_or(0);

        candidates.push((
            start,
            SummaryEvent {
                event_id,
                title: doc.data.get("title").and_then(Value::as_str).map(String::from),
                location: doc
                    .data
                    .get("location")
                    .and_then(Value::as_str)
                    .map(String::from),
                start_time: raw_start.to_string(),
                going_count,
            },
        ));
    }

    let mut ranked = rank_upcoming(candidates, now, options.window_days);
    let upcoming_count = ranked.len();
    ranked.truncate(options.top_n);

    let summary = DailySummary {
        date: now.date_naive().to_string(),
        generated_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        upcoming_count,
        top_events: ranked,
        window_days: options.window_days,
    };

    store
        .set(
            collections::DAILY_SUMMARIES,
            &summary.date,
            serde_json::to_value(&summary)?,
            true,
        )
        .await?;

    info!(
        date = %summary.date,
        upcoming = summary.upcoming_count,
        "Daily summary written"
    );
    Ok(summary)
}
