use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::core::error::MatchResult;
use crate::services::InteractionLog;

/// Days a dislike record is kept before compaction
pub const DEFAULT_DISLIKE_RETENTION_DAYS: i64 = 30;

/// Fold dislike records older than `retention` into their authors' passed
/// sets. Returns the number of records compacted.
///
/// The targets stay excluded from discovery; only the record is dropped.
pub async fn compact_expired_dislikes(
    interactions: &dyn InteractionLog,
    retention: ChronoDuration,
    now: DateTime<Utc>,
) -> MatchResult<u64> {
    let cutoff = now - retention;
    let compacted = interactions.compact_dislikes(cutoff).await?;

    if compacted > 0 {
        tracing::info!("Compacted {} dislike records older than {}", compacted, cutoff);
    } else {
        tracing::debug!("No dislike records older than {}", cutoff);
    }

    Ok(compacted)
}

/// Run the dislike compaction on a fixed interval until the task is aborted
pub fn spawn_dislike_sweeper(
    interactions: Arc<dyn InteractionLog>,
    retention: ChronoDuration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) =
                compact_expired_dislikes(interactions.as_ref(), retention, Utc::now()).await
            {
                tracing::error!("Dislike sweep failed: {}", e);
            }
        }
    })
}
