//! Periodic deactivation of old listings. Rows are never deleted.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::store::{ScrapeStore, StoreError};

#[derive(Error, Debug)]
pub enum SweepError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("maximum age of {0} days reaches past the supported date range")]
    AgeOutOfRange(i64),
}

/// Deactivate every listing scraped more than `max_age` ago.
pub fn sweep_stale(store: &dyn ScrapeStore, max_age: chrono::Duration) -> Result<usize, SweepError> {
    let cutoff = Utc::now()
        .checked_sub_signed(max_age)
        .ok_or(SweepError::AgeOutOfRange(max_age.num_days()))?;
    let count = store.deactivate_stale(cutoff)?;
    tracing::info!(deactivated = count, cutoff = %cutoff, "stale listing sweep");
    Ok(count)
}

/// Run [`sweep_stale`] every `interval` until `cancel` fires. The first sweep
/// happens immediately.
pub fn spawn_sweeper(
    store: Arc<dyn ScrapeStore>,
    interval: Duration,
    max_age: chrono::Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = sweep_stale(store.as_ref(), max_age) {
                        tracing::warn!(error = %e, "stale listing sweep failed");
                    }
                }
            }
        }
    })
}
