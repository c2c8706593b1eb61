//! Background job: purge long-expired extension tokens.
//!
//! Expired tokens already fail validation, so this only bounds table growth.
//! Rows are kept for a retention window after expiry so a late validation
//! still reports `Expired` rather than `Invalid token`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time;

use crate::tokens::{TokenError, TokenService};

/// Spawn the background purge task. Call this once at startup.
pub fn spawn(tokens: TokenService, every: Duration, retention: chrono::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = purge_once(&tokens, retention).await {
                tracing::error!("token purge job failed: {}", e);
            }
        }
    })
}

/// Delete tokens that expired more than `retention` ago. Returns rows deleted.
///
/// A negative retention is treated as zero; the cutoff never passes "now".
pub async fn purge_once(tokens: &TokenService, retention: chrono::Duration) -> Result<u64, TokenError> {
    let retention = retention.max(chrono::Duration::zero());
    let cutoff = cutoff(tokens.now(), retention);
    let purged = tokens.purge_expired(cutoff).await?;

    if purged > 0 {
        tracing::info!(rows = purged, cutoff = %cutoff, "purged expired extension tokens");
    }

    Ok(purged)
}

fn cutoff(now: DateTime<Utc>, retention: chrono::Duration) -> DateTime<Utc> {
    now - retention
}
