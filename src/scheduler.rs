//! # Feature: Daily Quota Reset
//!
//! A recurring task that clears the quota ledger at local midnight in a
//! configured fixed UTC offset (default +9, matching the original
//! deployment's timezone, which has no daylight saving).
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Initial release
//!
//! The scheduler is started once when the gateway first reports ready and is
//! never restarted on reconnect. The last reset time is not persisted; a
//! process restart close to midnight may skip or duplicate one reset.

use crate::quota::QuotaLedger;
use chrono::{DateTime, Days, FixedOffset, Utc};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

/// Clears the quota ledger once per day at local midnight
pub struct QuotaResetScheduler {
    quota: Arc<QuotaLedger>,
    offset: FixedOffset,
}

impl QuotaResetScheduler {
    pub fn new(quota: Arc<QuotaLedger>, offset: FixedOffset) -> Self {
        QuotaResetScheduler { quota, offset }
    }

    /// Run forever, resetting all quotas at each local midnight.
    pub async fn run(self) {
        loop {
            let wait = duration_until_next_midnight(Utc::now(), self.offset);
            debug!("next quota reset in {}s", wait.as_secs());
            tokio::time::sleep(wait).await;

            self.quota.reset_all();
            info!("daily quota reset complete");
        }
    }
}

/// Time remaining until the next 00:00 in the given offset.
///
/// Called exactly at local midnight this returns a full day, so a reset that
/// just fired is not immediately repeated.
pub fn duration_until_next_midnight(now: DateTime<Utc>, offset: FixedOffset) -> Duration {
    let local = now.with_timezone(&offset);
    let next_midnight = (local.date_naive() + Days::new(1))
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid wall-clock time")
        .and_local_timezone(offset)
        .single()
        .expect("fixed offsets have no ambiguous local times");

    (next_midnight - local).to_std().unwrap_or(Duration::ZERO)
}
