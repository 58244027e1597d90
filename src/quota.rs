//! # Feature: Daily Usage Quota
//!
//! Tracks how many AI invocations each user has left for the current day.
//! Entries are created lazily on a user's first attempt and cleared either
//! individually by an admin or collectively by the daily reset scheduler.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Initial release with per-user consume/reset and global reset

use dashmap::DashMap;
use log::debug;

/// Default number of AI invocations allowed per user per day
pub const DEFAULT_DAILY_ALLOWANCE: i32 = 3;

/// Outcome of a quota consumption attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeResult {
    /// The user may invoke an AI capability for this attempt
    Allowed { remaining: i32 },
    /// The user's daily allowance is exhausted
    Denied,
}

impl ConsumeResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ConsumeResult::Allowed { .. })
    }
}

/// Per-user daily quota bookkeeping
///
/// Shared across event handlers via `Arc`. The read-modify-write inside
/// [`QuotaLedger::consume`] holds the map entry for its whole duration, so a
/// concurrent attempt by the same user always observes the decrement.
pub struct QuotaLedger {
    allowance: i32,
    remaining: DashMap<u64, i32>,
}

impl QuotaLedger {
    pub fn new(allowance: i32) -> Self {
        QuotaLedger {
            allowance,
            remaining: DashMap::new(),
        }
    }

    /// Record one AI invocation attempt for a user.
    ///
    /// A user's first attempt of the day creates the entry at the full
    /// allowance; every later attempt decrements it, whether or not the
    /// attempt ends up being served. The attempt is allowed while the stored
    /// value is still positive, so a user gets exactly `allowance` served
    /// attempts between resets. Denied users keep being decremented below
    /// zero until the next reset.
    pub fn consume(&self, user_id: u64) -> ConsumeResult {
        let entry = self
            .remaining
            .entry(user_id)
            .and_modify(|r| *r -= 1)
            .or_insert(self.allowance);
        let remaining = *entry;
        drop(entry);

        if remaining > 0 {
            ConsumeResult::Allowed { remaining }
        } else {
            debug!("user {user_id} is over quota (counter at {remaining})");
            ConsumeResult::Denied
        }
    }

    /// Remove a single user's entry, restoring the full allowance on their
    /// next attempt. Returns whether an entry existed.
    pub fn reset(&self, user_id: u64) -> bool {
        self.remaining.remove(&user_id).is_some()
    }

    /// Clear every entry. Invoked once a day by the reset scheduler.
    pub fn reset_all(&self) {
        let cleared = self.remaining.len();
        self.remaining.clear();
        debug!("cleared quota entries for {cleared} user(s)");
    }

    pub fn allowance(&self) -> i32 {
        self.allowance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowance_served_exactly_three_times() {
        let ledger = QuotaLedger::new(3);

        assert_eq!(ledger.consume(1), ConsumeResult::Allowed { remaining: 3 });
        assert_eq!(ledger.consume(1), ConsumeResult::Allowed { remaining: 2 });
        assert_eq!(ledger.consume(1), ConsumeResult::Allowed { remaining: 1 });
        assert_eq!(ledger.consume(1), ConsumeResult::Denied);
        assert_eq!(ledger.consume(1), ConsumeResult::Denied);
    }

    #[test]
    fn test_users_are_independent() {
        let ledger = QuotaLedger::new(3);

        for _ in 0..4 {
            ledger.consume(1);
        }
        assert_eq!(ledger.consume(1), ConsumeResult::Denied);

        // A different user starts fresh
        assert_eq!(ledger.consume(2), ConsumeResult::Allowed { remaining: 3 });
    }

    #[test]
    fn test_reset_single_user() {
        let ledger = QuotaLedger::new(3);

        for _ in 0..4 {
            ledger.consume(1);
            ledger.consume(2);
        }
        assert!(ledger.reset(1));

        // User 1 behaves like a first-time caller again
        assert_eq!(ledger.consume(1), ConsumeResult::Allowed { remaining: 3 });
        // User 2 is still exhausted
        assert_eq!(ledger.consume(2), ConsumeResult::Denied);
    }

    #[test]
    fn test_reset_missing_user_is_a_no_op() {
        let ledger = QuotaLedger::new(3);
        assert!(!ledger.reset(99));
        assert_eq!(ledger.consume(99), ConsumeResult::Allowed { remaining: 3 });
    }

    #[test]
    fn test_reset_all_restores_everyone() {
        let ledger = QuotaLedger::new(3);

        for user in [1, 2, 3] {
            for _ in 0..4 {
                ledger.consume(user);
            }
            assert_eq!(ledger.consume(user), ConsumeResult::Denied);
        }

        ledger.reset_all();

        for user in [1, 2, 3] {
            assert_eq!(
                ledger.consume(user),
                ConsumeResult::Allowed { remaining: 3 }
            );
        }
    }

    #[test]
    fn test_custom_allowance() {
        let ledger = QuotaLedger::new(1);
        assert_eq!(ledger.consume(7), ConsumeResult::Allowed { remaining: 1 });
        assert_eq!(ledger.consume(7), ConsumeResult::Denied);
    }
}
