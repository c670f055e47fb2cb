//! Paces requests against one upstream quota.
//!
//! Each upstream gets its own limiter instance; the transaction history API
//! and the RPC endpoint have unrelated budgets, so they must never share one.

use std::time::Duration;

use tokio::{
    sync::Mutex,
    time::{
        self,
        Instant,
    },
};

/// Admits callers one at a time, spaced by at least the configured interval.
///
/// Spacing is measured from the start of one admission to the start of the
/// next, independent of how long the admitted work takes. Waiters are served
/// in arrival order (tokio's `Mutex` queues fairly), and admission always
/// eventually succeeds; callers needing a bound on waiting wrap `acquire` in
/// their own timeout.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Suspend until this caller's admission slot arrives.
    pub async fn acquire(&self) {
        let admit_at = {
            let mut next_slot = self.next_slot.lock().await;
            let admit_at = (*next_slot).max(Instant::now());
            *next_slot = admit_at + self.min_interval;
            admit_at
        };
        // Sleep outside the lock so later callers can claim their slots.
        time::sleep_until(admit_at).await;
    }
}
