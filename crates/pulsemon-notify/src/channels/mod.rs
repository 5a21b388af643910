pub mod email;
pub mod slack;
pub mod webhook;

use std::time::Duration;

/// Delivery attempts per target before giving up.
pub(crate) const MAX_ATTEMPTS: u32 = 3;

/// Exponential backoff delay before retry `attempt` (0-based).
pub(crate) fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(100 * 2u64.pow(attempt))
}
