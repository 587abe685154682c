//! Time utilities and tuning defaults for the ledger core.

use chrono::{DateTime, Duration, Utc};

/// Tuning defaults.
pub mod constants {
    use super::Duration;

    /// Time budget for a single store lock acquisition (2 seconds).
    pub fn lock_budget() -> std::time::Duration {
        std::time::Duration::from_secs(2)
    }

    /// Age after which a `Pending` movement is considered stale and
    /// eligible for the reconciliation sweep (15 minutes).
    pub fn stale_pending_after() -> Duration {
        Duration::minutes(15)
    }

    /// Interval between reconciliation sweeps (60 seconds).
    pub fn sweep_interval() -> std::time::Duration {
        std::time::Duration::from_secs(60)
    }
}

/// A timestamp with timezone (always UTC for CoreBank).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Check if a timestamp has expired (is in the past).
pub fn is_expired(expiry: Timestamp) -> bool {
    now() > expiry
}

/// Calculate expiry time from now.
pub fn expires_in(duration: Duration) -> Timestamp {
    now() + duration
}
