//! Sync cadence constants.

/// Seconds between timer-driven exchanges.
pub const SYNC_INTERVAL_SECS: u64 = 30;
