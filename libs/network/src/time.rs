//! Overflow-safe wall clock helpers.
//!
//! Nanosecond timestamps are stored as `u64`, which runs out in the year 2554.
//! These helpers return an error instead of silently truncating.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Timestamp conversion error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    /// Timestamp value would overflow u64 when converted to nanoseconds
    Overflow {
        ns_value: u128,
        max_value: u64,
        overflow_year: u128,
    },
    /// System time error (before UNIX epoch)
    SystemTimeError,
}

impl std::fmt::Display for TimestampError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimestampError::Overflow {
                ns_value,
                max_value,
                overflow_year,
            } => {
                write!(
                    f,
                    "Timestamp overflow: {} ns exceeds u64::MAX ({}), corresponds to year {}",
                    ns_value, max_value, overflow_year
                )
            }
            TimestampError::SystemTimeError => write!(f, "System time before UNIX epoch"),
        }
    }
}

impl std::error::Error for TimestampError {}

/// Convert a duration since the epoch into nanoseconds, rejecting overflow.
pub fn safe_duration_to_ns_checked(duration: Duration) -> Result<u64, TimestampError> {
    let ns_u128 = duration.as_nanos();

    if ns_u128 > u64::MAX as u128 {
        let overflow_seconds = ns_u128 / 1_000_000_000;
        // Average year = 365.25 days
        let seconds_per_year = (365.25 * 24.0 * 3600.0) as u128;
        let overflow_year = 1970 + overflow_seconds / seconds_per_year;

        return Err(TimestampError::Overflow {
            ns_value: ns_u128,
            max_value: u64::MAX,
            overflow_year,
        });
    }

    Ok(ns_u128 as u64)
}

/// Current wall clock time in nanoseconds since the epoch.
pub fn safe_system_timestamp_ns_checked() -> Result<u64, TimestampError> {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => safe_duration_to_ns_checked(duration),
        Err(_) => Err(TimestampError::SystemTimeError),
    }
}

/// Current wall clock time in nanoseconds, `0` if the clock is unusable.
pub fn current_timestamp_ns() -> u64 {
    safe_system_timestamp_ns_checked().unwrap_or(0)
}
