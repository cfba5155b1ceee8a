use chrono::{DateTime, SubsecRound, Utc};

/// Current time, truncated to the microsecond precision the store keeps, so
/// a value compares equal to itself after a database round trip.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
