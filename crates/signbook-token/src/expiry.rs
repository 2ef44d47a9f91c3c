//! Expiry policy: absolute expiry timestamps computed from "days from now".
//!
//! All timestamps are UTC. The expiry is evaluated at issuance time, not at
//! persistence time, and the 7-day "timeout" is a data-level comparison at
//! confirmation — there is no runtime timer anywhere in the system.

use chrono::{DateTime, Duration, Utc};

/// Default lifetime of both request kinds, in days.
pub const DEFAULT_EXPIRY_DAYS: i64 = 7;

/// Absolute expiry timestamp `days` days after `now`.
pub fn add_days(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now + Duration::days(days)
}
