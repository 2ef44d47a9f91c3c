//! The logbook root container.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::LogbookId;

/// Root container grouping signatories, requests, and audit events for one
/// applicant's maintenance-experience record.
///
/// Created on demand by the UI bootstrap step, never mutated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logbook {
    pub id: LogbookId,
    pub created_at: DateTime<Utc>,
}

impl Logbook {
    /// Create a fresh logbook stamped with `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { id: LogbookId::new(), created_at: now }
    }
}
