//! One-time token requests: verification and task-signature.
//!
//! Both request kinds share the same consumption lifecycle, carried by a
//! single tagged `RequestState` value rather than separate status and
//! used-at fields that could disagree:
//!
//!   Pending → Used(at)
//!   Pending → Expired      (recorded when a confirm finds the row stale)
//!
//! Only the SHA-256 hash of the raw token is ever stored here; the raw token
//! exists outside process memory solely inside the emailed link.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::{SignbookError, SignbookResult},
    ids::{LogbookId, RequestId, SignatoryId},
};

/// Consumption state of a one-time request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "status")]
pub enum RequestState {
    /// Issued, not yet consumed.
    Pending,
    /// Consumed exactly once at the recorded instant.
    Used { at: DateTime<Utc> },
    /// Found past its expiry by a confirm attempt and marked inert.
    Expired,
}

impl RequestState {
    /// Check that a request in this state, expiring at `expires_at`, may be
    /// consumed at `now`.
    ///
    /// Check order matches the confirmation endpoints: already-used is
    /// reported before expiry, and an untouched request past `expires_at`
    /// fails even on the very first attempt.
    pub fn ensure_consumable(
        &self,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> SignbookResult<()> {
        match self {
            Self::Used { .. } => Err(SignbookError::AlreadyUsed),
            Self::Expired => Err(SignbookError::Expired),
            Self::Pending if now >= expires_at => Err(SignbookError::Expired),
            Self::Pending => Ok(()),
        }
    }

    /// Whether this request has been consumed.
    pub fn is_used(&self) -> bool {
        matches!(self, Self::Used { .. })
    }
}

/// One task row a signatory is asked to attest to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    /// Position of the row in the logbook table.
    pub row_index: u32,
    /// ATA chapter the task falls under (e.g. "05").
    pub ata: String,
    /// Free-text task description.
    pub task_text: String,
}

/// A one-time challenge proving a signatory's identity and capturing their
/// signature image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub id: RequestId,
    pub signatory_id: SignatoryId,
    /// SHA-256 hex digest of the raw token; the storage lookup key.
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub state: RequestState,
    pub created_at: DateTime<Utc>,
}

impl VerificationRequest {
    pub fn new(
        signatory_id: SignatoryId,
        token_hash: String,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            signatory_id,
            token_hash,
            expires_at,
            state: RequestState::Pending,
            created_at: now,
        }
    }

    /// Fail unless this request may be consumed at `now`.
    pub fn ensure_consumable(&self, now: DateTime<Utc>) -> SignbookResult<()> {
        self.state.ensure_consumable(self.expires_at, now)
    }
}

/// A one-time challenge asking an already-verified signatory to confirm a
/// specific batch of task rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSignatureRequest {
    pub id: RequestId,
    pub logbook_id: LogbookId,
    pub signatory_id: SignatoryId,
    /// SHA-256 hex digest of the raw token; the storage lookup key.
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub state: RequestState,
    /// The task batch this signature is asserted against.
    pub tasks: Vec<TaskItem>,
    pub created_at: DateTime<Utc>,
}

impl TaskSignatureRequest {
    pub fn new(
        logbook_id: LogbookId,
        signatory_id: SignatoryId,
        token_hash: String,
        expires_at: DateTime<Utc>,
        tasks: Vec<TaskItem>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            logbook_id,
            signatory_id,
            token_hash,
            expires_at,
            state: RequestState::Pending,
            tasks,
            created_at: now,
        }
    }

    /// Fail unless this request may be consumed at `now`.
    pub fn ensure_consumable(&self, now: DateTime<Utc>) -> SignbookResult<()> {
        self.state.ensure_consumable(self.expires_at, now)
    }

    /// The task payload as audit metadata.
    pub fn payload(&self) -> serde_json::Value {
        json!({ "tasks": self.tasks })
    }
}
