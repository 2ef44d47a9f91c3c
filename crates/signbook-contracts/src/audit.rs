//! Audit trail types.
//!
//! Every state transition in the verification and task-signature flows
//! produces exactly one `AuditEvent`, written in the same atomic unit as the
//! transition it documents. Events are append-only: never mutated, never
//! deleted. The flows themselves never read them back — the trail exists for
//! after-the-fact review.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{LogbookId, SignatoryId};

/// Who caused a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorType {
    /// The logbook owner driving the UI.
    Applicant,
    /// A signatory acting through an emailed confirmation link.
    Signatory,
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Applicant => "APPLICANT",
            Self::Signatory => "SIGNATORY",
        };
        f.write_str(s)
    }
}

/// The enumerated action an audit event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    SignatoryCreated,
    SignatoryUpdated,
    SignatoryVerifySent,
    SignatoryVerified,
    TaskSignatureRequestSent,
    TasksSigned,
}

impl AuditAction {
    /// The canonical wire name of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignatoryCreated => "SIGNATORY_CREATED",
            Self::SignatoryUpdated => "SIGNATORY_UPDATED",
            Self::SignatoryVerifySent => "SIGNATORY_VERIFY_SENT",
            Self::SignatoryVerified => "SIGNATORY_VERIFIED",
            Self::TaskSignatureRequestSent => "TASK_SIGNATURE_REQUEST_SENT",
            Self::TasksSigned => "TASKS_SIGNED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requester context captured on the unauthenticated confirmation endpoints.
///
/// Both fields are best-effort — a confirm arriving without forwarding
/// headers records neither.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    /// No requester context (applicant-initiated operations).
    pub fn none() -> Self {
        Self::default()
    }
}

/// One immutable entry in a logbook's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Monotonically increasing position in the store's append order.
    pub sequence: u64,
    pub logbook_id: LogbookId,
    pub actor_type: ActorType,
    pub actor_id: Option<SignatoryId>,
    pub action: AuditAction,
    /// Opaque structured payload, typically the ids involved.
    pub metadata: serde_json::Value,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
