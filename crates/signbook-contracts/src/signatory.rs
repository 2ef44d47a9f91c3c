//! Signatory records and their identity-verification lifecycle.
//!
//! A signatory occupies one of fifteen slots in a logbook and moves through
//!
//!   DRAFT → PENDING → VERIFIED → NEEDS_REVERIFY
//!
//! PENDING means a verification email is outstanding; VERIFIED means the
//! recipient proved their identity and drew a signature; NEEDS_REVERIFY means
//! an identifying field was edited after verification and the proof is stale.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{SignbookError, SignbookResult},
    ids::{LogbookId, SignatoryId},
};

/// Lowest valid slot number.
pub const MIN_SLOT: u8 = 1;
/// Highest valid slot number.
pub const MAX_SLOT: u8 = 15;

/// A slot position within a logbook, restricted to 1..=15.
///
/// The constructor is the only way to obtain a value, so a `SlotNumber` held
/// anywhere in the system is always in range. (logbook, slot) is unique —
/// the store enforces that no two signatories in one logbook share a slot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct SlotNumber(u8);

impl SlotNumber {
    /// Validate `n` against the 1..=15 range.
    pub fn new(n: u8) -> SignbookResult<Self> {
        if (MIN_SLOT..=MAX_SLOT).contains(&n) {
            Ok(Self(n))
        } else {
            Err(SignbookError::validation(format!(
                "slot number {} is outside {}..={}",
                n, MIN_SLOT, MAX_SLOT
            )))
        }
    }

    /// The underlying slot position.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for SlotNumber {
    type Error = SignbookError;

    fn try_from(n: u8) -> SignbookResult<Self> {
        Self::new(n)
    }
}

impl From<SlotNumber> for u8 {
    fn from(slot: SlotNumber) -> u8 {
        slot.0
    }
}

impl fmt::Display for SlotNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle status of a signatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatoryStatus {
    /// Created, no verification email sent yet.
    Draft,
    /// A verification email is outstanding.
    Pending,
    /// Identity proven and a signature image is on file.
    Verified,
    /// Identifying fields changed after verification; re-proof required.
    NeedsReverify,
}

impl fmt::Display for SignatoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "DRAFT",
            Self::Pending => "PENDING",
            Self::Verified => "VERIFIED",
            Self::NeedsReverify => "NEEDS_REVERIFY",
        };
        f.write_str(s)
    }
}

/// The caller-supplied fields for creating or upserting a signatory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatoryDraft {
    pub name: String,
    pub email: String,
    pub licence_no: Option<String>,
    pub initials: Option<String>,
}

/// A partial update to a signatory's identifying fields.
///
/// `None` fields keep their existing value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignatoryPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub licence_no: Option<String>,
    pub initials: Option<String>,
}

/// A person authorized to attest to logged maintenance tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signatory {
    pub id: SignatoryId,
    pub logbook_id: LogbookId,
    pub slot: SlotNumber,
    pub name: String,
    pub email: String,
    pub licence_no: Option<String>,
    pub initials: Option<String>,
    /// Opaque SVG markup captured at verification time. Empty until verified.
    pub signature_svg: String,
    pub status: SignatoryStatus,
    pub signature_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Signatory {
    /// Create a signatory in `Draft` status with an empty signature.
    pub fn new(
        logbook_id: LogbookId,
        slot: SlotNumber,
        draft: SignatoryDraft,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SignatoryId::new(),
            logbook_id,
            slot,
            name: draft.name,
            email: draft.email,
            licence_no: draft.licence_no,
            initials: draft.initials,
            signature_svg: String::new(),
            status: SignatoryStatus::Draft,
            signature_updated_at: None,
            created_at: now,
        }
    }

    /// Merge `patch` into the identifying fields.
    ///
    /// Returns `true` if the patch supplied any field. Supplying any
    /// identifying field to a `Verified` signatory demotes it to
    /// `NeedsReverify`, even when the submitted value equals the stored one:
    /// the proof was captured against the identity as last confirmed, and
    /// every identity edit re-opens it.
    pub fn apply_patch(&mut self, patch: SignatoryPatch) -> bool {
        let mut touched = false;

        if let Some(name) = patch.name {
            self.name = name;
            touched = true;
        }
        if let Some(email) = patch.email {
            self.email = email;
            touched = true;
        }
        if let Some(licence_no) = patch.licence_no {
            self.licence_no = Some(licence_no);
            touched = true;
        }
        if let Some(initials) = patch.initials {
            self.initials = Some(initials);
            touched = true;
        }

        if touched && self.status == SignatoryStatus::Verified {
            self.status = SignatoryStatus::NeedsReverify;
        }

        touched
    }

    /// Whether a non-empty signature image is on file.
    pub fn has_saved_signature(&self) -> bool {
        !self.signature_svg.trim().is_empty()
    }

    /// Record a successful identity verification: store the drawn signature,
    /// stamp the update time, and promote to `Verified`.
    pub fn record_verification(&mut self, signature_svg: String, now: DateTime<Utc>) {
        self.signature_svg = signature_svg;
        self.signature_updated_at = Some(now);
        self.status = SignatoryStatus::Verified;
    }
}
