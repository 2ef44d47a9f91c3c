//! Trait seams between the flows and their collaborators.
//!
//! Three traits define the trust boundary of the service:
//!
//! - `LogbookStore` — trusted persistence engine; the only shared mutable
//!   resource. Each consume method is one atomic unit.
//! - `MailSender`   — untrusted delivery channel; fire-and-forget from the
//!   flows' perspective.
//! - `Clock`        — the single UTC time source shared by issuance and
//!   confirmation, so expiry comparisons never straddle two clocks.
//!
//! The store methods take `now` explicitly rather than reading a clock of
//! their own: time flows in from the service, which makes every store
//! implementation deterministic under test.

use chrono::{DateTime, Utc};

use signbook_contracts::{
    audit::{AuditEvent, RequestMeta},
    error::SignbookResult,
    ids::{LogbookId, SignatoryId},
    logbook::Logbook,
    request::{TaskSignatureRequest, VerificationRequest},
    signatory::{Signatory, SignatoryDraft, SignatoryPatch, SlotNumber},
};

/// The persistence engine behind the flows.
///
/// Implementations must provide unique-constrained lookup by token hash,
/// unique-constrained composite lookup by (logbook, slot), and atomic
/// multi-row writes. Every mutating method appends the corresponding audit
/// event inside the same atomic unit as the transition it documents — a
/// failure partway must leave neither half applied.
pub trait LogbookStore: Send + Sync {
    /// Create a fresh, empty logbook.
    fn create_logbook(&self, now: DateTime<Utc>) -> SignbookResult<Logbook>;

    /// Insert a signatory in `Draft` status.
    ///
    /// Fails with `Conflict` if the (logbook, slot) pair is already taken,
    /// and `NotFound` if the logbook does not exist. Audits
    /// `SIGNATORY_CREATED`.
    fn create_signatory(
        &self,
        logbook_id: LogbookId,
        slot: SlotNumber,
        draft: SignatoryDraft,
        now: DateTime<Utc>,
    ) -> SignbookResult<Signatory>;

    /// Create-or-update by the (logbook, slot) composite key.
    ///
    /// A fresh slot behaves exactly like `create_signatory`; an occupied
    /// slot merges the draft fields into the existing row (demoting a
    /// `Verified` signatory to `NeedsReverify`) and audits
    /// `SIGNATORY_UPDATED`. Never produces two rows for one slot.
    fn upsert_signatory(
        &self,
        logbook_id: LogbookId,
        slot: SlotNumber,
        draft: SignatoryDraft,
        now: DateTime<Utc>,
    ) -> SignbookResult<Signatory>;

    /// Load a signatory by id. Fails with `NotFound` if absent.
    fn signatory(&self, id: SignatoryId) -> SignbookResult<Signatory>;

    /// Merge `patch` into a signatory's identifying fields.
    ///
    /// Applies the `NeedsReverify` demotion rule and audits
    /// `SIGNATORY_UPDATED`.
    fn update_signatory(
        &self,
        id: SignatoryId,
        patch: SignatoryPatch,
        now: DateTime<Utc>,
    ) -> SignbookResult<Signatory>;

    /// All signatories of a logbook, ordered by slot ascending.
    fn list_signatories(&self, logbook_id: LogbookId) -> SignbookResult<Vec<Signatory>>;

    /// Persist a freshly issued verification request.
    ///
    /// In the same unit: set the signatory's status to `Pending` and audit
    /// `SIGNATORY_VERIFY_SENT`. Earlier unused requests for the same
    /// signatory are left untouched.
    fn record_verification_request(
        &self,
        request: VerificationRequest,
    ) -> SignbookResult<()>;

    /// Consume a verification request presented by token hash.
    ///
    /// Atomically: look up by hash (`NotFound`), check not used
    /// (`AlreadyUsed`), check `now` is strictly before expiry (`Expired`,
    /// recording the `Expired` state as a side effect), then store the
    /// signature image on the signatory, promote it to `Verified`, mark the
    /// request used, and audit `SIGNATORY_VERIFIED` with the requester
    /// context. Two racing calls on one token: exactly one wins.
    fn consume_verification_request(
        &self,
        token_hash: &str,
        signature_svg: &str,
        meta: RequestMeta,
        now: DateTime<Utc>,
    ) -> SignbookResult<Signatory>;

    /// Persist a freshly issued task-signature request and audit
    /// `TASK_SIGNATURE_REQUEST_SENT`.
    fn record_task_signature_request(
        &self,
        request: TaskSignatureRequest,
    ) -> SignbookResult<()>;

    /// Consume a task-signature request presented by token hash.
    ///
    /// Same check order and atomicity as the verification variant, but the
    /// signatory row is not touched — the transition only records that the
    /// previously captured signature is now asserted against this batch.
    /// Audits `TASKS_SIGNED` with the original task payload as metadata.
    fn consume_task_signature_request(
        &self,
        token_hash: &str,
        meta: RequestMeta,
        now: DateTime<Utc>,
    ) -> SignbookResult<TaskSignatureRequest>;

    /// The append-only audit trail of a logbook, in append order.
    ///
    /// Read surface for external review UIs; the flows never read this back.
    fn audit_events(&self, logbook_id: LogbookId) -> SignbookResult<Vec<AuditEvent>>;
}

/// An outbound email channel.
///
/// Delivery is best-effort: the flows call `send` only after the
/// transactional write commits, and a failure is logged, never rolled back.
/// The resend operation is the recovery path.
pub trait MailSender: Send + Sync {
    /// Attempt to deliver one message.
    fn send(&self, to: &str, subject: &str, html: &str) -> SignbookResult<()>;
}

/// The time source for issuance and expiry comparison.
pub trait Clock: Send + Sync {
    /// The current instant, UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
