//! The logbook service: the single entry point for every flow operation.
//!
//! One service instance owns the trusted collaborators — store, mail
//! sender, clock, configuration — and exposes the operations the logbook UI
//! and the two confirmation endpoints call. The signatory CRUD operations
//! live here; the verification and task-signature flows are implemented in
//! their own modules on the same type.

use tracing::{info, warn};

use signbook_contracts::{
    audit::AuditEvent,
    error::SignbookResult,
    ids::{LogbookId, SignatoryId},
    logbook::Logbook,
    signatory::{Signatory, SignatoryDraft, SignatoryPatch, SlotNumber},
};

use crate::{
    config::AppConfig,
    traits::{Clock, LogbookStore, MailSender},
};

/// Stateless front door over the persistence engine and mail channel.
///
/// Every method is an independent, one-shot operation; concurrency control
/// is delegated entirely to the store's transaction primitive.
pub struct LogbookService {
    store: Box<dyn LogbookStore>,
    mail: Box<dyn MailSender>,
    clock: Box<dyn Clock>,
    config: AppConfig,
}

impl LogbookService {
    /// Wire a service from its collaborators.
    pub fn new(
        store: Box<dyn LogbookStore>,
        mail: Box<dyn MailSender>,
        clock: Box<dyn Clock>,
        config: AppConfig,
    ) -> Self {
        Self { store, mail, clock, config }
    }

    pub(crate) fn store(&self) -> &dyn LogbookStore {
        self.store.as_ref()
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Create a fresh logbook (the UI bootstrap step).
    pub fn create_logbook(&self) -> SignbookResult<Logbook> {
        let logbook = self.store.create_logbook(self.clock.now())?;
        info!(logbook_id = %logbook.id, "logbook created");
        Ok(logbook)
    }

    /// Create a signatory in slot `slot` of `logbook_id`.
    ///
    /// Slot range is validated before any write; a taken slot fails with
    /// `Conflict`.
    pub fn create_signatory(
        &self,
        logbook_id: LogbookId,
        slot: u8,
        draft: SignatoryDraft,
    ) -> SignbookResult<Signatory> {
        let slot = SlotNumber::new(slot)?;
        let signatory =
            self.store
                .create_signatory(logbook_id, slot, draft, self.clock.now())?;
        info!(
            logbook_id = %logbook_id,
            signatory_id = %signatory.id,
            slot = %slot,
            "signatory created"
        );
        Ok(signatory)
    }

    /// Create-or-update the signatory occupying slot `slot`.
    pub fn upsert_signatory(
        &self,
        logbook_id: LogbookId,
        slot: u8,
        draft: SignatoryDraft,
    ) -> SignbookResult<Signatory> {
        let slot = SlotNumber::new(slot)?;
        self.store
            .upsert_signatory(logbook_id, slot, draft, self.clock.now())
    }

    /// Load one signatory by id.
    pub fn signatory(&self, id: SignatoryId) -> SignbookResult<Signatory> {
        self.store.signatory(id)
    }

    /// Merge a partial update into a signatory's identifying fields.
    ///
    /// Editing a `Verified` signatory demotes it to `NeedsReverify`, forcing
    /// re-proof before any further task signatures.
    pub fn update_signatory(
        &self,
        id: SignatoryId,
        patch: SignatoryPatch,
    ) -> SignbookResult<Signatory> {
        let signatory = self.store.update_signatory(id, patch, self.clock.now())?;
        info!(
            signatory_id = %signatory.id,
            status = %signatory.status,
            "signatory updated"
        );
        Ok(signatory)
    }

    /// All signatories of a logbook, ordered by slot ascending.
    pub fn list_signatories(&self, logbook_id: LogbookId) -> SignbookResult<Vec<Signatory>> {
        self.store.list_signatories(logbook_id)
    }

    /// The logbook's audit trail, in append order.
    pub fn audit_trail(&self, logbook_id: LogbookId) -> SignbookResult<Vec<AuditEvent>> {
        self.store.audit_events(logbook_id)
    }

    /// Best-effort mail dispatch, called only after the transactional write
    /// has committed. A delivery failure is logged and swallowed — the state
    /// change stands, and resending is the recovery path.
    pub(crate) fn dispatch_mail(&self, to: &str, subject: &str, html: &str) {
        if let Err(e) = self.mail.send(to, subject, html) {
            warn!(to = %to, subject = %subject, error = %e, "mail delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, TimeZone, Utc};

    use signbook_contracts::{
        audit::{AuditEvent, RequestMeta},
        error::{SignbookError, SignbookResult},
        ids::{LogbookId, SignatoryId},
        logbook::Logbook,
        request::{TaskItem, TaskSignatureRequest, VerificationRequest},
        signatory::{
            Signatory, SignatoryDraft, SignatoryPatch, SignatoryStatus, SlotNumber,
        },
    };

    use crate::{
        config::AppConfig,
        traits::{Clock, LogbookStore, MailSender},
    };

    use super::LogbookService;

    // ── Mock helpers ─────────────────────────────────────────────────────────

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn draft() -> SignatoryDraft {
        SignatoryDraft {
            name: "Dana Reyes".to_string(),
            email: "dana@example.com".to_string(),
            licence_no: None,
            initials: None,
        }
    }

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            fixed_now()
        }
    }

    /// A mail sender that records every message, optionally failing.
    struct MockMail {
        sent: Arc<Mutex<Vec<(String, String, String)>>>,
        fail: bool,
    }

    impl MockMail {
        fn new(fail: bool) -> Self {
            Self { sent: Arc::new(Mutex::new(vec![])), fail }
        }
    }

    impl MailSender for MockMail {
        fn send(&self, to: &str, subject: &str, html: &str) -> SignbookResult<()> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string(), html.to_string()));
            if self.fail {
                Err(SignbookError::Mail { reason: "smtp refused".to_string() })
            } else {
                Ok(())
            }
        }
    }

    /// A store that serves one configured signatory and records issued
    /// requests. Consume paths panic — these tests never reach them.
    struct MockStore {
        signatory: Option<Signatory>,
        verification_requests: Arc<Mutex<Vec<VerificationRequest>>>,
        task_requests: Arc<Mutex<Vec<TaskSignatureRequest>>>,
    }

    impl MockStore {
        fn with_signatory(signatory: Signatory) -> Self {
            Self {
                signatory: Some(signatory),
                verification_requests: Arc::new(Mutex::new(vec![])),
                task_requests: Arc::new(Mutex::new(vec![])),
            }
        }

        fn empty() -> Self {
            Self {
                signatory: None,
                verification_requests: Arc::new(Mutex::new(vec![])),
                task_requests: Arc::new(Mutex::new(vec![])),
            }
        }
    }

    impl LogbookStore for MockStore {
        fn create_logbook(&self, now: DateTime<Utc>) -> SignbookResult<Logbook> {
            Ok(Logbook::new(now))
        }

        fn create_signatory(
            &self,
            logbook_id: LogbookId,
            slot: SlotNumber,
            draft: SignatoryDraft,
            now: DateTime<Utc>,
        ) -> SignbookResult<Signatory> {
            Ok(Signatory::new(logbook_id, slot, draft, now))
        }

        fn upsert_signatory(
            &self,
            logbook_id: LogbookId,
            slot: SlotNumber,
            draft: SignatoryDraft,
            now: DateTime<Utc>,
        ) -> SignbookResult<Signatory> {
            Ok(Signatory::new(logbook_id, slot, draft, now))
        }

        fn signatory(&self, id: SignatoryId) -> SignbookResult<Signatory> {
            self.signatory
                .clone()
                .filter(|s| s.id == id)
                .ok_or_else(|| SignbookError::not_found("signatory"))
        }

        fn update_signatory(
            &self,
            _id: SignatoryId,
            _patch: SignatoryPatch,
            _now: DateTime<Utc>,
        ) -> SignbookResult<Signatory> {
            panic!("update_signatory not exercised here");
        }

        fn list_signatories(&self, _logbook_id: LogbookId) -> SignbookResult<Vec<Signatory>> {
            Ok(self.signatory.clone().into_iter().collect())
        }

        fn record_verification_request(
            &self,
            request: VerificationRequest,
        ) -> SignbookResult<()> {
            self.verification_requests.lock().unwrap().push(request);
            Ok(())
        }

        fn consume_verification_request(
            &self,
            _token_hash: &str,
            _signature_svg: &str,
            _meta: RequestMeta,
            _now: DateTime<Utc>,
        ) -> SignbookResult<Signatory> {
            panic!("consume_verification_request must not be reached");
        }

        fn record_task_signature_request(
            &self,
            request: TaskSignatureRequest,
        ) -> SignbookResult<()> {
            self.task_requests.lock().unwrap().push(request);
            Ok(())
        }

        fn consume_task_signature_request(
            &self,
            _token_hash: &str,
            _meta: RequestMeta,
            _now: DateTime<Utc>,
        ) -> SignbookResult<TaskSignatureRequest> {
            panic!("consume_task_signature_request must not be reached");
        }

        fn audit_events(&self, _logbook_id: LogbookId) -> SignbookResult<Vec<AuditEvent>> {
            Ok(vec![])
        }
    }

    fn service(store: MockStore, mail: MockMail) -> LogbookService {
        LogbookService::new(
            Box::new(store),
            Box::new(mail),
            Box::new(FixedClock),
            AppConfig::default(),
        )
    }

    fn verified_signatory() -> Signatory {
        let mut s = Signatory::new(
            LogbookId::new(),
            SlotNumber::new(3).unwrap(),
            draft(),
            fixed_now(),
        );
        s.record_verification("<svg></svg>".to_string(), fixed_now());
        s
    }

    fn task() -> TaskItem {
        TaskItem {
            row_index: 12,
            ata: "05".to_string(),
            task_text: "Inspection following lightning strike".to_string(),
        }
    }

    // ── Slot validation happens before any write ─────────────────────────────

    #[test]
    fn create_signatory_rejects_out_of_range_slot() {
        let svc = service(MockStore::empty(), MockMail::new(false));
        let result = svc.create_signatory(LogbookId::new(), 16, draft());
        assert!(matches!(result, Err(SignbookError::Validation { .. })));
    }

    // ── send_verification preconditions ──────────────────────────────────────

    #[test]
    fn send_verification_fails_for_unknown_signatory() {
        let svc = service(MockStore::empty(), MockMail::new(false));
        match svc.send_verification(SignatoryId::new()) {
            Err(SignbookError::NotFound { what }) => assert_eq!(what, "signatory"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn send_verification_fails_on_empty_email() {
        let mut signatory = verified_signatory();
        signatory.email = "   ".to_string();
        let id = signatory.id;
        let svc = service(MockStore::with_signatory(signatory), MockMail::new(false));

        match svc.send_verification(id) {
            Err(SignbookError::Validation { reason }) => {
                assert!(reason.contains("email"), "reason: {}", reason);
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn send_verification_records_request_then_mails_link() {
        let signatory = verified_signatory();
        let id = signatory.id;
        let store = MockStore::with_signatory(signatory);
        let requests = store.verification_requests.clone();
        let mail = MockMail::new(false);
        let sent = mail.sent.clone();

        let svc = service(store, mail);
        let ack = svc.send_verification(id).unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, ack.request_id);
        // 7-day expiry from the fixed clock.
        assert_eq!(ack.expires_at, fixed_now() + chrono::Duration::days(7));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (to, _subject, html) = &sent[0];
        assert_eq!(to, "dana@example.com");
        assert!(html.contains("/signatory/verify/"), "body must carry the link");
        // Only the hash is persisted; the raw token lives in the mail body.
        assert!(!html.contains(&requests[0].token_hash));
    }

    #[test]
    fn mail_failure_does_not_roll_back_the_request() {
        let signatory = verified_signatory();
        let id = signatory.id;
        let store = MockStore::with_signatory(signatory);
        let requests = store.verification_requests.clone();

        let svc = service(store, MockMail::new(true));
        // The send reports success even though delivery failed.
        svc.send_verification(id).unwrap();
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    // ── confirm_verification payload validation ──────────────────────────────

    #[test]
    fn confirm_verification_rejects_non_svg_payload() {
        let svc = service(MockStore::empty(), MockMail::new(false));

        for bad in ["", "just text", "<div>nope</div>", "<svg no close tag"] {
            match svc.confirm_verification("deadbeef", bad, RequestMeta::none()) {
                Err(SignbookError::Validation { reason }) => {
                    assert!(reason.contains("SVG"), "reason: {}", reason);
                }
                other => panic!("expected Validation for {:?}, got {:?}", bad, other),
            }
        }
    }

    // ── task-signature request gates ─────────────────────────────────────────

    #[test]
    fn task_request_rejects_empty_task_list() {
        let signatory = verified_signatory();
        let logbook_id = signatory.logbook_id;
        let id = signatory.id;
        let svc = service(MockStore::with_signatory(signatory), MockMail::new(false));

        match svc.request_task_signatures(logbook_id, id, vec![]) {
            Err(SignbookError::Validation { reason }) => {
                assert!(reason.contains("task"), "reason: {}", reason);
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn task_request_requires_verified_signatory_with_signature() {
        // Every non-qualifying combination of status and signature image
        // must fail the precondition gate.
        let statuses = [
            SignatoryStatus::Draft,
            SignatoryStatus::Pending,
            SignatoryStatus::NeedsReverify,
        ];
        for status in statuses {
            for svg in ["", "<svg></svg>"] {
                let mut signatory = verified_signatory();
                signatory.status = status;
                signatory.signature_svg = svg.to_string();
                let logbook_id = signatory.logbook_id;
                let id = signatory.id;
                let store = MockStore::with_signatory(signatory);
                let requests = store.task_requests.clone();
                let mail = MockMail::new(false);
                let sent = mail.sent.clone();
                let svc = service(store, mail);

                match svc.request_task_signatures(logbook_id, id, vec![task()]) {
                    Err(SignbookError::Precondition { reason }) => {
                        assert!(reason.contains("verified"), "reason: {}", reason);
                    }
                    other => panic!(
                        "expected Precondition for {:?}/{:?}, got {:?}",
                        status, svg, other
                    ),
                }
                // No request row, no email.
                assert!(requests.lock().unwrap().is_empty());
                assert!(sent.lock().unwrap().is_empty());
            }
        }

        // Verified but with an empty signature also fails.
        let mut signatory = verified_signatory();
        signatory.signature_svg = String::new();
        let logbook_id = signatory.logbook_id;
        let id = signatory.id;
        let svc = service(MockStore::with_signatory(signatory), MockMail::new(false));
        assert!(matches!(
            svc.request_task_signatures(logbook_id, id, vec![task()]),
            Err(SignbookError::Precondition { .. })
        ));
    }

    #[test]
    fn task_request_records_row_and_mails_sign_link() {
        let signatory = verified_signatory();
        let logbook_id = signatory.logbook_id;
        let id = signatory.id;
        let store = MockStore::with_signatory(signatory);
        let requests = store.task_requests.clone();
        let mail = MockMail::new(false);
        let sent = mail.sent.clone();

        let svc = service(store, mail);
        let ack = svc
            .request_task_signatures(logbook_id, id, vec![task()])
            .unwrap();
        assert_eq!(ack.task_count, 1);

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].logbook_id, logbook_id);
        assert_eq!(requests[0].tasks[0].row_index, 12);

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].2.contains("/sign/"), "body must carry the sign link");
    }

    #[test]
    fn task_request_rejects_signatory_from_another_logbook() {
        let signatory = verified_signatory();
        let id = signatory.id;
        let svc = service(MockStore::with_signatory(signatory), MockMail::new(false));

        let result = svc.request_task_signatures(LogbookId::new(), id, vec![task()]);
        assert!(matches!(result, Err(SignbookError::Validation { .. })));
    }
}
