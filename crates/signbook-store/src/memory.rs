//! In-memory implementation of `LogbookStore`.
//!
//! All tables live behind a single `Mutex`, which doubles as the
//! transaction primitive: every mutating method acquires the lock once and
//! performs all of its row writes plus the audit append under it, so a
//! failure partway leaves nothing applied and two confirmations racing on
//! the same token serialize — exactly one observes the request as pending.
//!
//! Token hashes are the map keys for both request tables, mirroring the
//! unique constraint a relational store would place on that column; the
//! (logbook, slot) composite key is a second index over signatories.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use tracing::debug;

use signbook_contracts::{
    audit::{ActorType, AuditAction, AuditEvent, RequestMeta},
    error::{SignbookError, SignbookResult},
    ids::{LogbookId, SignatoryId},
    logbook::Logbook,
    request::{RequestState, TaskSignatureRequest, VerificationRequest},
    signatory::{Signatory, SignatoryDraft, SignatoryPatch, SignatoryStatus, SlotNumber},
};
use signbook_core::traits::LogbookStore;

// ── Internal mutable state ────────────────────────────────────────────────────

/// The tables of the in-memory store.
struct Tables {
    logbooks: HashMap<LogbookId, Logbook>,
    signatories: HashMap<SignatoryId, Signatory>,
    /// Unique (logbook, slot) index over signatories.
    slots: HashMap<(LogbookId, u8), SignatoryId>,
    /// Verification requests keyed by token hash (unique).
    verification_requests: HashMap<String, VerificationRequest>,
    /// Task-signature requests keyed by token hash (unique).
    task_requests: HashMap<String, TaskSignatureRequest>,
    /// Append-only audit trail across all logbooks, in write order.
    audit: Vec<AuditEvent>,
    audit_sequence: u64,
}

impl Tables {
    fn new() -> Self {
        Self {
            logbooks: HashMap::new(),
            signatories: HashMap::new(),
            slots: HashMap::new(),
            verification_requests: HashMap::new(),
            task_requests: HashMap::new(),
            audit: Vec::new(),
            audit_sequence: 0,
        }
    }

    fn ensure_logbook(&self, id: LogbookId) -> SignbookResult<()> {
        if self.logbooks.contains_key(&id) {
            Ok(())
        } else {
            Err(SignbookError::not_found("logbook"))
        }
    }

    fn signatory_mut(&mut self, id: SignatoryId) -> SignbookResult<&mut Signatory> {
        self.signatories
            .get_mut(&id)
            .ok_or_else(|| SignbookError::not_found("signatory"))
    }

    #[allow(clippy::too_many_arguments)]
    fn append_audit(
        &mut self,
        logbook_id: LogbookId,
        actor_type: ActorType,
        actor_id: Option<SignatoryId>,
        action: AuditAction,
        metadata: serde_json::Value,
        meta: RequestMeta,
        recorded_at: DateTime<Utc>,
    ) {
        let event = AuditEvent {
            sequence: self.audit_sequence,
            logbook_id,
            actor_type,
            actor_id,
            action,
            metadata,
            ip: meta.ip,
            user_agent: meta.user_agent,
            recorded_at,
        };
        self.audit.push(event);
        self.audit_sequence += 1;
    }

    fn insert_signatory(
        &mut self,
        logbook_id: LogbookId,
        slot: SlotNumber,
        draft: SignatoryDraft,
        now: DateTime<Utc>,
    ) -> Signatory {
        let signatory = Signatory::new(logbook_id, slot, draft, now);
        self.slots.insert((logbook_id, slot.get()), signatory.id);
        self.signatories.insert(signatory.id, signatory.clone());
        self.append_audit(
            logbook_id,
            ActorType::Applicant,
            None,
            AuditAction::SignatoryCreated,
            serde_json::json!({ "signatory_id": signatory.id, "slot": slot.get() }),
            RequestMeta::none(),
            now,
        );
        signatory
    }
}

// ── Public store ──────────────────────────────────────────────────────────────

/// An in-memory `LogbookStore` safe to share across threads.
///
/// Clone-cheap: clones share the same underlying tables.
#[derive(Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(Tables::new())) }
    }

    fn lock(&self) -> SignbookResult<MutexGuard<'_, Tables>> {
        self.state.lock().map_err(|e| SignbookError::Storage {
            reason: format!("store lock poisoned: {}", e),
        })
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LogbookStore for InMemoryStore {
    fn create_logbook(&self, now: DateTime<Utc>) -> SignbookResult<Logbook> {
        let mut tables = self.lock()?;
        let logbook = Logbook::new(now);
        tables.logbooks.insert(logbook.id, logbook.clone());
        Ok(logbook)
    }

    fn create_signatory(
        &self,
        logbook_id: LogbookId,
        slot: SlotNumber,
        draft: SignatoryDraft,
        now: DateTime<Utc>,
    ) -> SignbookResult<Signatory> {
        let mut tables = self.lock()?;
        tables.ensure_logbook(logbook_id)?;

        if tables.slots.contains_key(&(logbook_id, slot.get())) {
            return Err(SignbookError::Conflict {
                reason: format!("slot {} is already taken in this logbook", slot),
            });
        }

        Ok(tables.insert_signatory(logbook_id, slot, draft, now))
    }

    fn upsert_signatory(
        &self,
        logbook_id: LogbookId,
        slot: SlotNumber,
        draft: SignatoryDraft,
        now: DateTime<Utc>,
    ) -> SignbookResult<Signatory> {
        let mut tables = self.lock()?;
        tables.ensure_logbook(logbook_id)?;

        let existing = tables.slots.get(&(logbook_id, slot.get())).copied();
        match existing {
            None => Ok(tables.insert_signatory(logbook_id, slot, draft, now)),
            Some(id) => {
                let patch = SignatoryPatch {
                    name: Some(draft.name),
                    email: Some(draft.email),
                    licence_no: draft.licence_no,
                    initials: draft.initials,
                };
                let signatory = tables.signatory_mut(id)?;
                signatory.apply_patch(patch);
                let snapshot = signatory.clone();
                tables.append_audit(
                    logbook_id,
                    ActorType::Applicant,
                    None,
                    AuditAction::SignatoryUpdated,
                    serde_json::json!({
                        "signatory_id": snapshot.id,
                        "slot": slot.get(),
                        "status": snapshot.status,
                    }),
                    RequestMeta::none(),
                    now,
                );
                Ok(snapshot)
            }
        }
    }

    fn signatory(&self, id: SignatoryId) -> SignbookResult<Signatory> {
        let tables = self.lock()?;
        tables
            .signatories
            .get(&id)
            .cloned()
            .ok_or_else(|| SignbookError::not_found("signatory"))
    }

    fn update_signatory(
        &self,
        id: SignatoryId,
        patch: SignatoryPatch,
        now: DateTime<Utc>,
    ) -> SignbookResult<Signatory> {
        let mut tables = self.lock()?;
        let signatory = tables.signatory_mut(id)?;
        signatory.apply_patch(patch);
        let snapshot = signatory.clone();
        tables.append_audit(
            snapshot.logbook_id,
            ActorType::Applicant,
            None,
            AuditAction::SignatoryUpdated,
            serde_json::json!({ "signatory_id": snapshot.id, "status": snapshot.status }),
            RequestMeta::none(),
            now,
        );
        Ok(snapshot)
    }

    fn list_signatories(&self, logbook_id: LogbookId) -> SignbookResult<Vec<Signatory>> {
        let tables = self.lock()?;
        let mut rows: Vec<Signatory> = tables
            .signatories
            .values()
            .filter(|s| s.logbook_id == logbook_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.slot);
        Ok(rows)
    }

    fn record_verification_request(
        &self,
        request: VerificationRequest,
    ) -> SignbookResult<()> {
        let mut tables = self.lock()?;
        let now = request.created_at;

        // Uniqueness check first: on Conflict the unit must leave no writes
        // behind, including the status flip below.
        if tables.verification_requests.contains_key(&request.token_hash) {
            return Err(SignbookError::Conflict {
                reason: "duplicate verification token hash".to_string(),
            });
        }

        let signatory = tables.signatory_mut(request.signatory_id)?;
        // Resend semantics: always back to Pending, whatever the prior state.
        signatory.status = SignatoryStatus::Pending;
        let logbook_id = signatory.logbook_id;
        let signatory_id = signatory.id;

        tables
            .verification_requests
            .insert(request.token_hash.clone(), request.clone());

        tables.append_audit(
            logbook_id,
            ActorType::Applicant,
            None,
            AuditAction::SignatoryVerifySent,
            serde_json::json!({
                "signatory_id": signatory_id,
                "verify_request_id": request.id,
            }),
            RequestMeta::none(),
            now,
        );

        debug!(signatory_id = %signatory_id, request_id = %request.id, "verification request stored");
        Ok(())
    }

    fn consume_verification_request(
        &self,
        token_hash: &str,
        signature_svg: &str,
        meta: RequestMeta,
        now: DateTime<Utc>,
    ) -> SignbookResult<Signatory> {
        let mut tables = self.lock()?;

        let (request_id, signatory_id, check) = {
            let request = tables
                .verification_requests
                .get(token_hash)
                .ok_or_else(|| SignbookError::not_found("verification request"))?;
            (request.id, request.signatory_id, request.ensure_consumable(now))
        };

        if let Err(e) = check {
            if matches!(e, SignbookError::Expired) {
                // Record the expiry so later attempts see an inert row.
                if let Some(request) = tables.verification_requests.get_mut(token_hash) {
                    if request.state == RequestState::Pending {
                        request.state = RequestState::Expired;
                    }
                }
            }
            return Err(e);
        }

        // Validate the signatory row before any write so a missing FK
        // target cannot leave the request half-consumed.
        if !tables.signatories.contains_key(&signatory_id) {
            return Err(SignbookError::Storage {
                reason: "verification request references a missing signatory".to_string(),
            });
        }

        if let Some(request) = tables.verification_requests.get_mut(token_hash) {
            request.state = RequestState::Used { at: now };
        }
        let signatory = tables.signatory_mut(signatory_id)?;
        signatory.record_verification(signature_svg.to_string(), now);
        let snapshot = signatory.clone();

        tables.append_audit(
            snapshot.logbook_id,
            ActorType::Signatory,
            Some(signatory_id),
            AuditAction::SignatoryVerified,
            serde_json::json!({
                "signatory_id": signatory_id,
                "verify_request_id": request_id,
            }),
            meta,
            now,
        );

        Ok(snapshot)
    }

    fn record_task_signature_request(
        &self,
        request: TaskSignatureRequest,
    ) -> SignbookResult<()> {
        let mut tables = self.lock()?;
        tables.ensure_logbook(request.logbook_id)?;
        if !tables.signatories.contains_key(&request.signatory_id) {
            return Err(SignbookError::not_found("signatory"));
        }
        // Check before inserting so a duplicate never clobbers the row
        // already stored under this hash.
        if tables.task_requests.contains_key(&request.token_hash) {
            return Err(SignbookError::Conflict {
                reason: "duplicate task-signature token hash".to_string(),
            });
        }

        let now = request.created_at;
        let metadata = serde_json::json!({
            "task_signature_request_id": request.id,
            "signatory_id": request.signatory_id,
            "task_count": request.tasks.len(),
        });
        let logbook_id = request.logbook_id;

        tables.task_requests.insert(request.token_hash.clone(), request);

        tables.append_audit(
            logbook_id,
            ActorType::Applicant,
            None,
            AuditAction::TaskSignatureRequestSent,
            metadata,
            RequestMeta::none(),
            now,
        );

        Ok(())
    }

    fn consume_task_signature_request(
        &self,
        token_hash: &str,
        meta: RequestMeta,
        now: DateTime<Utc>,
    ) -> SignbookResult<TaskSignatureRequest> {
        let mut tables = self.lock()?;

        {
            let request = tables
                .task_requests
                .get(token_hash)
                .ok_or_else(|| SignbookError::not_found("task signature request"))?;
            if let Err(e) = request.ensure_consumable(now) {
                if matches!(e, SignbookError::Expired) {
                    if let Some(request) = tables.task_requests.get_mut(token_hash) {
                        if request.state == RequestState::Pending {
                            request.state = RequestState::Expired;
                        }
                    }
                }
                return Err(e);
            }
        }

        let snapshot = {
            let request = tables
                .task_requests
                .get_mut(token_hash)
                .ok_or_else(|| SignbookError::not_found("task signature request"))?;
            request.state = RequestState::Used { at: now };
            request.clone()
        };

        tables.append_audit(
            snapshot.logbook_id,
            ActorType::Signatory,
            Some(snapshot.signatory_id),
            AuditAction::TasksSigned,
            snapshot.payload(),
            meta,
            now,
        );

        Ok(snapshot)
    }

    fn audit_events(&self, logbook_id: LogbookId) -> SignbookResult<Vec<AuditEvent>> {
        let tables = self.lock()?;
        Ok(tables
            .audit
            .iter()
            .filter(|e| e.logbook_id == logbook_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use signbook_contracts::{
        audit::{AuditAction, RequestMeta},
        error::SignbookError,
        ids::LogbookId,
        request::VerificationRequest,
        signatory::{SignatoryDraft, SignatoryPatch, SignatoryStatus, SlotNumber},
    };
    use signbook_core::traits::LogbookStore;

    use super::InMemoryStore;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn draft(name: &str) -> SignatoryDraft {
        SignatoryDraft {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            licence_no: None,
            initials: None,
        }
    }

    fn slot(n: u8) -> SlotNumber {
        SlotNumber::new(n).unwrap()
    }

    #[test]
    fn create_signatory_requires_existing_logbook() {
        let store = InMemoryStore::new();
        let result = store.create_signatory(LogbookId::new(), slot(1), draft("Dana"), now());
        assert!(matches!(result, Err(SignbookError::NotFound { .. })));
    }

    #[test]
    fn duplicate_slot_is_a_conflict() {
        let store = InMemoryStore::new();
        let logbook = store.create_logbook(now()).unwrap();

        store
            .create_signatory(logbook.id, slot(3), draft("Dana"), now())
            .unwrap();
        match store.create_signatory(logbook.id, slot(3), draft("Eli"), now()) {
            Err(SignbookError::Conflict { reason }) => {
                assert!(reason.contains("slot 3"), "reason: {}", reason);
            }
            other => panic!("expected Conflict, got {:?}", other),
        }

        // The same slot in a different logbook is fine.
        let other = store.create_logbook(now()).unwrap();
        store
            .create_signatory(other.id, slot(3), draft("Eli"), now())
            .unwrap();
    }

    #[test]
    fn upsert_reuses_the_existing_row() {
        let store = InMemoryStore::new();
        let logbook = store.create_logbook(now()).unwrap();

        let first = store
            .upsert_signatory(logbook.id, slot(5), draft("Dana"), now())
            .unwrap();
        let second = store
            .upsert_signatory(logbook.id, slot(5), draft("Dana Reyes"), now())
            .unwrap();

        // Same row, updated fields, never two rows for one slot.
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Dana Reyes");
        assert_eq!(store.list_signatories(logbook.id).unwrap().len(), 1);
    }

    #[test]
    fn list_is_ordered_by_slot_ascending() {
        let store = InMemoryStore::new();
        let logbook = store.create_logbook(now()).unwrap();

        for n in [9u8, 2, 14, 1] {
            store
                .create_signatory(logbook.id, slot(n), draft(&format!("S{}", n)), now())
                .unwrap();
        }

        let slots: Vec<u8> = store
            .list_signatories(logbook.id)
            .unwrap()
            .iter()
            .map(|s| s.slot.get())
            .collect();
        assert_eq!(slots, vec![1, 2, 9, 14]);
    }

    #[test]
    fn update_applies_patch_and_audits() {
        let store = InMemoryStore::new();
        let logbook = store.create_logbook(now()).unwrap();
        let signatory = store
            .create_signatory(logbook.id, slot(1), draft("Dana"), now())
            .unwrap();

        let updated = store
            .update_signatory(
                signatory.id,
                SignatoryPatch {
                    licence_no: Some("M-44871".to_string()),
                    ..Default::default()
                },
                now(),
            )
            .unwrap();
        assert_eq!(updated.licence_no.as_deref(), Some("M-44871"));

        let actions: Vec<AuditAction> = store
            .audit_events(logbook.id)
            .unwrap()
            .iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec![AuditAction::SignatoryCreated, AuditAction::SignatoryUpdated]
        );
    }

    #[test]
    fn audit_sequences_increase_in_append_order() {
        let store = InMemoryStore::new();
        let logbook = store.create_logbook(now()).unwrap();
        store
            .create_signatory(logbook.id, slot(1), draft("Dana"), now())
            .unwrap();
        store
            .create_signatory(logbook.id, slot(2), draft("Eli"), now())
            .unwrap();

        let events = store.audit_events(logbook.id).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].sequence < events[1].sequence);
    }

    #[test]
    fn recording_a_verification_request_flips_signatory_to_pending() {
        let store = InMemoryStore::new();
        let logbook = store.create_logbook(now()).unwrap();
        let signatory = store
            .create_signatory(logbook.id, slot(1), draft("Dana"), now())
            .unwrap();
        assert_eq!(signatory.status, SignatoryStatus::Draft);

        let request = VerificationRequest::new(
            signatory.id,
            "ab".repeat(32),
            now() + chrono::Duration::days(7),
            now(),
        );
        store.record_verification_request(request).unwrap();

        assert_eq!(
            store.signatory(signatory.id).unwrap().status,
            SignatoryStatus::Pending
        );
    }

    #[test]
    fn duplicate_token_hash_conflict_leaves_no_writes_behind() {
        let store = InMemoryStore::new();
        let logbook = store.create_logbook(now()).unwrap();
        let signatory = store
            .create_signatory(logbook.id, slot(1), draft("Dana"), now())
            .unwrap();

        let hash = "ab".repeat(32);
        let first = VerificationRequest::new(
            signatory.id,
            hash.clone(),
            now() + chrono::Duration::days(7),
            now(),
        );
        store.record_verification_request(first).unwrap();
        store
            .consume_verification_request(&hash, "<svg></svg>", RequestMeta::none(), now())
            .unwrap();
        let events_before = store.audit_events(logbook.id).unwrap().len();

        let second = VerificationRequest::new(
            signatory.id,
            hash.clone(),
            now() + chrono::Duration::days(7),
            now(),
        );
        match store.record_verification_request(second) {
            Err(SignbookError::Conflict { .. }) => {}
            other => panic!("expected Conflict, got {:?}", other),
        }

        // The failed record is all-or-nothing: the signatory was not flipped
        // back to Pending, no audit event was appended, and the stored row
        // under this hash still reads as used.
        assert_eq!(
            store.signatory(signatory.id).unwrap().status,
            SignatoryStatus::Verified
        );
        assert_eq!(store.audit_events(logbook.id).unwrap().len(), events_before);
        assert!(matches!(
            store.consume_verification_request(&hash, "<svg></svg>", RequestMeta::none(), now()),
            Err(SignbookError::AlreadyUsed)
        ));
    }
}
