//! Task-signature flow.
//!
//! Separated from identity verification by design: proving who you are and
//! capturing a signature image happens once, and the captured signature can
//! then be asserted against many independent task batches over time, each
//! with its own one-time token and audit entry.

use chrono::{DateTime, Utc};
use tracing::info;

use signbook_contracts::{
    audit::RequestMeta,
    error::{SignbookError, SignbookResult},
    ids::{LogbookId, RequestId, SignatoryId},
    request::{TaskItem, TaskSignatureRequest},
    signatory::SignatoryStatus,
};
use signbook_token::{add_days, generate_raw_token, hash_token};

use crate::service::LogbookService;

/// Acknowledgement returned by `request_task_signatures`.
#[derive(Debug, Clone)]
pub struct SentTaskSignatureRequest {
    pub request_id: RequestId,
    pub expires_at: DateTime<Utc>,
    pub task_count: usize,
}

impl LogbookService {
    /// Ask a signatory to confirm a batch of task rows.
    ///
    /// Requires a non-empty task list and a signatory that is `Verified`
    /// with a saved signature — otherwise fails with `Precondition` before
    /// any write. On success the request row and its
    /// `TASK_SIGNATURE_REQUEST_SENT` audit event are committed, then the
    /// link is emailed best-effort.
    pub fn request_task_signatures(
        &self,
        logbook_id: LogbookId,
        signatory_id: SignatoryId,
        tasks: Vec<TaskItem>,
    ) -> SignbookResult<SentTaskSignatureRequest> {
        if tasks.is_empty() {
            return Err(SignbookError::validation("task list is empty"));
        }

        let signatory = self.store().signatory(signatory_id)?;
        if signatory.logbook_id != logbook_id {
            return Err(SignbookError::validation(
                "signatory does not belong to this logbook",
            ));
        }
        if signatory.status != SignatoryStatus::Verified || !signatory.has_saved_signature() {
            return Err(SignbookError::precondition(
                "signatory must be verified and have a saved signature",
            ));
        }

        let raw = generate_raw_token();
        let now = self.clock().now();
        let expires_at = add_days(now, self.config().token_expiry_days);
        let task_count = tasks.len();
        let request = TaskSignatureRequest::new(
            logbook_id,
            signatory.id,
            hash_token(&raw),
            expires_at,
            tasks,
            now,
        );
        let request_id = request.id;

        self.store().record_task_signature_request(request)?;

        info!(
            logbook_id = %logbook_id,
            signatory_id = %signatory.id,
            request_id = %request_id,
            task_count,
            "task signature request issued"
        );

        let link = self.config().sign_link(&raw);
        self.dispatch_mail(
            &signatory.email,
            "Task signature request",
            &task_signature_body(&signatory.name, task_count, &link, self.config().token_expiry_days),
        );

        Ok(SentTaskSignatureRequest { request_id, expires_at, task_count })
    }

    /// Consume a task-signature token.
    ///
    /// Marks the request used and audits `TASKS_SIGNED` with the original
    /// task payload, atomically. The signatory record is not touched — the
    /// transition only asserts the previously captured signature against
    /// this specific batch.
    pub fn confirm_task_signatures(
        &self,
        raw_token: &str,
        meta: RequestMeta,
    ) -> SignbookResult<TaskSignatureRequest> {
        let token_hash = hash_token(raw_token.trim());
        let now = self.clock().now();
        let request = self
            .store()
            .consume_task_signature_request(&token_hash, meta, now)?;

        info!(
            logbook_id = %request.logbook_id,
            signatory_id = %request.signatory_id,
            request_id = %request.id,
            task_count = request.tasks.len(),
            "tasks signed"
        );

        Ok(request)
    }
}

fn task_signature_body(name: &str, task_count: usize, link: &str, days: i64) -> String {
    format!(
        "<p>Hello {name},</p>\
         <p>You have been asked to sign off {task_count} logged task(s).</p>\
         <p><a href=\"{link}\">Review and sign</a></p>\
         <p>This link expires in {days} days.</p>",
        name = name,
        task_count = task_count,
        link = link,
        days = days,
    )
}
