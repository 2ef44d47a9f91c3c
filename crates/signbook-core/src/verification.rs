//! Identity verification flow.
//!
//! `send_verification` mints a one-time token for a signatory and emails the
//! confirmation link; `confirm_verification` is the unauthenticated endpoint
//! the recipient hits, presenting the raw token plus a drawn SVG signature.
//!
//! The raw token is generated, embedded in the link, and dropped — only its
//! SHA-256 hash reaches the store, and nothing here logs it.

use chrono::{DateTime, Utc};
use tracing::info;

use signbook_contracts::{
    audit::RequestMeta,
    error::{SignbookError, SignbookResult},
    ids::{RequestId, SignatoryId},
    request::VerificationRequest,
    signatory::Signatory,
};
use signbook_token::{add_days, generate_raw_token, hash_token};

use crate::service::LogbookService;

/// Acknowledgement returned by `send_verification`.
#[derive(Debug, Clone)]
pub struct SentVerification {
    pub request_id: RequestId,
    pub expires_at: DateTime<Utc>,
}

impl LogbookService {
    /// Issue a verification request for `signatory_id` and email the link.
    ///
    /// Allowed from any non-`Verified` state and also as a resend: every
    /// call mints an independent request row and overwrites the signatory's
    /// status to `Pending`. Earlier unused tokens stay valid until their own
    /// expiry — whichever the recipient uses first wins.
    ///
    /// Fails with `NotFound` if the signatory does not exist and
    /// `Validation` if it has no email address. Mail delivery is
    /// best-effort after the write commits.
    pub fn send_verification(
        &self,
        signatory_id: SignatoryId,
    ) -> SignbookResult<SentVerification> {
        let signatory = self.store().signatory(signatory_id)?;
        if signatory.email.trim().is_empty() {
            return Err(SignbookError::validation("signatory email missing"));
        }

        let raw = generate_raw_token();
        let now = self.clock().now();
        let expires_at = add_days(now, self.config().token_expiry_days);
        let request =
            VerificationRequest::new(signatory.id, hash_token(&raw), expires_at, now);
        let request_id = request.id;

        self.store().record_verification_request(request)?;

        info!(
            signatory_id = %signatory.id,
            request_id = %request_id,
            expires_at = %expires_at,
            "verification request issued"
        );

        let link = self.config().verify_link(&raw);
        self.dispatch_mail(
            &signatory.email,
            "Confirm signatory profile",
            &verification_body(&signatory, &link, self.config().token_expiry_days),
        );

        Ok(SentVerification { request_id, expires_at })
    }

    /// Consume a verification token: capture the drawn signature and promote
    /// the signatory to `Verified`.
    ///
    /// The payload must be a well-formed SVG document; the store performs
    /// the lookup, single-use, and expiry checks plus all three writes as
    /// one atomic unit. `meta` carries the requester IP and user-agent for
    /// the audit row — this endpoint is reachable without authentication.
    pub fn confirm_verification(
        &self,
        raw_token: &str,
        signature_svg: &str,
        meta: RequestMeta,
    ) -> SignbookResult<Signatory> {
        ensure_svg(signature_svg)?;

        let token_hash = hash_token(raw_token.trim());
        let now = self.clock().now();
        let signatory = self.store().consume_verification_request(
            &token_hash,
            signature_svg.trim(),
            meta,
            now,
        )?;

        info!(
            signatory_id = %signatory.id,
            logbook_id = %signatory.logbook_id,
            "signatory verified"
        );

        Ok(signatory)
    }
}

/// Minimal well-formedness check for the signature payload: the expected
/// root tag with its matching close tag. The image is an audit artifact,
/// not a cryptographic signature, so nothing deeper is asserted.
fn ensure_svg(payload: &str) -> SignbookResult<()> {
    let s = payload.trim();
    if s.starts_with("<svg") && s.contains("</svg>") {
        Ok(())
    } else {
        Err(SignbookError::validation(
            "signature payload must be an SVG document",
        ))
    }
}

fn verification_body(signatory: &Signatory, link: &str, days: i64) -> String {
    format!(
        "<p>Hello {name},</p>\
         <p>Please verify your signatory profile and provide your signature.</p>\
         <p><a href=\"{link}\">Open verification link</a></p>\
         <p>This link expires in {days} days.</p>",
        name = signatory.name,
        link = link,
        days = days,
    )
}
