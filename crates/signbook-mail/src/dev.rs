//! Development mail sender: delivery via structured log output.
//!
//! Functionally equivalent to a real sender from the flows' point of view —
//! the recipient just reads the link off the console instead of an inbox.
//! The body intentionally appears in the log: the emailed link is the one
//! place the raw token is allowed to surface.

use tracing::info;

use signbook_contracts::error::SignbookResult;
use signbook_core::traits::MailSender;

/// A `MailSender` that logs every message instead of delivering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevMailSender;

impl MailSender for DevMailSender {
    fn send(&self, to: &str, subject: &str, html: &str) -> SignbookResult<()> {
        info!(to = %to, subject = %subject, body = %html, "dev mail dispatched");
        Ok(())
    }
}
