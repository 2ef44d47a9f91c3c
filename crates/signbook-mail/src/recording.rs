//! Recording mail sender: captures every message for later inspection.
//!
//! Used by the demo binary and the end-to-end tests, which play the part of
//! the email recipient by pulling the confirmation link back out of the
//! captured body.

use std::sync::{Arc, Mutex};

use signbook_contracts::error::{SignbookError, SignbookResult};
use signbook_core::traits::MailSender;

/// One captured message.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl SentMail {
    /// Extract the raw token from the confirmation link in the body.
    ///
    /// Looks for `path` (e.g. `/sign/` or `/signatory/verify/`) inside an
    /// `href` attribute and returns the path segment that follows it.
    pub fn token_after(&self, path: &str) -> Option<String> {
        let start = self.html.find(path)? + path.len();
        let rest = &self.html[start..];
        let end = rest.find('"').unwrap_or(rest.len());
        let token = &rest[..end];
        (!token.is_empty()).then(|| token.to_string())
    }
}

/// A `MailSender` that appends every message to a shared in-memory outbox.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailSender {
    outbox: Arc<Mutex<Vec<SentMail>>>,
}

impl RecordingMailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured messages, in send order.
    pub fn sent(&self) -> Vec<SentMail> {
        self.outbox
            .lock()
            .map(|o| o.clone())
            .unwrap_or_default()
    }

    /// The most recently captured message.
    pub fn last(&self) -> Option<SentMail> {
        self.sent().pop()
    }
}

impl MailSender for RecordingMailSender {
    fn send(&self, to: &str, subject: &str, html: &str) -> SignbookResult<()> {
        let mut outbox = self.outbox.lock().map_err(|e| SignbookError::Mail {
            reason: format!("outbox lock poisoned: {}", e),
        })?;
        outbox.push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use signbook_core::traits::MailSender;

    use super::RecordingMailSender;

    #[test]
    fn records_messages_in_order() {
        let sender = RecordingMailSender::new();
        sender.send("a@example.com", "first", "<p>1</p>").unwrap();
        sender.send("b@example.com", "second", "<p>2</p>").unwrap();

        let sent = sender.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "a@example.com");
        assert_eq!(sender.last().unwrap().subject, "second");
    }

    #[test]
    fn token_extraction_reads_the_link_path_segment() {
        let sender = RecordingMailSender::new();
        sender
            .send(
                "a@example.com",
                "sign",
                "<p><a href=\"http://localhost:3000/sign/abc123def\">Review and sign</a></p>",
            )
            .unwrap();

        let mail = sender.last().unwrap();
        assert_eq!(mail.token_after("/sign/").unwrap(), "abc123def");
        assert!(mail.token_after("/signatory/verify/").is_none());
    }
}
