//! # signbook-mail
//!
//! `MailSender` implementations. The flows treat delivery as best-effort,
//! so both senders here are infallible; a production API-backed sender
//! would surface transport failures as `SignbookError::Mail`.

pub mod dev;
pub mod recording;

pub use dev::DevMailSender;
pub use recording::{RecordingMailSender, SentMail};
