//! # signbook-core
//!
//! The flow layer of the signbook workspace: trait seams for the
//! persistence engine, mail channel, and clock, plus the `LogbookService`
//! that implements the signatory lifecycle, identity verification, and
//! task-signature flows over them.

pub mod config;
pub mod service;
pub mod tasksign;
pub mod traits;
pub mod verification;

pub use config::AppConfig;
pub use service::LogbookService;
pub use tasksign::SentTaskSignatureRequest;
pub use traits::{Clock, LogbookStore, MailSender, SystemClock};
pub use verification::SentVerification;
