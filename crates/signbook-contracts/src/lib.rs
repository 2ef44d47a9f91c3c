//! # signbook-contracts
//!
//! Shared types and the error taxonomy for the signbook workspace.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions, lifecycle state, and error types.

pub mod audit;
pub mod error;
pub mod ids;
pub mod logbook;
pub mod request;
pub mod signatory;
