//! # signbook-store
//!
//! The in-memory reference implementation of the `LogbookStore` trait, plus
//! the end-to-end tests exercising the full flows against it.

pub mod memory;

pub use memory::InMemoryStore;
