//! Identifier newtypes.
//!
//! Every entity is keyed by an opaque UUID generated at creation time.
//! The wrappers keep the foreign-key references in `Signatory`,
//! `VerificationRequest`, and `AuditEvent` from being mixed up at compile
//! time.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a logbook, the root container entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogbookId(pub uuid::Uuid);

/// Identifier of a signatory within a logbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatoryId(pub uuid::Uuid);

/// Identifier of a verification or task-signature request row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub uuid::Uuid);

macro_rules! impl_id {
    ($name:ident) => {
        impl $name {
            /// Create a new, unique id.
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

impl_id!(LogbookId);
impl_id!(SignatoryId);
impl_id!(RequestId);
