//! Beacon errors
//!
//! Every failure here is a programmer error at the call site: a malformed
//! descriptor, a conflicting registration, or a payload that does not match
//! its schema. Nothing is retried. Transport failures never show up here.

use std::sync::Arc;

use thiserror::Error;

use crate::descriptor::{Descriptor, FieldType, Kind};

pub type Result<T> = std::result::Result<T, BiError>;

#[derive(Debug, Error)]
pub enum BiError {
    /// Missing id (`evid`/`errc`) or no endpoint to resolve
    #[error("Invalid {kind} structure")]
    InvalidDescriptor { kind: Kind, desc: Arc<Descriptor> },

    /// Identity key already bound to another descriptor; carries the registered one
    #[error("{} already registered: {key}", .kind.title())]
    DuplicateDescriptor {
        kind: Kind,
        key: String,
        desc: Arc<Descriptor>,
    },

    #[error("{} not registered", .kind.title())]
    UnregisteredDescriptor { kind: Kind, desc: Arc<Descriptor> },

    #[error("{} field validation failed: '{field}' expected {expected}, got {actual}", .kind.title())]
    FieldValidation {
        kind: Kind,
        desc: Arc<Descriptor>,
        field: String,
        expected: FieldType,
        actual: &'static str,
    },

    #[error("Field '{field}' has no wire encoding")]
    UnsupportedValue { field: String },

    #[error("Catalog error in {path}: {message}")]
    Catalog { path: String, message: String },
}

impl BiError {
    /// Pipeline the error was raised from, if any
    pub fn kind(&self) -> Option<Kind> {
        match self {
            BiError::InvalidDescriptor { kind, .. }
            | BiError::DuplicateDescriptor { kind, .. }
            | BiError::UnregisteredDescriptor { kind, .. }
            | BiError::FieldValidation { kind, .. } => Some(*kind),
            BiError::UnsupportedValue { .. } | BiError::Catalog { .. } => None,
        }
    }

    /// Descriptor the error is about
    pub fn descriptor(&self) -> Option<&Arc<Descriptor>> {
        match self {
            BiError::InvalidDescriptor { desc, .. }
            | BiError::DuplicateDescriptor { desc, .. }
            | BiError::UnregisteredDescriptor { desc, .. }
            | BiError::FieldValidation { desc, .. } => Some(desc),
            BiError::UnsupportedValue { .. } | BiError::Catalog { .. } => None,
        }
    }
}
