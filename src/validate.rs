//! Descriptor and payload validation

use std::sync::Arc;

use crate::config::Options;
use crate::descriptor::{Descriptor, FieldType, Kind, type_name};
use crate::error::{BiError, Result};
use crate::url::Fields;

/// Endpoint a descriptor is sent to: its own, else the kind's default
pub fn resolve_endpoint<'a>(kind: Kind, desc: &'a Descriptor, options: &'a Options) -> Option<&'a str> {
    let endpoint = desc.endpoint.as_deref().filter(|e| !e.is_empty());
    endpoint.or_else(|| options.default_endpoint(kind))
}

/// Has an id for `kind` and a resolvable endpoint
pub fn validate_descriptor_shape(kind: Kind, desc: &Descriptor, options: &Options) -> bool {
    kind.id_of(desc).is_some() && resolve_endpoint(kind, desc, options).is_some()
}

pub fn check_descriptor_shape(kind: Kind, desc: &Arc<Descriptor>, options: &Options) -> Result<()> {
    if validate_descriptor_shape(kind, desc, options) {
        Ok(())
    } else {
        Err(BiError::InvalidDescriptor {
            kind,
            desc: desc.clone(),
        })
    }
}

/// First supplied field whose runtime type differs from its declared type.
///
/// Fields the schema does not mention are not checked.
pub fn field_mismatch<'a>(desc: &Descriptor, fields: &'a Fields) -> Option<(&'a str, FieldType, &'static str)> {
    let schema = desc.fields.as_ref()?;
    fields.iter().find_map(|(name, value)| {
        let expected = *schema.get(name)?;
        if FieldType::of(value) == Some(expected) {
            None
        } else {
            Some((name.as_str(), expected, type_name(value)))
        }
    })
}

pub fn validate_fields(desc: &Descriptor, fields: &Fields) -> bool {
    field_mismatch(desc, fields).is_none()
}

pub fn check_fields(kind: Kind, desc: &Arc<Descriptor>, fields: &Fields) -> Result<()> {
    match field_mismatch(desc, fields) {
        None => Ok(()),
        Some((field, expected, actual)) => Err(BiError::FieldValidation {
            kind,
            desc: desc.clone(),
            field: field.to_string(),
            expected,
            actual,
        }),
    }
}
