//! Descriptor registry
//!
//! One registry per kind. Keys are `endpoint?evid=id` (or `errc`), so the
//! same id under two endpoints is two entries. A key only ever maps to the
//! `Arc` that first claimed it; re-registering that same `Arc` is a no-op.

use indexmap::IndexMap;
use indexmap::map::Entry;
use std::sync::Arc;

use crate::config::Options;
use crate::descriptor::{Descriptor, Kind};
use crate::error::{BiError, Result};
use crate::validate::{check_descriptor_shape, resolve_endpoint};

/// Identity key for a descriptor, also the relative path it is sent to
pub fn identity_key(kind: Kind, desc: &Descriptor, options: &Options) -> String {
    let endpoint = resolve_endpoint(kind, desc, options).unwrap_or("");
    let id = kind.id_of(desc).unwrap_or("");
    format!("{}?{}={}", endpoint, kind.id_param(), id)
}

#[derive(Debug)]
pub struct Registry {
    kind: Kind,
    entries: IndexMap<String, Arc<Descriptor>>,
}

impl Registry {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            entries: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Register one descriptor
    pub fn register_one(&mut self, desc: &Arc<Descriptor>, options: &Options) -> Result<()> {
        check_descriptor_shape(self.kind, desc, options)?;

        let key = identity_key(self.kind, desc, options);
        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                if Arc::ptr_eq(entry.get(), desc) {
                    return Ok(());
                }
                Err(BiError::DuplicateDescriptor {
                    kind: self.kind,
                    key: entry.key().clone(),
                    desc: entry.get().clone(),
                })
            }
            Entry::Vacant(entry) => {
                log::debug!("Registered {} {}", self.kind, entry.key());
                entry.insert(desc.clone());
                Ok(())
            }
        }
    }

    /// Register in order; stops at the first failure, keeping what came before
    pub fn register_many<'a, I>(&mut self, descs: I, options: &Options) -> Result<()>
    where
        I: IntoIterator<Item = &'a Arc<Descriptor>>,
    {
        for desc in descs {
            self.register_one(desc, options)?;
        }
        Ok(())
    }

    /// Bound to this exact descriptor, or registration checks are off
    pub fn is_registered(&self, desc: &Arc<Descriptor>, options: &Options) -> bool {
        if options.no_registration {
            return true;
        }
        self.entries
            .get(&identity_key(self.kind, desc, options))
            .is_some_and(|registered| Arc::ptr_eq(registered, desc))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered keys and descriptors in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Descriptor>)> {
        self.entries.iter().map(|(key, desc)| (key.as_str(), desc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Options {
        Options::default()
    }

    #[test]
    fn test_identity_key() {
        let desc = Descriptor::event("x").with_endpoint("/e");
        assert_eq!(identity_key(Kind::Event, &desc, &options()), "/e?evid=x");

        let opts = Options {
            errors_endpoint: Some("/errors".to_string()),
            ..Options::default()
        };
        assert_eq!(identity_key(Kind::Error, &Descriptor::error("E1"), &opts), "/errors?errc=E1");
    }

    #[test]
    fn test_register_same_instance_twice_is_noop() {
        let mut registry = Registry::new(Kind::Event);
        let desc = Descriptor::event("x").with_endpoint("/e").shared();

        registry.register_one(&desc, &options()).unwrap();
        registry.register_one(&desc, &options()).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.is_registered(&desc, &options()));
    }

    #[test]
    fn test_register_identical_copy_conflicts() {
        let mut registry = Registry::new(Kind::Event);
        let first = Descriptor::event("x").with_endpoint("/e").shared();
        let copy = Arc::new((*first).clone());

        registry.register_one(&first, &options()).unwrap();
        let err = registry.register_one(&copy, &options()).unwrap_err();

        match err {
            BiError::DuplicateDescriptor { key, desc, .. } => {
                assert_eq!(key, "/e?evid=x");
                assert!(Arc::ptr_eq(&desc, &first));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!registry.is_registered(&copy, &options()));
    }

    #[test]
    fn test_same_id_different_endpoints() {
        let mut registry = Registry::new(Kind::Event);
        let a = Descriptor::event("x").with_endpoint("/a").shared();
        let b = Descriptor::event("x").with_endpoint("/b").shared();

        registry.register_many([&a, &b], &options()).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_invalid_descriptor() {
        let mut registry = Registry::new(Kind::Error);
        let no_endpoint = Descriptor::error("E1").shared();
        let err = registry.register_one(&no_endpoint, &options()).unwrap_err();
        assert!(matches!(err, BiError::InvalidDescriptor { kind: Kind::Error, .. }));

        // an event id does not make a valid error descriptor
        let wrong_kind = Descriptor::event("x").with_endpoint("/e").shared();
        assert!(registry.register_one(&wrong_kind, &options()).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_many_stops_at_first_failure() {
        let mut registry = Registry::new(Kind::Event);
        let ok = Descriptor::event("1").with_endpoint("/e").shared();
        let bad = Descriptor::event("").with_endpoint("/e").shared();
        let never = Descriptor::event("3").with_endpoint("/e").shared();

        assert!(registry.register_many([&ok, &bad, &never], &options()).is_err());
        assert!(registry.is_registered(&ok, &options()));
        assert!(!registry.is_registered(&never, &options()));
    }

    #[test]
    fn test_is_registered_with_no_registration() {
        let registry = Registry::new(Kind::Event);
        let desc = Descriptor::event("x").with_endpoint("/e").shared();
        let opts = Options {
            no_registration: true,
            ..Options::default()
        };
        assert!(!registry.is_registered(&desc, &options()));
        assert!(registry.is_registered(&desc, &opts));
    }

    #[test]
    fn test_iter_in_registration_order() {
        let mut registry = Registry::new(Kind::Event);
        let b = Descriptor::event("b").with_endpoint("/e").shared();
        let a = Descriptor::event("a").with_endpoint("/e").shared();
        registry.register_many([&b, &a], &options()).unwrap();

        let keys: Vec<&str> = registry.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["/e?evid=b", "/e?evid=a"]);
    }
}
