//! Descriptor catalogs
//!
//! A catalog is YAML with optional `events` and `errors` sections. Each
//! section is a list of descriptors, a mapping of name to descriptor, or a
//! single descriptor:
//!
//! ```yaml
//! events:
//!   login:
//!     evid: 1001
//!     endpoint: /app
//!     fields: { user: string, attempts: number }
//! errors:
//!   - errc: E_TIMEOUT
//!     sev: warning
//! ```
//!
//! A mapping is read as a single descriptor when it carries any descriptor
//! key (`evid`, `errc`, `endpoint`, `fields`, `severity`, `sev`). Mapping
//! keys are display names only; identity still comes from the
//! descriptor's endpoint and id. A catalog path may be a directory, in which
//! case every `*.yaml`/`*.yml` under it is merged in path order.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

use crate::config::Options;
use crate::descriptor::{Descriptor, Kind};
use crate::dispatch::Context;
use crate::error::{BiError, Result};
use crate::registry::Registry;

/// Keys that mark a mapping as one descriptor rather than a name table
const DESCRIPTOR_KEYS: &[&str] = &["evid", "errc", "endpoint", "fields", "severity", "sev"];

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CatalogFile {
    events: Option<Value>,
    errors: Option<Value>,
}

fn section_name(kind: Kind) -> &'static str {
    match kind {
        Kind::Event => "events",
        Kind::Error => "errors",
    }
}

/// Parse one descriptor, prefixing errors with where it sits in the file
fn parse_descriptor(value: Value, location: &str) -> std::result::Result<Descriptor, String> {
    serde_yaml::from_value(value).map_err(|e| format!("{}: {}", location, e))
}

/// Named descriptors of a section: a list, a name mapping or one descriptor.
///
/// List entries and lone descriptors are named by their id, or `#<index>`
/// when the id is missing.
fn parse_section(kind: Kind, value: Value) -> std::result::Result<Vec<(String, Descriptor)>, String> {
    let section = section_name(kind);
    let default_name = |index: usize, desc: &Descriptor| {
        kind.id_of(desc)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", index))
    };

    let single = matches!(&value, Value::Mapping(map)
        if map.keys().any(|key| key.as_str().is_some_and(|key| DESCRIPTOR_KEYS.contains(&key))));

    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| -> std::result::Result<_, String> {
                let desc = parse_descriptor(item, &format!("{}[{}]", section, index))?;
                Ok((default_name(index, &desc), desc))
            })
            .collect(),
        value if single => {
            let desc = parse_descriptor(value, section)?;
            Ok(vec![(default_name(0, &desc), desc)])
        }
        Value::Mapping(map) => map
            .into_iter()
            .map(|(key, item)| -> std::result::Result<_, String> {
                let name = match key {
                    Value::String(name) => name,
                    other => return Err(format!("{}: entry name must be a string, got {:?}", section, other)),
                };
                let desc = parse_descriptor(item, &format!("{}.{}", section, name))?;
                Ok((name, desc))
            })
            .collect(),
        _ => Err(format!("{}: expected a list, a mapping or a descriptor", section)),
    }
}

/// Named event and error descriptors, in load order
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    events: IndexMap<String, Arc<Descriptor>>,
    errors: IndexMap<String, Arc<Descriptor>>,
}

impl Catalog {
    /// Load a catalog file or a directory of them
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Self::load_file(path);
        }

        let mut catalog = Self::default();
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| catalog_error(path, e))?;
            let is_yaml = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "yaml" || ext == "yml");
            if entry.file_type().is_file() && is_yaml {
                catalog.merge(Self::load_file(entry.path())?, entry.path())?;
            }
        }
        Ok(catalog)
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| catalog_error(path, e))?;
        let catalog = Self::from_yaml(&content, path)?;
        log::info!(
            "Loaded catalog {} ({} events, {} errors)",
            path.display(),
            catalog.events.len(),
            catalog.errors.len()
        );
        Ok(catalog)
    }

    /// Parse catalog YAML; `origin` names the source in errors
    pub fn from_yaml(content: &str, origin: &Path) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(content).map_err(|e| catalog_error(origin, e))?;

        let mut catalog = Self::default();
        for (kind, set) in [(Kind::Event, file.events), (Kind::Error, file.errors)] {
            let Some(set) = set else { continue };
            for (name, desc) in parse_section(kind, set).map_err(|e| catalog_error(origin, e))? {
                catalog.insert(kind, name, desc.shared(), origin)?;
            }
        }
        Ok(catalog)
    }

    fn section_mut(&mut self, kind: Kind) -> &mut IndexMap<String, Arc<Descriptor>> {
        match kind {
            Kind::Event => &mut self.events,
            Kind::Error => &mut self.errors,
        }
    }

    fn section(&self, kind: Kind) -> &IndexMap<String, Arc<Descriptor>> {
        match kind {
            Kind::Event => &self.events,
            Kind::Error => &self.errors,
        }
    }

    fn insert(&mut self, kind: Kind, name: String, desc: Arc<Descriptor>, origin: &Path) -> Result<()> {
        let section = self.section_mut(kind);
        if section.contains_key(&name) {
            return Err(catalog_error(origin, format!("duplicate {} name '{}'", kind, name)));
        }
        section.insert(name, desc);
        Ok(())
    }

    /// Append another catalog's entries; names must stay unique
    pub fn merge(&mut self, other: Catalog, origin: &Path) -> Result<()> {
        for (name, desc) in other.events {
            self.insert(Kind::Event, name, desc, origin)?;
        }
        for (name, desc) in other.errors {
            self.insert(Kind::Error, name, desc, origin)?;
        }
        Ok(())
    }

    /// Add a descriptor under a name
    pub fn add(&mut self, kind: Kind, name: impl Into<String>, desc: Arc<Descriptor>) -> Result<()> {
        self.insert(kind, name.into(), desc, Path::new("<memory>"))
    }

    pub fn entries(&self, kind: Kind) -> impl Iterator<Item = (&str, &Arc<Descriptor>)> {
        self.section(kind).iter().map(|(name, desc)| (name.as_str(), desc))
    }

    pub fn len(&self) -> usize {
        self.events.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up by name, then by id
    pub fn find(&self, kind: Kind, name_or_id: &str) -> Option<&Arc<Descriptor>> {
        let section = self.section(kind);
        section
            .get(name_or_id)
            .or_else(|| section.values().find(|desc| kind.id_of(desc) == Some(name_or_id)))
    }

    /// Register every descriptor, events first
    pub fn register_into(&self, ctx: &mut Context) -> Result<()> {
        ctx.register_events(self.events.values())?;
        ctx.register_errors(self.errors.values())
    }

    /// Every registration failure this catalog would hit, with entry names
    pub fn check(&self, options: &Options) -> Vec<(Kind, String, BiError)> {
        let mut problems = Vec::new();
        for kind in [Kind::Event, Kind::Error] {
            let mut registry = Registry::new(kind);
            for (name, desc) in self.section(kind) {
                if let Err(e) = registry.register_one(desc, options) {
                    problems.push((kind, name.clone(), e));
                }
            }
        }
        problems
    }
}

fn catalog_error(path: &Path, message: impl ToString) -> BiError {
    BiError::Catalog {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}
