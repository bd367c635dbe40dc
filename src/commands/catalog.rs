use colored::*;
use eyre::{Context, Result};
use serde::Serialize;

use beacon::config::Config;
use beacon::{Catalog, Descriptor, Kind};

use crate::cli::{CatalogAction, OutputFormat};

pub fn run(action: CatalogAction, config: &Config) -> Result<()> {
    match action {
        CatalogAction::List { format } => list(OutputFormat::resolve(format), config),
        CatalogAction::Validate => validate(config),
    }
}

/// Configured catalog, or an empty one when none is set
pub fn load_catalog(config: &Config) -> Result<Catalog> {
    match config.catalog_path() {
        Some(path) => Catalog::load(&path).with_context(|| format!("Failed to load catalog {}", path.display())),
        None => {
            log::debug!("No catalog configured");
            Ok(Catalog::default())
        }
    }
}

#[derive(Serialize)]
struct CatalogEntry<'a> {
    kind: Kind,
    name: &'a str,
    #[serde(flatten)]
    descriptor: &'a Descriptor,
}

fn list(format: OutputFormat, config: &Config) -> Result<()> {
    let catalog = load_catalog(config)?;
    let entries: Vec<CatalogEntry> = [Kind::Event, Kind::Error]
        .into_iter()
        .flat_map(|kind| {
            catalog.entries(kind).map(move |(name, desc)| CatalogEntry {
                kind,
                name,
                descriptor: desc.as_ref(),
            })
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&entries)?),
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("  {}", "(no descriptors)".dimmed());
                return Ok(());
            }
            for kind in [Kind::Event, Kind::Error] {
                println!("{}:", format!("{}s", kind).cyan());
                for entry in entries.iter().filter(|e| e.kind == kind) {
                    print_entry(entry, config);
                }
                println!();
            }
        }
    }
    Ok(())
}

fn print_entry(entry: &CatalogEntry, config: &Config) {
    let kind = entry.kind;
    let id = kind.id_of(entry.descriptor).unwrap_or("?");
    let endpoint = beacon::validate::resolve_endpoint(kind, entry.descriptor, &config.options)
        .map(|e| e.to_string())
        .unwrap_or_else(|| "(no endpoint)".red().to_string());

    println!(
        "  {} {}={} {}",
        entry.name.bold(),
        kind.id_param().dimmed(),
        id,
        endpoint.dimmed()
    );
    if let Some(fields) = &entry.descriptor.fields {
        let schema: Vec<String> = fields.iter().map(|(name, ty)| format!("{}: {}", name, ty)).collect();
        println!("    {}", schema.join(", "));
    }
}

fn validate(config: &Config) -> Result<()> {
    let catalog = load_catalog(config)?;
    let problems = catalog.check(&config.options);

    if problems.is_empty() {
        println!("{} {} descriptors register cleanly", "✓".green(), catalog.len());
        return Ok(());
    }

    for (kind, name, error) in &problems {
        println!("{} {} {}: {}", "✗".red(), kind, name.bold(), error);
    }
    eyre::bail!("{} catalog problem(s)", problems.len())
}
