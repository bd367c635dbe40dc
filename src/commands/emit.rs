//! `beacon event` / `beacon error`

use colored::*;
use eyre::{Context as _, Result};
use std::sync::Arc;
use std::time::Duration;

use beacon::config::Config;
use beacon::{Catalog, Context, Descriptor, Fields, HttpSender, Kind, LogSender, StdoutSender};
use serde_json::{Number, Value};

use crate::cli::EmitArgs;
use crate::commands::catalog::load_catalog;

pub fn run(kind: Kind, args: EmitArgs, config: &Config) -> Result<()> {
    let catalog = load_catalog(config)?;

    let mut options = config.options.clone();
    if args.dry_run {
        options.disabled = true;
        options.log = true;
    }

    let base = args.base.clone().unwrap_or_else(|| config.base.clone());
    let sender = HttpSender::new(Duration::from_secs(config.timeout_secs)).attached();
    let mut ctx = if args.dry_run {
        Context::with_transport(base, options, sender, StdoutSender)
    } else {
        Context::with_transport(base, options, sender, LogSender)
    };

    catalog.register_into(&mut ctx).context("Failed to register catalog")?;

    let desc = resolve_descriptor(kind, &args, &catalog, &mut ctx)?;
    let fields = collect_fields(kind, &args);

    let sent = match kind {
        Kind::Event => ctx.event(&desc, Some(&fields)),
        Kind::Error => ctx.error(&desc, Some(&fields)),
    };
    sent.with_context(|| format!("Failed to send {} '{}'", kind, args.name))?;

    if !args.dry_run {
        println!("{} Sent {} {}", "✓".green(), kind, args.name.cyan());
    }
    Ok(())
}

/// Catalog entry for the name, or an ad-hoc descriptor registered on the spot
fn resolve_descriptor(kind: Kind, args: &EmitArgs, catalog: &Catalog, ctx: &mut Context) -> Result<Arc<Descriptor>> {
    if let Some(desc) = catalog.find(kind, &args.name) {
        if args.endpoint.is_some() {
            log::warn!("Ignoring --endpoint for catalog {} '{}'", kind, args.name);
        }
        return Ok(desc.clone());
    }

    log::info!("{} '{}' not in catalog, using ad-hoc descriptor", kind.title(), args.name);
    let mut desc = match kind {
        Kind::Event => Descriptor::event(&args.name),
        Kind::Error => Descriptor::error(&args.name),
    };
    if let Some(endpoint) = &args.endpoint {
        desc = desc.with_endpoint(endpoint);
    }
    let desc = desc.shared();

    let registered = match kind {
        Kind::Event => ctx.register_events([&desc]),
        Kind::Error => ctx.register_errors([&desc]),
    };
    registered.with_context(|| format!("Failed to register ad-hoc {} '{}'", kind, args.name))?;

    Ok(desc)
}

fn collect_fields(kind: Kind, args: &EmitArgs) -> Fields {
    let mut fields: Fields = args.fields.iter().cloned().collect();
    if kind == Kind::Error
        && let Some(severity) = &args.severity
    {
        let value = severity
            .parse::<Number>()
            .map(Value::Number)
            .unwrap_or_else(|_| Value::String(severity.clone()));
        fields.insert("sev".to_string(), value);
    }
    fields
}
