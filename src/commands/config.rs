use colored::*;
use eyre::Result;

use beacon::config::Config;

use crate::cli::{ConfigAction, OutputFormat};

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            let unset = || "(unset)".dimmed().to_string();

            println!("{}", "Beacon Configuration".bold());
            println!();

            println!("  base: {}", config.base);
            println!(
                "  catalog: {}",
                config
                    .catalog_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(unset)
            );
            println!("  log_level: {}", config.log_level.as_filter());
            println!("  timeout_secs: {}", config.timeout_secs);
            println!();

            let options = &config.options;
            println!("{}:", "options".cyan());
            println!("  disabled: {}", options.disabled);
            println!("  log: {}", options.log);
            println!("  no_registration: {}", options.no_registration);
            println!(
                "  events_endpoint: {}",
                options.events_endpoint.clone().unwrap_or_else(unset)
            );
            println!(
                "  errors_endpoint: {}",
                options.errors_endpoint.clone().unwrap_or_else(unset)
            );
        }
    }

    Ok(())
}
