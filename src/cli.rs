use clap::{Args, Parser, Subcommand, ValueEnum};
use lazy_regex::regex_captures;
use serde_json::Value;
use std::io::IsTerminal;
use std::path::PathBuf;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "beacon",
    about = "Fire BI event and error beacons from a descriptor catalog",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/beacon/logs/beacon.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to beacon.yaml config file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send an event beacon
    Event(EmitArgs),

    /// Send an error beacon
    Error(EmitArgs),

    /// Inspect the descriptor catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Args)]
pub struct EmitArgs {
    /// Catalog name or id (evid/errc)
    pub name: String,

    /// Field as key=value; JSON values (5, true, {"a":1}) keep their type
    #[arg(short = 'f', long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, Value)>,

    /// Endpoint for a descriptor not found in the catalog
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Override the configured base URL
    #[arg(long)]
    pub base: Option<String>,

    /// Severity name or level (errors only)
    #[arg(long, short = 's')]
    pub severity: Option<String>,

    /// Print the beacon URL instead of sending it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum CatalogAction {
    /// List catalog descriptors
    List {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Check every descriptor would register cleanly
    Validate,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },
}

/// Parse `key=value`, reading the value as JSON when it is valid JSON
pub fn parse_field(input: &str) -> Result<(String, Value), String> {
    let (_, key, raw) = regex_captures!(r"^([A-Za-z_][A-Za-z0-9_.-]*)=(.*)$"s, input)
        .ok_or_else(|| format!("invalid field '{}': expected key=value", input))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_field_types() {
        assert_eq!(parse_field("count=5").unwrap(), ("count".to_string(), json!(5)));
        assert_eq!(parse_field("ok=true").unwrap(), ("ok".to_string(), json!(true)));
        assert_eq!(parse_field("user=ada").unwrap(), ("user".to_string(), json!("ada")));
        assert_eq!(parse_field("o={\"a\":1}").unwrap(), ("o".to_string(), json!({"a": 1})));
        assert_eq!(parse_field("s=\"5\"").unwrap(), ("s".to_string(), json!("5")));
    }

    #[test]
    fn test_parse_field_keeps_equals_in_value() {
        assert_eq!(parse_field("q=a=b").unwrap(), ("q".to_string(), json!("a=b")));
        assert_eq!(parse_field("empty=").unwrap(), ("empty".to_string(), json!("")));
    }

    #[test]
    fn test_parse_field_rejects_bad_keys() {
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
        assert!(parse_field("1abc=x").is_err());
        assert!(parse_field("a b=x").is_err());
    }

    #[test]
    fn test_parse_emit_args() {
        let cli = Cli::try_parse_from(["beacon", "event", "login", "-f", "user=ada", "-f", "n=2", "--dry-run"]).unwrap();
        match cli.command {
            Commands::Event(args) => {
                assert_eq!(args.name, "login");
                assert_eq!(args.fields.len(), 2);
                assert!(args.dry_run);
            }
            _ => panic!("expected event command"),
        }
    }
}
