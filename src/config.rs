//! Context options and the command-line configuration file

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::descriptor::Kind;

/// Per-context options, fixed at `init`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Options {
    /// Build URLs but never hand them to the transport
    pub disabled: bool,
    /// Mirror every URL to the diagnostic sink
    pub log: bool,
    pub events_endpoint: Option<String>,
    pub errors_endpoint: Option<String>,
    /// Skip the registry presence check when emitting
    pub no_registration: bool,
}

impl Options {
    /// Configured default endpoint for a kind, if non-empty
    pub fn default_endpoint(&self, kind: Kind) -> Option<&str> {
        let endpoint = match kind {
            Kind::Event => self.events_endpoint.as_deref(),
            Kind::Error => self.errors_endpoint.as_deref(),
        };
        endpoint.filter(|e| !e.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// Command-line configuration (beacon.yaml)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the collection service
    pub base: String,
    pub options: Options,
    /// Descriptor catalog file or directory
    pub catalog: Option<PathBuf>,
    pub log_level: LogLevel,
    /// HTTP transport timeout
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base: "http://localhost:8080/".to_string(),
            options: Options::default(),
            catalog: None,
            log_level: LogLevel::default(),
            timeout_secs: 5,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let env_path = |name: &str| std::env::var_os(name).map(PathBuf::from);
        let candidates = Self::search_paths(env_path("BEACON_CONFIG"), env_path("BEACON_DIR"));

        Ok(Self::load_first(&candidates).unwrap_or_else(|| {
            log::info!("No config file found, using defaults");
            Self::default()
        }))
    }

    /// Config files tried in order when no explicit path is given:
    /// BEACON_CONFIG, `$BEACON_DIR/beacon.yaml`, `<config_dir>/beacon/beacon.yaml`,
    /// then `./beacon.yaml` (for development)
    fn search_paths(config_env: Option<PathBuf>, beacon_dir: Option<PathBuf>) -> Vec<(&'static str, PathBuf)> {
        let mut paths = Vec::new();

        if let Some(path) = config_env {
            paths.push(("BEACON_CONFIG", path));
        }
        if let Some(dir) = beacon_dir {
            paths.push(("BEACON_DIR", dir.join("beacon.yaml")));
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(("config dir", config_dir.join("beacon").join("beacon.yaml")));
        }
        paths.push(("local", PathBuf::from("beacon.yaml")));

        paths
    }

    /// First candidate that exists and parses; unreadable ones are logged and skipped
    fn load_first(candidates: &[(&'static str, PathBuf)]) -> Option<Self> {
        for (source, path) in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(path) {
                Ok(config) => return Some(config),
                Err(e) => {
                    log::warn!("Failed to load config from {} ({}): {}", path.display(), source, e);
                }
            }
        }
        None
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Catalog path with `~` and env vars expanded
    pub fn catalog_path(&self) -> Option<PathBuf> {
        self.catalog.as_deref().map(Self::expand_path)
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}
