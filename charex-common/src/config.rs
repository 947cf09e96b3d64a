//! Configuration loading
//!
//! Bootstrap settings come from, in priority order:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing or malformed config file never stops startup; it is logged and
//! the compiled defaults apply.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "CHAREX_CONFIG";

/// Environment variable for the output root
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Compiled default output root
pub const DEFAULT_DATA_DIR: &str = "output";

/// Compiled default HTTP port
pub const DEFAULT_PORT: u16 = 9111;

/// Compiled default static asset directory
pub const DEFAULT_STATIC_DIR: &str = "web/static";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Output root for extracted cards
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Directory served as the web UI
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Job hub sizing
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Buffered messages per agent before it counts as saturated
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,

    /// Pending register/unregister/broadcast commands
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: default_outbound_capacity(),
            command_capacity: default_command_capacity(),
        }
    }
}

/// Network fetch settings for page-based sources
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_outbound_capacity() -> usize {
    256
}

fn default_command_capacity() -> usize {
    1024
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))
    }

    /// Load the config file if one exists, falling back to defaults
    pub fn load_or_default() -> Self {
        let Some(path) = locate_config_file() else {
            debug!("No config file found, using compiled defaults");
            return Self::default();
        };

        match Self::from_file(&path) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Resolve the output root (CLI → env → TOML → default)
    pub fn resolve_data_dir(&self, cli_arg: Option<&Path>) -> PathBuf {
        resolve_path(
            cli_arg,
            DATA_DIR_ENV,
            self.data_dir.as_deref(),
            Path::new(DEFAULT_DATA_DIR),
        )
    }

    /// Resolve the HTTP port (CLI/env → TOML → default)
    ///
    /// clap already merges the CLI flag with its environment variable.
    pub fn resolve_port(&self, cli_or_env: Option<u16>) -> u16 {
        cli_or_env.or(self.port).unwrap_or(DEFAULT_PORT)
    }

    /// Resolve the static asset directory (CLI/env → TOML → default)
    pub fn resolve_static_dir(&self, cli_or_env: Option<&Path>) -> PathBuf {
        cli_or_env
            .or(self.static_dir.as_deref())
            .unwrap_or(Path::new(DEFAULT_STATIC_DIR))
            .to_path_buf()
    }
}

/// Resolve a path setting following the priority order
pub fn resolve_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config_value: Option<&Path>,
    default: &Path,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = config_value {
        return path.to_path_buf();
    }

    // Priority 4: Compiled default
    default.to_path_buf()
}

/// Find the config file: `$CHAREX_CONFIG`, then `<config dir>/charex/config.toml`
fn locate_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!("{} points to missing file {}", CONFIG_PATH_ENV, path.display());
    }

    dirs::config_dir()
        .map(|d| d.join("charex").join("config.toml"))
        .filter(|p| p.exists())
}
