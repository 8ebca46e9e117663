//! Configuration for the `Chirp` engine.
//!
//! Layered with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/chirp/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::chat::ChatConfig;
use crate::notify::{DEFAULT_TICK_INTERVAL, MAX_TICK_INTERVAL};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "chirp", about = "Optimistic chat delivery engine demo")]
pub struct CliArgs {
    /// Path to a TOML config file.
    #[arg(long, env = "CHIRP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level filter (e.g. `info`, `chirp=debug`).
    #[arg(long, env = "CHIRP_LOG", default_value = "info")]
    pub log_level: String,

    /// Log file path (defaults to `chirp.log` in the temp directory).
    #[arg(long, env = "CHIRP_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Typing indicator expiry in milliseconds.
    #[arg(long, env = "CHIRP_TYPING_TIMEOUT_MS")]
    pub typing_timeout_ms: Option<u64>,

    /// Simulated transport latency in milliseconds.
    #[arg(long, env = "CHIRP_TRANSPORT_LATENCY_MS")]
    pub transport_latency_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    chat: ChatFileConfig,
    notify: NotifyFileConfig,
    transport: TransportFileConfig,
}

/// `[chat]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ChatFileConfig {
    typing_timeout_ms: Option<u64>,
    event_buffer: Option<usize>,
}

/// `[notify]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct NotifyFileConfig {
    tick_interval_ms: Option<u64>,
}

/// `[transport]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct TransportFileConfig {
    latency_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Notification queue configuration.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Countdown tick granularity (clamped to 200 ms by the queue).
    pub tick_interval: Duration,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// Simulated transport configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Round-trip latency applied to every delivery.
    pub latency: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(250),
        }
    }
}

/// Fully resolved engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Conversation facade settings.
    pub chat: ChatConfig,
    /// Notification queue settings.
    pub notify: NotifyConfig,
    /// Mock transport settings.
    pub transport: TransportConfig,
}

impl EngineConfig {
    /// Loads configuration, resolving CLI args > config file > defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicitly requested config file
    /// cannot be read, or if any config file fails to parse.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = Self::load_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Reads the config file, if one exists.
    ///
    /// An explicit path must exist; the default path is optional.
    fn load_file(explicit: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let Some(path) = default_config_path() else {
                    return Ok(ConfigFile::default());
                };
                if !path.exists() {
                    return Ok(ConfigFile::default());
                }
                path
            }
        };

        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;
        let parsed = toml::from_str(&raw)?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(parsed)
    }

    /// Merges the layers into concrete settings.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        let typing_timeout = cli
            .typing_timeout_ms
            .or(file.chat.typing_timeout_ms)
            .map_or(defaults.chat.typing_timeout, Duration::from_millis);
        let event_buffer = file.chat.event_buffer.unwrap_or(defaults.chat.event_buffer);

        let tick_interval = file.notify.tick_interval_ms.map_or(
            defaults.notify.tick_interval,
            |ms| Duration::from_millis(ms.min(MAX_TICK_INTERVAL.as_millis() as u64)),
        );

        let latency = cli
            .transport_latency_ms
            .or(file.transport.latency_ms)
            .map_or(defaults.transport.latency, Duration::from_millis);

        Self {
            chat: ChatConfig {
                typing_timeout,
                event_buffer,
            },
            notify: NotifyConfig { tick_interval },
            transport: TransportConfig { latency },
        }
    }
}

/// Default config file location (`~/.config/chirp/config.toml`).
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("chirp").join("config.toml"))
}
