//! # kururi-config
//!
//! Layered configuration loading for kururi using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Command-line flags (applied by [`KururiConfig::resolve`])
//! 2. Environment variables (`KURURI_*` prefix)
//! 3. Project-level `.kururi/config.toml`
//! 4. User-level `~/.config/kururi/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Keys are flat: `KURURI_MODEL_URL` -> `model_url`, `KURURI_MODEL_SHA256` ->
//! `model_sha256`, `KURURI_MODEL_TIMEOUT` -> `model_timeout`,
//! `KURURI_CHECKPOINT` -> `checkpoint`, `KURURI_MODEL_NAME` -> `model_name`,
//! `KURURI_DEVICE` -> `device`.
//!
//! An empty string or a zero timeout counts as "not set" at every layer, so
//! the next source down is used instead.
//!
//! # Usage
//!
//! ```no_run
//! use kururi_config::{CliOverrides, KururiConfig};
//!
//! let config = KururiConfig::load_with_dotenv().expect("config");
//! let settings = config.resolve(&CliOverrides::default());
//! println!("checkpoint: {}", settings.checkpoint.display());
//! ```

mod error;
mod settings;

pub use error::ConfigError;
pub use settings::{CliOverrides, ResolvedSettings};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use kururi_core::constants::{
    DEFAULT_CHECKPOINT_PATH, DEFAULT_DEVICE, DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_MODEL_NAME,
    DEFAULT_MODEL_URL,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_model_url() -> String {
    String::from(DEFAULT_MODEL_URL)
}

const fn default_model_timeout() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_checkpoint() -> PathBuf {
    PathBuf::from(DEFAULT_CHECKPOINT_PATH)
}

fn default_model_name() -> String {
    String::from(DEFAULT_MODEL_NAME)
}

fn default_device() -> String {
    String::from(DEFAULT_DEVICE)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KururiConfig {
    /// Download source for a missing checkpoint.
    #[serde(default = "default_model_url")]
    pub model_url: String,

    /// Expected SHA-256 (hex) of the checkpoint. Empty disables verification.
    #[serde(default)]
    pub model_sha256: String,

    /// Download timeout in seconds.
    #[serde(default = "default_model_timeout")]
    pub model_timeout: u64,

    /// Local checkpoint path.
    #[serde(default = "default_checkpoint")]
    pub checkpoint: PathBuf,

    /// Classifier architecture name.
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Compute device (`cpu`, `cuda`, `cuda:N`).
    #[serde(default = "default_device")]
    pub device: String,
}

impl Default for KururiConfig {
    fn default() -> Self {
        Self {
            model_url: default_model_url(),
            model_sha256: String::new(),
            model_timeout: default_model_timeout(),
            checkpoint: default_checkpoint(),
            model_name: default_model_name(),
            device: default_device(),
        }
    }
}

impl KururiConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] if you need `.env` file loading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if a source cannot be parsed or a value
    /// has the wrong type (e.g. a non-numeric `KURURI_MODEL_TIMEOUT`).
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration with `.env` file support.
    ///
    /// Loads `.env` from the current directory (if present) before building
    /// the figment. This is the entry point used by the CLI.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// This is public so tests can inspect the figment directly or add
    /// additional providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".kururi/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority below CLI flags)
        figment.merge(Env::prefixed("KURURI_"))
    }

    /// Apply command-line overrides and fall back to built-in defaults for
    /// anything left empty.
    #[must_use]
    pub fn resolve(&self, overrides: &CliOverrides) -> ResolvedSettings {
        settings::resolve(self, overrides)
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("kururi").join("config.toml"))
    }
}
