//! # sbs-config
//!
//! Layered configuration loading for the SmileBASIC Source client using
//! figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`SBS_*` prefix, `__` as separator)
//! 2. An explicit file passed with `--config`
//! 3. Project-level `.sbs/config.toml`
//! 4. User-level `~/.config/sbs/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `SBS_API__TOKEN` -> `api.token`,
//! `SBS_LISTEN__POLL_TIMEOUT_SECS` -> `listen.poll_timeout_secs`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use sbs_config::SbsConfig;
//!
//! let config = SbsConfig::load_with_dotenv().expect("config");
//! if config.api.has_token() {
//!     println!("authenticated against {}", config.api.base_url);
//! }
//! ```

mod api;
mod decode;
mod error;
mod listen;

pub use api::{ApiConfig, DEFAULT_BASE_URL};
pub use decode::{DecodeConfig, MAX_CLOCK_SKEW_SECS};
pub use error::ConfigError;
pub use listen::ListenConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SbsConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub decode: DecodeConfig,
}

impl SbsConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env`
    /// loading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if extraction fails or a value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::extract(Self::figment())
    }

    /// Load configuration, layering an explicit file above the discovered
    /// ones.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `path` does not exist, or any
    /// error [`Self::load`] can return.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Self::load();
        };
        if !path.is_file() {
            return Err(ConfigError::InvalidValue {
                field: "config".into(),
                reason: format!("{} is not a readable file", path.display()),
            });
        }
        Self::extract(Self::figment_with(Some(path)))
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain without an explicit file.
    pub fn figment() -> Figment {
        Self::figment_with(None)
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment or add providers on top.
    pub fn figment_with(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".sbs/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Explicit --config file
        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }

        // Layer 4: Environment variables (highest priority)
        figment.merge(Env::prefixed("SBS_").split("__"))
    }

    /// Check every section for values the client cannot work with.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.check()?;
        self.listen.check()?;
        self.decode.check()
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sbs").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SbsConfig::default();
        assert!(config.api.is_configured());
        assert!(!config.api.has_token());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = SbsConfig::load_from(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "config"));
    }
}
