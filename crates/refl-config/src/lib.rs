//! # refl-config
//!
//! Layered configuration loading for the reflectivity assembler using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`REFLASM_*` prefix, `__` as separator)
//! 2. Project-level `.reflasm/config.toml`
//! 3. User-level `~/.config/reflasm/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `REFLASM_OUTPUT__DIRECTORY` -> `output.directory`,
//! `REFLASM_ASSEMBLY__MIN_POINTS_WARNING` -> `assembly.min_points_warning`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use refl_config::AssemblerConfig;
//!
//! let config = AssemblerConfig::load_with_dotenv().expect("config");
//! println!("writing to {}", config.output.directory);
//! ```

mod assembly;
mod error;
mod output;

pub use assembly::AssemblyConfig;
pub use error::ConfigError;
pub use output::OutputConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use refl_core::instrument::InstrumentProfile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "REFLASM_";

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AssemblerConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub assembly: AssemblyConfig,
    /// Extra or overriding instrument profiles. A profile here replaces a
    /// built-in profile with the same name.
    #[serde(default)]
    pub instruments: Vec<InstrumentProfile>,
}

impl AssemblerConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if extraction fails or a value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if extraction fails or a value is invalid.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can add providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                tracing::debug!(path = %global_path.display(), "merging user config");
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".reflasm/config.toml");
        if local_path.exists() {
            tracing::debug!(path = %local_path.display(), "merging project config");
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Reject values the assembler cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.directory.trim().is_empty() {
            return Err(invalid("output.directory", "must not be empty"));
        }
        if self.assembly.min_points_warning == 0 {
            return Err(invalid("assembly.min_points_warning", "must be positive"));
        }
        if !(self.assembly.q_max_warning.is_finite() && self.assembly.q_max_warning > 0.0) {
            return Err(invalid("assembly.q_max_warning", "must be a positive number"));
        }
        for (i, profile) in self.instruments.iter().enumerate() {
            if profile.name.trim().is_empty() {
                return Err(invalid(&format!("instruments[{i}].name"), "must not be empty"));
            }
            if profile.aliases.iter().any(|a| a.trim().is_empty()) {
                return Err(invalid(
                    &format!("instruments[{i}].aliases"),
                    "aliases must not be empty",
                ));
            }
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("reflasm").join("config.toml"))
    }

    /// Load `.env` from the workspace root.
    ///
    /// Walks up from `CARGO_MANIFEST_DIR` (if available), then falls back to
    /// the current directory. Silently does nothing if no `.env` is found.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
