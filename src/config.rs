//! Configuration System using Figment
//!
//! Strongly-typed configuration for a single virtual bench. Configuration is
//! loaded from:
//! 1. a TOML file (base configuration)
//! 2. Environment variables (prefixed with `LAB_INST_`)
//!
//! Nested keys in environment variables are separated by a double
//! underscore, so `LAB_INST_APPLICATION__LOG_LEVEL=debug` overrides
//! `application.log_level`.
//!
//! # Example
//! ```no_run
//! use lab_instruments::config::LabConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LabConfig::load_from("config/lab.toml")?;
//! println!("Instrument type: {}", config.instrument.r#type);
//! # Ok(())
//! # }
//! ```

use crate::logging::parse_log_level;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use inst_core::VIRTUAL_ADDRESS;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of environment variables that override file values.
pub const ENV_PREFIX: &str = "LAB_INST_";

/// Separator between nesting levels in environment variable names.
pub const ENV_SEPARATOR: &str = "__";

/// Error types for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File missing, invalid TOML, or values of the wrong type
    #[error("Failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    /// Parsed, but the values make no sense
    #[error("Config validation failed: {0}")]
    Validation(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// The instrument to connect to
    pub instrument: InstrumentConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Instrument definition in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Driver type (e.g. "virtual_dmm")
    pub r#type: String,
    /// Connection address; `VIRTUAL` selects the hardware-free path
    #[serde(default = "default_address")]
    pub address: String,
    /// Driver-specific options, forwarded without interpretation
    #[serde(default)]
    pub options: toml::Table,
}

// Default value functions
fn default_name() -> String {
    "lab_instruments".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_address() -> String {
    VIRTUAL_ADDRESS.to_string()
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

impl InstrumentConfig {
    /// Instrument of `driver_type` on the virtual address with no options.
    pub fn new(driver_type: impl Into<String>) -> Self {
        Self {
            r#type: driver_type.into(),
            address: default_address(),
            options: toml::Table::new(),
        }
    }

    /// Set the connection address
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Add a driver option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// The flat table handed to a driver factory.
    ///
    /// Options come first and `address` is written last, so an `address`
    /// key inside `options` never overrides the real one.
    pub fn to_driver_config(&self) -> toml::Value {
        let mut table = self.options.clone();
        table.insert(
            "address".to_string(),
            toml::Value::String(self.address.clone()),
        );
        toml::Value::Table(table)
    }
}

impl LabConfig {
    /// Load configuration from a TOML file and environment variables
    ///
    /// Environment variables override the file.
    /// Example: `LAB_INST_INSTRUMENT__ADDRESS=GPIB0::22::INSTR`
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split(ENV_SEPARATOR))
            .extract()?;
        config.validate()?;
        tracing::debug!(path = %path.as_ref().display(), "configuration loaded");
        Ok(config)
    }

    /// Parse configuration from a TOML string, without environment overrides
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: Self = Figment::new().merge(Toml::string(source)).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_log_level(&self.application.log_level).map_err(ConfigError::Validation)?;

        if self.instrument.r#type.trim().is_empty() {
            return Err(ConfigError::Validation(
                "instrument.type must not be empty".to_string(),
            ));
        }

        if self.instrument.address.trim().is_empty() {
            return Err(ConfigError::Validation(
                "instrument.address must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = LabConfig::from_toml(
            r#"
            [instrument]
            type = "virtual_dmm"
            "#,
        )
        .unwrap();

        assert_eq!(config.application.name, "lab_instruments");
        assert_eq!(config.application.log_level, "info");
        assert_eq!(config.instrument.address, "VIRTUAL");
        assert!(config.instrument.options.is_empty());
    }

    #[test]
    fn test_options_are_kept() {
        let config = LabConfig::from_toml(
            r#"
            [application]
            name = "bench"
            log_level = "debug"

            [instrument]
            type = "virtual_dmm"
            address = "GPIB0::22::INSTR"

            [instrument.options]
            nplc = 10
            terminals = "front"
            "#,
        )
        .unwrap();

        assert_eq!(config.instrument.address, "GPIB0::22::INSTR");
        assert_eq!(
            config.instrument.options.get("nplc"),
            Some(&toml::Value::Integer(10))
        );
    }

    #[test]
    fn test_invalid_log_level() {
        let result = LabConfig::from_toml(
            r#"
            [application]
            log_level = "loud"

            [instrument]
            type = "virtual_dmm"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_missing_instrument_section() {
        let result = LabConfig::from_toml("[application]\nname = \"x\"\n");
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_empty_type_rejected() {
        let result = LabConfig::from_toml("[instrument]\ntype = \"  \"\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_driver_config_address_wins() {
        let instrument = InstrumentConfig::new("virtual_dmm")
            .with_address("VIRTUAL")
            .with_option("address", "elsewhere")
            .with_option("nplc", 5_i64);

        let value = instrument.to_driver_config();
        let table = value.as_table().unwrap();
        assert_eq!(table["address"].as_str(), Some("VIRTUAL"));
        assert_eq!(table["nplc"].as_integer(), Some(5));
    }
}
