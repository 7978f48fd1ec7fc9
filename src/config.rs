//! Configuration management for SolaXd
//!
//! Configuration is read from YAML. Every section has defaults, so an empty
//! file (or no file at all) yields a working setup for `/dev/ttyUSB0`.
//! Command line options from [`crate::cli::Options`] are applied on top.

use crate::error::{Result, SolaxError};
use crate::logging::parse_log_level;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// RS485 adapter
    pub serial: SerialConfig,

    /// Inverter addressing and averaging
    pub inverter: InverterConfig,

    /// Web server binding configuration
    pub web: WebConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Tick period in milliseconds
    pub poll_interval_ms: u64,

    /// Replay captured replies instead of opening the serial port
    pub simulate: bool,
}

/// Serial port parameters. Framing is always 8N1 without flow control.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub device: String,
    pub baud_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InverterConfig {
    /// Bus address assigned to the inverter during registration
    pub address: u8,

    /// Number of earlier samples averaged together with the current one
    pub average_samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level name or numeric verbosity 0 (error) to 4 (trace)
    pub level: String,

    /// Log file path or directory; console only when unset
    pub file: Option<String>,

    /// Whether to use JSON format
    pub json_format: bool,

    /// Whether to log to console when a file is configured
    pub console_output: bool,

    /// Number of rotated files to keep
    pub backup_count: u32,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from `path`, or from the first default location that exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(SolaxError::config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            return Self::from_file(path);
        }

        let default_paths = [
            "solaxd.yaml",
            "/data/solaxd.yaml",
            "/etc/solaxd/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.simulate && self.serial.device.trim().is_empty() {
            return Err(SolaxError::validation(
                "serial.device",
                "Device path cannot be empty",
            ));
        }

        if self.serial.baud_rate == 0 {
            return Err(SolaxError::validation(
                "serial.baud_rate",
                "Must be greater than 0",
            ));
        }

        // 0x00 is the unregistered address used during discovery
        if self.inverter.address == 0 {
            return Err(SolaxError::validation(
                "inverter.address",
                "Address 0 is reserved",
            ));
        }

        if !(1..=99).contains(&self.inverter.average_samples) {
            return Err(SolaxError::validation(
                "inverter.average_samples",
                "Must be between 1 and 99",
            ));
        }

        if self.web.port == 0 {
            return Err(SolaxError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(SolaxError::validation(
                "poll_interval_ms",
                "Must be greater than 0",
            ));
        }

        if let Err(e) = parse_log_level(&self.logging.level) {
            return Err(SolaxError::validation(
                "logging.level".to_string(),
                e.to_string(),
            ));
        }

        Ok(())
    }
}
