//! Command line options
//!
//! Every option is optional and overrides the matching configuration value.

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// SolaX X1 Mini RS485 monitoring daemon
#[derive(Debug, Clone, Default, Parser)]
#[command(author, version = env!("APP_VERSION"), about, long_about = None)]
pub struct Options {
    /// YAML configuration file
    #[arg(short = 'c', long, env = "SOLAXD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Serial device of the RS485 adapter
    #[arg(short = 'd', long, env = "SOLAXD_DEVICE")]
    pub device: Option<String>,

    /// TCP port of the HTTP server
    #[arg(short = 'p', long, env = "SOLAXD_PORT")]
    pub port: Option<u16>,

    /// Earlier samples averaged with the current one (1-99)
    #[arg(short = 's', long)]
    pub samples: Option<usize>,

    /// Bus address assigned to the inverter, decimal or 0x-prefixed hex
    #[arg(short = 'a', long, value_parser = parse_address)]
    pub address: Option<u8>,

    /// Log file path
    #[arg(short = 'l', long)]
    pub logfile: Option<String>,

    /// Log level, 0 (error) to 4 (trace) or a level name
    #[arg(short = 'L', long, env = "SOLAXD_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Replay captured inverter replies instead of using the serial port
    #[arg(short = 'x', long)]
    pub simulate: bool,
}

fn parse_address(value: &str) -> Result<u8, String> {
    let value = value.trim();
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", value, e))
}

impl Options {
    /// Overwrite `config` with every option given on the command line
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(device) = &self.device {
            config.serial.device = device.clone();
        }
        if let Some(port) = self.port {
            config.web.port = port;
        }
        if let Some(samples) = self.samples {
            config.inverter.average_samples = samples;
        }
        if let Some(address) = self.address {
            config.inverter.address = address;
        }
        if let Some(file) = &self.logfile {
            config.logging.file = Some(file.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.simulate {
            config.simulate = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_flags() {
        let opts = Options::try_parse_from([
            "solaxd", "-d", "/dev/ttyS1", "-p", "8080", "-s", "5", "-a", "0x0B", "-L", "3", "-x",
        ])
        .unwrap();
        assert_eq!(opts.device.as_deref(), Some("/dev/ttyS1"));
        assert_eq!(opts.port, Some(8080));
        assert_eq!(opts.samples, Some(5));
        assert_eq!(opts.address, Some(0x0B));
        assert_eq!(opts.log_level.as_deref(), Some("3"));
        assert!(opts.simulate);
    }

    #[test]
    fn address_accepts_decimal_and_hex() {
        assert_eq!(parse_address("10"), Ok(10));
        assert_eq!(parse_address("0x0a"), Ok(10));
        assert!(parse_address("0x100").is_err());
        assert!(parse_address("ten").is_err());
    }

    #[test]
    fn options_override_config() {
        let mut config = Config::default();
        let opts = Options {
            device: Some("/dev/ttyAMA0".to_string()),
            address: Some(3),
            logfile: Some("/var/log/solaxd.log".to_string()),
            ..Options::default()
        };
        opts.apply_to(&mut config);
        assert_eq!(config.serial.device, "/dev/ttyAMA0");
        assert_eq!(config.inverter.address, 3);
        assert_eq!(config.logging.file.as_deref(), Some("/var/log/solaxd.log"));
        // untouched values keep their configured state
        assert_eq!(config.web.port, 6789);
        assert!(!config.simulate);
    }
}
