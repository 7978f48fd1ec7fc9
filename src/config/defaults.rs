use super::*;

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
        }
    }
}

impl Default for InverterConfig {
    fn default() -> Self {
        Self {
            address: 0x0A,
            average_samples: 10,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 6789,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: None,
            json_format: false,
            console_output: true,
            backup_count: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            inverter: InverterConfig::default(),
            web: WebConfig::default(),
            logging: LoggingConfig::default(),
            poll_interval_ms: 1000,
            simulate: false,
        }
    }
}
