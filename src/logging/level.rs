use crate::error::{Result, SolaxError};
use tracing::Level;

/// Parse a level name or one of the numeric verbosity levels `0..=4`.
///
/// Numeric levels are 0 error, 1 notice, 2 info, 3 debug, 4 trace. `tracing`
/// has no notice level, so notice maps to WARN.
pub fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.trim().to_uppercase().as_str() {
        "4" | "TRACE" => Ok(Level::TRACE),
        "3" | "DEBUG" => Ok(Level::DEBUG),
        "2" | "INFO" => Ok(Level::INFO),
        "1" | "NOTICE" | "WARN" | "WARNING" => Ok(Level::WARN),
        "0" | "ERROR" => Ok(Level::ERROR),
        _ => Err(SolaxError::config(format!(
            "Invalid log level: {}",
            level_str
        ))),
    }
}

/// Numeric verbosity of `level`, inverse of the numeric forms above
pub fn verbosity(level: Level) -> u8 {
    match level {
        Level::ERROR => 0,
        Level::WARN => 1,
        Level::INFO => 2,
        Level::DEBUG => 3,
        Level::TRACE => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_named_levels() {
        assert_eq!(parse_log_level("0").unwrap(), Level::ERROR);
        assert_eq!(parse_log_level("1").unwrap(), Level::WARN);
        assert_eq!(parse_log_level("notice").unwrap(), Level::WARN);
        assert_eq!(parse_log_level("info").unwrap(), Level::INFO);
        assert_eq!(parse_log_level(" 3 ").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level("TRACE").unwrap(), Level::TRACE);
        assert!(parse_log_level("5").is_err());
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn verbosity_round_trips_numeric_levels() {
        for n in 0..=4u8 {
            let level = parse_log_level(&n.to_string()).unwrap();
            assert_eq!(verbosity(level), n);
        }
    }
}
