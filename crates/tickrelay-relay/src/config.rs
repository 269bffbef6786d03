//! Relay tunables

use std::time::Duration;

use crate::error::RelayError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Flush a topic once its buffer holds this many rows
    pub size_threshold: usize,
    /// Shared timer: flush every non-empty buffer once this has elapsed
    pub time_threshold: Duration,
    /// Upper bound for one blocking read from the log
    pub poll_wait: Duration,
    /// Upper bound for one batch insert
    pub insert_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            size_threshold: 100,
            time_threshold: Duration::from_millis(1000),
            poll_wait: Duration::from_millis(500),
            insert_timeout: Duration::from_secs(10),
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.size_threshold == 0 {
            return Err(RelayError::Config(
                "Size threshold must be greater than zero".to_string(),
            ));
        }
        if self.time_threshold.is_zero() {
            return Err(RelayError::Config(
                "Time threshold must be greater than zero".to_string(),
            ));
        }
        if self.insert_timeout.is_zero() {
            return Err(RelayError::Config(
                "Insert timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse `"500ms"`, `"1s"`, `"2m"` or `"1h"` into a [`Duration`]
pub fn parse_duration(s: &str) -> Result<Duration, RelayError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(RelayError::Config("Empty duration".to_string()));
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| RelayError::Config(format!("Missing unit: {}", s)))?;
    let (num_str, unit) = s.split_at(split);
    let num: u64 = num_str
        .parse()
        .map_err(|_| RelayError::Config(format!("Invalid duration: {}", s)))?;

    let secs_per_unit = match unit {
        "ms" => return Ok(Duration::from_millis(num)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => return Err(RelayError::Config(format!("Unknown unit: {}", unit))),
    };
    num.checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| RelayError::Config(format!("Duration out of range: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.size_threshold, 100);
        assert_eq!(config.time_threshold, Duration::from_millis(1000));
        assert_eq!(config.poll_wait, Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = RelayConfig {
            size_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RelayConfig {
            time_threshold: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RelayConfig {
            insert_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_duration(" 2m ").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("0ms").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("100").is_err());
        assert!(parse_duration("ms").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("1.5s").is_err());
    }

    #[test]
    fn test_parse_duration_rejects_overflow() {
        let huge = format!("{}h", u64::MAX / 60);
        assert!(matches!(parse_duration(&huge), Err(RelayError::Config(_))));
        assert!(matches!(
            parse_duration("99999999999999999999m"),
            Err(RelayError::Config(_))
        ));
        assert_eq!(
            parse_duration(&format!("{}s", u64::MAX)).unwrap(),
            Duration::from_secs(u64::MAX)
        );
    }
}
