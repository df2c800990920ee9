use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://192.168.3.86:8080/api";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// `None` leaves the transport default in place.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    pub gas_alert_ppm: f64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            gas_alert_ppm: 400.0,
        }
    }
}

impl PollerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if !self.gas_alert_ppm.is_finite() || self.gas_alert_ppm < 0.0 {
            return Err(ConfigError::GasThreshold(self.gas_alert_ppm));
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("poll interval must be strictly positive")]
    ZeroInterval,
    #[error("invalid gas alert threshold: {0}")]
    GasThreshold(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_settings() {
        let config = PollerConfig::default();
        assert_eq!(config.interval, Duration::from_millis(2000));
        assert!(config.validate().is_ok());
        assert!(ClientConfig::default().request_timeout.is_none());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = PollerConfig {
            interval: Duration::ZERO,
            ..PollerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));
    }
}
