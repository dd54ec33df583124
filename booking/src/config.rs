//! Configuration management for the booking services.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::booking::{BookingSettings, ExactMatchPolicy};
use crate::quota::{DEFAULT_DAILY_CAPACITY, QuotaDecrement};
use seatledger_runtime::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Invalid configuration values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A value is outside its allowed range.
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Environment variable name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Quota pool configuration
    pub quota: QuotaConfig,
    /// Booking protocol configuration
    pub booking: BookingConfig,
    /// Conflict retry configuration
    pub retry: RetryConfig,
    /// Logging and metrics configuration
    pub observability: ObservabilityConfig,
}

/// Quota pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Budget written on initialization and rollover (default: 200)
    pub daily_capacity: u32,
    /// Decrement per granted seat (default: per-request)
    pub decrement: QuotaDecrement,
}

/// Booking protocol configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Behaviour when a request takes exactly the remaining seats (default: sold-out)
    pub exact_match: ExactMatchPolicy,
    /// Deadline for each catalog call in milliseconds (default: 2000)
    pub catalog_timeout_ms: u64,
}

/// Conflict retry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (default: 5)
    pub max_retries: usize,
    /// First backoff in milliseconds (default: 10)
    pub initial_delay_ms: u64,
    /// Backoff cap in milliseconds (default: 500)
    pub max_delay_ms: u64,
}

/// Logging and metrics configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// `tracing` filter directive (default: info)
    pub log_filter: String,
    /// Prometheus listener address; metrics are disabled when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl ObservabilityConfig {
    /// Subscriber filter built from `log_filter`; an unparsable directive falls back to `info`.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_filter).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            quota: QuotaConfig {
                daily_capacity: env::var("QUOTA_DAILY_CAPACITY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DAILY_CAPACITY),
                decrement: env::var("QUOTA_DECREMENT_POLICY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default(),
            },
            booking: BookingConfig {
                exact_match: env::var("BOOKING_EXACT_MATCH_POLICY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default(),
                catalog_timeout_ms: env::var("CATALOG_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            },
            retry: RetryConfig {
                max_retries: env::var("RETRY_MAX_RETRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
                initial_delay_ms: env::var("RETRY_INITIAL_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                max_delay_ms: env::var("RETRY_MAX_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            },
            observability: ObservabilityConfig {
                log_filter: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
                metrics_addr: env::var("METRICS_ADDR").ok().and_then(|s| s.parse().ok()),
            },
        }
    }

    /// Reject values the services cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero daily capacity, a zero
    /// catalog timeout, or a retry cap below the initial delay.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quota.daily_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "QUOTA_DAILY_CAPACITY",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.booking.catalog_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "CATALOG_TIMEOUT_MS",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(ConfigError::Invalid {
                field: "RETRY_MAX_DELAY_MS",
                reason: format!(
                    "{} is below RETRY_INITIAL_DELAY_MS ({})",
                    self.retry.max_delay_ms, self.retry.initial_delay_ms
                ),
            });
        }
        Ok(())
    }

    /// Conflict retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.retry.max_retries)
            .initial_delay(Duration::from_millis(self.retry.initial_delay_ms))
            .max_delay(Duration::from_millis(self.retry.max_delay_ms))
            .build()
    }

    /// Booking service settings.
    #[must_use]
    pub fn booking_settings(&self) -> BookingSettings {
        BookingSettings {
            exact_match: self.booking.exact_match,
            catalog_timeout: Duration::from_millis(self.booking.catalog_timeout_ms),
            retry: self.retry_policy(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quota: QuotaConfig {
                daily_capacity: DEFAULT_DAILY_CAPACITY,
                decrement: QuotaDecrement::default(),
            },
            booking: BookingConfig {
                exact_match: ExactMatchPolicy::default(),
                catalog_timeout_ms: 2000,
            },
            retry: RetryConfig {
                max_retries: 5,
                initial_delay_ms: 10,
                max_delay_ms: 500,
            },
            observability: ObservabilityConfig {
                log_filter: "info".to_string(),
                metrics_addr: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.quota.daily_capacity, 200);
        assert_eq!(config.booking.exact_match, ExactMatchPolicy::MarkSoldOut);
        assert_eq!(config.quota.decrement, QuotaDecrement::PerRequest);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut config = Config::default();
        config.quota.daily_capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "QUOTA_DAILY_CAPACITY",
                ..
            })
        ));
    }

    #[test]
    fn inverted_retry_delays_are_rejected() {
        let mut config = Config::default();
        config.retry.initial_delay_ms = 100;
        config.retry.max_delay_ms = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn log_filter_drives_the_subscriber_filter() {
        let mut config = Config::default();
        assert_eq!(
            config.observability.env_filter().max_level_hint(),
            Some(LevelFilter::INFO)
        );

        config.observability.log_filter = "debug".to_string();
        assert_eq!(
            config.observability.env_filter().max_level_hint(),
            Some(LevelFilter::DEBUG)
        );

        config.observability.log_filter = "seatledger_booking=loudest".to_string();
        assert_eq!(
            config.observability.env_filter().max_level_hint(),
            Some(LevelFilter::INFO)
        );
    }

    #[test]
    fn settings_carry_configured_values() {
        let mut config = Config::default();
        config.booking.catalog_timeout_ms = 250;
        config.retry.max_retries = 2;

        let settings = config.booking_settings();
        assert_eq!(settings.catalog_timeout, Duration::from_millis(250));
        assert_eq!(settings.retry.max_retries, 2);
    }
}
