//! Configuration for endpoint connections

use crate::EndpointError;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-connection endpoint configuration
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Idle period after which the connection counts as expired.
    /// `Duration::ZERO` disables expiry.
    #[builder(default = Duration::from_secs(300))]
    #[serde(with = "duration_secs")]
    pub idle_timeout: Duration,

    /// Upper bound on blocking worker threads used for sends
    #[builder(default = 64)]
    pub max_blocking_threads: usize,

    /// Largest text or object payload accepted, in bytes (None = unlimited)
    pub max_text_message_size: Option<usize>,

    /// Largest binary payload accepted, in bytes (None = unlimited)
    pub max_binary_message_size: Option<usize>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(300),
            max_blocking_threads: 64,
            max_text_message_size: None,
            max_binary_message_size: None,
        }
    }
}

impl EndpointConfig {
    /// Idle timeout, or `None` when expiry is disabled
    pub fn effective_idle_timeout(&self) -> Option<Duration> {
        (!self.idle_timeout.is_zero()).then_some(self.idle_timeout)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), EndpointError> {
        if self.max_blocking_threads == 0 {
            return Err(EndpointError::InvalidConfig(
                "max_blocking_threads must be greater than zero".to_string(),
            ));
        }

        if self.max_text_message_size == Some(0) {
            return Err(EndpointError::InvalidConfig(
                "max_text_message_size must be greater than zero".to_string(),
            ));
        }

        if self.max_binary_message_size == Some(0) {
            return Err(EndpointError::InvalidConfig(
                "max_binary_message_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse a configuration from JSON, applying defaults for missing fields
    pub fn from_json(json: &str) -> Result<Self, EndpointError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
