//! Redis configuration
//!
//! Redis only carries outbound notifications. Without a URL the service
//! logs events instead of publishing them.

use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL; empty disables publishing
    #[serde(default)]
    pub url: String,

    /// Prefix for pub/sub channel names
    #[serde(default = "default_channel_prefix")]
    pub channel_prefix: String,
}

impl RedisConfig {
    pub fn is_enabled(&self) -> bool {
        !self.url.is_empty()
    }

    /// Validate Redis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.is_enabled() {
            return Ok(());
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::InvalidRedisUrl);
        }
        Ok(())
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            channel_prefix: default_channel_prefix(),
        }
    }
}

fn default_channel_prefix() -> String {
    "visit".to_string()
}
