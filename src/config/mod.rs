//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `VISIT_ENGINE` prefix
//! and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use visit_engine::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod gateway;
mod redis;
mod scheduling;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use gateway::{GatewayConfig, MOCK_PROVIDER};
pub use redis::RedisConfig;
pub use scheduling::SchedulingConfig;
pub use server::{Environment, ServerConfig};

use chrono::Duration;
use serde::Deserialize;

use crate::application::EngineConfig;
use crate::domain::foundation::Money;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Redis configuration (notification channel, optional)
    #[serde(default)]
    pub redis: RedisConfig,

    /// Payment gateway credentials and reconciliation policy
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Clinic day, hold window and sweep cadence
    #[serde(default)]
    pub scheduling: SchedulingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `VISIT_ENGINE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// - `VISIT_ENGINE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `VISIT_ENGINE__SCHEDULING__HOLD_MINUTES=5` -> `scheduling.hold_minutes = 5`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("VISIT_ENGINE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.gateway.validate(&self.server.environment)?;
        self.scheduling.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }

    /// Engine policy derived from the scheduling and gateway sections.
    pub fn engine_config(&self) -> Result<EngineConfig, ValidationError> {
        let scheduling = &self.scheduling;
        let fee = Money::new(scheduling.consultation_fee_minor, self.gateway.currency.clone())
            .map_err(|e| ValidationError::InvalidScheduling(e.to_string()))?;

        Ok(EngineConfig::new(scheduling.slot_grid()?, fee)
            .with_hold_minutes(scheduling.hold_minutes)
            .with_utc_offset(scheduling.utc_offset()?)
            .with_reconcile_grace(Duration::seconds(self.gateway.reconcile_grace_secs as i64))
            .with_order_timeout(Duration::seconds(self.gateway.order_timeout_secs as i64))
            .with_batch_size(scheduling.sweep_batch_size))
    }
}
