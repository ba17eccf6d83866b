//! Application configuration

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;

use crate::errors::YardMonitorError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub mqtt: MqttConfig,
    pub database: DatabaseConfig,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    /// Topic all devices publish their status reports on.
    pub status_topic: String,
    /// Client identity of the long-lived listener connection. Command
    /// dispatches use their own per-invocation identities.
    pub client_id: String,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    /// Bound on waiting for the broker to acknowledge a command publish.
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_ack_timeout")]
    pub ack_timeout: Duration,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout: Duration,
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_ack_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> Duration {
    Duration::from_secs(10)
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("YARDMONITOR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl MqttConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), YardMonitorError> {
        if self.host.trim().is_empty() {
            return Err(YardMonitorError::ConfigurationError {
                message: "MQTT host cannot be empty".to_string(),
            });
        }
        if self.client_id.trim().is_empty() {
            return Err(YardMonitorError::ConfigurationError {
                message: "MQTT client id cannot be empty".to_string(),
            });
        }
        if self.status_topic.trim().is_empty() {
            return Err(YardMonitorError::ConfigurationError {
                message: "MQTT status topic cannot be empty".to_string(),
            });
        }
        if self.connect_timeout.is_zero() || self.ack_timeout.is_zero() {
            return Err(YardMonitorError::ConfigurationError {
                message: "MQTT timeouts must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl DatabaseConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), YardMonitorError> {
        if self.url.trim().is_empty() {
            return Err(YardMonitorError::ConfigurationError {
                message: "Database URL cannot be empty".to_string(),
            });
        }
        if self.max_connections == 0 {
            return Err(YardMonitorError::ConfigurationError {
                message: "Database pool must allow at least one connection".to_string(),
            });
        }
        Ok(())
    }
}
