//! Errors for the yard monitor
use thiserror::Error;

#[derive(Error, Debug)]
pub enum YardMonitorError {
    #[error("MQTT connection failed")]
    MqttConnectionError(#[from] rumqttc::ConnectionError),

    #[error("MQTT client error")]
    MqttClientError(#[from] rumqttc::ClientError),

    #[error("timed out waiting for broker connection")]
    ConnectTimeout,

    #[error("timed out waiting for publish acknowledgment")]
    AckTimeout,

    #[error("malformed status payload")]
    DecodeError(#[from] serde_json::Error),

    #[error("status message carries no device code")]
    MissingDeviceCode,

    #[error("invalid device code: {0:?}")]
    InvalidDeviceCode(String),

    #[error("command payload cannot be empty")]
    EmptyCommand,

    #[error("configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("database migration error")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}
