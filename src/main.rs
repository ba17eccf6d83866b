//! Parking-yard status listener

use tokio::signal;
use tracing::{error, info};

use yard_monitor::config::AppConfig;
use yard_monitor::database::Database;
use yard_monitor::errors::YardMonitorError;
use yard_monitor::mqtt::{MqttListener, MqttListenerBuilder};

#[tokio::main]
async fn main() -> Result<(), YardMonitorError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration, preferring environment variables over config files
    let config = AppConfig::load()?;

    let listener = MqttListenerBuilder::new(&config.mqtt)?
        .connect(&config.mqtt.status_topic)
        .await?;

    let db = Database::from_url(&config.database).await?;

    // Setup signal handling for graceful shutdown
    let shutdown_signal = signal::ctrl_c();

    tokio::select! {
        result = run_listener(listener, db) => {
            info!("Listener completed: {:?}", result);
        }
        _ = shutdown_signal => {
            info!("Received shutdown signal");
        }
    }

    Ok(())
}

/// Pull decoded reports off the channel and apply them one at a time.
///
/// Store failures are logged and the message dropped; the loop only
/// ends when the broker connection is gone.
async fn run_listener(
    mut listener: MqttListener,
    database: Database,
) -> Result<(), YardMonitorError> {
    loop {
        match listener.recv().await {
            Ok(Some(report)) => {
                if let Err(e) = database.process_report(report).await {
                    error!("Message processing error: {}", e);
                }
            }
            Ok(None) => break, // Channel closed
            Err(e) => {
                error!("MQTT receive error: {}", e);
                break;
            }
        }
    }

    Ok(())
}
