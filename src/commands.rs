//! Command dispatch to individual devices
//!
//! Each dispatch opens its own short-lived broker session under a fresh
//! client identity, so operator commands never collide with the
//! listener connection.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{config::MqttConfig, errors::YardMonitorError, models::DeviceCode};

/// Topic a single device listens on for operator commands
pub fn command_topic(device: &DeviceCode) -> String {
    format!("iot/devices/{}/comando", device)
}

/// One-shot publisher for operator commands.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    host: String,
    port: u16,
    connect_timeout: Duration,
    ack_timeout: Duration,
}

impl CommandDispatcher {
    pub fn new(config: &MqttConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            connect_timeout: config.connect_timeout,
            ack_timeout: config.ack_timeout,
        }
    }

    /// Publish `command` to one device and wait for the broker to
    /// acknowledge it.
    ///
    /// The command token is opaque to this layer, beyond being
    /// non-blank. At most one publish attempt is made; the caller
    /// decides whether to retry by dispatching again.
    pub async fn dispatch(
        &self,
        device: &DeviceCode,
        command: &str,
    ) -> Result<(), YardMonitorError> {
        if command.trim().is_empty() {
            return Err(YardMonitorError::EmptyCommand);
        }

        let client_id = format!("yard-command-{}", Uuid::new_v4());
        let mut mqtt_options = MqttOptions::new(client_id, &self.host, self.port);
        mqtt_options.set_keep_alive(Duration::from_secs(5));

        let (client, mut event_loop) = AsyncClient::new(mqtt_options, 10);
        let topic = command_topic(device);

        let result = self
            .publish_and_confirm(&client, &mut event_loop, &topic, command)
            .await;

        // Teardown errors must not mask the publish outcome.
        if let Err(e) = client.disconnect().await {
            debug!("Error during MQTT disconnect: {}", e);
        }

        match &result {
            Ok(()) => info!("Command delivered to {}", topic),
            Err(e) => warn!("Command to {} failed: {}", topic, e),
        }

        result
    }

    async fn publish_and_confirm(
        &self,
        client: &AsyncClient,
        event_loop: &mut EventLoop,
        topic: &str,
        command: &str,
    ) -> Result<(), YardMonitorError> {
        Self::await_packet(
            event_loop,
            self.connect_timeout,
            YardMonitorError::ConnectTimeout,
            |packet| matches!(packet, Packet::ConnAck(_)),
        )
        .await?;

        client
            .publish(topic, QoS::AtLeastOnce, false, command.as_bytes().to_vec())
            .await?;

        Self::await_packet(
            event_loop,
            self.ack_timeout,
            YardMonitorError::AckTimeout,
            |packet| matches!(packet, Packet::PubAck(_)),
        )
        .await
    }

    /// Drive the event loop until a matching inbound packet or the deadline.
    async fn await_packet(
        event_loop: &mut EventLoop,
        wait: Duration,
        on_timeout: YardMonitorError,
        wanted: impl Fn(&Packet) -> bool,
    ) -> Result<(), YardMonitorError> {
        let outcome = timeout(wait, async {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(packet)) if wanted(&packet) => break Ok(()),
                    Ok(_) => continue,
                    Err(e) => break Err(YardMonitorError::from(e)),
                }
            }
        })
        .await;

        match outcome {
            Ok(result) => result,
            Err(_) => Err(on_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> MqttConfig {
        MqttConfig {
            host: "localhost".to_string(),
            port: 1883,
            status_topic: "iot/devices/status".to_string(),
            client_id: "test-listener".to_string(),
            connect_timeout: Duration::from_secs(1),
            ack_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn command_topic_targets_one_device() {
        let device = DeviceCode::try_from("S1").unwrap();

        assert_eq!(command_topic(&device), "iot/devices/S1/comando");
    }

    #[tokio::test]
    async fn dispatch_rejects_blank_command() {
        let dispatcher = CommandDispatcher::new(&test_config());
        let device = DeviceCode::try_from("S1").unwrap();

        let result = dispatcher.dispatch(&device, "   ").await;

        assert!(matches!(result, Err(YardMonitorError::EmptyCommand)));
    }

    #[tokio::test]
    async fn dispatch_fails_in_bounded_time_without_broker() {
        // Nothing listens on port 1; either the connection is refused or
        // the connect timeout fires.
        let mut config = test_config();
        config.port = 1;
        config.connect_timeout = Duration::from_millis(200);
        let dispatcher = CommandDispatcher::new(&config);
        let device = DeviceCode::try_from("S1").unwrap();

        let result = dispatcher.dispatch(&device, "led_verde").await;

        assert!(result.is_err());
    }
}
