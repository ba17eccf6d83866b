//! MQTT listener for device status reports

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};

use crate::{config::MqttConfig, errors::YardMonitorError, models::StatusReport};

/// Builder for the long-lived listener connection
pub struct MqttListenerBuilder {
    client: AsyncClient,
    event_loop: EventLoop,
    tx: mpsc::Sender<Result<StatusReport, YardMonitorError>>,
    rx: mpsc::Receiver<Result<StatusReport, YardMonitorError>>,
}

/// Receiving half of the listener connection
pub struct MqttListener {
    _client: AsyncClient,
    rx: mpsc::Receiver<Result<StatusReport, YardMonitorError>>,
    _handle: tokio::task::JoinHandle<Result<(), YardMonitorError>>,
}

impl MqttListenerBuilder {
    /// Create a new listener client from configuration
    pub fn new(config: &MqttConfig) -> Result<Self, YardMonitorError> {
        config.validate()?;

        let mut mqtt_options = MqttOptions::new(&config.client_id, &config.host, config.port);
        mqtt_options.set_keep_alive(Duration::from_secs(30));

        let (client, event_loop) = AsyncClient::new(mqtt_options, 100);

        // Create a channel for message passing
        let (tx, rx) = mpsc::channel(100);

        Ok(Self {
            client,
            event_loop,
            tx,
            rx,
        })
    }

    /// Connect to the broker and start receiving status reports
    ///
    /// Note: subscription is not done here; it happens in the event
    /// task on every `ConnAck`.
    pub async fn connect(self, topic: &str) -> Result<MqttListener, YardMonitorError> {
        let topic = topic.to_string();

        let _handle = tokio::spawn(Self::process_events(
            self.tx,
            self.event_loop,
            self.client.clone(), // Clone client for event task
            topic,
        ));

        Ok(MqttListener {
            _client: self.client,
            rx: self.rx,
            _handle,
        })
    }

    /// Process MQTT events
    ///
    /// Decodes inbound status payloads and forwards them over the
    /// channel. Decode rejections are logged and dropped here so one bad
    /// payload never stalls the stream; a payload without a device code
    /// gets its own log line. Loss of the connection ends the task;
    /// the listener process exits and external supervision restarts it.
    async fn process_events(
        tx: mpsc::Sender<Result<StatusReport, YardMonitorError>>,
        mut event_loop: EventLoop,
        client: AsyncClient,
        topic: String,
    ) -> Result<(), YardMonitorError> {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("Connected to MQTT broker, subscribing to {}", topic);
                    if let Err(e) = client.subscribe(&topic, QoS::AtLeastOnce).await {
                        error!("Failed to subscribe: {}", e);
                        let _ = tx.send(Err(e.into())).await;
                        break;
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    match StatusReport::decode(&publish.payload) {
                        Ok(report) => {
                            if let Err(e) = tx.send(Ok(report)).await {
                                error!("Failed to forward report: {}", e);
                            }
                        }
                        Err(YardMonitorError::MissingDeviceCode) => {
                            warn!("Status message without device code, ignoring");
                        }
                        Err(e) => {
                            warn!("Failed to decode status message: {}", e);
                        }
                    }
                }
                Ok(_) => continue,
                Err(e) => {
                    error!("MQTT connection lost: {}", e);
                    let _ = tx.send(Err(e.into())).await;
                    break;
                }
            }
        }

        Ok(())
    }
}

impl MqttListener {
    /// Receive next status report
    pub async fn recv(&mut self) -> Result<Option<StatusReport>, YardMonitorError> {
        self.rx.recv().await.transpose()
    }
}
