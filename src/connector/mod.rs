mod client;
mod error;
mod options;

pub use client::*;
pub use error::*;
pub use options::*;

use crate::model::DeviceEndpoint;
use bytes::Bytes;
use rand::{distributions::Alphanumeric, Rng};
use rumqttc::{
    AsyncClient, Event as MqttEvent, EventLoop, Incoming, MqttOptions, QoS, TlsConfiguration,
    Transport,
};
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

fn random_client_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(23)
        .map(char::from)
        .collect()
}

/// Callbacks driven by [`Connector::run`]: connection-state changes and
/// inbound messages on the response topic.
///
/// The callbacks run on the connection task. Handlers that need to touch
/// shared state should forward into a channel instead; see [`EventForwarder`].
pub trait ConnectorHandler {
    type Error: std::error::Error + Send + Sync;

    fn connected(&mut self, state: bool) -> impl Future<Output = Result<(), Self::Error>>;
    fn message(
        &mut self,
        topic: String,
        payload: Bytes,
    ) -> impl Future<Output = Result<(), Self::Error>>;
}

/// Connection-state changes and inbound messages, as forwarded by
/// [`EventForwarder`].
#[derive(Clone, Debug)]
pub enum Event {
    Connected { state: bool },
    Message { topic: String, payload: Bytes },
}

/// Forwards connector callbacks into a bounded channel, so that inbound
/// messages are handled on the receiver's task rather than on the network
/// loop.
pub struct EventForwarder {
    tx: mpsc::Sender<Event>,
}

impl EventForwarder {
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self { tx }
    }
}

impl ConnectorHandler for EventForwarder {
    type Error = mpsc::error::SendError<Event>;

    async fn connected(&mut self, state: bool) -> Result<(), Self::Error> {
        self.tx.send(Event::Connected { state }).await
    }

    fn message(
        &mut self,
        topic: String,
        payload: Bytes,
    ) -> impl Future<Output = Result<(), Self::Error>> {
        self.tx.send(Event::Message { topic, payload })
    }
}

/// Owns the MQTT connection for one [`DeviceEndpoint`].
pub struct Connector {
    mqtt: AsyncClient,
    eventloop: EventLoop,
    endpoint: DeviceEndpoint,
    connected: watch::Sender<bool>,
}

impl Connector {
    /// Create the connection and its publish handle.
    ///
    /// The connection makes no progress until [`run`](Self::run) is polled.
    pub fn new(options: ConnectorOptions, endpoint: DeviceEndpoint) -> (Self, Client) {
        let client_id = options.client_id.unwrap_or_else(random_client_id);

        let port = options
            .port
            .unwrap_or(if options.disable_tls { 1883 } else { 8883 });

        let mut mqttoptions = MqttOptions::new(client_id, options.host, port);
        mqttoptions.set_keep_alive(options.keep_alive);

        if !options.disable_tls {
            mqttoptions.set_transport(Transport::Tls(TlsConfiguration::Native));
        }

        log::debug!("Options: {mqttoptions:#?}");

        if let Some(username) = options.username {
            mqttoptions.set_credentials(username, options.password.unwrap_or_default());
        }

        let (mqtt, eventloop) = AsyncClient::new(mqttoptions, 10);
        let (connected, connected_rx) = watch::channel(false);

        let client = Client::new(mqtt.clone(), endpoint.command_topic(), connected_rx);

        (
            Self {
                mqtt,
                eventloop,
                endpoint,
                connected,
            },
            client,
        )
    }

    /// Drive the connection until the handler fails or the future is dropped.
    ///
    /// Reconnecting after a failure is left to the underlying event loop; a
    /// failed poll is logged and retried after a short sleep.
    pub async fn run<H>(mut self, mut handler: H) -> Result<(), Error<H::Error>>
    where
        H: ConnectorHandler,
    {
        let response_topic = self.endpoint.response_topic();

        loop {
            match self.eventloop.poll().await {
                Ok(MqttEvent::Incoming(Incoming::ConnAck(_))) => {
                    log::info!("Connected");
                    self.connected.send_replace(true);
                    if let Err(err) = self
                        .mqtt
                        .try_subscribe(response_topic.as_str(), QoS::AtLeastOnce)
                    {
                        log::warn!("Failed to subscribe to the response topic: {err}");
                        if let Err(err) = self.mqtt.try_disconnect() {
                            panic!("Failed to disconnect after error: {err}");
                        }
                    }
                    handler.connected(true).await.map_err(Error::Handler)?;
                }
                Ok(MqttEvent::Incoming(Incoming::Disconnect)) => {
                    log::info!("Disconnected");
                    self.connected.send_replace(false);
                    handler.connected(false).await.map_err(Error::Handler)?;
                }
                Ok(MqttEvent::Incoming(Incoming::Publish(publish))) => {
                    if publish.topic == response_topic {
                        handler
                            .message(publish.topic, publish.payload)
                            .await
                            .map_err(Error::Handler)?;
                    } else {
                        log::debug!("Skipping unknown topic: {}", publish.topic);
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    log::warn!("Connection failed: {err}");
                    self.connected.send_replace(false);
                    handler.connected(false).await.map_err(Error::Handler)?;
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }
}
