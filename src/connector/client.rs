use crate::model::{Command, CommandError};
use rumqttc::{AsyncClient, QoS};
use tokio::sync::watch;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("not connected to the broker")]
    NotConnected,
    #[error("invalid command")]
    Command(#[from] CommandError),
    #[error("serialization failure")]
    Serialization(#[from] serde_json::Error),
    #[error("client error")]
    Client(#[from] rumqttc::ClientError),
}

/// Publish handle for one mower endpoint.
#[derive(Clone)]
pub struct Client {
    mqtt: AsyncClient,
    command_topic: String,
    connected: watch::Receiver<bool>,
}

impl Client {
    pub(crate) fn new(
        mqtt: AsyncClient,
        command_topic: String,
        connected: watch::Receiver<bool>,
    ) -> Self {
        Self {
            mqtt,
            command_topic,
            connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Watch connection-state changes.
    pub fn connected_watch(&self) -> watch::Receiver<bool> {
        self.connected.clone()
    }

    /// Encode and publish a command to the mower.
    ///
    /// Fails with [`ClientError::NotConnected`] before publishing anything
    /// when no connection is established. Delivery is fire-and-forget beyond
    /// the QoS 1 tier.
    pub async fn send_command(&self, command: &Command) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let payload = command.encode()?.to_payload()?;
        log::debug!("Sending command to {}", self.command_topic);

        self.mqtt
            .publish(self.command_topic.clone(), QoS::AtLeastOnce, false, payload)
            .await?;

        Ok(())
    }

    /// Close the connection. Safe to call when already disconnected.
    pub fn disconnect(&self) {
        if let Err(err) = self.mqtt.try_disconnect() {
            log::debug!("Disconnect: {err}");
        }
    }
}
