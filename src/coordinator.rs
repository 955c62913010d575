//! Periodic status refresh and cache ownership for one mower.

use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::connector::{
    Client, ClientError, Connector, ConnectorOptions, Event, EventForwarder,
};
use crate::model::{
    Command, DeviceEndpoint, DeviceIdentity, Intent, StatusCache, StatusSnapshot,
};

/// Fixed period between status refreshes.
pub const UPDATE_INTERVAL: Duration = Duration::from_secs(30);

/// Pause between the status and rain-status requests. The mower drops
/// back-to-back commands.
const COMMAND_PAUSE: Duration = Duration::from_millis(500);

/// Bound on waiting for a response after a request cycle.
const REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

const EVENTS_CAP: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("not connected to the broker")]
    NotConnected,
    #[error("no status update received in time")]
    Timeout,
    #[error("command failed: {0}")]
    Client(#[from] ClientError),
}

/// Drives one mower endpoint.
///
/// Owns the connection and the status cache, refreshes the cache on a fixed
/// period and exposes the latest merged snapshot through watch channels. The
/// cache is mutated only on the cache task; the network task hands every
/// inbound message off through a bounded channel.
pub struct Coordinator {
    client: Client,
    endpoint: DeviceEndpoint,
    snapshot: watch::Receiver<Option<StatusSnapshot>>,
    identity: watch::Receiver<Option<DeviceIdentity>>,
    available: watch::Receiver<bool>,
    nudge: mpsc::Sender<()>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Coordinator {
    /// Spawn the network, cache and refresh tasks for one endpoint.
    ///
    /// Must be called within a Tokio runtime. A broker that is currently
    /// unreachable is not an error: the coordinator starts degraded and
    /// reports unavailable until a connection is established.
    pub fn spawn(options: ConnectorOptions, endpoint: DeviceEndpoint) -> Self {
        let (connector, client) = Connector::new(options, endpoint.clone());

        let (shutdown, _) = watch::channel(false);
        let (snapshot_tx, snapshot) = watch::channel(None);
        let (identity_tx, identity) = watch::channel(None);
        let (available_tx, available) = watch::channel(false);
        let (events_tx, events_rx) = mpsc::channel(EVENTS_CAP);
        let (nudge, nudge_rx) = mpsc::channel(1);

        let mut tasks = Vec::new();

        let mut stop = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            tokio::select! {
                _ = stop.wait_for(|stop| *stop) => {}
                result = connector.run(EventForwarder::new(events_tx)) => {
                    if let Err(err) = result {
                        log::error!("Connection task failed: {err}");
                    }
                }
            }
        }));

        tasks.push(tokio::spawn(cache_task(
            events_rx,
            snapshot_tx,
            identity_tx,
            shutdown.subscribe(),
        )));

        tasks.push(tokio::spawn(refresh_task(
            client.clone(),
            snapshot.clone(),
            available_tx,
            nudge_rx,
            shutdown.subscribe(),
        )));

        Self {
            client,
            endpoint,
            snapshot,
            identity,
            available,
            nudge,
            shutdown,
            tasks,
        }
    }

    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Whether the last refresh cycle succeeded.
    pub fn is_available(&self) -> bool {
        *self.available.borrow()
    }

    pub fn watch_available(&self) -> watch::Receiver<bool> {
        self.available.clone()
    }

    /// The latest merged snapshot, `None` until the first status arrived.
    pub fn snapshot(&self) -> Option<StatusSnapshot> {
        self.snapshot.borrow().clone()
    }

    pub fn watch_snapshot(&self) -> watch::Receiver<Option<StatusSnapshot>> {
        self.snapshot.clone()
    }

    /// Static device identity, derived from the first robot status message.
    pub fn identity(&self) -> Option<DeviceIdentity> {
        self.identity.borrow().clone()
    }

    pub fn watch_identity(&self) -> watch::Receiver<Option<DeviceIdentity>> {
        self.identity.clone()
    }

    /// Request a fresh snapshot and wait for it.
    pub async fn refresh(&self) -> Result<StatusSnapshot, RefreshError> {
        refresh(&self.client, self.snapshot.clone()).await
    }

    /// Encode and publish an intent, then trigger an early refresh.
    pub async fn send_intent(&self, intent: Intent) -> Result<(), ClientError> {
        log::debug!("Intent for {}: {intent:?}", self.endpoint);
        self.client.send_command(&intent.into_command()).await?;
        let _ = self.nudge.try_send(());
        Ok(())
    }

    pub async fn send_command(&self, command: &Command) -> Result<(), ClientError> {
        self.client.send_command(command).await
    }

    /// Stop all tasks and close the connection.
    ///
    /// Pending refresh timers are cancelled with their task; in-flight
    /// publishes are left to resolve against the closed connection.
    pub async fn shutdown(mut self) {
        log::debug!("Shutting down {}", self.endpoint);
        self.shutdown.send_replace(true);
        self.client.disconnect();

        for result in join_all(self.tasks.drain(..)).await {
            if let Err(err) = result {
                log::warn!("Task failed during shutdown: {err}");
            }
        }
    }
}

/// Sole mutator of the status cache: applies inbound messages, publishes the
/// merged snapshot and the one-time device identity.
async fn cache_task(
    mut events: mpsc::Receiver<Event>,
    snapshot: watch::Sender<Option<StatusSnapshot>>,
    identity: watch::Sender<Option<DeviceIdentity>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut cache = StatusCache::default();

    loop {
        let event = tokio::select! {
            _ = shutdown.wait_for(|stop| *stop) => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match event {
            Event::Connected { state } => {
                log::debug!("Connection state: {state}");
            }
            Event::Message { topic, payload } => {
                log::debug!("Received {} bytes on {topic}", payload.len());
                if let Some(update) = cache.ingest(&payload) {
                    if identity.borrow().is_none() {
                        if let Some(derived) = cache.identity() {
                            identity.send_replace(Some(derived.clone()));
                        }
                    }
                    snapshot.send_replace(Some(update));
                }
            }
        }
    }
}

async fn refresh_task(
    client: Client,
    snapshot: watch::Receiver<Option<StatusSnapshot>>,
    available: watch::Sender<bool>,
    mut nudge: mpsc::Receiver<()>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(UPDATE_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.wait_for(|stop| *stop) => break,
            _ = interval.tick() => {}
            nudged = nudge.recv() => {
                if nudged.is_none() {
                    break;
                }
                interval.reset();
            }
        }

        let result = tokio::select! {
            _ = shutdown.wait_for(|stop| *stop) => break,
            result = refresh(&client, snapshot.clone()) => result,
        };

        match result {
            Ok(_) => {
                available.send_replace(true);
            }
            Err(err) => {
                log::warn!("Status refresh failed: {err}");
                available.send_replace(false);
            }
        }
    }
}

/// One refresh cycle: request robot and rain status, then wait for the cache
/// to publish an update.
///
/// Fails fast with [`RefreshError::NotConnected`] before sending anything
/// when the connection is down, and with [`RefreshError::Timeout`] when no
/// update arrives within the bound.
async fn refresh(
    client: &Client,
    mut snapshot: watch::Receiver<Option<StatusSnapshot>>,
) -> Result<StatusSnapshot, RefreshError> {
    if !client.is_connected() {
        return Err(RefreshError::NotConnected);
    }

    snapshot.mark_unchanged();

    log::debug!("Requesting status");
    client.send_command(&Command::StatusRequest).await?;
    tokio::time::sleep(COMMAND_PAUSE).await;
    client.send_command(&Command::RainStatusRequest).await?;

    let mut connected = client.connected_watch();

    let updated = async {
        loop {
            if snapshot.changed().await.is_err() {
                return Err(RefreshError::NotConnected);
            }
            if let Some(update) = snapshot.borrow_and_update().clone() {
                return Ok(update);
            }
        }
    };

    tokio::select! {
        result = updated => result,
        _ = connected.wait_for(|connected| !connected) => Err(RefreshError::NotConnected),
        _ = tokio::time::sleep(REFRESH_TIMEOUT) => Err(RefreshError::Timeout),
    }
}
