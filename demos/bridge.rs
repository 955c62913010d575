//! Run the bridge against a real broker and dump status updates.

use clap::Parser;
use strum::IntoEnumIterator;
use sunseeker_bridge::connector::ConnectorOptions;
use sunseeker_bridge::model::{DeviceEndpoint, Sensor};
use sunseeker_bridge::Coordinator;

#[derive(Debug, clap::Parser)]
struct Cli {
    #[command(flatten)]
    connector: ConnectorOptions,

    /// The mower's device id
    #[arg(long, env)]
    device_id: String,

    /// Topic prefix, defaults to `device`
    #[arg(long, env)]
    topic_prefix: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    log::info!("Starting up bridge");

    let endpoint = DeviceEndpoint::new(cli.device_id, cli.topic_prefix)?;
    let coordinator = Coordinator::spawn(cli.connector, endpoint);

    let mut snapshots = coordinator.watch_snapshot();

    let watcher = async {
        while snapshots.changed().await.is_ok() {
            let Some(snapshot) = snapshots.borrow_and_update().clone() else {
                continue;
            };

            if let Some(activity) = snapshot.activity() {
                log::info!("Activity: {activity}");
            }
            for sensor in Sensor::iter() {
                if let Some(value) = sensor.value(&snapshot) {
                    log::info!("{}: {value} {}", sensor.name(), sensor.unit().unwrap_or(""));
                }
            }
        }
    };

    tokio::select! {
        _ = watcher => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    log::info!("Exiting");
    coordinator.shutdown().await;

    Ok(())
}
