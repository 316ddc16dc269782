mod config;
mod sinks;

use std::sync::Arc;

use clap::Parser;
use r10_core::device::{run_reconnect_loop, DeviceDriver};
use r10_core::transport::dbus::BlueZTransport;
use r10_core::ShotSink;
use tracing::info;

use config::BridgeConfig;
use sinks::{CompositeSink, PuttingCameraSink, TcpClientSink, TcpTextServerSink};

#[derive(Parser, Debug)]
#[command(name = "r10-bridge", about = "Bridges a Garmin Approach R10 to downstream golf simulator sinks")]
struct Args {
    /// BlueZ device object path, e.g. /org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF.
    /// Overrides `device_address` from r10-bridge.toml when given.
    #[arg(long)]
    device_path: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "r10_bridge=info,r10_core=info".into()),
        )
        .init();

    info!("r10-bridge v{} starting", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = BridgeConfig::load().await;

    let device_path = args
        .device_path
        .or_else(|| config.device_address.clone())
        .expect("device path required: pass --device-path or set device_address in r10-bridge.toml");

    let sinks = build_sinks(&config).await;
    let driver = Arc::new(DeviceDriver::new(config.device_config(), sinks));

    run_reconnect_loop(driver, move || {
        let device_path = device_path.clone();
        async move { Ok(Arc::new(BlueZTransport::new(device_path).await?)) }
    })
    .await;
}

async fn build_sinks(config: &BridgeConfig) -> Vec<Arc<dyn ShotSink>> {
    let mut sinks: Vec<Arc<dyn ShotSink>> = Vec::new();

    if let Some(tcp_client) = &config.sinks.tcp_client {
        sinks.push(Arc::new(TcpClientSink::new(tcp_client.address.clone())));
        info!(address = %tcp_client.address, "tcp client sink enabled");
    }

    if let Some(tcp_server) = &config.sinks.tcp_server {
        match TcpTextServerSink::bind(tcp_server.bind_address.clone()).await {
            Ok(sink) => sinks.push(Arc::new(sink)),
            Err(err) => tracing::warn!(%err, "failed to bind tcp text server sink, skipping"),
        }
    }

    if let Some(putting_camera) = &config.sinks.putting_camera {
        sinks.push(Arc::new(PuttingCameraSink::new(putting_camera.endpoint_url.clone())));
        info!(endpoint = %putting_camera.endpoint_url, "putting camera sink enabled");
    }

    // A single composite collapses the list back to one ShotSink, which is
    // all DeviceDriver::new needs; keeping it one element avoids fanning the
    // same shot out through two layers of Vec iteration in device.rs.
    vec![Arc::new(CompositeSink::new(sinks))]
}
