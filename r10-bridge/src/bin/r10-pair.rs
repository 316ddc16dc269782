//! One-time pairing helper (spec.md §4.4): registers the `NoInputNoOutput`
//! agent, connects to the given device path, and enables the protected
//! notifier — the exact sequence that triggers BlueZ's in-band pairing —
//! then exits. Run this once per new R10 before starting `r10-bridge`, so
//! the bridge's reconnect loop never has to carry pairing-flow error
//! handling of its own.

use clap::Parser;
use r10_core::transport::GattTransport;
use r10_core::transport::dbus::BlueZTransport;
use r10_core::uuids;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "r10-pair", about = "Pairs this host with a Garmin Approach R10 over BlueZ")]
struct Args {
    /// BlueZ device object path, e.g. /org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF
    device_path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "r10_pair=info".into()))
        .init();

    let args = Args::parse();
    let transport = BlueZTransport::new(args.device_path.clone()).await?;

    info!(device = %args.device_path, "connecting");
    transport.connect().await?;

    info!("registering pairing agent");
    transport.register_pairing_agent().await?;

    info!("discovering GATT services");
    let gatt = transport.discover().await?;
    let protected = gatt.path(&uuids::MEASUREMENT_SERVICE, &uuids::CONTROL_POINT_CHAR)?;

    info!("enabling protected notifier — expect a pairing prompt on the device, if any");
    let (sink, _rx) = tokio::sync::mpsc::channel(1);
    transport.enable_protected_notifier(protected, sink).await?;

    info!("pairing complete, the device is now bonded to this host");
    Ok(())
}
