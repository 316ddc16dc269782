//! `r10-sim` CLI — runs one scripted scenario against a real
//! `DeviceDriver<FakeR10Peer>` and logs the outcome, so the protocol engine
//! and command layer can be exercised without a real R10 or BlueZ — a
//! standalone binary that drives the same application logic the
//! production process uses, against synthetic input instead of real
//! hardware.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use r10_core::device::DeviceDriver;
use r10_core::normalize::ShotRecord;
use r10_core::sink::{ErrorSeverity, ShotSink};
use r10_core::{DeviceConfig, EnvironmentConfig};
use tracing::{info, warn};

use r10_sim::{FakeR10Peer, Scenario};

#[derive(Parser, Debug)]
#[command(name = "r10-sim", about = "Runs a scripted R10 protocol scenario without hardware")]
struct Args {
    /// Scenario to run: s1, s2, s3, s4, s5, or s6. Omit to list all scenarios.
    scenario: Option<String>,
}

struct LoggingSink;

#[async_trait]
impl ShotSink for LoggingSink {
    async fn on_shot(&self, shot: ShotRecord) {
        info!(
            shot_id = shot.shot_id,
            ball_speed_mph = shot.ball_speed_mph,
            launch_angle_deg = shot.launch_angle_deg,
            side_spin_rpm = shot.side_spin_rpm,
            back_spin_rpm = shot.back_spin_rpm,
            "shot delivered"
        );
    }

    async fn on_readiness_changed(&self, ready: bool) {
        info!(ready, "readiness changed");
    }

    async fn on_error(&self, severity: ErrorSeverity, message: String) {
        warn!(?severity, %message, "device error");
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "r10_sim=info".into()))
        .init();

    let args = Args::parse();

    let Some(name) = args.scenario else {
        println!("available scenarios:");
        for scenario in Scenario::all() {
            println!("  {:<4} {}", scenario.name, scenario.description);
        }
        return;
    };

    let Some(scenario) = Scenario::by_name(&name) else {
        eprintln!("unknown scenario {name:?}, run with no arguments to list them");
        std::process::exit(1);
    };

    info!(scenario = scenario.name, "{}", scenario.description);
    run_scenario(scenario).await;
}

async fn run_scenario(scenario: Scenario) {
    let peer = FakeR10Peer::new(scenario.header_byte, scenario.responses);

    let config = DeviceConfig {
        auto_wake: true,
        auto_calibrate_tilt: false,
        reconnect_delay: Duration::from_secs(5),
        environment: EnvironmentConfig {
            temperature_f: 70.0,
            humidity: 50.0,
            altitude_m: 0.0,
            air_density: 1.0,
            tee_range_m: 3.0,
        },
    };

    let driver = Arc::new(DeviceDriver::new(config, vec![Arc::new(LoggingSink)]));

    match driver.setup_session(peer.clone()).await {
        Ok(()) => info!("setup_session completed"),
        Err(err) => {
            warn!(?err, "setup_session failed");
            return;
        }
    }

    for alert in &scenario.post_setup_alerts {
        peer.push_alert(alert).await;
        // Give the alert stream task a turn to process before the next push,
        // so duplicate-id suppression (S3) observes them in order.
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    info!(ready = driver.is_ready().await, tilt = ?driver.cached_tilt().await, "scenario finished");
}
