//! Configuration loading (spec.md §9, "outside scope" for the core but part
//! of the surrounding repository). TOML on disk, falling back to defaults
//! when the file is missing or fails to parse — the same "never fail
//! startup over a bad persisted file" policy `persistence::load_state`
//! follows for its own on-disk state.

use r10_core::device::{DeviceConfig, EnvironmentConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

const CONFIG_FILE: &str = "r10-bridge.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub device_address: Option<String>,
    pub auto_wake: bool,
    pub auto_calibrate_tilt: bool,
    pub reconnect_delay_secs: u64,
    pub environment: EnvironmentToml,
    pub sinks: SinksConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            device_address: None,
            auto_wake: true,
            auto_calibrate_tilt: false,
            reconnect_delay_secs: 5,
            environment: EnvironmentToml::default(),
            sinks: SinksConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentToml {
    pub temperature_f: f64,
    pub humidity: f64,
    pub altitude_m: f64,
    pub air_density: f64,
    pub tee_range_m: f64,
}

impl Default for EnvironmentToml {
    fn default() -> Self {
        Self { temperature_f: 70.0, humidity: 50.0, altitude_m: 0.0, air_density: 1.0, tee_range_m: 3.0 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SinksConfig {
    pub tcp_client: Option<TcpClientSinkConfig>,
    pub tcp_server: Option<TcpServerSinkConfig>,
    pub putting_camera: Option<PuttingCameraSinkConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpClientSinkConfig {
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpServerSinkConfig {
    pub bind_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuttingCameraSinkConfig {
    pub endpoint_url: String,
}

impl BridgeConfig {
    /// Load from `r10-bridge.toml` in the working directory. Returns the
    /// default configuration if the file is missing or fails to parse,
    /// logging a warning rather than failing startup.
    pub async fn load() -> Self {
        if !Path::new(CONFIG_FILE).exists() {
            info!(file = CONFIG_FILE, "no config file found, using defaults");
            return Self::default();
        }

        match tokio::fs::read_to_string(CONFIG_FILE).await {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => {
                    info!(file = CONFIG_FILE, "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(%err, "failed to parse {CONFIG_FILE}, using defaults");
                    Self::default()
                }
            },
            Err(err) => {
                warn!(%err, "failed to read {CONFIG_FILE}, using defaults");
                Self::default()
            }
        }
    }

    pub fn device_config(&self) -> DeviceConfig {
        DeviceConfig {
            auto_wake: self.auto_wake,
            auto_calibrate_tilt: self.auto_calibrate_tilt,
            reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
            environment: EnvironmentConfig {
                temperature_f: self.environment.temperature_f,
                humidity: self.environment.humidity,
                altitude_m: self.environment.altitude_m,
                air_density: self.environment.air_density,
                tee_range_m: self.environment.tee_range_m,
            },
        }
    }
}
