//! `DeviceDriver` (spec.md §4.6, §4.8): readiness derivation, alert
//! dispatch, the `setupSession` startup sequence, and the reconnect loop.
//! This is the layer commands.rs and session.rs are wired together behind —
//! `r10-bridge` talks to a `DeviceDriver`, never to a bare `Session`.

use crate::commands;
use crate::error::Result;
use crate::normalize;
use crate::session::Session;
use crate::sink::{ErrorSeverity, ShotSink};
use crate::transport::GattTransport;
use crate::uuids;
use r10_proto::{AlertKind, DeviceState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tracing::{error, info, warn};

/// Environmental settings pushed via `shotConfig` during setup, and
/// reapplied verbatim on every reconnect.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentConfig {
    pub temperature_f: f64,
    pub humidity: f64,
    pub altitude_m: f64,
    pub air_density: f64,
    pub tee_range_m: f64,
}

/// Driver-level configuration independent of any one `Session`.
#[derive(Debug, Clone, Copy)]
pub struct DeviceConfig {
    pub auto_wake: bool,
    pub auto_calibrate_tilt: bool,
    pub reconnect_delay: Duration,
    pub environment: EnvironmentConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
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
        }
    }
}

/// Owns a `Session`'s lifecycle, runs `setupSession`, and dispatches
/// `AlertNotification`s to normalisation + sinks. `ready` and the
/// device-reported tilt are cached here, not in `Session`, since they are
/// application state rather than protocol-engine state.
pub struct DeviceDriver<T: GattTransport> {
    config: DeviceConfig,
    sinks: Vec<Arc<dyn ShotSink>>,
    ready: AtomicBool,
    cached_tilt: RwLock<(f64, f64)>,
    session: RwLock<Option<Arc<Session<T>>>>,
}

impl<T: GattTransport + 'static> DeviceDriver<T> {
    pub fn new(config: DeviceConfig, sinks: Vec<Arc<dyn ShotSink>>) -> Self {
        Self {
            config,
            sinks,
            ready: AtomicBool::new(false),
            cached_tilt: RwLock::new((0.0, 0.0)),
            session: RwLock::new(None),
        }
    }

    /// Runs `setupSession()`'s startup sequence (spec.md §4.6) against an
    /// already-connected, already-GATT-discovered transport — device-info
    /// reads, wake, status/tilt queries, alert subscription, optional tilt
    /// calibration, shot config — then drives the alert stream until the
    /// session disconnects.
    pub async fn setup_session(self: &Arc<Self>, transport: Arc<T>) -> Result<()> {
        let gatt = transport.discover().await?;
        let (session, mut alerts) = Session::start(transport, gatt).await?;

        *self.session.write().await = Some(session.clone());

        for (label, characteristic) in [
            ("serial number", &*uuids::SERIAL_NUMBER_CHAR),
            ("model number", &*uuids::MODEL_NUMBER_CHAR),
            ("firmware revision", &*uuids::FIRMWARE_REV_CHAR),
        ] {
            let value = session.read_characteristic(&uuids::DEVICE_INFO_SERVICE, characteristic).await?;
            info!(label, value = %String::from_utf8_lossy(&value), "read device-info characteristic");
        }

        commands::wake(&session).await?;
        let state = commands::query_status(&session).await?;
        self.apply_state(state).await;

        let tilt = commands::query_tilt(&session).await?;
        *self.cached_tilt.write().await = tilt;

        commands::subscribe_to_alerts(&session, AlertKind::LaunchMonitor).await?;

        if self.config.auto_calibrate_tilt {
            commands::start_tilt_calibration(&session).await?;
        }

        let env = self.config.environment;
        commands::shot_config(&session, env.temperature_f, env.humidity, env.altitude_m, env.air_density, env.tee_range_m)
            .await?;

        let driver = self.clone();
        tokio::spawn(async move {
            while let Some(alert) = alerts.recv().await {
                driver.dispatch_alert(alert).await;
            }
            info!("alert stream closed, session has ended");
        });

        Ok(())
    }

    /// `ready ⇔ state == Waiting` (spec.md §4.6). Fires `onReadinessChanged`
    /// exactly once per actual transition.
    async fn apply_state(&self, state: DeviceState) {
        let newly_ready = state == DeviceState::Waiting;
        let was_ready = self.ready.swap(newly_ready, Ordering::SeqCst);
        if was_ready != newly_ready {
            for sink in &self.sinks {
                sink.on_readiness_changed(newly_ready).await;
            }
        }
    }

    async fn dispatch_alert(&self, alert: r10_proto::AlertNotification) {
        if let Some(state_raw) = alert.state {
            match DeviceState::try_from(state_raw) {
                Ok(DeviceState::Standby) if self.config.auto_wake => {
                    if let Some(session) = self.session.read().await.clone() {
                        if let Err(err) = commands::wake(&session).await {
                            warn!(?err, "auto-wake failed");
                        }
                    }
                }
                Ok(DeviceState::Standby) => {
                    self.surface_error(ErrorSeverity::Advisory, "device entered standby".to_string()).await;
                }
                Ok(state) => self.apply_state(state).await,
                Err(_) => warn!(state_raw, "unrecognised device state in alert"),
            }
        }

        if let Some(error_info) = &alert.error {
            self.surface_error(ErrorSeverity::Error, error_info.message.clone()).await;
        }

        if let Some(metrics) = &alert.metrics {
            let shot = normalize::normalize_shot(metrics);
            for sink in &self.sinks {
                sink.on_shot(shot.clone()).await;
            }
        }

        if alert.tilt_calibration.is_some() {
            if let Some(session) = self.session.read().await.clone() {
                match commands::query_tilt(&session).await {
                    Ok(tilt) => *self.cached_tilt.write().await = tilt,
                    Err(err) => warn!(?err, "tilt re-query after calibration failed"),
                }
            }
        }
    }

    async fn surface_error(&self, severity: ErrorSeverity, message: String) {
        error!(%message, ?severity, "device error");
        for sink in &self.sinks {
            sink.on_error(severity, message.clone()).await;
        }
    }

    pub async fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub async fn cached_tilt(&self) -> (f64, f64) {
        *self.cached_tilt.read().await
    }

    /// Tears down the current `Session` (cancelling its workers) and clears
    /// cached readiness/tilt state, matching spec.md's reconnect policy. The
    /// caller is expected to loop: `teardown` then reconnect after
    /// `config.reconnect_delay`, restarting from `setup_session` with a
    /// freshly discovered GATT map — this produces a new header byte and an
    /// empty `processedShotIds` set, since both live inside the old
    /// `Session` that gets dropped here.
    pub async fn teardown(&self) -> Result<()> {
        let previous = self.session.write().await.take();
        if let Some(session) = previous {
            session.shutdown().await;
        }
        self.ready.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.config.reconnect_delay
    }
}

/// Drives the connect/setup/run/reconnect loop for as long as `transport_factory`
/// keeps producing transports. Exists as a free function (rather than a
/// `DeviceDriver` method) because it owns the transport's construction,
/// which `DeviceDriver` itself is agnostic to.
pub async fn run_reconnect_loop<T, F, Fut>(driver: Arc<DeviceDriver<T>>, mut transport_factory: F) -> !
where
    T: GattTransport + 'static,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Arc<T>>>,
{
    loop {
        match transport_factory().await {
            Ok(transport) => match transport.connect().await {
                Ok(()) => {
                    if let Err(err) = run_once(&driver, transport).await {
                        warn!(?err, "session ended, reconnecting");
                    }
                }
                Err(err) => warn!(?err, "connect failed, retrying"),
            },
            Err(err) => warn!(?err, "failed to obtain transport, retrying"),
        }

        driver.teardown().await.ok();
        tokio::time::sleep(driver.reconnect_delay()).await;
    }
}

async fn run_once<T: GattTransport + 'static>(driver: &Arc<DeviceDriver<T>>, transport: Arc<T>) -> Result<()> {
    transport.register_pairing_agent().await?;
    driver.setup_session(transport).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ErrorSeverity;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        readiness_events: Mutex<Vec<bool>>,
        shots: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl ShotSink for RecordingSink {
        async fn on_shot(&self, shot: crate::normalize::ShotRecord) {
            self.shots.lock().await.push(shot.shot_id);
        }
        async fn on_readiness_changed(&self, ready: bool) {
            self.readiness_events.lock().await.push(ready);
        }
        async fn on_error(&self, _severity: ErrorSeverity, _message: String) {}
    }

    #[tokio::test]
    async fn readiness_fires_once_per_transition() {
        // spec.md §8, testable property 8.
        let sink = Arc::new(RecordingSink::default());
        let driver: DeviceDriver<crate::transport::dbus::BlueZTransport> =
            DeviceDriver::new(DeviceConfig::default(), vec![sink.clone()]);

        driver.apply_state(DeviceState::Standby).await;
        driver.apply_state(DeviceState::Waiting).await;
        driver.apply_state(DeviceState::Waiting).await;
        driver.apply_state(DeviceState::Standby).await;

        let events = sink.readiness_events.lock().await.clone();
        assert_eq!(events, vec![true, false]);
    }
}
