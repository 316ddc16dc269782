//! GATT transport abstraction (spec.md §4.4).
//!
//! `GattTransport` is the seam between the session/protocol engine and
//! whatever actually moves bytes over BLE. The production implementation,
//! [`dbus::BlueZTransport`], talks to BlueZ over D-Bus (grounded on
//! `bluez-async`/`bluez-bluer` in the retrieval pack); tests and `r10-sim`
//! substitute an in-memory double instead.

pub mod agent;
pub mod dbus;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A resolved D-Bus object path to a GATT service or characteristic, e.g.
/// `/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/service0012/char0013`.
pub type GattPath = String;

/// Service UUID -> characteristic UUID -> object path, populated once by
/// [`GattTransport::discover`] and consulted for every subsequent GATT call.
#[derive(Debug, Clone, Default)]
pub struct GattMap {
    services: HashMap<Uuid, HashMap<Uuid, GattPath>>,
}

impl GattMap {
    pub fn insert(&mut self, service: Uuid, characteristic: Uuid, path: GattPath) {
        self.services.entry(service).or_default().insert(characteristic, path);
    }

    /// Look up the object path for a characteristic within a service.
    pub fn path(&self, service: &Uuid, characteristic: &Uuid) -> Result<&GattPath> {
        self.services
            .get(service)
            .and_then(|chars| chars.get(characteristic))
            .ok_or(crate::error::Error::DeviceNotFound)
    }

    pub fn has_service(&self, service: &Uuid) -> bool {
        self.services.contains_key(service)
    }
}

/// Abstraction over the subset of GATT central-role operations the R10
/// driver needs. Implementors own connection lifecycle; callers drive it
/// through `connect`/`discover` once and then issue reads/writes/notify
/// subscriptions against the resulting [`GattMap`].
#[async_trait]
pub trait GattTransport: Send + Sync {
    /// Connect to the device (by address or by being the only bonded R10,
    /// per spec.md's discovery rule) and wait for GATT service resolution.
    async fn connect(&self) -> Result<()>;

    /// Walk the resolved GATT tree and return a service/characteristic to
    /// object-path map. Implementations are free to use whatever discovery
    /// mechanism is reliable on the host; see
    /// [`dbus::BlueZTransport::discover`] for why this one shells out.
    async fn discover(&self) -> Result<GattMap>;

    /// Register this process as the BlueZ pairing agent with `NoInputNoOutput`
    /// IO capability, so pairing can proceed without user interaction.
    async fn register_pairing_agent(&self) -> Result<()>;

    /// Enable notifications on the protected (pairing-gated) characteristic,
    /// forwarding every subsequent `Value` update as raw bytes on `sink`.
    /// Per spec.md this must be the first GATT operation of a session; the
    /// concrete transport enforces that ordering itself.
    async fn enable_protected_notifier(&self, characteristic: &GattPath, sink: mpsc::Sender<Vec<u8>>) -> Result<()>;

    /// Enable notifications on a plain (no pairing required) characteristic,
    /// forwarding updates on `sink` the same way as
    /// [`GattTransport::enable_protected_notifier`]. All characteristics a
    /// session subscribes to share one `sink`, matching spec.md's single
    /// multiplexed reader queue (§4.5) rather than a queue per
    /// characteristic.
    async fn enable_plain_notifier(&self, characteristic: &GattPath, sink: mpsc::Sender<Vec<u8>>) -> Result<()>;

    /// Write without waiting for a peripheral-side acknowledgement.
    async fn write_without_response(&self, characteristic: &GattPath, value: &[u8]) -> Result<()>;

    /// Read a characteristic's current value (used for Device Information
    /// and Battery Service reads, which are one-shot, not notified).
    async fn read_value(&self, characteristic: &GattPath) -> Result<Vec<u8>>;

    /// Tear down the connection. Best-effort; errors are logged, not fatal.
    async fn disconnect(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gatt_map_round_trips_lookups() {
        let mut map = GattMap::default();
        let service = Uuid::new_v4();
        let characteristic = Uuid::new_v4();
        map.insert(service, characteristic, "/org/bluez/hci0/dev_X/service0/char0".to_string());

        assert!(map.has_service(&service));
        assert_eq!(
            map.path(&service, &characteristic).unwrap(),
            "/org/bluez/hci0/dev_X/service0/char0"
        );
    }

    #[test]
    fn gatt_map_missing_lookup_is_device_not_found() {
        let map = GattMap::default();
        let err = map.path(&Uuid::new_v4(), &Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, crate::error::Error::DeviceNotFound));
    }
}
