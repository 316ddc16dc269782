//! Garmin Approach R10 BLE device driver.
//!
//! Leaves first: [`cobs`] and [`crc16`] are pure codecs, [`frame`] builds on
//! them, [`transport`] abstracts the BlueZ D-Bus surface, [`session`] is the
//! protocol engine, [`commands`] and [`device`] are the application layer,
//! and [`normalize`]/[`sink`] are the boundary to downstream consumers.

pub mod cobs;
pub mod commands;
pub mod crc16;
pub mod device;
pub mod error;
pub mod frame;
pub mod normalize;
pub mod session;
pub mod sink;
pub mod transport;
pub mod uuids;

pub use device::{DeviceConfig, DeviceDriver, EnvironmentConfig};
pub use error::{Error, Result};
pub use normalize::ShotRecord;
pub use sink::{ErrorSeverity, ShotSink};
