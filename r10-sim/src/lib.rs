//! Fake R10 BLE peer (spec.md §8's scenarios S1-S6) — an in-process
//! [`r10_core::transport::GattTransport`] that plays the device side of the
//! wire protocol against a real `r10-core::Session`/`DeviceDriver`, without
//! touching BlueZ or hardware: a standalone, scriptable stand-in for
//! hardware used both as a dev tool and to drive integration-style tests.

pub mod peer;
pub mod scenarios;

pub use peer::FakeR10Peer;
pub use scenarios::Scenario;
