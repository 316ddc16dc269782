//! Error taxonomy for the R10 device driver (spec.md §7).
//!
//! Framing and transient protocol errors (`ChecksumMismatch`,
//! `MalformedFrame`, `CounterMismatch`) are recovered locally by the
//! caller — they are returned so the reassembler/session can log and
//! continue, not because every caller is expected to propagate them.
//! Lifecycle errors (`HandshakeTimeout`, `NotifyAuthRequired`,
//! `ConnectFailed`, `AdapterUnavailable`, `DeviceNotFound`) are meant to
//! surface out of `setup_session` to whoever started the session.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no Bluetooth host controller found")]
    AdapterUnavailable,

    #[error("device not found among known/bonded peers")]
    DeviceNotFound,

    #[error("GATT connect failed or services did not resolve within the timeout")]
    ConnectFailed,

    #[error("enabling the protected notifier requires authentication and in-band pairing failed")]
    NotifyAuthRequired,

    #[error("no handshake reply received within the timeout")]
    HandshakeTimeout,

    #[error("CRC16 verification failed")]
    ChecksumMismatch,

    #[error("frame was malformed (bad COBS pointer or too short)")]
    MalformedFrame,

    #[error("no matching response after all retry attempts")]
    RequestTimeout,

    #[error("response counter did not match the outstanding request counter")]
    CounterMismatch,

    #[error("device disconnected")]
    Disconnected,

    #[error("D-Bus error: {0}")]
    Dbus(#[from] dbus::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protobuf decode error: {0}")]
    ProtoDecode(#[from] prost::DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;
