//! Downstream sink interface (spec.md §6, "the core exports, the simulator
//! adapter consumes"). The core never owns a sink's lifecycle — it only
//! invokes it, per spec.md §4.5's ownership rule.

use crate::normalize::ShotRecord;
use async_trait::async_trait;

/// Severity attached to an `onError` call, distinguishing device-reported
/// conditions (advisory, e.g. "still in standby") from driver-level faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Advisory,
    Error,
}

/// Everything downstream of the normalisation adapter implements this to
/// receive shots, readiness transitions, and errors. A bridge process may
/// fan a single `DeviceDriver` out to several sinks via a composite
/// implementation (see `r10-bridge::sinks::CompositeSink`).
#[async_trait]
pub trait ShotSink: Send + Sync {
    async fn on_shot(&self, shot: ShotRecord);
    async fn on_readiness_changed(&self, ready: bool);
    async fn on_error(&self, severity: ErrorSeverity, message: String);
}
