//! Downstream sink implementations (spec.md §1, "out of scope" collaborators
//! that consume the core's normalised shot events).

mod putting_camera;
mod tcp_client;
mod tcp_server;

pub use putting_camera::PuttingCameraSink;
pub use tcp_client::TcpClientSink;
pub use tcp_server::TcpTextServerSink;

use async_trait::async_trait;
use r10_core::{ErrorSeverity, ShotRecord, ShotSink};
use std::sync::Arc;

/// Fans a single driver's events out to every configured sink, so
/// `DeviceDriver` only ever needs one `Arc<dyn ShotSink>`.
pub struct CompositeSink {
    sinks: Vec<Arc<dyn ShotSink>>,
}

impl CompositeSink {
    pub fn new(sinks: Vec<Arc<dyn ShotSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl ShotSink for CompositeSink {
    async fn on_shot(&self, shot: ShotRecord) {
        for sink in &self.sinks {
            sink.on_shot(shot.clone()).await;
        }
    }

    async fn on_readiness_changed(&self, ready: bool) {
        for sink in &self.sinks {
            sink.on_readiness_changed(ready).await;
        }
    }

    async fn on_error(&self, severity: ErrorSeverity, message: String) {
        for sink in &self.sinks {
            sink.on_error(severity, message.clone()).await;
        }
    }
}
