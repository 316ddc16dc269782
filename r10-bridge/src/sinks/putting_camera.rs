//! Putting-camera companion sink (spec.md §9): posts shot events to an
//! external HTTP endpoint rather than hosting one, keeping this process a
//! pure client — no `axum`/server-side HTTP stack needed anywhere in this
//! crate.

use async_trait::async_trait;
use r10_core::{ErrorSeverity, ShotRecord, ShotSink};
use serde::Serialize;
use tracing::warn;

#[derive(Serialize)]
struct ShotPayload {
    shot_id: u32,
    ball_speed_mph: f64,
    launch_angle_deg: f64,
    launch_direction_deg: f64,
}

pub struct PuttingCameraSink {
    client: reqwest::Client,
    endpoint_url: String,
}

impl PuttingCameraSink {
    pub fn new(endpoint_url: String) -> Self {
        Self { client: reqwest::Client::new(), endpoint_url }
    }
}

#[async_trait]
impl ShotSink for PuttingCameraSink {
    async fn on_shot(&self, shot: ShotRecord) {
        let payload = ShotPayload {
            shot_id: shot.shot_id,
            ball_speed_mph: shot.ball_speed_mph,
            launch_angle_deg: shot.launch_angle_deg,
            launch_direction_deg: shot.launch_direction_deg,
        };

        if let Err(err) = self.client.post(&self.endpoint_url).json(&payload).send().await {
            warn!(endpoint = %self.endpoint_url, %err, "putting camera sink: post failed");
        }
    }

    // The putting camera only cares about shots landing, not readiness or
    // error state.
    async fn on_readiness_changed(&self, _ready: bool) {}

    async fn on_error(&self, _severity: ErrorSeverity, _message: String) {}
}
