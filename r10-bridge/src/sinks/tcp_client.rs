//! Outbound TCP sink (spec.md §9): re-emits shots to a golf simulator
//! listening on a TCP socket, as newline-delimited JSON. Reconnects lazily —
//! a write failure just drops the stale connection and the next shot
//! triggers a fresh dial, rather than treating one failed write as fatal
//! to the process.

use async_trait::async_trait;
use r10_core::{ErrorSeverity, ShotRecord, ShotSink};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Serialize)]
struct ShotMessage {
    shot_id: u32,
    ball_speed_mph: f64,
    club_speed_mph: f64,
    launch_angle_deg: f64,
    launch_direction_deg: f64,
    spin_axis_deg: f64,
    side_spin_rpm: f64,
    back_spin_rpm: f64,
    attack_angle_deg: f64,
    club_face_deg: f64,
    club_path_deg: f64,
}

pub struct TcpClientSink {
    address: String,
    connection: Mutex<Option<TcpStream>>,
}

impl TcpClientSink {
    pub fn new(address: String) -> Self {
        Self { address, connection: Mutex::new(None) }
    }

    async fn send_line(&self, line: String) {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            match TcpStream::connect(&self.address).await {
                Ok(stream) => *guard = Some(stream),
                Err(err) => {
                    warn!(address = %self.address, %err, "tcp sink: connect failed");
                    return;
                }
            }
        }

        if let Some(stream) = guard.as_mut() {
            let mut payload = line;
            payload.push('\n');
            if let Err(err) = stream.write_all(payload.as_bytes()).await {
                warn!(address = %self.address, %err, "tcp sink: write failed, dropping connection");
                *guard = None;
            }
        }
    }
}

#[async_trait]
impl ShotSink for TcpClientSink {
    async fn on_shot(&self, shot: ShotRecord) {
        let message = ShotMessage {
            shot_id: shot.shot_id,
            ball_speed_mph: shot.ball_speed_mph,
            club_speed_mph: shot.club_speed_mph,
            launch_angle_deg: shot.launch_angle_deg,
            launch_direction_deg: shot.launch_direction_deg,
            spin_axis_deg: shot.spin_axis_deg,
            side_spin_rpm: shot.side_spin_rpm,
            back_spin_rpm: shot.back_spin_rpm,
            attack_angle_deg: shot.attack_angle_deg,
            club_face_deg: shot.club_face_deg,
            club_path_deg: shot.club_path_deg,
        };
        match serde_json::to_string(&message) {
            Ok(line) => self.send_line(line).await,
            Err(err) => warn!(%err, "tcp sink: failed to serialize shot"),
        }
    }

    async fn on_readiness_changed(&self, ready: bool) {
        let line = serde_json::json!({ "readiness_changed": ready }).to_string();
        self.send_line(line).await;
    }

    async fn on_error(&self, severity: ErrorSeverity, message: String) {
        let line = serde_json::json!({ "error": message, "severity": format!("{severity:?}") }).to_string();
        self.send_line(line).await;
    }
}
