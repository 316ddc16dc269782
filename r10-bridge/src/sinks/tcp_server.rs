//! Inbound TCP sink (spec.md §9): hosts a plain-text line protocol that
//! simulator clients connect to, distinct from [`super::tcp_client`]'s
//! outbound JSON protocol. Uses a broadcast-fan-out pattern to push the
//! same event to every connected client without tracking individual
//! client state.

use async_trait::async_trait;
use r10_core::{ErrorSeverity, ShotRecord, ShotSink};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

const BROADCAST_CAPACITY: usize = 64;

pub struct TcpTextServerSink {
    tx: broadcast::Sender<String>,
}

impl TcpTextServerSink {
    /// Binds immediately and spawns the accept loop; each accepted
    /// connection gets its own broadcast subscription and just forwards
    /// lines until the client disconnects or falls behind.
    pub async fn bind(bind_address: String) -> std::io::Result<Self> {
        let (tx, _rx) = broadcast::channel::<String>(BROADCAST_CAPACITY);
        let listener = TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "tcp text sink listening");

        let accept_tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((mut stream, peer)) => {
                        let mut rx = accept_tx.subscribe();
                        tokio::spawn(async move {
                            while let Ok(line) = rx.recv().await {
                                if stream.write_all(line.as_bytes()).await.is_err() {
                                    break;
                                }
                            }
                            info!(%peer, "tcp text sink client disconnected");
                        });
                    }
                    Err(err) => warn!(%err, "tcp text sink accept failed"),
                }
            }
        });

        Ok(Self { tx })
    }

    fn publish(&self, line: String) {
        // No subscribers is the common case at startup; broadcast::send
        // only errors when the channel has zero receivers, which isn't
        // worth logging.
        let _ = self.tx.send(line);
    }
}

#[async_trait]
impl ShotSink for TcpTextServerSink {
    async fn on_shot(&self, shot: ShotRecord) {
        self.publish(format!(
            "SHOT {} {:.2} {:.2} {:.2} {:.2} {:.2}\n",
            shot.shot_id,
            shot.ball_speed_mph,
            shot.club_speed_mph,
            shot.launch_angle_deg,
            shot.launch_direction_deg,
            shot.spin_axis_deg,
        ));
    }

    async fn on_readiness_changed(&self, ready: bool) {
        self.publish(format!("READY {}\n", if ready { 1 } else { 0 }));
    }

    async fn on_error(&self, severity: ErrorSeverity, message: String) {
        let tag = match severity {
            ErrorSeverity::Advisory => "ADVISORY",
            ErrorSeverity::Error => "ERROR",
        };
        self.publish(format!("{tag} {message}\n"));
    }
}
