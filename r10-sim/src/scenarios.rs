//! Canned scenario scripts (spec.md §8, S1-S6). Each [`Scenario`] builds the
//! exact queue of `B413` response bodies `FakeR10Peer` hands out, in the
//! order `DeviceDriver::setup_session` issues requests, plus any alerts the
//! scenario should push once the session is up.

use prost::Message;
use r10_proto::{AlertKind, AlertNotification, AlertStatusEntry, AlertSubscriptionResponse};
use r10_proto::{CalibrationStatusResponse, DeviceState, ErrorInfo, ShotConfigResponse};
use r10_proto::{ShotMetrics, StatusResponse, TiltCalibrationResult, TiltResponse, WakeUpResponse};

use crate::peer::CannedResponse;

fn encode(message: &impl Message) -> CannedResponse {
    let mut body = Vec::new();
    message.encode(&mut body).expect("protobuf encode is infallible for owned buffers");
    body
}

fn standard_setup_responses(state: DeviceState, calibrate: bool) -> Vec<CannedResponse> {
    let mut responses = vec![
        encode(&WakeUpResponse { state: state as i32 }),
        encode(&StatusResponse { state: state as i32 }),
        encode(&TiltResponse { roll: 0.5, pitch: -0.25 }),
        encode(&AlertSubscriptionResponse {
            entries: vec![AlertStatusEntry { kind: AlertKind::LaunchMonitor as i32, subscribed: true }],
        }),
    ];
    if calibrate {
        responses.push(encode(&CalibrationStatusResponse { started: true }));
    }
    responses.push(encode(&ShotConfigResponse { accepted: true }));
    responses
}

fn shot_metrics(shot_id: u32) -> ShotMetrics {
    ShotMetrics {
        shot_id,
        ball_speed_mps: 65.0,
        launch_angle_deg: 14.0,
        launch_direction_deg: -2.5,
        spin_axis_deg: 8.0,
        total_spin_rpm: 2600.0,
        club_head_speed_mps: 45.0,
        attack_angle_deg: 1.2,
        club_face_deg: 0.6,
        club_path_deg: -0.4,
    }
}

/// One scripted end-to-end exercise of the protocol: the responses a
/// [`crate::FakeR10Peer`] should be constructed with, plus the alerts to
/// push once `DeviceDriver::setup_session` has completed.
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    pub header_byte: u8,
    pub responses: Vec<CannedResponse>,
    pub post_setup_alerts: Vec<AlertNotification>,
}

impl Scenario {
    /// S1: idle handshake, status and tilt query succeed, device reports
    /// `WAITING` throughout — readiness fires true and stays there.
    pub fn s1_idle_handshake() -> Self {
        Self {
            name: "s1",
            description: "handshake + status/tilt query, device already waiting",
            header_byte: 0x42,
            responses: standard_setup_responses(DeviceState::Waiting, false),
            post_setup_alerts: Vec::new(),
        }
    }

    /// S2: a single shot arrives after setup and should reach the sinks
    /// normalised.
    pub fn s2_shot_delivery() -> Self {
        Self {
            name: "s2",
            description: "one shot pushed after setup, delivered to sinks",
            header_byte: 0x17,
            responses: standard_setup_responses(DeviceState::Waiting, false),
            post_setup_alerts: vec![AlertNotification {
                state: None,
                error: None,
                metrics: Some(shot_metrics(1)),
                tilt_calibration: None,
            }],
        }
    }

    /// S3: the same shot id is pushed twice — the second push must be
    /// suppressed by the session's dedup, so only one shot reaches the sinks.
    pub fn s3_duplicate_shot() -> Self {
        let metrics = shot_metrics(7);
        Self {
            name: "s3",
            description: "duplicate shot id pushed twice, second suppressed",
            header_byte: 0x17,
            responses: standard_setup_responses(DeviceState::Waiting, false),
            post_setup_alerts: vec![
                AlertNotification { state: None, error: None, metrics: Some(metrics.clone()), tilt_calibration: None },
                AlertNotification { state: None, error: None, metrics: Some(metrics), tilt_calibration: None },
            ],
        }
    }

    /// S4: the peer is starved of a response for one setup request (here,
    /// the shot-config response is never queued) so `send_request` must
    /// exhaust its retries and surface a timeout error.
    pub fn s4_response_timeout() -> Self {
        let mut responses = standard_setup_responses(DeviceState::Waiting, false);
        responses.pop(); // drop the ShotConfigResponse so that request times out.
        Self {
            name: "s4",
            description: "shot-config response withheld, request must time out",
            header_byte: 0x99,
            responses,
            post_setup_alerts: Vec::new(),
        }
    }

    /// S5: a shot arrives alongside a device-reported error — both should
    /// surface, the error through `onError` and the shot through `onShot`.
    pub fn s5_error_alert() -> Self {
        Self {
            name: "s5",
            description: "device reports an error alongside a shot",
            header_byte: 0x17,
            responses: standard_setup_responses(DeviceState::Waiting, false),
            post_setup_alerts: vec![AlertNotification {
                state: None,
                error: Some(ErrorInfo { code: 12, message: "impact sensor fault".into() }),
                metrics: Some(shot_metrics(3)),
                tilt_calibration: None,
            }],
        }
    }

    /// S6: the device starts in standby, auto-wake brings it to waiting, a
    /// tilt calibration result arrives and triggers a tilt re-query.
    pub fn s6_standby_then_calibrate() -> Self {
        Self {
            name: "s6",
            description: "device wakes from standby, then tilt calibration completes",
            header_byte: 0x17,
            responses: standard_setup_responses(DeviceState::Standby, true),
            post_setup_alerts: vec![
                AlertNotification { state: Some(DeviceState::Waiting as i32), error: None, metrics: None, tilt_calibration: None },
                AlertNotification {
                    state: None,
                    error: None,
                    metrics: None,
                    tilt_calibration: Some(TiltCalibrationResult { success: true, roll: 1.0, pitch: 0.1 }),
                },
            ],
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            Self::s1_idle_handshake(),
            Self::s2_shot_delivery(),
            Self::s3_duplicate_shot(),
            Self::s4_response_timeout(),
            Self::s5_error_alert(),
            Self::s6_standby_then_calibrate(),
        ]
    }

    pub fn by_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|s| s.name == name)
    }
}
