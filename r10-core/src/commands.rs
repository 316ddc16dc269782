//! Launch-monitor commands (spec.md §4.6) — thin typed wrappers over
//! [`Session::send_request`] that encode the right protobuf request and
//! decode the matching response field.

use crate::error::{Error, Result};
use crate::session::Session;
use crate::transport::GattTransport;
use prost::Message;
use r10_proto::{
    AlertKind, AlertSubscriptionResponse, CalibrationStatusResponse, DeviceState, ShotConfigRequest,
    ShotConfigResponse, StartTiltCalibrationRequest, StatusQuery, StatusResponse, SubscribeAlertsRequest,
    TiltQuery, TiltResponse, WakeUpRequest, WakeUpResponse,
};

async fn call<Req: Message, Resp: Message + Default>(session: &Session<impl GattTransport + 'static>, req: Req) -> Result<Resp> {
    let mut body = Vec::new();
    req.encode(&mut body).expect("protobuf encode is infallible for owned buffers");
    let response_bytes = session.send_request(body).await?;
    Resp::decode(response_bytes.as_slice()).map_err(Error::from)
}

pub async fn wake(session: &Session<impl GattTransport + 'static>) -> Result<DeviceState> {
    let response: WakeUpResponse = call(session, WakeUpRequest {}).await?;
    device_state_from_i32(response.state)
}

pub async fn query_status(session: &Session<impl GattTransport + 'static>) -> Result<DeviceState> {
    let response: StatusResponse = call(session, StatusQuery {}).await?;
    device_state_from_i32(response.state)
}

pub async fn query_tilt(session: &Session<impl GattTransport + 'static>) -> Result<(f64, f64)> {
    let response: TiltResponse = call(session, TiltQuery {}).await?;
    Ok((response.roll, response.pitch))
}

pub async fn subscribe_to_alerts(
    session: &Session<impl GattTransport + 'static>,
    kind: AlertKind,
) -> Result<AlertSubscriptionResponse> {
    call(session, SubscribeAlertsRequest { kind: kind as i32 }).await
}

pub async fn start_tilt_calibration(session: &Session<impl GattTransport + 'static>) -> Result<bool> {
    let response: CalibrationStatusResponse = call(session, StartTiltCalibrationRequest {}).await?;
    Ok(response.started)
}

#[allow(clippy::too_many_arguments)]
pub async fn shot_config(
    session: &Session<impl GattTransport + 'static>,
    temperature_f: f64,
    humidity: f64,
    altitude_m: f64,
    air_density: f64,
    tee_range_m: f64,
) -> Result<bool> {
    let response: ShotConfigResponse = call(
        session,
        ShotConfigRequest { temperature_f, humidity, altitude_m, air_density, tee_range_m },
    )
    .await?;
    Ok(response.accepted)
}

fn device_state_from_i32(raw: i32) -> Result<DeviceState> {
    DeviceState::try_from(raw).map_err(|_| Error::MalformedFrame)
}
