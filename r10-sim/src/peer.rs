//! [`FakeR10Peer`]: plays the device side of spec.md §4.5's wire protocol.
//!
//! Canned responses are consumed in the same order `DeviceDriver::setup_session`
//! issues requests (wake, status, tilt, subscribe, [calibrate], shot config) —
//! this fixture does not decode request bodies, it just answers each `B313`
//! request it sees with the next queued `B413` response, which is adequate
//! for scripting deterministic scenarios rather than building a full
//! protocol-accurate device model.

use async_trait::async_trait;
use prost::Message;
use r10_core::error::Result;
use r10_core::frame::{self, FrameReassembler};
use r10_core::transport::{GattMap, GattPath, GattTransport};
use r10_core::uuids;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace};

const PREFIX_PROTO_RESPONSE: [u8; 2] = [0xB4, 0x13];
const PREFIX_PROTO_ASYNC: [u8; 2] = [0xB3, 0x13];
const PREFIX_ACK: [u8; 2] = [0x88, 0x13];
const ACK_TAIL: [u8; 8] = [0; 8];

const HANDSHAKE_HOST_FIRST_LEN: usize = 12;

/// A single queued `B413` response body (already protobuf-encoded), handed
/// out in FIFO order to whichever `B313` request arrives next.
pub type CannedResponse = Vec<u8>;

pub struct FakeR10Peer {
    header_byte: u8,
    handshake_done: AtomicBool,
    notify_sink: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    reassembler: Mutex<FrameReassembler>,
    responses: Mutex<VecDeque<CannedResponse>>,
    last_consumed_counter: StdMutex<Option<[u8; 2]>>,
}

impl FakeR10Peer {
    pub fn new(header_byte: u8, responses: Vec<CannedResponse>) -> Arc<Self> {
        Arc::new(Self {
            header_byte,
            handshake_done: AtomicBool::new(false),
            notify_sink: Mutex::new(None),
            reassembler: Mutex::new(FrameReassembler::new()),
            responses: Mutex::new(responses.into()),
            last_consumed_counter: StdMutex::new(None),
        })
    }

    /// Counter byte from the last `B313` request this peer answered, for
    /// scenarios that want to assert a request actually reached the peer.
    pub fn last_request_counter(&self) -> u8 {
        self.last_consumed_counter.lock().expect("peer state mutex poisoned").map_or(0, |c| c[0])
    }

    /// Pushes an unsolicited `B313` alert to the host, exactly the way a
    /// real shot/state/error push arrives — used by scenarios to script
    /// shots and duplicate-shot delivery.
    pub async fn push_alert(&self, notification: &r10_proto::AlertNotification) {
        let mut body = Vec::new();
        notification.encode(&mut body).expect("protobuf encode is infallible for owned buffers");

        let mut payload = Vec::with_capacity(2 + body.len());
        payload.extend_from_slice(&PREFIX_PROTO_ASYNC);
        payload.extend_from_slice(&body);

        self.notify(&payload).await;
    }

    async fn notify(&self, payload: &[u8]) {
        let Some(sink) = self.notify_sink.lock().await.clone() else {
            debug!("no notifier registered yet, dropping notification");
            return;
        };
        for chunk in frame::build_outbound(payload, self.header_byte) {
            if sink.send(chunk).await.is_err() {
                return;
            }
        }
    }

    async fn handle_handshake_write(&self, value: &[u8]) {
        if value.len() == HANDSHAKE_HOST_FIRST_LEN {
            let mut reply = vec![0x01, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0];
            reply.push(self.header_byte);
            reply.extend_from_slice(&[0, 0, 0]);
            let Some(sink) = self.notify_sink.lock().await.clone() else {
                debug!("no notifier registered yet, dropping handshake reply");
                return;
            };
            let _ = sink.send(reply).await;
        } else {
            // The single `0x00` host-final byte; nothing to send back.
            self.handshake_done.store(true, Ordering::SeqCst);
        }
    }

    async fn handle_framed_write(&self, raw: &[u8]) {
        if raw.is_empty() {
            return;
        }
        let body = &raw[1..];
        let completed = {
            let mut reassembler = self.reassembler.lock().await;
            reassembler.push_bytes(body)
        };

        for result in completed {
            match result {
                Ok(payload) => self.process_payload(&payload).await,
                Err(err) => debug!(?err, "fake peer: dropping malformed frame"),
            }
        }
    }

    async fn process_payload(&self, payload: &[u8]) {
        if payload.len() < 2 {
            return;
        }
        let prefix = [payload[0], payload[1]];

        if prefix == PREFIX_PROTO_ASYNC {
            // A `sendRequest` from the host. Acknowledge it regardless, but
            // only answer once per counter: a real device considers the
            // request consumed and advances its own counter, so a repeat of
            // the same counter (the host reusing one instead of advancing)
            // looks like a retransmit of an already-handled request and
            // gets no fresh response.
            if payload.len() < 4 {
                return;
            }
            let counter = [payload[2], payload[3]];
            self.send_ack(prefix).await;

            let already_consumed = {
                let mut last = self.last_consumed_counter.lock().expect("peer state mutex poisoned");
                let repeat = *last == Some(counter);
                *last = Some(counter);
                repeat
            };
            if already_consumed {
                debug!(?counter, "fake peer: counter already consumed, dropping retransmit");
                return;
            }

            self.send_response(counter).await;
            return;
        }

        trace!(?prefix, "fake peer: ignoring unrecognised/unhandled frame");
    }

    async fn send_ack(&self, prefix: [u8; 2]) {
        let mut ack = Vec::with_capacity(2 + 2 + ACK_TAIL.len());
        ack.extend_from_slice(&PREFIX_ACK);
        ack.extend_from_slice(&prefix);
        ack.extend_from_slice(&ACK_TAIL);
        self.notify(&ack).await;
    }

    async fn send_response(&self, counter: [u8; 2]) {
        let Some(body) = self.responses.lock().await.pop_front() else {
            debug!("fake peer: no scripted response queued for this request, dropping");
            return;
        };

        let len = (body.len() as u16).to_le_bytes();
        let mut payload = Vec::with_capacity(16 + body.len());
        payload.extend_from_slice(&PREFIX_PROTO_RESPONSE);
        payload.extend_from_slice(&counter);
        payload.extend_from_slice(&len);
        payload.extend_from_slice(&len);
        payload.extend_from_slice(&[0u8; 8]);
        payload.extend_from_slice(&body);

        self.notify(&payload).await;
    }
}

#[async_trait]
impl GattTransport for FakeR10Peer {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn discover(&self) -> Result<GattMap> {
        let mut map = GattMap::default();
        map.insert(*uuids::DEVICE_INTERFACE_SERVICE, *uuids::DEVICE_INTERFACE_NOTIFIER_CHAR, "sim/notifier".into());
        map.insert(*uuids::DEVICE_INTERFACE_SERVICE, *uuids::DEVICE_INTERFACE_WRITER_CHAR, "sim/writer".into());
        map.insert(*uuids::BATTERY_SERVICE, *uuids::BATTERY_LEVEL_CHAR, "sim/battery".into());
        map.insert(*uuids::MEASUREMENT_SERVICE, *uuids::MEASUREMENT_CHAR, "sim/measurement".into());
        map.insert(*uuids::MEASUREMENT_SERVICE, *uuids::CONTROL_POINT_CHAR, "sim/control".into());
        map.insert(*uuids::MEASUREMENT_SERVICE, *uuids::STATUS_CHAR, "sim/status".into());
        map.insert(*uuids::DEVICE_INFO_SERVICE, *uuids::SERIAL_NUMBER_CHAR, "sim/serial".into());
        map.insert(*uuids::DEVICE_INFO_SERVICE, *uuids::MODEL_NUMBER_CHAR, "sim/model".into());
        map.insert(*uuids::DEVICE_INFO_SERVICE, *uuids::FIRMWARE_REV_CHAR, "sim/firmware".into());
        Ok(map)
    }

    async fn register_pairing_agent(&self) -> Result<()> {
        Ok(())
    }

    async fn enable_protected_notifier(&self, _characteristic: &GattPath, sink: mpsc::Sender<Vec<u8>>) -> Result<()> {
        *self.notify_sink.lock().await = Some(sink);
        Ok(())
    }

    async fn enable_plain_notifier(&self, _characteristic: &GattPath, sink: mpsc::Sender<Vec<u8>>) -> Result<()> {
        *self.notify_sink.lock().await = Some(sink);
        Ok(())
    }

    async fn write_without_response(&self, _characteristic: &GattPath, value: &[u8]) -> Result<()> {
        if !self.handshake_done.load(Ordering::SeqCst) {
            self.handle_handshake_write(value).await;
            return Ok(());
        }
        self.handle_framed_write(value).await;
        Ok(())
    }

    async fn read_value(&self, characteristic: &GattPath) -> Result<Vec<u8>> {
        let canned = match characteristic.as_str() {
            "sim/serial" => "SIM-0001",
            "sim/model" => "R10",
            "sim/firmware" => "0.0.0-sim",
            _ => "",
        };
        Ok(canned.as_bytes().to_vec())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }
}
