//! Device Session / protocol engine (spec.md §4.5).
//!
//! Three cooperating workers — writer, reader, processor — communicate over
//! bounded `tokio::mpsc` channels, the shape spec.md §9 calls out directly
//! ("queues + signals -> bounded channels... capacity should be small
//! (<=64)"). Each worker owns one concern end to end, the way
//! `uwb_hub.rs`'s UDP listener task or `auto_director.rs`'s interval
//! broadcaster do.

use crate::error::{Error, Result};
use crate::frame::{self, FrameReassembler};
use crate::transport::{GattMap, GattPath, GattTransport};
use crate::uuids;
use prost::Message;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

const QUEUE_CAPACITY: usize = 64;
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_MAX_ATTEMPTS: u32 = 3;

const HANDSHAKE_HOST_FIRST: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0];
const HANDSHAKE_HOST_FINAL: [u8; 1] = [0x00];
const HANDSHAKE_DEVICE_REPLY_LEN: usize = 16;
const HANDSHAKE_HEADER_BYTE_OFFSET: usize = 12;

const PREFIX_DEVICE_INFO: [u8; 2] = [0xA0, 0x13];
const PREFIX_CONFIG: [u8; 2] = [0xBA, 0x13];
const PREFIX_PROTO_RESPONSE: [u8; 2] = [0xB4, 0x13];
const PREFIX_PROTO_ASYNC: [u8; 2] = [0xB3, 0x13];
const PREFIX_ACK: [u8; 2] = [0x88, 0x13];
const ACK_TAIL: [u8; 8] = [0; 8];

/// Counter and outstanding-response slot. Kept in a plain (non-async) mutex
/// so critical sections are always short and never held across an `.await` —
/// the oneshot `pending` sender is handed out and later taken under this
/// lock, but fulfilling it happens after the lock is released.
struct RequestState {
    counter: u32,
    pending_counter: u32,
    pending: Option<oneshot::Sender<Vec<u8>>>,
}

/// A live device session: owns the worker tasks, the request/response
/// state machine, and the deduplicated alert stream. Dropping a `Session`
/// does not stop its workers; call [`Session::shutdown`] explicitly (the
/// reconnect loop in `device.rs` does this on disconnect).
pub struct Session<T: GattTransport> {
    transport: Arc<T>,
    gatt: GattMap,
    header_byte: AtomicU8,
    cancel: CancellationToken,
    write_tx: mpsc::Sender<Vec<u8>>,
    notify_tx: mpsc::Sender<Vec<u8>>,
    handshake_ready: Notify,
    handshake_done: AtomicBool,
    /// Serialises `send_request` callers end to end (spec.md: "only one
    /// sendRequest is in flight at a time"). Distinct from `state` so the
    /// processor task can fulfil a pending response without waiting on a
    /// caller that is itself blocked inside the response wait.
    call_lock: AsyncMutex<()>,
    state: std::sync::Mutex<RequestState>,
    alerts_tx: mpsc::Sender<r10_proto::AlertNotification>,
    processed_shot_ids: AsyncMutex<HashSet<u32>>,
}

impl<T: GattTransport + 'static> Session<T> {
    /// Runs `setupSession`'s ordering-sensitive first two steps (protected
    /// notifier, then plain notifiers), spins up the worker tasks, and
    /// performs the handshake. Returns the session plus a receiver of
    /// deduplicated alert notifications for the device layer to dispatch.
    pub async fn start(
        transport: Arc<T>,
        gatt: GattMap,
    ) -> Result<(Arc<Self>, mpsc::Receiver<r10_proto::AlertNotification>)> {
        let (session, alerts_rx) = Self::connect_and_spawn(transport, gatt).await?;
        session.perform_handshake().await?;
        Ok((session, alerts_rx))
    }

    /// `setupSession` steps 1-2 (protected notifier, then plain notifiers)
    /// plus worker spawning, stopping short of the handshake. Split out so
    /// tests can deliver the scripted handshake reply concurrently with the
    /// handshake wait rather than racing `start`'s single future.
    async fn connect_and_spawn(
        transport: Arc<T>,
        gatt: GattMap,
    ) -> Result<(Arc<Self>, mpsc::Receiver<r10_proto::AlertNotification>)> {
        let (write_tx, write_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (notify_tx, notify_rx) = mpsc::channel::<Vec<u8>>(QUEUE_CAPACITY);
        let (frame_tx, frame_rx) = mpsc::channel::<Vec<u8>>(QUEUE_CAPACITY);
        let (alerts_tx, alerts_rx) = mpsc::channel(QUEUE_CAPACITY);
        let cancel = CancellationToken::new();

        transport
            .enable_protected_notifier(
                gatt.path(&uuids::DEVICE_INTERFACE_SERVICE, &uuids::DEVICE_INTERFACE_NOTIFIER_CHAR)?,
                notify_tx.clone(),
            )
            .await?;

        for (service, characteristic) in [
            (&*uuids::BATTERY_SERVICE, &*uuids::BATTERY_LEVEL_CHAR),
            (&*uuids::MEASUREMENT_SERVICE, &*uuids::MEASUREMENT_CHAR),
            (&*uuids::MEASUREMENT_SERVICE, &*uuids::CONTROL_POINT_CHAR),
            (&*uuids::MEASUREMENT_SERVICE, &*uuids::STATUS_CHAR),
        ] {
            transport
                .enable_plain_notifier(gatt.path(service, characteristic)?, notify_tx.clone())
                .await?;
        }

        let session = Arc::new(Self {
            transport,
            gatt,
            header_byte: AtomicU8::new(0x00),
            cancel,
            write_tx,
            notify_tx,
            handshake_ready: Notify::new(),
            handshake_done: AtomicBool::new(false),
            call_lock: AsyncMutex::new(()),
            state: std::sync::Mutex::new(RequestState { counter: 0, pending_counter: 0, pending: None }),
            alerts_tx,
            processed_shot_ids: AsyncMutex::new(HashSet::new()),
        });

        session.clone().spawn_writer(write_rx);
        session.clone().spawn_reader(notify_rx, frame_tx);
        session.clone().spawn_processor(frame_rx);

        Ok((session, alerts_rx))
    }

    fn writer_char(&self) -> &GattPath {
        self.gatt
            .path(&uuids::DEVICE_INTERFACE_SERVICE, &uuids::DEVICE_INTERFACE_WRITER_CHAR)
            .expect("writer characteristic resolved during discovery")
    }

    /// Feed one raw BLE notification (header byte not yet stripped) into
    /// the session. Called by the transport's notification-delivery path,
    /// or directly by test doubles / `r10-sim`'s `FakeR10Peer`.
    pub async fn deliver_notification(&self, raw: Vec<u8>) {
        if self.handshake_done.load(Ordering::SeqCst) {
            let _ = self.notify_tx.send(raw).await;
        } else {
            self.deliver_handshake_reply(raw);
        }
    }

    fn deliver_handshake_reply(&self, raw: Vec<u8>) {
        if raw.len() < HANDSHAKE_DEVICE_REPLY_LEN {
            warn!(len = raw.len(), "handshake reply shorter than expected, ignoring");
            return;
        }
        let header = raw[HANDSHAKE_HEADER_BYTE_OFFSET];
        self.header_byte.store(header, Ordering::SeqCst);
        self.handshake_done.store(true, Ordering::SeqCst);
        self.handshake_ready.notify_waiters();
    }

    pub async fn perform_handshake(&self) -> Result<()> {
        self.transport.write_without_response(self.writer_char(), &HANDSHAKE_HOST_FIRST).await?;

        tokio::time::timeout(HANDSHAKE_TIMEOUT, self.handshake_ready.notified())
            .await
            .map_err(|_| Error::HandshakeTimeout)?;

        if !self.handshake_done.load(Ordering::SeqCst) {
            return Err(Error::HandshakeTimeout);
        }

        self.transport.write_without_response(self.writer_char(), &HANDSHAKE_HOST_FINAL).await?;
        info!(header_byte = self.header_byte.load(Ordering::SeqCst), "handshake complete");
        Ok(())
    }

    fn spawn_writer(self: Arc<Self>, mut write_rx: mpsc::Receiver<Vec<u8>>) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    chunk = write_rx.recv() => {
                        match chunk {
                            Some(bytes) => {
                                if let Err(err) = self.transport.write_without_response(self.writer_char(), &bytes).await {
                                    warn!(?err, "GATT write failed");
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
        });
    }

    fn spawn_reader(self: Arc<Self>, mut notify_rx: mpsc::Receiver<Vec<u8>>, frame_tx: mpsc::Sender<Vec<u8>>) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let mut reassembler = FrameReassembler::new();
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(5)) => continue,
                    notification = notify_rx.recv() => {
                        match notification {
                            Some(raw) => {
                                if !self.handshake_done.load(Ordering::SeqCst) {
                                    self.deliver_handshake_reply(raw);
                                    continue;
                                }
                                // The header byte is the first byte of every
                                // post-handshake notification; strip it
                                // before reassembly (spec.md §4.5).
                                let body: &[u8] = if raw.is_empty() { &raw } else { &raw[1..] };
                                for result in reassembler.push_bytes(body) {
                                    match result {
                                        Ok(payload) => {
                                            if frame_tx.send(payload).await.is_err() {
                                                return;
                                            }
                                        }
                                        Err(err) => {
                                            debug!(?err, "dropping malformed frame, reassembler ready for next");
                                        }
                                    }
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
        });
    }

    fn spawn_processor(self: Arc<Self>, mut frame_rx: mpsc::Receiver<Vec<u8>>) {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(5)) => continue,
                    frame = frame_rx.recv() => {
                        match frame {
                            Some(payload) => self.process_frame(payload).await,
                            None => break,
                        }
                    }
                }
            }
        });
    }

    async fn process_frame(&self, payload: Vec<u8>) {
        if payload.len() < 2 {
            debug!("frame shorter than classifier prefix, dropping");
            return;
        }
        let prefix = [payload[0], payload[1]];

        if prefix == PREFIX_DEVICE_INFO || prefix == PREFIX_CONFIG {
            self.send_ack(prefix).await;
            return;
        }

        if prefix == PREFIX_PROTO_RESPONSE {
            self.handle_response(&payload);
            self.send_ack(prefix).await;
            return;
        }

        if prefix == PREFIX_PROTO_ASYNC {
            self.handle_alert(&payload).await;
            self.send_ack(prefix).await;
            return;
        }

        trace!(?prefix, "unrecognised frame prefix, ignoring");
    }

    fn handle_response(&self, payload: &[u8]) {
        if payload.len() < 16 {
            debug!("B413 frame too short to carry counter + body, dropping");
            return;
        }
        let counter = u16::from_le_bytes([payload[2], payload[3]]) as u32;

        let sender = {
            let mut state = self.state.lock().expect("request state mutex poisoned");
            if state.pending.is_none() || counter != state.pending_counter {
                trace!(counter, pending = state.pending_counter, "stale response, dropping");
                None
            } else {
                state.pending.take()
            }
        };

        if let Some(sender) = sender {
            let _ = sender.send(payload[16..].to_vec());
        }
    }

    async fn handle_alert(&self, payload: &[u8]) {
        let body = if payload.len() > 2 { &payload[2..] } else { &[] };
        let notification = match r10_proto::AlertNotification::decode(body) {
            Ok(n) => n,
            Err(err) => {
                debug!(?err, "failed to decode AlertNotification, dropping");
                return;
            }
        };

        if let Some(metrics) = &notification.metrics {
            let mut seen = self.processed_shot_ids.lock().await;
            if !seen.insert(metrics.shot_id) {
                debug!(shot_id = metrics.shot_id, "duplicate shot id, suppressing");
                return;
            }
        }

        let _ = self.alerts_tx.send(notification).await;
    }

    async fn send_ack(&self, prefix: [u8; 2]) {
        let mut ack = Vec::with_capacity(2 + 2 + ACK_TAIL.len());
        ack.extend_from_slice(&PREFIX_ACK);
        ack.extend_from_slice(&prefix);
        ack.extend_from_slice(&ACK_TAIL);
        self.enqueue_write(&ack).await;
    }

    async fn enqueue_write(&self, payload: &[u8]) {
        let header = self.header_byte.load(Ordering::SeqCst);
        for chunk in frame::build_outbound(payload, header) {
            if self.write_tx.send(chunk).await.is_err() {
                warn!("write queue closed, dropping chunk");
                return;
            }
        }
    }

    /// Serialised request/response exchange (spec.md §4.5). Builds a
    /// `B313`-prefixed frame carrying the current counter and two copies of
    /// the protobuf length, retries up to 3 times on a 5s-per-attempt
    /// timeout. The counter is never reused: a timeout advances it so a
    /// late reply for the abandoned attempt is classified stale, and a
    /// successful response advances it too, since the device consumes the
    /// counter it was sent on and expects the next request to carry a
    /// fresh one.
    pub async fn send_request(&self, body: Vec<u8>) -> Result<Vec<u8>> {
        let _serialized = self.call_lock.lock().await;

        for attempt in 0..REQUEST_MAX_ATTEMPTS {
            let (tx, rx) = oneshot::channel();
            let counter = {
                let mut state = self.state.lock().expect("request state mutex poisoned");
                state.pending = Some(tx);
                state.pending_counter = state.counter;
                state.counter
            };

            self.enqueue_write(&build_request_frame(counter, &body)).await;

            if let Ok(Ok(response)) = tokio::time::timeout(REQUEST_ATTEMPT_TIMEOUT, rx).await {
                let mut state = self.state.lock().expect("request state mutex poisoned");
                state.counter = state.counter.wrapping_add(1);
                return Ok(response);
            }

            let mut state = self.state.lock().expect("request state mutex poisoned");
            state.pending = None;
            state.counter = state.counter.wrapping_add(1);
            debug!(attempt, counter, "request attempt timed out, advancing counter");
        }

        Err(Error::RequestTimeout)
    }

    /// Plain one-shot read of a characteristic's current value, bypassing
    /// the counter/frame protocol entirely (spec.md §4.6 step 3: device-info
    /// strings are read this way, not via `sendRequest`).
    pub async fn read_characteristic(&self, service: &uuid::Uuid, characteristic: &uuid::Uuid) -> Result<Vec<u8>> {
        let path = self.gatt.path(service, characteristic)?;
        self.transport.read_value(path).await
    }

    pub async fn shutdown(&self) {
        self.cancel.cancel();
    }
}

fn build_request_frame(counter: u32, body: &[u8]) -> Vec<u8> {
    let len = body.len() as u16;
    let mut frame = Vec::with_capacity(2 + 2 + 2 + 2 + 8 + body.len());
    frame.extend_from_slice(&PREFIX_PROTO_ASYNC);
    frame.extend_from_slice(&(counter as u16).to_le_bytes());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&[0u8; 8]);
    frame.extend_from_slice(body);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::GattMap;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Mutex as TestMutex;

    /// In-memory transport double: records writes, lets tests script the
    /// device's notification replies, and toggles `NotifyAuthRequired` to
    /// exercise the protected-notifier-first ordering guard.
    struct MockTransport {
        writes: TestMutex<Vec<Vec<u8>>>,
        protected_first_violation: AtomicBool,
        any_op_issued: AtomicUsize,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                writes: TestMutex::new(Vec::new()),
                protected_first_violation: AtomicBool::new(false),
                any_op_issued: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl GattTransport for MockTransport {
        async fn connect(&self) -> Result<()> {
            Ok(())
        }
        async fn discover(&self) -> Result<GattMap> {
            Ok(GattMap::default())
        }
        async fn register_pairing_agent(&self) -> Result<()> {
            Ok(())
        }
        async fn enable_protected_notifier(&self, _characteristic: &GattPath, _sink: mpsc::Sender<Vec<u8>>) -> Result<()> {
            if self.any_op_issued.fetch_add(1, Ordering::SeqCst) != 0 {
                self.protected_first_violation.store(true, Ordering::SeqCst);
                return Err(Error::NotifyAuthRequired);
            }
            Ok(())
        }
        async fn enable_plain_notifier(&self, _characteristic: &GattPath, _sink: mpsc::Sender<Vec<u8>>) -> Result<()> {
            self.any_op_issued.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn write_without_response(&self, _characteristic: &GattPath, value: &[u8]) -> Result<()> {
            self.writes.lock().await.push(value.to_vec());
            Ok(())
        }
        async fn read_value(&self, characteristic: &GattPath) -> Result<Vec<u8>> {
            Ok(characteristic.as_bytes().to_vec())
        }
        async fn disconnect(&self) -> Result<()> {
            Ok(())
        }
    }

    fn full_gatt_map() -> GattMap {
        let mut map = GattMap::default();
        map.insert(*uuids::DEVICE_INTERFACE_SERVICE, *uuids::DEVICE_INTERFACE_NOTIFIER_CHAR, "notifier".into());
        map.insert(*uuids::DEVICE_INTERFACE_SERVICE, *uuids::DEVICE_INTERFACE_WRITER_CHAR, "writer".into());
        map.insert(*uuids::BATTERY_SERVICE, *uuids::BATTERY_LEVEL_CHAR, "battery".into());
        map.insert(*uuids::MEASUREMENT_SERVICE, *uuids::MEASUREMENT_CHAR, "measurement".into());
        map.insert(*uuids::MEASUREMENT_SERVICE, *uuids::CONTROL_POINT_CHAR, "control".into());
        map.insert(*uuids::MEASUREMENT_SERVICE, *uuids::STATUS_CHAR, "status".into());
        map.insert(*uuids::DEVICE_INFO_SERVICE, *uuids::SERIAL_NUMBER_CHAR, "serial".into());
        map
    }

    #[tokio::test]
    async fn handshake_adopts_device_header_byte() {
        // spec.md §8, testable property 4.
        let transport = Arc::new(MockTransport::new());
        let (session, _alerts) = Session::connect_and_spawn(transport.clone(), full_gatt_map())
            .await
            .expect("workers spawn without a handshake");

        let handshake = tokio::spawn({
            let session = session.clone();
            async move { session.perform_handshake().await }
        });

        // Wait for the handshake's first write to land before scripting the
        // device's reply.
        for _ in 0..100 {
            if !transport.writes.lock().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        let reply = vec![0x01, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0x7E, 0, 0, 0];
        session.deliver_notification(reply).await;

        handshake.await.expect("task join").expect("handshake completes");
        assert_eq!(session.header_byte.load(Ordering::SeqCst), 0x7E);

        let writes = transport.writes.lock().await;
        assert_eq!(writes[0], HANDSHAKE_HOST_FIRST.to_vec());
        assert_eq!(writes[1], HANDSHAKE_HOST_FINAL.to_vec());
    }

    #[test]
    fn request_frame_carries_counter_and_duplicated_length() {
        let frame = build_request_frame(7, &[0xAA, 0xBB, 0xCC]);
        assert_eq!(&frame[0..2], &PREFIX_PROTO_ASYNC);
        assert_eq!(u16::from_le_bytes([frame[2], frame[3]]), 7);
        assert_eq!(u16::from_le_bytes([frame[4], frame[5]]), 3);
        assert_eq!(u16::from_le_bytes([frame[6], frame[7]]), 3);
        assert_eq!(&frame[16..], &[0xAA, 0xBB, 0xCC]);
    }

    #[tokio::test(start_paused = true)]
    async fn request_timeout_advances_counter_and_drops_stale_reply() {
        // spec.md §8, testable property 5 / scenario S4.
        let transport = Arc::new(MockTransport::new());
        let (session, _alerts) = Session::connect_and_spawn(transport.clone(), full_gatt_map())
            .await
            .expect("workers spawn without a handshake");
        session.handshake_done.store(true, Ordering::SeqCst);
        session.header_byte.store(0x7E, Ordering::SeqCst);

        let call = tokio::spawn({
            let session = session.clone();
            async move { session.send_request(vec![1, 2, 3]).await }
        });

        // Attempts #0 and #1 (counters 0 and 1) both time out unanswered.
        for _ in 0..2 {
            tokio::task::yield_now().await;
            tokio::time::advance(REQUEST_ATTEMPT_TIMEOUT + Duration::from_millis(1)).await;
        }

        // Wait for attempt #2 (counter 2) to be outstanding before replying.
        for _ in 0..1000 {
            let ready = {
                let state = session.state.lock().unwrap();
                state.pending_counter == 2 && state.pending.is_some()
            };
            if ready {
                break;
            }
            tokio::task::yield_now().await;
        }

        // A late reply for the already-abandoned counter 0 must be dropped.
        let mut stale = vec![0xB4, 0x13];
        stale.extend_from_slice(&0u16.to_le_bytes());
        stale.extend_from_slice(&[0u8; 12]);
        stale.extend_from_slice(&[0xDE, 0xAD]);
        session.handle_response(&stale);

        // Attempt #2 (counter 2) gets a matching reply.
        let mut good = vec![0xB4, 0x13];
        good.extend_from_slice(&2u16.to_le_bytes());
        good.extend_from_slice(&[0u8; 12]);
        good.extend_from_slice(&[9, 9, 9]);
        session.handle_response(&good);

        let result = call.await.expect("task join");
        assert_eq!(result.expect("third attempt succeeds"), vec![9, 9, 9]);
    }

    #[tokio::test]
    async fn duplicate_shot_ids_are_suppressed() {
        // spec.md §8, testable property 6.
        let transport = Arc::new(MockTransport::new());
        let (session, mut alerts) = Session::connect_and_spawn(transport, full_gatt_map())
            .await
            .expect("workers spawn without a handshake");

        let notification = r10_proto::AlertNotification {
            state: None,
            error: None,
            metrics: Some(r10_proto::ShotMetrics { shot_id: 42, ..Default::default() }),
            tilt_calibration: None,
        };
        let mut body = Vec::new();
        notification.encode(&mut body).expect("proto encodes");
        let mut frame = vec![0xB3, 0x13];
        frame.extend_from_slice(&body);

        session.handle_alert(&frame).await;
        session.handle_alert(&frame).await;

        let mut received = 0;
        while alerts.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 1);
    }

    #[tokio::test]
    async fn read_characteristic_performs_a_plain_read() {
        // spec.md §4.6 startup step 3: device-info reads bypass the
        // counter/frame protocol entirely.
        let transport = Arc::new(MockTransport::new());
        let (session, _alerts) = Session::connect_and_spawn(transport, full_gatt_map())
            .await
            .expect("workers spawn without a handshake");

        let value = session
            .read_characteristic(&uuids::DEVICE_INFO_SERVICE, &uuids::SERIAL_NUMBER_CHAR)
            .await
            .expect("characteristic resolved in gatt map");
        assert_eq!(value, b"serial");
    }

    #[tokio::test]
    async fn protected_notifier_must_be_first_gatt_operation() {
        // spec.md §8, testable property 7.
        let transport = MockTransport::new();
        let (sink, _rx) = mpsc::channel(1);
        transport.enable_plain_notifier(&"battery".to_string(), sink.clone()).await.unwrap();
        let err = transport.enable_protected_notifier(&"notifier".to_string(), sink).await.unwrap_err();
        assert!(matches!(err, Error::NotifyAuthRequired));
    }
}
