//! Wire framing — length prefix, CRC16 trailer, COBS wrapping, and 19-byte
//! BLE-write chunking (spec.md §4.3).

use crate::cobs;
use crate::crc16;
use crate::error::Error;

/// Maximum payload bytes per BLE write, not counting the header byte the
/// caller prepends to each chunk.
pub const CHUNK_SIZE: usize = 19;

/// Build the outbound BLE writes for `payload`, each prefixed with the
/// session's negotiated `header` byte.
///
/// `length` (spec.md step 1) covers the 2-byte length field itself, the
/// payload, and the 2-byte CRC trailer: `2 + payload.len() + 2`.
pub fn build_outbound(payload: &[u8], header: u8) -> Vec<Vec<u8>> {
    let length = (2 + payload.len() + 2) as u16;

    let mut raw = Vec::with_capacity(2 + payload.len());
    raw.extend_from_slice(&length.to_le_bytes());
    raw.extend_from_slice(payload);

    let framed = crc16::append_checksum(&raw);
    let encoded = cobs::encode(&framed);

    let mut wrapped = Vec::with_capacity(encoded.len() + 2);
    wrapped.push(0x00);
    wrapped.extend_from_slice(&encoded);
    wrapped.push(0x00);

    wrapped
        .chunks(CHUNK_SIZE)
        .map(|chunk| {
            let mut write = Vec::with_capacity(chunk.len() + 1);
            write.push(header);
            write.extend_from_slice(chunk);
            write
        })
        .collect()
}

/// Reassembles COBS+CRC16-framed payloads from a stream of
/// already-header-stripped bytes (spec.md §4.3 inbound reassembly).
///
/// A leading `0x00` (encountered while the internal buffer is empty) clears
/// state and starts a new frame; a trailing `0x00` (encountered while the
/// buffer holds data) completes one. Decode or CRC failure discards the
/// partial frame; the reassembler is immediately ready for the next
/// sentinel, matching spec.md's "drop frame; continue" failure policy.
#[derive(Debug, Default)]
pub struct FrameReassembler {
    buf: Vec<u8>,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one post-header byte. Returns `Some` exactly when an
    /// end-of-frame sentinel completes a frame — `Ok(payload)` with the
    /// length prefix and CRC trailer already stripped, or `Err` if COBS
    /// decoding or CRC verification failed.
    pub fn push_byte(&mut self, byte: u8) -> Option<Result<Vec<u8>, Error>> {
        if byte != 0x00 {
            self.buf.push(byte);
            return None;
        }

        if self.buf.is_empty() {
            // Leading sentinel: start of frame, nothing buffered yet.
            return None;
        }

        let wrapped = std::mem::take(&mut self.buf);
        Some(Self::finish_frame(&wrapped))
    }

    /// Feed a whole notification (post-header) and collect every frame
    /// completed while processing it. Normally yields 0 or 1 items; BLE
    /// notifications never straddle more than one sentinel-terminated
    /// frame in practice, but nothing prevents it structurally.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<Result<Vec<u8>, Error>> {
        bytes.iter().filter_map(|&b| self.push_byte(b)).collect()
    }

    fn finish_frame(wrapped: &[u8]) -> Result<Vec<u8>, Error> {
        let decoded = cobs::decode(wrapped)?;
        let without_crc = crc16::verify_and_strip(&decoded)?;
        if without_crc.len() < 2 {
            return Err(Error::MalformedFrame);
        }
        Ok(without_crc[2..].to_vec())
    }

    /// Discard any partial frame in progress (used on reconnect/reset).
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reassemble_all(chunks: &[Vec<u8>]) -> Vec<Result<Vec<u8>, Error>> {
        let mut reassembler = FrameReassembler::new();
        let mut out = Vec::new();
        for chunk in chunks {
            // Strip the header byte the way the reader loop does.
            out.extend(reassembler.push_bytes(&chunk[1..]));
        }
        out
    }

    #[test]
    fn chunks_are_at_most_19_bytes_and_reassemble() {
        let payload = vec![0xAB; 123];
        let chunks = build_outbound(&payload, 0x7E);
        for chunk in &chunks {
            assert!(chunk.len() <= CHUNK_SIZE + 1, "chunk too long: {}", chunk.len());
            assert_eq!(chunk[0], 0x7E);
        }

        let results = reassemble_all(&chunks);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap(), &payload);
    }

    #[test]
    fn small_payload_still_roundtrips() {
        let payload = vec![0x01, 0x02, 0x03];
        let chunks = build_outbound(&payload, 0x42);
        let results = reassemble_all(&chunks);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap(), &payload);
    }

    #[test]
    fn corrupted_frame_is_dropped_and_reader_recovers() {
        let good = vec![0x10, 0x20, 0x30];
        let chunks_good = build_outbound(&good, 0x7E);

        let bad = vec![0x99, 0x98];
        let mut chunks_bad = build_outbound(&bad, 0x7E);
        // Flip a bit inside the COBS/CRC body of the single-chunk message.
        let last = chunks_bad.len() - 1;
        let flip_at = chunks_bad[last].len() - 2;
        chunks_bad[last][flip_at] ^= 0xFF;

        let mut reassembler = FrameReassembler::new();
        let mut results = Vec::new();
        for chunk in chunks_bad.iter().chain(chunks_good.iter()) {
            results.extend(reassembler.push_bytes(&chunk[1..]));
        }

        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap(), &good);
    }
}
