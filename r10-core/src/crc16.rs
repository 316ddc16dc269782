//! CRC16 codec (spec.md §4.2) — CRC-16/XMODEM over `[length, payload]`.
//!
//! Same table-driven algorithm and crate (`crc`) the pack's
//! `sam-ruff-walkie-textie-firmware` uses for its own binary frames.

use crate::error::Error;
use crc::{Crc, CRC_16_XMODEM};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Compute the CRC16 over `bytes`.
pub fn compute(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes)
}

/// Append the little-endian CRC16 of `bytes` to a copy of `bytes`.
pub fn append_checksum(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 2);
    out.extend_from_slice(bytes);
    out.extend_from_slice(&compute(bytes).to_le_bytes());
    out
}

/// Verify the trailing little-endian CRC16 and strip it off, returning the
/// original payload. Errors with [`Error::ChecksumMismatch`] on mismatch or
/// if `bytes` is too short to contain a trailer.
pub fn verify_and_strip(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    if bytes.len() < 2 {
        return Err(Error::ChecksumMismatch);
    }
    let (body, trailer) = bytes.split_at(bytes.len() - 2);
    let received = u16::from_le_bytes([trailer[0], trailer[1]]);
    if compute(body) != received {
        return Err(Error::ChecksumMismatch);
    }
    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let payload = b"r10-bridge-handshake".to_vec();
        let framed = append_checksum(&payload);
        assert_eq!(verify_and_strip(&framed).unwrap(), payload);
    }

    #[test]
    fn bit_flip_is_detected() {
        let payload = b"the quick brown fox".to_vec();
        let mut framed = append_checksum(&payload);
        framed[3] ^= 0x01;
        assert!(matches!(verify_and_strip(&framed), Err(Error::ChecksumMismatch)));
    }

    #[test]
    fn too_short_is_a_mismatch_not_a_panic() {
        assert!(matches!(verify_and_strip(&[0x01]), Err(Error::ChecksumMismatch)));
        assert!(matches!(verify_and_strip(&[]), Err(Error::ChecksumMismatch)));
    }
}
