//! Payload integrity checksum (CRC-32, IEEE polynomial).
//!
//! Computed over the payload region only; the wire header is never included.

/// CRC-32 of `payload`
pub fn checksum(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}
