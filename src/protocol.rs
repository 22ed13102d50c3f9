//! Wire protocol definitions
//!
//! Every frame is an Ethernet II frame tagged with a private ethertype,
//! followed by a fixed 9-byte header and a variable payload:
//!
//! ```text
//! [dst: 6][src: 6][ethertype: 2][id: u32 BE][checksum: u32][stop: u8][payload...]
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ethertype reserved for this protocol (unregistered, private use)
pub const ETHERTYPE_ETHERP: u16 = 0x4242;

/// Hardware address length
pub const ETH_ALEN: usize = 6;
/// Ethernet II header length (dst + src + ethertype)
pub const ETH_HLEN: usize = 14;
/// Minimum Ethernet frame length, FCS excluded
pub const ETH_ZLEN: usize = 60;
/// Standard maximum Ethernet payload
pub const ETH_DATA_LEN: usize = 1500;
/// Frame check sequence length
pub const ETH_FCS_LEN: usize = 4;

/// Smallest payload that still makes a valid Ethernet frame
pub const MIN_PAYLOAD_LEN: usize = ETH_ZLEN - ETH_HLEN;
/// Jumbo frame payload limit
pub const JUMBO_PAYLOAD_LEN: usize = 9000;
/// Largest frame we ever build or expect to receive
pub const MAX_FRAME_LEN: usize = ETH_HLEN + JUMBO_PAYLOAD_LEN + ETH_FCS_LEN;

/// Encoded size of [`WireHeader`]
pub const WIRE_HEADER_LEN: usize = 9;

/// Default frame size when none is configured
pub const DEFAULT_FRAME_SIZE: usize = ETH_DATA_LEN;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("truncated header: expected at least {expected} bytes, got {actual}")]
    TruncatedHeader { expected: usize, actual: usize },
}

/// How the checksum field is laid out on the wire.
///
/// Both ends must agree. `Little` exists to talk to peers that wrote the
/// CRC in host order on little-endian machines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumOrder {
    #[default]
    Network,
    Little,
}

impl ChecksumOrder {
    fn put(self, value: u32) -> [u8; 4] {
        match self {
            ChecksumOrder::Network => value.to_be_bytes(),
            ChecksumOrder::Little => value.to_le_bytes(),
        }
    }

    fn get(self, bytes: [u8; 4]) -> u32 {
        match self {
            ChecksumOrder::Network => u32::from_be_bytes(bytes),
            ChecksumOrder::Little => u32::from_le_bytes(bytes),
        }
    }
}

impl std::str::FromStr for ChecksumOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "network" | "be" | "big" | "big-endian" => Ok(Self::Network),
            "little" | "le" | "little-endian" | "host" => Ok(Self::Little),
            _ => Err(format!(
                "invalid checksum order '{}', expected 'network' or 'little'",
                s
            )),
        }
    }
}

impl std::fmt::Display for ChecksumOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumOrder::Network => write!(f, "network"),
            ChecksumOrder::Little => write!(f, "little"),
        }
    }
}

/// Fixed protocol header carried right after the Ethernet header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireHeader {
    pub id: u32,
    pub checksum: u32,
    pub stop: bool,
}

impl WireHeader {
    /// Encode with the checksum in network byte order
    pub fn encode(&self) -> [u8; WIRE_HEADER_LEN] {
        self.encode_with(ChecksumOrder::Network)
    }

    pub fn encode_with(&self, order: ChecksumOrder) -> [u8; WIRE_HEADER_LEN] {
        let mut buffer = [0u8; WIRE_HEADER_LEN];
        self.write(&mut buffer, order);
        buffer
    }

    /// Write into the first [`WIRE_HEADER_LEN`] bytes of `buffer`.
    ///
    /// Panics if `buffer` is shorter than the header.
    pub fn write(&self, buffer: &mut [u8], order: ChecksumOrder) {
        buffer[0..4].copy_from_slice(&self.id.to_be_bytes());
        buffer[4..8].copy_from_slice(&order.put(self.checksum));
        buffer[8] = u8::from(self.stop);
    }

    pub fn decode(buffer: &[u8]) -> Result<Self, FrameError> {
        Self::decode_with(buffer, ChecksumOrder::Network)
    }

    /// Decode a header. Only the length is checked here; any non-zero stop
    /// byte is read as set.
    pub fn decode_with(buffer: &[u8], order: ChecksumOrder) -> Result<Self, FrameError> {
        if buffer.len() < WIRE_HEADER_LEN {
            return Err(FrameError::TruncatedHeader {
                expected: WIRE_HEADER_LEN,
                actual: buffer.len(),
            });
        }
        let id = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]);
        let checksum = order.get([buffer[4], buffer[5], buffer[6], buffer[7]]);
        Ok(Self {
            id,
            checksum,
            stop: buffer[8] != 0,
        })
    }
}

/// Check a frame size (Ethernet payload length) against link limits
pub fn frame_size_in_range(size: usize) -> bool {
    (MIN_PAYLOAD_LEN..=JUMBO_PAYLOAD_LEN).contains(&size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = WireHeader {
            id: 0x01020304,
            checksum: 0xAABBCCDD,
            stop: true,
        };
        assert_eq!(
            header.encode(),
            [0x01, 0x02, 0x03, 0x04, 0xAA, 0xBB, 0xCC, 0xDD, 0x01]
        );
        assert_eq!(
            header.encode_with(ChecksumOrder::Little),
            [0x01, 0x02, 0x03, 0x04, 0xDD, 0xCC, 0xBB, 0xAA, 0x01]
        );
    }

    #[test]
    fn test_header_roundtrip_both_orders() {
        let header = WireHeader {
            id: u32::MAX,
            checksum: 0xDEADBEEF,
            stop: false,
        };
        for order in [ChecksumOrder::Network, ChecksumOrder::Little] {
            let bytes = header.encode_with(order);
            assert_eq!(WireHeader::decode_with(&bytes, order).unwrap(), header);
        }
    }

    #[test]
    fn test_mismatched_order_changes_checksum() {
        let header = WireHeader {
            id: 7,
            checksum: 0x12345678,
            stop: false,
        };
        let bytes = header.encode_with(ChecksumOrder::Little);
        let decoded = WireHeader::decode(&bytes).unwrap();
        assert_eq!(decoded.id, 7);
        assert_eq!(decoded.checksum, 0x78563412);
    }

    #[test]
    fn test_truncated_header() {
        let err = WireHeader::decode(&[0u8; 8]).unwrap_err();
        assert_eq!(
            err,
            FrameError::TruncatedHeader {
                expected: 9,
                actual: 8
            }
        );
        assert!(WireHeader::decode(&[]).is_err());
    }

    #[test]
    fn test_decode_ignores_trailing_payload() {
        let mut buffer = vec![0xFFu8; 64];
        WireHeader {
            id: 3,
            checksum: 9,
            stop: false,
        }
        .write(&mut buffer, ChecksumOrder::Network);
        let decoded = WireHeader::decode(&buffer).unwrap();
        assert_eq!(decoded.id, 3);
        assert_eq!(decoded.checksum, 9);
        assert!(!decoded.stop);
    }

    #[test]
    fn test_checksum_order_parse() {
        assert_eq!("network".parse::<ChecksumOrder>(), Ok(ChecksumOrder::Network));
        assert_eq!("LE".parse::<ChecksumOrder>(), Ok(ChecksumOrder::Little));
        assert!("middle".parse::<ChecksumOrder>().is_err());
    }

    #[test]
    fn test_frame_size_limits() {
        assert_eq!(MIN_PAYLOAD_LEN, 46);
        assert!(!frame_size_in_range(45));
        assert!(frame_size_in_range(46));
        assert!(frame_size_in_range(9000));
        assert!(!frame_size_in_range(9001));
    }
}
