//! Receiver-side frame validation
//!
//! [`FrameValidator::validate`] classifies one raw frame, updates the
//! [`ReceiverSession`] counters and reports anomalies as warnings. Nothing
//! here is fatal: lost, corrupted and truncated frames are counted and the
//! caller moves on to the next frame.

use tracing::{debug, warn};

use crate::checksum::checksum;
use crate::net::MacAddr;
use crate::protocol::{
    ChecksumOrder, ETH_ALEN, ETH_HLEN, ETHERTYPE_ETHERP, FrameError, WIRE_HEADER_LEN, WireHeader,
};
use crate::sequence::{SequenceEvent, SequenceTracker};

/// Why a frame was dropped without touching any counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Shorter than an Ethernet header
    TooShort(usize),
    /// Not tagged with our ethertype
    ForeignEthertype(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptedFrame {
    pub source: MacAddr,
    pub id: u32,
    pub len: usize,
    /// `None` when verification is disabled
    pub checksum_ok: Option<bool>,
    pub sequence: SequenceEvent,
    pub stop: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Ignored(IgnoreReason),
    Malformed(FrameError),
    Accepted(AcceptedFrame),
}

impl ValidationOutcome {
    /// True when the frame ends the session
    pub fn is_stop(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted(frame) if frame.stop)
    }
}

/// Counters for one receiving session
#[derive(Debug, Default)]
pub struct ReceiverSession {
    pub tracker: SequenceTracker,
    pub frames: u64,
    pub bytes: u64,
    pub errors: u64,
    pub checksum_errors: u64,
    pub truncated: u64,
    /// A frame with the stop flag has been processed
    pub completed: bool,
}

impl ReceiverSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lost(&self) -> u64 {
        self.tracker.lost()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FrameValidator {
    pub order: ChecksumOrder,
    pub verify_checksum: bool,
}

impl Default for FrameValidator {
    fn default() -> Self {
        Self {
            order: ChecksumOrder::Network,
            verify_checksum: true,
        }
    }
}

impl FrameValidator {
    pub fn new(order: ChecksumOrder, verify_checksum: bool) -> Self {
        Self {
            order,
            verify_checksum,
        }
    }

    pub fn validate(&self, raw: &[u8], session: &mut ReceiverSession) -> ValidationOutcome {
        if raw.len() < ETH_HLEN {
            return ValidationOutcome::Ignored(IgnoreReason::TooShort(raw.len()));
        }

        let ethertype = u16::from_be_bytes([raw[2 * ETH_ALEN], raw[2 * ETH_ALEN + 1]]);
        if ethertype != ETHERTYPE_ETHERP {
            return ValidationOutcome::Ignored(IgnoreReason::ForeignEthertype(ethertype));
        }

        let mut source = [0u8; ETH_ALEN];
        source.copy_from_slice(&raw[ETH_ALEN..2 * ETH_ALEN]);
        let source = MacAddr(source);

        let header = match WireHeader::decode_with(&raw[ETH_HLEN..], self.order) {
            Ok(header) => header,
            Err(e) => {
                warn!(
                    "Frame of {} bytes from {} dropped (last received ID was {}): {}",
                    raw.len(),
                    source,
                    display_last_id(session.tracker.last_id()),
                    e
                );
                session.errors += 1;
                session.truncated += 1;
                return ValidationOutcome::Malformed(e);
            }
        };

        debug!("Received frame from {} ID={}", source, header.id);

        let checksum_ok = if self.verify_checksum {
            let computed = checksum(&raw[ETH_HLEN + WIRE_HEADER_LEN..]);
            let ok = computed == header.checksum;
            if !ok {
                warn!(
                    "Received frame with wrong CRC (ID={}, expected {:#010x}, computed {:#010x})",
                    header.id, header.checksum, computed
                );
                session.errors += 1;
                session.checksum_errors += 1;
            }
            Some(ok)
        } else {
            None
        };

        let sequence = session.tracker.observe(header.id);
        match sequence {
            SequenceEvent::Gap(gap) => {
                warn!(
                    "{} missing frame(s): {} (ID={} but last received ID was {})",
                    gap.lost,
                    gap,
                    header.id,
                    gap.first.wrapping_sub(1)
                );
                session.errors += u64::from(gap.lost);
            }
            SequenceEvent::Backward { last } => {
                warn!(
                    "Out of sequence frame (ID={} but last received ID was {})",
                    header.id, last
                );
                session.errors += 1;
            }
            SequenceEvent::First | SequenceEvent::InOrder => {}
        }

        session.frames += 1;
        session.bytes += raw.len() as u64;

        if header.stop {
            debug!("Stop frame received (ID={})", header.id);
            session.completed = true;
        }

        ValidationOutcome::Accepted(AcceptedFrame {
            source,
            id: header.id,
            len: raw.len(),
            checksum_ok,
            sequence,
            stop: header.stop,
        })
    }
}

fn display_last_id(last: Option<u32>) -> String {
    last.map(|id| id.to_string())
        .unwrap_or_else(|| "none".to_string())
}
