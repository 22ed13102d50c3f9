//! Sender-side frame construction
//!
//! A [`FrameBuilder`] assembles complete Ethernet frames into a reusable
//! buffer; the [`SenderSession`] carries the identifier sequence, the size
//! policy and the running counters for one sending session.

use anyhow::ensure;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::warn;

use crate::checksum::checksum;
use crate::net::MacAddr;
use crate::protocol::{
    ChecksumOrder, ETH_ALEN, ETH_HLEN, ETHERTYPE_ETHERP, JUMBO_PAYLOAD_LEN, MIN_PAYLOAD_LEN,
    WIRE_HEADER_LEN, WireHeader, frame_size_in_range,
};

/// Advances the frame size by one byte per frame between two bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeCycler {
    min: usize,
    max: usize,
}

impl SizeCycler {
    pub fn new(min: usize, max: usize) -> anyhow::Result<Self> {
        ensure!(
            frame_size_in_range(min) && frame_size_in_range(max),
            "size bounds must be between {} and {}",
            MIN_PAYLOAD_LEN,
            JUMBO_PAYLOAD_LEN
        );
        ensure!(min <= max, "minimum size {} exceeds maximum {}", min, max);
        Ok(Self { min, max })
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn next(&self, current: usize) -> usize {
        let next = current + 1;
        if next > self.max { self.min } else { next }
    }

    /// Number of distinct sizes in one full cycle
    pub fn cycle_len(&self) -> usize {
        self.max - self.min + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizePolicy {
    Fixed(usize),
    Vary(SizeCycler),
}

impl SizePolicy {
    pub fn fixed(size: usize) -> anyhow::Result<Self> {
        ensure!(
            frame_size_in_range(size),
            "The size must be an integer between {} and {}",
            MIN_PAYLOAD_LEN,
            JUMBO_PAYLOAD_LEN
        );
        Ok(Self::Fixed(size))
    }

    pub fn initial_size(&self) -> usize {
        match self {
            SizePolicy::Fixed(size) => *size,
            SizePolicy::Vary(cycler) => cycler.min(),
        }
    }

    pub fn largest(&self) -> usize {
        match self {
            SizePolicy::Fixed(size) => *size,
            SizePolicy::Vary(cycler) => cycler.max(),
        }
    }
}

/// State of one sending session
#[derive(Debug, Clone)]
pub struct SenderSession {
    pub destination: MacAddr,
    pub next_id: u32,
    pub size: usize,
    pub policy: SizePolicy,
    pub frames: u64,
    pub bytes: u64,
    /// Set once a frame carrying `stop = 1` has been built
    pub finished: bool,
}

impl SenderSession {
    pub fn new(destination: MacAddr, policy: SizePolicy) -> Self {
        Self {
            destination,
            next_id: 0,
            size: policy.initial_size(),
            policy,
            frames: 0,
            bytes: 0,
            finished: false,
        }
    }

    /// Move to the next frame size (no-op for fixed sizes)
    pub fn advance_size(&mut self) {
        if let SizePolicy::Vary(cycler) = self.policy {
            self.size = cycler.next(self.size);
        }
    }
}

/// Builds frames into an internal buffer large enough for a jumbo frame
pub struct FrameBuilder {
    source: MacAddr,
    order: ChecksumOrder,
    rng: StdRng,
    buffer: Vec<u8>,
}

impl FrameBuilder {
    pub fn new(source: MacAddr, order: ChecksumOrder) -> Self {
        Self::with_rng(source, order, StdRng::from_os_rng())
    }

    /// Builder with a fixed payload seed, for reproducible frames
    pub fn seeded(source: MacAddr, order: ChecksumOrder, seed: u64) -> Self {
        Self::with_rng(source, order, StdRng::seed_from_u64(seed))
    }

    fn with_rng(source: MacAddr, order: ChecksumOrder, rng: StdRng) -> Self {
        Self {
            source,
            order,
            rng,
            buffer: vec![0u8; ETH_HLEN + JUMBO_PAYLOAD_LEN],
        }
    }

    /// Build the next frame of `session`.
    ///
    /// `size` is the Ethernet payload length (wire header included). Sizes
    /// outside `[MIN_PAYLOAD_LEN, JUMBO_PAYLOAD_LEN]` are clamped to the
    /// nearest bound, so check the returned length when `size` is not
    /// coming from a validated [`SizePolicy`]. With `fill_payload` unset the
    /// payload is zeroed and the checksum field is 0. The session identifier
    /// and counters advance as a side effect; sending is up to the caller.
    pub fn build_frame(
        &mut self,
        session: &mut SenderSession,
        size: usize,
        fill_payload: bool,
        is_last: bool,
    ) -> &[u8] {
        if !frame_size_in_range(size) {
            warn!(
                "Frame size {} out of range, clamped to {}..={}",
                size, MIN_PAYLOAD_LEN, JUMBO_PAYLOAD_LEN
            );
        }
        let size = size.clamp(MIN_PAYLOAD_LEN, JUMBO_PAYLOAD_LEN);
        let frame_len = ETH_HLEN + size;
        let frame = &mut self.buffer[..frame_len];

        frame[0..ETH_ALEN].copy_from_slice(&session.destination.octets());
        frame[ETH_ALEN..2 * ETH_ALEN].copy_from_slice(&self.source.octets());
        frame[2 * ETH_ALEN..ETH_HLEN].copy_from_slice(&ETHERTYPE_ETHERP.to_be_bytes());

        let (header, payload) = frame[ETH_HLEN..].split_at_mut(WIRE_HEADER_LEN);
        let crc = if fill_payload {
            self.rng.fill_bytes(payload);
            checksum(payload)
        } else {
            // Buffer is reused: clear what a filled frame left behind
            payload.fill(0);
            0
        };

        WireHeader {
            id: session.next_id,
            checksum: crc,
            stop: is_last,
        }
        .write(header, self.order);

        session.next_id = session.next_id.wrapping_add(1);
        session.frames += 1;
        session.bytes += frame_len as u64;
        if is_last {
            session.finished = true;
        }

        &self.buffer[..frame_len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dst() -> MacAddr {
        MacAddr([0x02, 0, 0, 0, 0, 0x02])
    }

    fn src() -> MacAddr {
        MacAddr([0x02, 0, 0, 0, 0, 0x01])
    }

    #[test]
    fn test_size_cycler_wraps_to_min() {
        let cycler = SizeCycler::new(46, 50).unwrap();
        let mut size = 46;
        let mut seen = vec![size];
        for _ in 0..cycler.cycle_len() {
            let next = cycler.next(size);
            if next > size {
                assert_eq!(next, size + 1);
            }
            size = next;
            seen.push(size);
        }
        assert_eq!(seen, vec![46, 47, 48, 49, 50, 46]);
        assert_eq!(cycler.cycle_len(), 5);
    }

    #[test]
    fn test_size_cycler_bounds() {
        assert!(SizeCycler::new(45, 100).is_err());
        assert!(SizeCycler::new(100, 9001).is_err());
        assert!(SizeCycler::new(200, 100).is_err());
        let single = SizeCycler::new(64, 64).unwrap();
        assert_eq!(single.next(64), 64);
    }

    #[test]
    fn test_fixed_policy_bounds() {
        assert!(SizePolicy::fixed(45).is_err());
        assert!(SizePolicy::fixed(9000).is_ok());
        assert!(SizePolicy::fixed(9001).is_err());
    }

    #[test]
    fn test_build_frame_layout() {
        let mut builder = FrameBuilder::seeded(src(), ChecksumOrder::Network, 1);
        let mut session = SenderSession::new(dst(), SizePolicy::fixed(100).unwrap());

        let frame = builder.build_frame(&mut session, 100, true, false).to_vec();
        assert_eq!(frame.len(), ETH_HLEN + 100);
        assert_eq!(&frame[0..6], &dst().octets());
        assert_eq!(&frame[6..12], &src().octets());
        assert_eq!(&frame[12..14], &[0x42, 0x42]);

        let header = WireHeader::decode(&frame[ETH_HLEN..]).unwrap();
        assert_eq!(header.id, 0);
        assert!(!header.stop);
        assert_eq!(header.checksum, checksum(&frame[ETH_HLEN + WIRE_HEADER_LEN..]));
    }

    #[test]
    fn test_build_frame_advances_session() {
        let mut builder = FrameBuilder::seeded(src(), ChecksumOrder::Network, 2);
        let mut session = SenderSession::new(dst(), SizePolicy::fixed(46).unwrap());

        for expected in 0..3u32 {
            let is_last = expected == 2;
            let frame = builder.build_frame(&mut session, 46, true, is_last);
            let header = WireHeader::decode(&frame[ETH_HLEN..]).unwrap();
            assert_eq!(header.id, expected);
            assert_eq!(header.stop, is_last);
        }
        assert_eq!(session.next_id, 3);
        assert_eq!(session.frames, 3);
        assert_eq!(session.bytes, 3 * 60);
        assert!(session.finished);
    }

    #[test]
    fn test_id_wraps() {
        let mut builder = FrameBuilder::seeded(src(), ChecksumOrder::Network, 3);
        let mut session = SenderSession::new(dst(), SizePolicy::fixed(46).unwrap());
        session.next_id = u32::MAX;
        builder.build_frame(&mut session, 46, false, false);
        assert_eq!(session.next_id, 0);
    }

    #[test]
    fn test_no_data_mode_leaves_checksum_zero() {
        let mut builder = FrameBuilder::seeded(src(), ChecksumOrder::Network, 4);
        let mut session = SenderSession::new(dst(), SizePolicy::fixed(64).unwrap());
        let frame = builder.build_frame(&mut session, 64, false, false);
        let header = WireHeader::decode(&frame[ETH_HLEN..]).unwrap();
        assert_eq!(header.checksum, 0);
        assert!(frame[ETH_HLEN + WIRE_HEADER_LEN..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_no_data_frame_after_filled_frame_is_zeroed() {
        let mut builder = FrameBuilder::seeded(src(), ChecksumOrder::Network, 4);
        let mut session = SenderSession::new(dst(), SizePolicy::fixed(64).unwrap());
        builder.build_frame(&mut session, 64, true, false);
        let frame = builder.build_frame(&mut session, 64, false, false);
        assert!(frame[ETH_HLEN + WIRE_HEADER_LEN..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_out_of_range_size_is_clamped() {
        let mut builder = FrameBuilder::seeded(src(), ChecksumOrder::Network, 6);
        let mut session = SenderSession::new(dst(), SizePolicy::fixed(64).unwrap());
        assert_eq!(builder.build_frame(&mut session, 20, true, false).len(), 60);
        assert_eq!(
            builder.build_frame(&mut session, 10_000, true, false).len(),
            ETH_HLEN + JUMBO_PAYLOAD_LEN
        );
        assert_eq!(session.bytes, 60 + (ETH_HLEN + JUMBO_PAYLOAD_LEN) as u64);
    }

    #[test]
    fn test_little_endian_checksum_order() {
        let mut builder = FrameBuilder::seeded(src(), ChecksumOrder::Little, 5);
        let mut session = SenderSession::new(dst(), SizePolicy::fixed(80).unwrap());
        let frame = builder.build_frame(&mut session, 80, true, false);
        let header = WireHeader::decode_with(&frame[ETH_HLEN..], ChecksumOrder::Little).unwrap();
        assert_eq!(header.checksum, checksum(&frame[ETH_HLEN + WIRE_HEADER_LEN..]));
    }

    #[test]
    fn test_vary_policy_session() {
        let cycler = SizeCycler::new(46, 47).unwrap();
        let mut session = SenderSession::new(dst(), SizePolicy::Vary(cycler));
        assert_eq!(session.size, 46);
        session.advance_size();
        assert_eq!(session.size, 47);
        session.advance_size();
        assert_eq!(session.size, 46);
    }
}
