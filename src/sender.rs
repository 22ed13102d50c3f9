//! Sender side: builds and transmits the frame stream
//!
//! The session ends after the configured frame count, or on cancellation.
//! A cancellation never drops the stream abruptly: the next frame is built
//! with the stop flag set and is the last one sent.

use std::time::{Duration, Instant};

use anyhow::{Context, ensure};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::backend::FrameTransport;
use crate::cancel::sleep_or_cancel;
use crate::frame::{FrameBuilder, SenderSession, SizePolicy};
use crate::net::MacAddr;
use crate::protocol::{ChecksumOrder, DEFAULT_FRAME_SIZE};
use crate::stats::{RateCounter, SenderTotals, UnitSystem, elapsed_ms, throughput};

#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub destination: MacAddr,
    pub source: MacAddr,
    /// Delay between two frames, `None` to send back to back
    pub interval: Option<Duration>,
    /// Number of frames to send, `None` for no limit
    pub count: Option<u64>,
    pub size: SizePolicy,
    /// Fill payloads with random bytes and checksum them
    pub fill_payload: bool,
    pub checksum_order: ChecksumOrder,
    pub units: UnitSystem,
    /// Payload seed for reproducible runs
    pub seed: Option<u64>,
}

impl SenderConfig {
    pub fn new(destination: MacAddr, source: MacAddr) -> Self {
        Self {
            destination,
            source,
            interval: None,
            count: None,
            size: SizePolicy::Fixed(DEFAULT_FRAME_SIZE),
            fill_payload: true,
            checksum_order: ChecksumOrder::default(),
            units: UnitSystem::default(),
            seed: None,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.count != Some(0),
            "The count must be an integer greater than 0"
        );
        ensure!(
            self.interval != Some(Duration::ZERO),
            "The interval must be greater than 0"
        );
        if let SizePolicy::Fixed(size) = self.size {
            SizePolicy::fixed(size)?;
        }
        Ok(())
    }
}

/// Run one sending session over `transport`.
///
/// Every transmitted byte is added to `rate`. Transport failures are fatal.
pub async fn send_frames(
    transport: &dyn FrameTransport,
    config: &SenderConfig,
    rate: &RateCounter,
    mut cancel: watch::Receiver<bool>,
) -> anyhow::Result<SenderTotals> {
    config.validate()?;

    let mut builder = match config.seed {
        Some(seed) => FrameBuilder::seeded(config.source, config.checksum_order, seed),
        None => FrameBuilder::new(config.source, config.checksum_order),
    };
    let mut session = SenderSession::new(config.destination, config.size);
    let mut remaining = config.count;
    let mut finish_next = false;
    let start = Instant::now();

    info!(
        "Sending frames from {} to {} ({} transport)",
        config.source,
        config.destination,
        transport.name()
    );

    loop {
        let is_last = remaining == Some(1) || finish_next;
        let id = session.next_id;
        let size = session.size;

        let frame = builder.build_frame(&mut session, size, config.fill_payload, is_last);
        let len = frame.len() as u64;
        debug!("Sending frame to {} ID={}", config.destination, id);
        transport
            .send(frame)
            .await
            .with_context(|| format!("Can't send Ethernet frame (ID={})", id))?;
        rate.add(len);

        if let Some(n) = remaining.as_mut() {
            *n -= 1;
        }
        if is_last {
            break;
        }

        session.advance_size();

        if *cancel.borrow() {
            finish_next = true;
        } else if let Some(delay) = config.interval
            && sleep_or_cancel(delay, &mut cancel).await
        {
            finish_next = true;
        }
        if finish_next {
            debug!("Cancellation requested, next frame is the last one");
        }
    }

    let elapsed = start.elapsed();
    let peak = rate.peak();
    Ok(SenderTotals {
        frames: session.frames,
        bytes: session.bytes,
        last_id: (session.frames > 0).then(|| session.next_id.wrapping_sub(1)),
        cancelled: finish_next,
        duration_ms: elapsed_ms(start),
        throughput_mbps: throughput(session.bytes, elapsed, config.units),
        peak_mbps: (peak.bytes > 0).then(|| peak.megabits()),
        units: config.units,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SenderConfig {
        SenderConfig::new(MacAddr([2, 0, 0, 0, 0, 2]), MacAddr([2, 0, 0, 0, 0, 1]))
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.size, SizePolicy::Fixed(1500));
        assert!(config.fill_payload);
    }

    #[test]
    fn test_rejects_zero_count_and_interval() {
        let mut bad = config();
        bad.count = Some(0);
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.interval = Some(Duration::ZERO);
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.size = SizePolicy::Fixed(20);
        assert!(bad.validate().is_err());
    }
}
