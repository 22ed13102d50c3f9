//! Receiver side: validates the incoming frame stream
//!
//! Receives are raced against cancellation so an operator interrupt ends
//! the session promptly. A frame carrying the stop flag ends it normally.

use std::time::Instant;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{debug, info, trace};

use crate::backend::FrameTransport;
use crate::cancel::cancelled;
use crate::protocol::{ChecksumOrder, MAX_FRAME_LEN};
use crate::stats::{RateCounter, ReceiverTotals, UnitSystem, elapsed_ms, throughput};
use crate::validate::{FrameValidator, ReceiverSession, ValidationOutcome};

#[derive(Debug, Clone, Copy)]
pub struct ReceiverConfig {
    pub checksum_order: ChecksumOrder,
    pub verify_checksum: bool,
    pub units: UnitSystem,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            checksum_order: ChecksumOrder::default(),
            verify_checksum: true,
            units: UnitSystem::default(),
        }
    }
}

/// Run one receiving session over `transport`.
///
/// Every accepted frame is added to `rate`. Transport failures are fatal;
/// protocol anomalies are only counted.
pub async fn receive_frames(
    transport: &dyn FrameTransport,
    config: &ReceiverConfig,
    rate: &RateCounter,
    mut cancel: watch::Receiver<bool>,
) -> anyhow::Result<ReceiverTotals> {
    let validator = FrameValidator::new(config.checksum_order, config.verify_checksum);
    let mut session = ReceiverSession::new();
    let mut buffer = vec![0u8; MAX_FRAME_LEN];
    let start = Instant::now();

    info!("Waiting for frames ({} transport)", transport.name());

    loop {
        let n = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                debug!("Receive cancelled");
                break;
            }
            result = transport.recv(&mut buffer) => {
                result.context("Can't receive Ethernet frame")?
            }
        };

        let outcome = validator.validate(&buffer[..n], &mut session);
        match &outcome {
            ValidationOutcome::Accepted(frame) => rate.add(frame.len as u64),
            ValidationOutcome::Ignored(reason) => trace!("Ignored frame: {:?}", reason),
            ValidationOutcome::Malformed(_) => {}
        }

        if outcome.is_stop() {
            info!("Last frame received");
            break;
        }
    }

    let elapsed = start.elapsed();
    let peak = rate.peak();
    Ok(ReceiverTotals {
        frames: session.frames,
        bytes: session.bytes,
        errors: session.errors,
        lost: session.lost(),
        checksum_errors: session.checksum_errors,
        truncated: session.truncated,
        backward: session.tracker.backward_steps(),
        last_id: session.tracker.last_id(),
        completed: session.completed,
        duration_ms: elapsed_ms(start),
        throughput_mbps: throughput(session.bytes, elapsed, config.units),
        peak_mbps: (peak.bytes > 0).then(|| peak.megabits()),
        units: config.units,
    })
}
