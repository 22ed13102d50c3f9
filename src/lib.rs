//! etherp - raw Ethernet throughput and frame loss testing
//!
//! A sender streams numbered frames tagged with a private ethertype to a
//! destination hardware address; a receiver validates them, detects lost
//! and corrupted frames and reports throughput. IP is bypassed entirely.
//!
//! # Library Usage
//!
//! The send and receive loops work over any [`backend::FrameTransport`]:
//!
//! ```ignore
//! use etherp::backend::ChannelTransport;
//! use etherp::receiver::{ReceiverConfig, receive_frames};
//! use etherp::sender::{SenderConfig, send_frames};
//! use etherp::stats::{RateCounter, UnitSystem};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (tx_end, rx_end) = ChannelTransport::pair(64);
//!     let (_cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
//!
//!     let mut config = SenderConfig::new(
//!         "02:00:00:00:00:02".parse()?,
//!         "02:00:00:00:00:01".parse()?,
//!     );
//!     config.count = Some(10);
//!
//!     let rate = RateCounter::new(UnitSystem::Decimal);
//!     let sent = send_frames(&tx_end, &config, &rate, cancel_rx.clone()).await?;
//!     let received =
//!         receive_frames(&rx_end, &ReceiverConfig::default(), &rate, cancel_rx).await?;
//!
//!     assert_eq!(sent.frames, received.frames);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`protocol`] - Wire header codec and link-layer constants
//! - [`frame`], [`validate`] - Frame construction and validation
//! - [`sequence`] - Loss detection
//! - [`sender`], [`receiver`] - Session loops
//! - [`backend`] - Raw socket and in-process transports
//! - [`stats`] - Rate sampling and session totals

pub mod backend;
pub mod cancel;
pub mod checksum;
pub mod config;
pub mod frame;
pub mod net;
pub mod output;
pub mod protocol;
pub mod receiver;
pub mod sender;
pub mod sequence;
pub mod stats;
pub mod validate;

pub use frame::{FrameBuilder, SenderSession, SizeCycler, SizePolicy};
pub use protocol::{ChecksumOrder, FrameError, WireHeader};
pub use receiver::{ReceiverConfig, receive_frames};
pub use sender::{SenderConfig, send_frames};
pub use validate::{FrameValidator, ReceiverSession, ValidationOutcome};
