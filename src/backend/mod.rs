//! Frame transport abstraction.
//!
//! The send and receive loops only need to push and pull whole link-layer
//! frames. [`RawSocketTransport`] does that on a real interface; the
//! in-process [`ChannelTransport`] is used for loopback runs and tests.

mod channel;
#[cfg(unix)]
mod raw;

pub use channel::ChannelTransport;
#[cfg(unix)]
pub use raw::RawSocketTransport;

use std::io;

use async_trait::async_trait;

/// Moves whole link-layer frames
#[async_trait]
pub trait FrameTransport: Send + Sync {
    /// Transmit one complete frame (Ethernet header included)
    async fn send(&self, frame: &[u8]) -> io::Result<()>;

    /// Receive one frame into `buf`, returning its length
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Get transport name for logging
    fn name(&self) -> &'static str;
}
