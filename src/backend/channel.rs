//! In-process frame transport over tokio channels.

use std::io;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use super::FrameTransport;

/// One end of an in-memory link
pub struct ChannelTransport {
    tx: mpsc::Sender<Vec<u8>>,
    rx: Mutex<mpsc::Receiver<Vec<u8>>>,
}

impl ChannelTransport {
    /// Two connected ends: frames sent on one are received on the other
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::channel(capacity);
        let (b_tx, b_rx) = mpsc::channel(capacity);
        (
            Self {
                tx: a_tx,
                rx: Mutex::new(b_rx),
            },
            Self {
                tx: b_tx,
                rx: Mutex::new(a_rx),
            },
        )
    }
}

#[async_trait]
impl FrameTransport for ChannelTransport {
    async fn send(&self, frame: &[u8]) -> io::Result<()> {
        self.tx
            .send(frame.to_vec())
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer transport closed"))
    }

    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        let frame = self.rx.lock().await.recv().await.ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "peer transport closed")
        })?;
        // Oversized frames are cut to the buffer, like a raw socket read
        let n = frame.len().min(buf.len());
        buf[..n].copy_from_slice(&frame[..n]);
        Ok(n)
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}
