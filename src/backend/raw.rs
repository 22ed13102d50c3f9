//! Raw `AF_PACKET` transport driven by tokio's reactor.

use std::io::{self, Read, Write};

use async_trait::async_trait;
use socket2::Socket;
use tokio::io::unix::AsyncFd;
use tracing::info;

use super::FrameTransport;
use crate::net::{self, PacketSocketOptions};

/// Frames sent and received on a single network interface
pub struct RawSocketTransport {
    fd: AsyncFd<Socket>,
}

impl RawSocketTransport {
    /// Open a socket on `interface`. Must be called inside a tokio runtime.
    pub fn open(interface: &str, opts: PacketSocketOptions) -> io::Result<Self> {
        let socket = net::create_packet_socket(interface, opts)?;
        let fd = AsyncFd::new(socket)?;
        info!("Raw socket open on {}", interface);
        Ok(Self { fd })
    }
}

#[async_trait]
impl FrameTransport for RawSocketTransport {
    async fn send(&self, frame: &[u8]) -> io::Result<()> {
        loop {
            let mut guard = self.fd.writable().await?;
            match guard.try_io(|inner| {
                let mut socket: &Socket = inner.get_ref();
                socket.write(frame)
            }) {
                Ok(result) => {
                    let n = result?;
                    if n != frame.len() {
                        return Err(io::Error::new(
                            io::ErrorKind::WriteZero,
                            format!("short write: {} of {} bytes", n, frame.len()),
                        ));
                    }
                    return Ok(());
                }
                Err(_would_block) => continue,
            }
        }
    }

    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.fd.readable().await?;
            match guard.try_io(|inner| {
                let mut socket: &Socket = inner.get_ref();
                socket.read(buf)
            }) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }

    fn name(&self) -> &'static str {
        "raw"
    }
}
