//! Link-layer utilities: hardware addresses, interface lookup and raw
//! `AF_PACKET` socket creation.
//!
//! Raw sockets are Linux-only; other platforms get `Unsupported` errors.

use std::io;

use socket2::Socket;
use thiserror::Error;
use tracing::debug;

use crate::protocol::ETH_ALEN;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MacParseError {
    #[error("invalid MAC address '{0}': expected six hex octets separated by ':'")]
    Format(String),
}

/// 48-bit hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; ETH_ALEN]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xFF; ETH_ALEN]);

    pub fn octets(&self) -> [u8; ETH_ALEN] {
        self.0
    }

    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl From<[u8; ETH_ALEN]> for MacAddr {
    fn from(octets: [u8; ETH_ALEN]) -> Self {
        Self(octets)
    }
}

impl std::str::FromStr for MacAddr {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut octets = [0u8; ETH_ALEN];
        let mut parts = trimmed.split(':');
        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .filter(|p| !p.is_empty() && p.len() <= 2)
                .ok_or_else(|| MacParseError::Format(s.to_string()))?;
            *octet =
                u8::from_str_radix(part, 16).map_err(|_| MacParseError::Format(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(MacParseError::Format(s.to_string()));
        }
        Ok(Self(octets))
    }
}

impl std::fmt::Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

/// Look up the hardware address of a local interface
#[cfg(target_os = "linux")]
pub fn interface_mac(ifname: &str) -> io::Result<MacAddr> {
    let path = format!("/sys/class/net/{}/address", ifname);
    let contents = std::fs::read_to_string(&path).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("Cannot get MAC address of {}: {}", ifname, e),
        )
    })?;
    let mac = contents
        .parse()
        .map_err(|e: MacParseError| io::Error::new(io::ErrorKind::InvalidData, e))?;
    debug!("Interface {} has hardware address {}", ifname, mac);
    Ok(mac)
}

#[cfg(not(target_os = "linux"))]
pub fn interface_mac(ifname: &str) -> io::Result<MacAddr> {
    Err(unsupported(ifname))
}

/// Resolve an interface name to its kernel index
#[cfg(target_os = "linux")]
pub fn interface_index(ifname: &str) -> io::Result<u32> {
    let name = std::ffi::CString::new(ifname).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Invalid interface name: {}", ifname),
        )
    })?;
    let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
    if index == 0 {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("No such interface: {}", ifname),
        ));
    }
    Ok(index)
}

#[cfg(not(target_os = "linux"))]
pub fn interface_index(ifname: &str) -> io::Result<u32> {
    Err(unsupported(ifname))
}

/// Options for opening a raw link-layer socket
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketSocketOptions {
    /// Ethertype to receive, `None` for a send-only socket
    pub ethertype: Option<u16>,
    /// Ask the interface to deliver frames addressed to other hosts
    pub promiscuous: bool,
}

/// Create a non-blocking `AF_PACKET`/`SOCK_RAW` socket bound to `ifname`.
///
/// With `ethertype` set the kernel only delivers frames of that type, which
/// stands in for a socket filter.
#[cfg(target_os = "linux")]
pub fn create_packet_socket(ifname: &str, opts: PacketSocketOptions) -> io::Result<Socket> {
    use socket2::{Domain, Protocol, Type};
    use std::os::unix::io::AsRawFd;

    let ifindex = interface_index(ifname)?;
    let protocol_be = opts.ethertype.unwrap_or(0).to_be();

    let socket = Socket::new(
        Domain::PACKET,
        Type::RAW,
        Some(Protocol::from(libc::c_int::from(protocol_be))),
    )?;
    let fd = socket.as_raw_fd();

    let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
    addr.sll_family = libc::AF_PACKET as libc::c_ushort;
    addr.sll_protocol = protocol_be;
    addr.sll_ifindex = ifindex as libc::c_int;

    let ret = unsafe {
        libc::bind(
            fd,
            &addr as *const libc::sockaddr_ll as *const libc::sockaddr,
            std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
        )
    };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }

    if opts.promiscuous {
        let mreq = libc::packet_mreq {
            mr_ifindex: ifindex as libc::c_int,
            mr_type: libc::PACKET_MR_PROMISC as libc::c_ushort,
            mr_alen: 0,
            mr_address: [0; 8],
        };
        let ret = unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_PACKET,
                libc::PACKET_ADD_MEMBERSHIP,
                &mreq as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::packet_mreq>() as libc::socklen_t,
            )
        };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        debug!("Promiscuous mode enabled on {}", ifname);
    }

    socket.set_nonblocking(true)?;
    debug!(
        "Packet socket bound to {} (index {}, ethertype {:?})",
        ifname, ifindex, opts.ethertype
    );
    Ok(socket)
}

#[cfg(not(target_os = "linux"))]
pub fn create_packet_socket(ifname: &str, _opts: PacketSocketOptions) -> io::Result<Socket> {
    Err(unsupported(ifname))
}

#[cfg(not(target_os = "linux"))]
fn unsupported(ifname: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("Raw link-layer access to {} is only supported on Linux", ifname),
    )
}
