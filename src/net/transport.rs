//! Trait abstraction for datagram sockets to enable testing

use async_trait::async_trait;
use std::io;
use std::net::{Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::debug;

/// Trait for connectionless send operations
#[async_trait]
pub trait DatagramTransport: Send {
    /// Send one datagram to `target`, returning the number of bytes sent
    async fn send_to(&mut self, data: &[u8], target: SocketAddr) -> io::Result<usize>;

    /// Release the underlying socket
    fn close(&mut self);
}

/// Wrapper around tokio::net::UdpSocket that implements DatagramTransport
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    local_addr: SocketAddr,
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("local_addr", &self.local_addr)
            .field("open", &self.socket.is_some())
            .finish()
    }
}

impl UdpTransport {
    /// Bind a UDP socket on `addr` (use port 0 for an ephemeral port)
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        debug!("Bound UDP socket on {}", local_addr);
        Ok(Self {
            socket: Some(socket),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait]
impl DatagramTransport for UdpTransport {
    async fn send_to(&mut self, data: &[u8], target: SocketAddr) -> io::Result<usize> {
        match self.socket.as_ref() {
            Some(socket) => socket.send_to(data, target).await,
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "socket closed")),
        }
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!("Closed UDP socket on {}", self.local_addr);
        }
    }
}

/// Pick a local bind address able to reach `target`
///
/// An unspecified IPv4 bind address is swapped for the IPv6 one when the
/// target is IPv6; explicit addresses are kept as configured.
pub fn bind_addr_for(configured: SocketAddr, target: SocketAddr) -> SocketAddr {
    match (configured, target) {
        (SocketAddr::V4(local), SocketAddr::V6(_)) if local.ip().is_unspecified() => {
            SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), local.port())
        }
        _ => configured,
    }
}
