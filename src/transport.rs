use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;

use crate::destination::Destination;

/// The datagram socket a [crate::query::Client] talks through.
pub trait Transport {
    /// Send one datagram to `dest`.
    async fn send_to(&self, data: &[u8], dest: &Destination) -> io::Result<()>;

    /// Wait for the next datagram, returning its length and sender.
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
}

impl Transport for UdpSocket {
    async fn send_to(&self, data: &[u8], dest: &Destination) -> io::Result<()> {
        UdpSocket::send_to(self, data, (dest.address.as_str(), dest.port)).await?;
        Ok(())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf).await
    }
}

/// Socket errors that concern a single datagram or peer and leave the
/// socket usable. An ICMP port-unreachable for a dead host shows up as
/// `ConnectionReset` or `ConnectionRefused` on the next receive.
pub fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}
