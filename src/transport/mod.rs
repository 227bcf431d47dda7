//! Inbound transport seam.
//!
//! The bridge core does not care how callers reach it: AX.25 kernel sockets,
//! a KISS TNC gateway, or plain TCP all look the same once a connection is a
//! bidirectional byte stream. [`PacketListener`] is that seam. The crate
//! ships [`TcpPacketListener`]; attaching a native AX.25 listener (axports,
//! kernel module, interface setup) is the transport binding's job, outside
//! this crate.

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};

/// An accept-style source of inbound caller connections.
///
/// `accept` yields the next caller as a bidirectional stream plus a
/// best-effort peer label (callsign or address) for banners and logs. A
/// `None` label means the transport could not identify the peer.
pub trait PacketListener {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn accept(
        &mut self,
    ) -> impl Future<Output = io::Result<(Self::Stream, Option<String>)>> + Send;
}

/// TCP-backed [`PacketListener`].
///
/// Binds the operator-chosen listen endpoint and hands each accepted TCP
/// connection to the bridge core. This is the stand-in the transport binding
/// (e.g. `ax25ipd` or a TNC gateway pointed at this port) connects into.
pub struct TcpPacketListener {
    listener: TcpListener,
}

impl TcpPacketListener {
    /// Bind the listen endpoint (`host:port`).
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// The locally bound address, useful when binding port 0 in tests.
    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

impl PacketListener for TcpPacketListener {
    type Stream = TcpStream;

    async fn accept(&mut self) -> io::Result<(Self::Stream, Option<String>)> {
        let (stream, addr) = self.listener.accept().await?;
        Ok((stream, Some(addr.to_string())))
    }
}
