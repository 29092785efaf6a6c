use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::endpoint::Role;
use crate::error::Result;

/// An established relay connection. Implements `Read` and `Write`.
///
/// Produced by [`crate::TransportContext::establish`]. The channel is closed
/// exactly once: by an explicit [`Channel::close`] or, failing that, on drop.
pub struct Channel {
    stream: TcpStream,
    role: Role,
    peer: SocketAddr,
    closed: bool,
    open_channels: Arc<AtomicUsize>,
}

impl Channel {
    pub(crate) fn new(
        stream: TcpStream,
        role: Role,
        peer: SocketAddr,
        open_channels: Arc<AtomicUsize>,
    ) -> Self {
        open_channels.fetch_add(1, Ordering::SeqCst);
        Self {
            stream,
            role,
            peer,
            closed: false,
            open_channels,
        }
    }

    /// The role this side played when the channel was established.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Address of the remote peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Local address of the connection.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.stream.local_addr().map_err(Into::into)
    }

    /// Set read timeout on the underlying stream.
    ///
    /// When set, reads that see no data within the timeout fail with
    /// `WouldBlock` or `TimedOut` instead of blocking forever.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_write_timeout(timeout).map_err(Into::into)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Shut the connection down in both directions.
    ///
    /// Idempotent: only the first call touches the socket.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.open_channels.fetch_sub(1, Ordering::SeqCst);
        info!(peer = %self.peer, role = %self.role, "closing channel");

        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // Peer already tore the connection down.
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl Read for Channel {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for Channel {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stream.flush()
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(err) = self.close() {
                debug!(error = %err, "channel shutdown on drop failed");
            }
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("role", &self.role)
            .field("peer", &self.peer)
            .field("closed", &self.closed)
            .finish()
    }
}
