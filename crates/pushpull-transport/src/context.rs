use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::channel::Channel;
use crate::endpoint::{Endpoint, Role};
use crate::error::{Result, TransportError};

/// Default interval at which blocked accepts and reads re-check cancellation.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Socket options applied to every channel a context establishes.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound for an active connect attempt. `None` uses the OS default.
    pub connect_timeout: Option<Duration>,
    /// How often a pending accept or a blocked read wakes to observe
    /// cancellation. Also installed as the channel read timeout.
    pub poll_interval: Duration,
    /// Write timeout for established channels.
    pub write_timeout: Option<Duration>,
    /// Disable Nagle's algorithm so each frame leaves immediately.
    pub nodelay: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(5)),
            poll_interval: DEFAULT_POLL_INTERVAL,
            write_timeout: None,
            nodelay: true,
        }
    }
}

/// Establish a single channel with a default, short-lived context.
///
/// A passive accept started this way cannot be cancelled; use
/// [`TransportContext::establish`] when the caller needs to interrupt it.
pub fn establish(role: Role, endpoint: &Endpoint) -> Result<Channel> {
    let mut ctx = TransportContext::new();
    let channel = ctx.establish(role, endpoint, &CancelToken::new());
    // The channel outlives the context here; skip the open-channel check.
    ctx.terminated = true;
    channel
}

/// Process-wide transport state.
///
/// Created once by the entry point and handed by reference to whatever needs
/// to establish channels. Tracks how many channels are still open so that
/// teardown can report leaks. [`TransportContext::shutdown`] (or drop) tears it
/// down exactly once.
#[derive(Debug)]
pub struct TransportContext {
    config: TransportConfig,
    open_channels: Arc<AtomicUsize>,
    terminated: bool,
}

impl TransportContext {
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    pub fn with_config(config: TransportConfig) -> Self {
        debug!(?config, "transport context created");
        Self {
            config,
            open_channels: Arc::new(AtomicUsize::new(0)),
            terminated: false,
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Number of channels established by this context and not yet closed.
    pub fn open_channels(&self) -> usize {
        self.open_channels.load(Ordering::SeqCst)
    }

    /// Establish a channel for `role` on `endpoint`.
    ///
    /// Active connects to the endpoint. Passive binds it, waits for exactly one
    /// peer and stops listening once that peer is accepted. A pending accept
    /// returns [`TransportError::Cancelled`] when `cancel` fires.
    pub fn establish(
        &self,
        role: Role,
        endpoint: &Endpoint,
        cancel: &CancelToken,
    ) -> Result<Channel> {
        match role {
            Role::Active => self.connect(endpoint),
            Role::Passive => self.listen(endpoint)?.accept_one(cancel),
        }
    }

    /// Connect to a listening peer.
    pub fn connect(&self, endpoint: &Endpoint) -> Result<Channel> {
        let addrs = endpoint.resolve().map_err(|source| TransportError::Connect {
            endpoint: endpoint.clone(),
            source,
        })?;

        let mut last_err = None;
        for addr in addrs {
            let attempt = match self.config.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    info!(%addr, "connected to peer");
                    return prepare_channel(
                        stream,
                        Role::Active,
                        addr,
                        &self.config,
                        &self.open_channels,
                    );
                }
                Err(err) => {
                    debug!(%addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::Connect {
            endpoint: endpoint.clone(),
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, "no addresses to try")
            }),
        })
    }

    /// Bind `endpoint` without accepting yet.
    ///
    /// Useful when the caller needs the bound address (port 0) before a peer
    /// can connect.
    pub fn listen(&self, endpoint: &Endpoint) -> Result<PassiveListener> {
        let bind_err = |source| TransportError::Bind {
            endpoint: endpoint.clone(),
            source,
        };

        let addrs = endpoint.resolve().map_err(bind_err)?;
        let listener = TcpListener::bind(addrs.as_slice()).map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;

        info!(%local_addr, "listening for peer");

        Ok(PassiveListener {
            listener,
            endpoint: endpoint.clone(),
            local_addr,
            config: self.config.clone(),
            open_channels: Arc::clone(&self.open_channels),
        })
    }

    /// Tear the context down.
    pub fn shutdown(mut self) {
        self.terminate();
    }

    fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        let open = self.open_channels();
        if open > 0 {
            warn!(open, "transport context shut down with channels still open");
        } else {
            debug!("transport context shut down");
        }
    }
}

impl Default for TransportContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TransportContext {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// A bound passive endpoint waiting for its single peer.
pub struct PassiveListener {
    listener: TcpListener,
    endpoint: Endpoint,
    local_addr: SocketAddr,
    config: TransportConfig,
    open_channels: Arc<AtomicUsize>,
}

impl PassiveListener {
    /// The concrete bound address (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The endpoint as requested.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Wait for one peer, then stop listening.
    ///
    /// Connection attempts after this returns are refused.
    pub fn accept_one(self, cancel: &CancelToken) -> Result<Channel> {
        let poll = self.config.poll_interval.max(MIN_POLL_INTERVAL);
        loop {
            if cancel.is_cancelled() {
                debug!(local_addr = %self.local_addr, "accept cancelled");
                return Err(TransportError::Cancelled);
            }

            match self.listener.accept() {
                Ok((stream, peer)) => {
                    stream.set_nonblocking(false).map_err(TransportError::Accept)?;
                    info!(%peer, local_addr = %self.local_addr, "accepted peer");
                    return prepare_channel(
                        stream,
                        Role::Passive,
                        peer,
                        &self.config,
                        &self.open_channels,
                    );
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    cancel.wait_timeout(poll);
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Accept(err)),
            }
        }
    }
}

impl std::fmt::Debug for PassiveListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassiveListener")
            .field("endpoint", &self.endpoint)
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

fn prepare_channel(
    stream: TcpStream,
    role: Role,
    peer: SocketAddr,
    config: &TransportConfig,
    open_channels: &Arc<AtomicUsize>,
) -> Result<Channel> {
    stream.set_nodelay(config.nodelay)?;
    stream.set_read_timeout(Some(config.poll_interval.max(MIN_POLL_INTERVAL)))?;
    stream.set_write_timeout(config.write_timeout)?;
    Ok(Channel::new(stream, role, peer, Arc::clone(open_channels)))
}
