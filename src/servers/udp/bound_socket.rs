//! A thin wrapper around a bound [`tokio::net::UdpSocket`].
use std::net::SocketAddr;
use std::ops::Deref;

use tokio::net::UdpSocket;

use super::UDP_TRACKER_LOG_TARGET;

pub struct BoundSocket {
    socket: UdpSocket,
}

impl std::fmt::Debug for BoundSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundSocket").field("socket", &self.socket).finish()
    }
}

impl BoundSocket {
    /// Binds a new UDP socket to the given address.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound (e.g. port already in use).
    pub async fn new(addr: SocketAddr) -> Result<Self, Box<std::io::Error>> {
        let socket = UdpSocket::bind(addr).await.map_err(Box::new)?;

        tracing::debug!(target: UDP_TRACKER_LOG_TARGET, local_addr = %addr, "bound udp socket");

        Ok(Self { socket })
    }

    /// Wraps an already-bound [`tokio::net::UdpSocket`].
    ///
    /// Used by the launcher, which binds synchronously (it runs inside
    /// [`crate::servers::service::Launcher::start`], a non-async method)
    /// before handing the socket to the async receive loop.
    #[must_use]
    pub(super) fn from_tokio(socket: UdpSocket) -> Self {
        Self { socket }
    }

    /// Returns the local address this socket is bound to.
    ///
    /// # Panics
    ///
    /// Panics if the underlying socket doesn't have a local address.
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        self.socket.local_addr().expect("it should have a local address")
    }

    /// Returns this socket's address as a `udp://` url.
    ///
    /// # Panics
    ///
    /// Panics if the resulting string is not a valid url.
    #[must_use]
    pub fn url(&self) -> url::Url {
        url::Url::parse(&format!("udp://{}", self.address())).expect("it should be a valid url")
    }
}

impl Deref for BoundSocket {
    type Target = UdpSocket;

    fn deref(&self) -> &Self::Target {
        &self.socket
    }
}
