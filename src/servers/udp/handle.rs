//! Handle to control a running UDP tracker instance.
//!
//! Unlike the HTTP/health-check servers there's no web framework handle to
//! delegate to: the listening address is only known once the receive loop
//! actually binds its socket, so it's published through a `watch` channel
//! instead of polled off an `axum_server::Handle`.
use std::net::SocketAddr;

use futures::FutureExt as _;
use tokio::sync::{oneshot, watch};

use crate::servers::service;
use crate::servers::signals::Halted;

#[derive(Debug)]
pub struct Handle {
    tx_shutdown: Option<oneshot::Sender<Halted>>,
    rx_shutdown: Option<oneshot::Receiver<Halted>>,
    addr_tx: watch::Sender<Option<SocketAddr>>,
    addr_rx: watch::Receiver<Option<SocketAddr>>,
}

impl Handle {
    fn shutdown(&mut self) -> Result<(), service::Error> {
        if let Some(tx) = self.tx_shutdown.take() {
            tx.send(Halted::Normal)
                .map_err(|err| service::Error::UnableToSendHaltingMessage { err })?;
        } else {
            panic!("it has already taken the channel?");
        }
        Ok(())
    }

    /// Takes the shutdown receiver the receive loop selects on.
    ///
    /// # Panics
    ///
    /// Panics if called more than once for the same handle.
    pub(super) fn take_rx_shutdown(&mut self) -> oneshot::Receiver<Halted> {
        self.rx_shutdown.take().expect("rx_shutdown already taken")
    }

    /// Publishes the socket address the receive loop ended up bound to.
    pub(super) fn set_listening(&self, addr: SocketAddr) {
        drop(self.addr_tx.send(Some(addr)));
    }
}

impl Default for Handle {
    fn default() -> Self {
        let (tx_shutdown, rx_shutdown) = oneshot::channel::<Halted>();
        let (addr_tx, addr_rx) = watch::channel(None);

        Self {
            tx_shutdown: Some(tx_shutdown),
            rx_shutdown: Some(rx_shutdown),
            addr_tx,
            addr_rx,
        }
    }
}

impl service::Handle for Handle {
    fn stop(mut self) -> Result<(), service::Error> {
        self.shutdown()
    }

    fn listening(&self) -> service::AddrFuture<'_> {
        let mut addr_rx = self.addr_rx.clone();

        async move {
            loop {
                if let Some(addr) = *addr_rx.borrow() {
                    return Some(addr);
                }
                if addr_rx.changed().await.is_err() {
                    return None;
                }
            }
        }
        .boxed()
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if self.tx_shutdown.is_some() {
            self.shutdown().expect("it should shutdown when dropped");
        }
    }
}
