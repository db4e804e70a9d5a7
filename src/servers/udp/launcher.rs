//! The UDP tracker's own receive loop launcher.
//!
//! Unlike the HTTP launcher there's no web framework `serve()` to hand off
//! to: this launcher binds the socket itself (synchronously, since
//! [`service::Launcher::start`] is not an `async fn`) and spawns its own
//! accept-dispatch-reply loop.
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use aquatic_udp_protocol::Response;
use derive_more::{Constructor, Display};
use futures::{FutureExt as _, StreamExt as _};

use super::bound_socket::BoundSocket;
use super::check::check_builder;
use super::cookie::ConnectionIdRegistry;
use super::handle::Handle;
use super::receiver::Receiver;
use super::request::RawRequest;
use super::request_buffer::ActiveRequests;
use super::{handlers, MAX_PACKET_SIZE, UDP_TRACKER_LOG_TARGET};
use crate::core::Tracker;
use crate::servers::registar::FnSpawnServiceHeathCheck;
use crate::servers::service;
use crate::servers::signals::shutdown_signal_with_message;

#[derive(Constructor, Clone, Debug, Display)]
#[display(fmt = "intended_address: {addr}")]
pub struct Launcher {
    pub tracker: Arc<Tracker>,
    pub addr: SocketAddr,
    pub connection_cookie_lifetime: Duration,
}

impl service::Launcher<Handle> for Launcher {
    fn start(self) -> Result<(service::TaskFuture<'static, (), service::Error>, Handle, FnSpawnServiceHeathCheck), service::Error> {
        let mut handle = Handle::default();

        let std_socket = std::net::UdpSocket::bind(self.addr).map_err(|e| service::Error::UnableToBindToSocket {
            addr: self.addr,
            err: e.into(),
        })?;

        std_socket.set_nonblocking(true).map_err(|e| service::Error::UnableToBindToSocket {
            addr: self.addr,
            err: e.into(),
        })?;

        let addr = std_socket
            .local_addr()
            .map_err(|e| service::Error::UnableToGetLocalAddress { err: e.into() })?;

        let tokio_socket =
            tokio::net::UdpSocket::from_std(std_socket).map_err(|e| service::Error::UnableToGetLocalAddress { err: e.into() })?;

        let bound_socket = Arc::new(BoundSocket::from_tokio(tokio_socket));

        handle.set_listening(addr);
        let rx_shutdown = handle.take_rx_shutdown();

        let tracker = self.tracker;
        let connections = Arc::new(ConnectionIdRegistry::new(self.connection_cookie_lifetime));

        let running: service::TaskFuture<'static, (), service::Error> = async move {
            let receiver = Receiver::new(bound_socket);

            let halt_task = tokio::task::spawn(shutdown_signal_with_message(
                rx_shutdown,
                format!("Halting UDP Service Bound to Socket: {addr}"),
            ));

            let receive_loop = tokio::task::spawn(run_udp_server_main(receiver, tracker, connections));
            let stop = receive_loop.abort_handle();

            tokio::select! {
                _ = receive_loop => { tracing::debug!(target: UDP_TRACKER_LOG_TARGET, %addr, "udp receive loop stopped"); },
                _ = halt_task => { tracing::debug!(target: UDP_TRACKER_LOG_TARGET, %addr, "udp receive loop halted"); },
            }

            stop.abort();

            Ok(())
        }
        .boxed();

        Ok((running, handle, check_builder))
    }
}

async fn run_udp_server_main(mut receiver: Receiver, tracker: Arc<Tracker>, connections: Arc<ConnectionIdRegistry>) {
    let mut active_requests = ActiveRequests::default();

    let addr = receiver.bound_socket_address();
    let local_addr = format!("udp://{addr}");

    loop {
        let Some(req) = receiver.next().await else {
            tracing::error!(target: UDP_TRACKER_LOG_TARGET, local_addr, "udp receive loop ran dry, should not happen in production");
            break;
        };

        let req = match req {
            Ok(req) => req,
            Err(e) => {
                if e.kind() == std::io::ErrorKind::Interrupted {
                    tracing::warn!(target: UDP_TRACKER_LOG_TARGET, local_addr, err = %e, "udp receive loop interrupted");
                    return;
                }
                tracing::error!(target: UDP_TRACKER_LOG_TARGET, local_addr, err = %e, "udp receive loop breaking on error");
                break;
            }
        };

        // Spawned even when the active-requests buffer is full: `force_push`
        // reclaims a finished slot, or aborts the oldest unfinished one,
        // rather than blocking the accept loop on backpressure.
        let abort_handle = tokio::task::spawn(process_request(req, tracker.clone(), connections.clone(), receiver.bound_socket.clone()))
            .abort_handle();

        if abort_handle.is_finished() {
            continue;
        }

        active_requests.force_push(abort_handle, &local_addr).await;
    }
}

async fn process_request(request: RawRequest, tracker: Arc<Tracker>, connections: Arc<ConnectionIdRegistry>, socket: Arc<BoundSocket>) {
    let from = request.from;
    let server_addr = socket.address();

    let response = handlers::handle_packet(request, &tracker, &connections, server_addr).await;

    send_response(&socket, from, response).await;
}

async fn send_response(bound_socket: &Arc<BoundSocket>, to: SocketAddr, response: Response) {
    let buffer = vec![0u8; MAX_PACKET_SIZE];
    let mut cursor = Cursor::new(buffer);

    match response.write_bytes(&mut cursor) {
        Ok(()) => {
            #[allow(clippy::cast_possible_truncation)]
            let position = cursor.position() as usize;
            let inner = cursor.get_ref();

            tracing::trace!(target: UDP_TRACKER_LOG_TARGET, %to, bytes_count = inner[..position].len(), "udp response sent");

            drop(bound_socket.send_to(&inner[..position], to).await);
        }
        Err(e) => {
            tracing::error!(target: UDP_TRACKER_LOG_TARGET, %to, err = %e, "failed to encode udp response");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use privateer_tracker_test_helpers::configuration::ephemeral;

    use crate::core::Tracker;
    use crate::servers::udp::launcher::Launcher;
    use crate::servers::{registar, service};

    #[tokio::test]
    async fn it_should_be_able_to_start_and_stop() {
        let cfg = ephemeral();
        let tracker = Arc::new(Tracker::new(cfg.clone()).await.expect("tracker should build"));
        let config = &cfg.udp_trackers[0];

        let bind_to = config.bind_address.parse().expect("valid bind address");
        let connection_cookie_lifetime = Duration::from_secs(u64::from(config.connection_timeout));

        let registar = registar::Registar::default();

        let stopped = service::Service::new(Launcher::new(tracker, bind_to, connection_cookie_lifetime));

        let started = stopped.start().expect("it should start the server");
        started.reg_form(registar.give_form()).await.expect("it should register");

        let stopped = started.stop().await.expect("it should stop the server");

        drop(stopped);
    }
}
