//! Health check for the UDP tracker: a raw BEP 15 `Connect` round trip.
use std::io::Cursor;
use std::net::SocketAddr;
use std::time::Duration;

use aquatic_udp_protocol::{ConnectRequest, Request, Response, TransactionId};
use tracing::info;

use crate::servers::registar::{ServiceHealthCheckJob, ServiceHeathCheckResult};

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds a health check job for the UDP tracker: connects a transient UDP
/// socket to `addr` and waits for a well-formed `Connect` response.
#[must_use]
pub(super) fn check_builder(addr: &SocketAddr) -> ServiceHealthCheckJob {
    let addr = *addr;
    let info = format!("checking udp tracker health check at: udp://{addr}");

    info!("{info}");

    let job = tokio::spawn(async move { check(addr).await });

    ServiceHealthCheckJob::new(addr, info, job)
}

async fn check(addr: SocketAddr) -> ServiceHeathCheckResult {
    tokio::time::timeout(CHECK_TIMEOUT, connect(addr))
        .await
        .map_err(|_| format!("timed out connecting to {addr}"))?
}

async fn connect(addr: SocketAddr) -> ServiceHeathCheckResult {
    let local_addr: SocketAddr = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" }.parse().expect("valid local bind address");

    let socket = tokio::net::UdpSocket::bind(local_addr)
        .await
        .map_err(|err| format!("failed to bind udp check socket: {err}"))?;

    socket.connect(addr).await.map_err(|err| format!("failed to connect to {addr}: {err}"))?;

    let request = Request::Connect(ConnectRequest {
        transaction_id: TransactionId(rand::random()),
    });

    let mut buffer = Cursor::new(Vec::new());
    request.write_bytes(&mut buffer).map_err(|err| format!("failed to encode connect request: {err}"))?;

    socket
        .send(buffer.get_ref())
        .await
        .map_err(|err| format!("failed to send connect request to {addr}: {err}"))?;

    let mut response_buffer = [0u8; 1496];
    let read = socket
        .recv(&mut response_buffer)
        .await
        .map_err(|err| format!("failed to read connect response from {addr}: {err}"))?;

    match Response::from_bytes(&response_buffer[..read], addr.is_ipv4()) {
        Ok(Response::Connect(_)) => Ok(format!("connected to {addr}")),
        Ok(other) => Err(format!("unexpected response from {addr}: {other:?}")),
        Err(err) => Err(format!("failed to parse response from {addr}: {err}")),
    }
}
