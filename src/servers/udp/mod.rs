//! The UDP tracker server (BEP 15).
//!
//! Unlike the HTTP server there is no web framework underneath: `launcher`
//! binds a raw [`tokio::net::UdpSocket`] and drives its own receive loop,
//! dispatching each datagram to [`handlers`] through the [`request_buffer`]
//! bound on concurrently in-flight requests. `cookie` implements the
//! connection-id registry BEP 15 requires before a peer may announce or
//! scrape: ids are drawn from a CSPRNG on `Connect` and held, with a TTL,
//! until a background job sweeps them out.
pub mod bound_socket;
pub mod check;
pub mod cookie;
pub mod error;
pub mod handle;
pub mod handlers;
pub mod launcher;
pub mod receiver;
pub mod request;
pub mod request_buffer;
pub mod tracing;

pub const UDP_TRACKER_LOG_TARGET: &str = "UDP TRACKER";

/// Conservative MTU-safe datagram size: big enough for any request or
/// response this server produces, small enough to avoid IP fragmentation.
pub const MAX_PACKET_SIZE: usize = 1496;

/// The largest number of info hashes accepted in a single scrape request
/// (BEP 15 places no hard cap; this keeps one scrape inside one packet).
pub const MAX_SCRAPE_TORRENTS: u8 = 74;

/// `BitTorrent` UDP tracker protocol version. There's only one version
/// currently supported.
#[derive(Copy, Clone, Debug)]
pub enum Version {
    V1,
}
