//! Dispatches raw UDP datagrams to the request pipeline (BEP 15).
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::panic::Location;
use std::sync::Arc;
use std::time::Instant;

use aquatic_udp_protocol::{
    AnnounceInterval, AnnounceRequest, AnnounceResponse, ConnectRequest, ConnectResponse, ErrorResponse, NumberOfDownloads,
    NumberOfPeers, Port, Request, Response, ResponsePeer, ScrapeRequest, ScrapeResponse, TorrentScrapeStatistics, TransactionId,
};
use privateer_tracker_clock::clock::Time;
use privateer_tracker_primitives::info_hash::InfoHash;
use privateer_tracker_primitives::peer::AnnounceKey;
use privateer_tracker_located_error::DynError;
use tracing::debug;
use uuid::Uuid;

use super::cookie::ConnectionIdRegistry;
use super::request::{AnnounceWrapper, RawRequest};
use super::tracing::{trace_bad_request, trace_error_response, trace_request, trace_response};
use super::MAX_SCRAPE_TORRENTS;
use crate::core::{self, Tracker};
use crate::servers::udp::error::Error;
use crate::CurrentClock;

/// Parses one datagram and dispatches it, tracing the whole round trip.
pub(crate) async fn handle_packet(
    raw_request: RawRequest,
    tracker: &Arc<Tracker>,
    connections: &ConnectionIdRegistry,
    server_socket_addr: SocketAddr,
) -> Response {
    debug!("handling packet: {raw_request:?}");

    let start_time = Instant::now();
    let request_id = RequestId::new();

    match Request::from_bytes(&raw_request.payload, MAX_SCRAPE_TORRENTS).map_err(|e| Error::InternalServer {
        message: format!("{e:?}"),
        location: Location::caller(),
    }) {
        Ok(request) => {
            trace_request(&request, &request_id, &server_socket_addr);

            let transaction_id = match &request {
                Request::Connect(r) => r.transaction_id,
                Request::Announce(r) => r.transaction_id,
                Request::Scrape(r) => r.transaction_id,
            };

            let response = match handle_request(request, raw_request.from, tracker, connections).await {
                Ok(response) => response,
                Err(e) => handle_error(&e, transaction_id),
            };

            let latency = start_time.elapsed();
            trace_response(&response, &transaction_id, &request_id, &server_socket_addr, latency);

            response
        }
        Err(e) => {
            trace_bad_request(&request_id);

            let response = handle_error(
                &Error::BadRequest {
                    source: (Arc::new(e) as DynError).into(),
                },
                TransactionId(0),
            );

            trace_error_response(&request_id);

            response
        }
    }
}

async fn handle_request(request: Request, remote_addr: SocketAddr, tracker: &Tracker, connections: &ConnectionIdRegistry) -> Result<Response, Error> {
    debug!("handling request: {request:?} from: {remote_addr:?}");

    match request {
        Request::Connect(connect_request) => Ok(handle_connect(remote_addr, &connect_request, connections)),
        Request::Announce(announce_request) => handle_announce(remote_addr, &announce_request, tracker, connections).await,
        Request::Scrape(scrape_request) => handle_scrape(remote_addr, &scrape_request, tracker, connections).await,
    }
}

/// Handles `Connect` (§4.1): issues a fresh connection id, no tracker access
/// involved.
fn handle_connect(remote_addr: SocketAddr, request: &ConnectRequest, connections: &ConnectionIdRegistry) -> Response {
    debug!("udp connect request: {request:?}");

    let connection_id = connections.issue(remote_addr, CurrentClock::now());

    let response = ConnectResponse {
        transaction_id: request.transaction_id,
        connection_id,
    };

    debug!("udp connect response: {response:?}");

    Response::from(response)
}

/// Handles `Announce`. Unlike the HTTP tracker there is no passkey — BEP 15
/// carries none — so the request reaches the core with `passkey: None` and
/// the only authentication surface is the anti-spoof `key` field (§4.4.1
/// step 2), which this server maps straight off the wire (design note:
/// UDP's key field is always present, unlike HTTP's optional query param).
async fn handle_announce(remote_addr: SocketAddr, announce_request: &AnnounceRequest, tracker: &Tracker, connections: &ConnectionIdRegistry) -> Result<Response, Error> {
    debug!("udp announce request: {announce_request:?}");

    connections
        .check(remote_addr, announce_request.connection_id, CurrentClock::now())
        .map_err(|_| Error::InvalidConnectionId { location: Location::caller() })?;

    let wrapped = AnnounceWrapper::new(announce_request);

    let request = core::AnnounceRequest {
        passkey: None,
        info_hash: wrapped.info_hash,
        peer_id: announce_request.peer_id,
        peer_addr: SocketAddr::new(remote_addr.ip(), announce_request.port.0),
        uploaded: announce_request.bytes_uploaded.0.get(),
        downloaded: announce_request.bytes_downloaded.0.get(),
        left: announce_request.bytes_left.0.get(),
        event: map_announce_event(announce_request.event),
        key: Some(AnnounceKey::from_udp_key(announce_request.key.0)),
        num_want: announce_request.peers_wanted.0.get(),
    };

    let response = tracker.announce(request, CurrentClock::now()).await?;

    let announce_response = build_announce_response(remote_addr, announce_request.transaction_id, &response);

    debug!("udp announce response: {announce_response:?}");

    Ok(announce_response)
}

fn map_announce_event(event: aquatic_udp_protocol::AnnounceEvent) -> privateer_tracker_primitives::announce_event::AnnounceEvent {
    use aquatic_udp_protocol::AnnounceEvent as Wire;
    use privateer_tracker_primitives::announce_event::AnnounceEvent as Domain;

    match event {
        Wire::Started => Domain::Started,
        Wire::Stopped => Domain::Stopped,
        Wire::Completed => Domain::Completed,
        Wire::None => Domain::None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn build_announce_response(remote_addr: SocketAddr, transaction_id: TransactionId, response: &core::AnnounceResponse) -> Response {
    let announce_interval = AnnounceInterval::new(i64::from(response.interval) as i32);
    let leechers = NumberOfPeers::new(i64::from(response.leechers) as i32);
    let seeders = NumberOfPeers::new(i64::from(response.seeders) as i32);

    if remote_addr.is_ipv4() {
        Response::from(AnnounceResponse {
            transaction_id,
            announce_interval,
            leechers,
            seeders,
            peers: response
                .peers
                .iter()
                .filter_map(|peer| match peer.peer_addr.ip() {
                    IpAddr::V4(ip) => Some(ResponsePeer::<Ipv4Addr> {
                        ip_address: ip,
                        port: Port(peer.peer_addr.port()),
                    }),
                    IpAddr::V6(_) => None,
                })
                .collect(),
        })
    } else {
        Response::from(AnnounceResponse {
            transaction_id,
            announce_interval,
            leechers,
            seeders,
            peers: response
                .peers
                .iter()
                .filter_map(|peer| match peer.peer_addr.ip() {
                    IpAddr::V6(ip) => Some(ResponsePeer::<Ipv6Addr> {
                        ip_address: ip,
                        port: Port(peer.peer_addr.port()),
                    }),
                    IpAddr::V4(_) => None,
                })
                .collect(),
        })
    }
}

/// Handles `Scrape` (§4.1). Same connection-id check as announce; scrape
/// carries no passkey either, so a private tracker returns zeroed counters
/// for every info hash (the gate check inside `core::Tracker::scrape` only
/// rejects on ban/rate-limit, never on a missing passkey here).
async fn handle_scrape(remote_addr: SocketAddr, request: &ScrapeRequest, tracker: &Tracker, connections: &ConnectionIdRegistry) -> Result<Response, Error> {
    debug!("udp scrape request: {request:?}");

    connections
        .check(remote_addr, request.connection_id, CurrentClock::now())
        .map_err(|_| Error::InvalidConnectionId { location: Location::caller() })?;

    let info_hashes: Vec<InfoHash> = request.info_hashes.iter().map(|hash| InfoHash::from(*hash)).collect();

    let scrape_request = core::ScrapeRequest { passkey: None, info_hashes };

    let response = tracker.scrape(scrape_request, remote_addr.ip(), CurrentClock::now()).await?;

    #[allow(clippy::cast_possible_truncation)]
    let torrent_stats = response
        .files
        .iter()
        .map(|(_, entry)| TorrentScrapeStatistics {
            seeders: NumberOfPeers::new(i64::from(entry.seeders) as i32),
            completed: NumberOfDownloads::new(i64::from(entry.completed) as i32),
            leechers: NumberOfPeers::new(i64::from(entry.leechers) as i32),
        })
        .collect();

    let scrape_response = ScrapeResponse {
        transaction_id: request.transaction_id,
        torrent_stats,
    };

    debug!("udp scrape response: {scrape_response:?}");

    Ok(Response::from(scrape_response))
}

fn handle_error(e: &Error, transaction_id: TransactionId) -> Response {
    Response::from(ErrorResponse {
        transaction_id,
        message: e.to_string().into(),
    })
}

/// An identifier for a request, carried through tracing only.
#[derive(Debug, Clone)]
pub struct RequestId(Uuid);

impl RequestId {
    fn new() -> RequestId {
        RequestId(Uuid::new_v4())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
    use std::time::Duration;

    use aquatic_udp_protocol::{
        AnnounceEvent as AquaticAnnounceEvent, AnnounceRequest, ConnectRequest, InfoHash as AquaticInfoHash, NumberOfBytes,
        NumberOfPeers, PeerId as AquaticPeerId, PeerKey, Port, Response, ScrapeRequest, TransactionId,
    };
    use privateer_tracker_test_helpers::configuration;

    use super::{handle_announce, handle_connect, handle_scrape};
    use crate::core::Tracker;
    use crate::servers::udp::cookie::ConnectionIdRegistry;

    fn remote_v4() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)), 8080)
    }

    fn remote_v6() -> SocketAddr {
        SocketAddr::new(IpAddr::V6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1)), 8080)
    }

    async fn public_tracker() -> Tracker {
        Tracker::new(configuration::ephemeral()).await.expect("tracker should build")
    }

    fn registry() -> ConnectionIdRegistry {
        ConnectionIdRegistry::new(Duration::from_secs(120))
    }

    fn sample_announce_request(connection_id: aquatic_udp_protocol::ConnectionId) -> AnnounceRequest {
        AnnounceRequest {
            connection_id,
            transaction_id: TransactionId(0i32),
            info_hash: AquaticInfoHash([0u8; 20]),
            peer_id: AquaticPeerId([255u8; 20]),
            bytes_downloaded: NumberOfBytes::new(0),
            bytes_uploaded: NumberOfBytes::new(0),
            bytes_left: NumberOfBytes::new(0),
            event: AquaticAnnounceEvent::Started,
            ip_address: None,
            key: PeerKey(0u32),
            peers_wanted: NumberOfPeers::new(1),
            port: Port(8080),
        }
    }

    #[tokio::test]
    async fn a_connect_response_carries_the_requests_transaction_id() {
        let connections = registry();
        let request = ConnectRequest { transaction_id: TransactionId(42) };

        let response = handle_connect(remote_v4(), &request, &connections);

        match response {
            Response::Connect(connect_response) => assert_eq!(connect_response.transaction_id, TransactionId(42)),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn an_announce_is_rejected_without_a_prior_connect() {
        let tracker = public_tracker().await;
        let connections = registry();

        let bogus_connection_id = aquatic_udp_protocol::ConnectionId(9999);
        let request = sample_announce_request(bogus_connection_id);

        let result = handle_announce(remote_v4(), &request, &tracker, &connections).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn an_announce_succeeds_once_a_connection_id_has_been_issued() {
        let tracker = public_tracker().await;
        let connections = registry();

        let remote_addr = remote_v4();
        let connect_response = handle_connect(remote_addr, &ConnectRequest { transaction_id: TransactionId(0) }, &connections);
        let connection_id = match connect_response {
            Response::Connect(r) => r.connection_id,
            other => panic!("unexpected response: {other:?}"),
        };

        let request = sample_announce_request(connection_id);

        let response = handle_announce(remote_addr, &request, &tracker, &connections).await.unwrap();

        assert!(matches!(response, Response::AnnounceIpv4(_)));
    }

    #[tokio::test]
    async fn an_announce_over_ipv6_returns_an_ipv6_response() {
        let tracker = public_tracker().await;
        let connections = registry();

        let remote_addr = remote_v6();
        let connect_response = handle_connect(remote_addr, &ConnectRequest { transaction_id: TransactionId(0) }, &connections);
        let connection_id = match connect_response {
            Response::Connect(r) => r.connection_id,
            other => panic!("unexpected response: {other:?}"),
        };

        let request = sample_announce_request(connection_id);

        let response = handle_announce(remote_addr, &request, &tracker, &connections).await.unwrap();

        assert!(matches!(response, Response::AnnounceIpv6(_)));
    }

    #[tokio::test]
    async fn a_scrape_without_a_prior_connect_is_rejected() {
        let tracker = public_tracker().await;
        let connections = registry();

        let request = ScrapeRequest {
            connection_id: aquatic_udp_protocol::ConnectionId(1234),
            transaction_id: TransactionId(0),
            info_hashes: vec![AquaticInfoHash([0u8; 20])],
        };

        let result = handle_scrape(remote_v4(), &request, &tracker, &connections).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn a_scrape_for_an_unknown_torrent_returns_zeroed_statistics() {
        let tracker = public_tracker().await;
        let connections = registry();

        let remote_addr = remote_v4();
        let connect_response = handle_connect(remote_addr, &ConnectRequest { transaction_id: TransactionId(0) }, &connections);
        let connection_id = match connect_response {
            Response::Connect(r) => r.connection_id,
            other => panic!("unexpected response: {other:?}"),
        };

        let request = ScrapeRequest {
            connection_id,
            transaction_id: TransactionId(0),
            info_hashes: vec![AquaticInfoHash([0u8; 20])],
        };

        let response = handle_scrape(remote_addr, &request, &tracker, &connections).await.unwrap();

        match response {
            Response::Scrape(scrape_response) => {
                assert_eq!(scrape_response.torrent_stats[0].seeders.0.get(), 0);
                assert_eq!(scrape_response.torrent_stats[0].leechers.0.get(), 0);
                assert_eq!(scrape_response.torrent_stats[0].completed.0.get(), 0);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
