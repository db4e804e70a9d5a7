//! `Announce` response for the [`HTTP tracker`](crate::servers::http).
//!
//! Builds the bencoded announce response (§4.1): compact peer lists (BEP 23)
//! with optional `peers6` (BEP 7), or a non-compact peer dict list plus the
//! anti-spoof `tracker id`.
use std::net::{IpAddr, SocketAddr};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use privateer_tracker_contrib_bencode::{ben_dict, BDict, BValue};
use privateer_tracker_primitives::peer::Peer;

use crate::core::AnnounceResponse;

/// Whether the response should use BEP 23 compact peer encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compact {
    Yes,
    No,
}

/// `Announce` response for the HTTP tracker, ready to bencode.
#[derive(Debug)]
pub struct Announce {
    pub interval: u32,
    pub complete: u32,
    pub incomplete: u32,
    pub peers: Vec<Peer>,
    pub announce_key: String,
    pub compact: Compact,
}

impl Announce {
    #[must_use]
    pub fn from_core(data: AnnounceResponse, compact: Compact) -> Self {
        Self {
            interval: data.interval,
            complete: data.seeders,
            incomplete: data.leechers,
            peers: data.peers,
            announce_key: data.announce_key.to_string(),
            compact,
        }
    }

    /// Returns the bencoded representation of the announce response.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut dict = BDict::new();
        dict.insert(b"interval".to_vec(), BValue::Integer(i64::from(self.interval)));
        dict.insert(b"complete".to_vec(), BValue::Integer(i64::from(self.complete)));
        dict.insert(b"incomplete".to_vec(), BValue::Integer(i64::from(self.incomplete)));

        match self.compact {
            Compact::Yes => {
                dict.insert(b"peers".to_vec(), BValue::Bytes(compact_peers_v4(&self.peers)));

                let peers6 = compact_peers_v6(&self.peers);
                if !peers6.is_empty() {
                    dict.insert(b"peers6".to_vec(), BValue::Bytes(peers6));
                }
            }
            Compact::No => {
                dict.insert(b"peers".to_vec(), non_compact_peers(&self.peers));
                dict.insert(b"tracker id".to_vec(), BValue::from(self.announce_key.as_str()));
            }
        }

        BValue::Dict(dict).encode()
    }
}

impl IntoResponse for Announce {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}

/// Concatenated 6-byte records (4-byte IPv4 address + 2-byte big-endian
/// port), per BEP 23.
fn compact_peers_v4(peers: &[Peer]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for peer in peers {
        if let SocketAddr::V4(addr) = peer.peer_addr {
            bytes.extend_from_slice(&addr.ip().octets());
            bytes.extend_from_slice(&addr.port().to_be_bytes());
        }
    }
    bytes
}

/// Concatenated 18-byte records (16-byte IPv6 address + 2-byte big-endian
/// port), per BEP 7. Empty (and thus omitted) when no peer is IPv6.
fn compact_peers_v6(peers: &[Peer]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for peer in peers {
        if let SocketAddr::V6(addr) = peer.peer_addr {
            bytes.extend_from_slice(&addr.ip().octets());
            bytes.extend_from_slice(&addr.port().to_be_bytes());
        }
    }
    bytes
}

/// A list of `{"ip": <string>, "port": <int>}` dicts. No `peer id` key per
/// §4.1 — unlike BEP 3's baseline, this tracker omits it in both modes.
fn non_compact_peers(peers: &[Peer]) -> BValue {
    let list = peers
        .iter()
        .map(|peer| {
            let ip = match peer.peer_addr.ip() {
                IpAddr::V4(ip) => ip.to_string(),
                IpAddr::V6(ip) => ip.to_string(),
            };
            ben_dict! {
                "ip" => BValue::from(ip.as_str()),
                "port" => BValue::Integer(i64::from(peer.peer_addr.port())),
            }
        })
        .collect();

    BValue::List(list)
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
    use std::time::Duration;

    use aquatic_udp_protocol::{NumberOfBytes, PeerId};
    use privateer_tracker_primitives::announce_event::AnnounceEvent;
    use privateer_tracker_primitives::peer::{AnnounceKey, Connectable, Peer};

    use super::{Announce, Compact};

    fn sample_peer(addr: SocketAddr) -> Peer {
        Peer {
            user_id: None,
            peer_id: PeerId([0u8; 20]),
            peer_addr: addr,
            updated_at: Duration::from_secs(0),
            uploaded: NumberOfBytes(0),
            downloaded: NumberOfBytes(0),
            left: NumberOfBytes(0),
            event: AnnounceEvent::None,
            announce_key: AnnounceKey::generate(),
            connectable: Connectable::Unknown,
        }
    }

    #[test]
    fn compact_response_has_six_bytes_per_ipv4_peer_and_no_peers6_key() {
        let peers = vec![
            sample_peer(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080)),
            sample_peer(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2)), 8081)),
        ];

        let response = Announce {
            interval: 120,
            complete: 1,
            incomplete: 1,
            peers,
            announce_key: "0011223344556677".to_owned(),
            compact: Compact::Yes,
        };

        let body = response.body();
        let decoded = privateer_tracker_contrib_bencode::decode(&body).unwrap();
        let dict = decoded.as_dict().unwrap();

        assert_eq!(dict.get(b"peers").unwrap().as_bytes().unwrap().len(), 12);
        assert!(dict.get(b"peers6").is_none());
    }

    #[test]
    fn compact_response_includes_peers6_only_when_an_ipv6_peer_is_present() {
        let peers = vec![sample_peer(SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 8080))];

        let response = Announce {
            interval: 120,
            complete: 0,
            incomplete: 1,
            peers,
            announce_key: "0011223344556677".to_owned(),
            compact: Compact::Yes,
        };

        let body = response.body();
        let decoded = privateer_tracker_contrib_bencode::decode(&body).unwrap();
        let dict = decoded.as_dict().unwrap();

        assert_eq!(dict.get(b"peers").unwrap().as_bytes().unwrap().len(), 0);
        assert_eq!(dict.get(b"peers6").unwrap().as_bytes().unwrap().len(), 18);
    }

    #[test]
    fn non_compact_response_has_no_peer_id_key_and_includes_tracker_id() {
        let peers = vec![sample_peer(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080))];

        let response = Announce {
            interval: 120,
            complete: 1,
            incomplete: 0,
            peers,
            announce_key: "0011223344556677".to_owned(),
            compact: Compact::No,
        };

        let body = response.body();
        let decoded = privateer_tracker_contrib_bencode::decode(&body).unwrap();
        let dict = decoded.as_dict().unwrap();

        let peer_list = dict.get(b"peers").unwrap().as_list().unwrap();
        assert_eq!(peer_list.len(), 1);
        assert!(peer_list[0].as_dict().unwrap().get(b"peer id").is_none());
        assert_eq!(dict.get(b"tracker id").unwrap().as_bytes().unwrap(), b"0011223344556677");
    }
}
