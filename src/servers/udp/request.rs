//! UDP request types.
//!
//! This crate uses the [`aquatic_udp_protocol`](https://crates.io/crates/aquatic_udp_protocol)
//! crate to parse and serialize UDP requests. The types in this module wrap
//! that crate's raw wire types with our own domain types.
use std::net::SocketAddr;

use aquatic_udp_protocol::AnnounceRequest;
use privateer_tracker_primitives::info_hash::InfoHash;

/// One datagram off the wire, not yet parsed into a BEP 15 request.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub payload: Vec<u8>,
    pub from: SocketAddr,
}

/// Wrapper around [`AnnounceRequest`](aquatic_udp_protocol::AnnounceRequest)
/// that exposes the info hash as our own [`InfoHash`] type.
pub struct AnnounceWrapper {
    pub announce_request: AnnounceRequest,
    pub info_hash: InfoHash,
}

impl AnnounceWrapper {
    #[must_use]
    pub fn new(announce_request: &AnnounceRequest) -> Self {
        AnnounceWrapper {
            announce_request: announce_request.clone(),
            info_hash: InfoHash::from(announce_request.info_hash),
        }
    }
}
