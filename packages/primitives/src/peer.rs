//! The swarm-local, volatile peer record.
//!
//! A peer is keyed by `(ip, port)` inside a torrent's swarm — a client that
//! restarts on a new port becomes a new peer, per the tracker's identity
//! invariant.
use std::net::{IpAddr, SocketAddr};

use aquatic_udp_protocol::{NumberOfBytes, PeerId};
use rand::RngCore;
use serde::Serialize;

use crate::announce_event::AnnounceEvent;
use crate::DurationSinceUnixEpoch;

/// Length, in bytes, of the raw anti-spoof announce key before hex encoding.
pub const ANNOUNCE_KEY_BYTES_LEN: usize = 8;

/// A server-issued per-peer anti-spoof token, hex-encoded to 16 characters.
///
/// Issued on a peer's first announce and required on every subsequent
/// announce for the same `(info_hash, ip, port)` tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AnnounceKey([u8; ANNOUNCE_KEY_BYTES_LEN]);

impl AnnounceKey {
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; ANNOUNCE_KEY_BYTES_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Builds an `AnnounceKey` from BEP 15's 4-byte anti-spoof `key` field,
    /// left-padded with zeroes. UDP peers never see the hex form of this
    /// value; it only has to compare equal across announces from the same
    /// peer, which zero-extension preserves.
    #[must_use]
    pub fn from_udp_key(key: u32) -> Self {
        let mut bytes = [0u8; ANNOUNCE_KEY_BYTES_LEN];
        bytes[4..].copy_from_slice(&key.to_be_bytes());
        Self(bytes)
    }
}

impl std::fmt::Display for AnnounceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for AnnounceKey {
    type Err = binascii::ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ANNOUNCE_KEY_BYTES_LEN * 2 {
            return Err(binascii::ConvertError::InvalidInputLength);
        }
        let mut bytes = [0u8; ANNOUNCE_KEY_BYTES_LEN];
        binascii::hex2bin(s.as_bytes(), &mut bytes)?;
        Ok(Self(bytes))
    }
}

/// Tri-state reachability, as determined by the peer-reachability verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum Connectable {
    Yes,
    No,
    #[default]
    Unknown,
}

impl Connectable {
    /// Ordering score used by peer selection: lower sorts first.
    #[must_use]
    pub fn score(self) -> u8 {
        match self {
            Connectable::Yes => 0,
            Connectable::Unknown => 1,
            Connectable::No => 2,
        }
    }
}

/// The `(ip, port)` pair that uniquely identifies a peer within one swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerKey {
    pub ip: IpAddr,
    pub port: u16,
}

impl PeerKey {
    #[must_use]
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }
}

impl From<SocketAddr> for PeerKey {
    fn from(addr: SocketAddr) -> Self {
        Self {
            ip: addr.ip(),
            port: addr.port(),
        }
    }
}

impl From<PeerKey> for SocketAddr {
    fn from(key: PeerKey) -> Self {
        SocketAddr::new(key.ip, key.port)
    }
}

/// A peer announced into a torrent's swarm.
#[derive(Debug, Clone, Serialize)]
pub struct Peer {
    /// Owning user, when the announce carried a passkey. UDP peers (BEP 15
    /// carries no passkey) are always anonymous.
    pub user_id: Option<i64>,
    #[serde(serialize_with = "ser_peer_id")]
    pub peer_id: PeerId,
    pub peer_addr: SocketAddr,
    #[serde(serialize_with = "ser_unix_time")]
    pub updated_at: DurationSinceUnixEpoch,
    #[serde(serialize_with = "ser_number_of_bytes")]
    pub uploaded: NumberOfBytes,
    #[serde(serialize_with = "ser_number_of_bytes")]
    pub downloaded: NumberOfBytes,
    #[serde(serialize_with = "ser_number_of_bytes")]
    pub left: NumberOfBytes,
    pub event: AnnounceEvent,
    pub announce_key: AnnounceKey,
    pub connectable: Connectable,
}

impl Peer {
    #[must_use]
    pub fn key(&self) -> PeerKey {
        PeerKey::from(self.peer_addr)
    }

    /// A peer is a seeder iff it reported `left == 0`.
    #[must_use]
    pub fn is_seeder(&self) -> bool {
        self.left.0.get() == 0
    }

    #[must_use]
    pub fn is_active(&self, now: DurationSinceUnixEpoch, max_peer_timeout: DurationSinceUnixEpoch) -> bool {
        now.saturating_sub(self.updated_at) <= max_peer_timeout
    }
}

pub fn ser_unix_time<S: serde::Serializer>(value: &DurationSinceUnixEpoch, ser: S) -> Result<S::Ok, S::Error> {
    #[allow(clippy::cast_possible_truncation)]
    ser.serialize_u64(value.as_secs())
}

pub fn ser_number_of_bytes<S: serde::Serializer>(value: &NumberOfBytes, ser: S) -> Result<S::Ok, S::Error> {
    ser.serialize_i64(value.0.get())
}

pub fn ser_peer_id<S: serde::Serializer>(peer_id: &PeerId, ser: S) -> Result<S::Ok, S::Error> {
    let mut buf = [0u8; 40];
    match binascii::bin2hex(&peer_id.0, &mut buf) {
        Ok(hex) => ser.serialize_str(std::str::from_utf8(hex).unwrap_or_default()),
        Err(_) => ser.serialize_str(""),
    }
}

/// Test-only peer builder, exposed (not gated by `cfg(test)`) so downstream
/// crates' own tests can build fixtures without a dev-dependency cycle.
pub mod fixture {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use aquatic_udp_protocol::{NumberOfBytes, PeerId};

    use super::{AnnounceKey, Connectable, Peer};
    use crate::announce_event::AnnounceEvent;
    use crate::DurationSinceUnixEpoch;

    /// Builder for [`Peer`] fixtures in tests.
    pub struct PeerBuilder {
        peer: Peer,
    }

    impl Default for PeerBuilder {
        fn default() -> Self {
            Self {
                peer: Peer {
                    user_id: Some(1),
                    peer_id: PeerId(*b"-qB00000000000000000"),
                    peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080),
                    updated_at: DurationSinceUnixEpoch::new(0, 0),
                    uploaded: NumberOfBytes::new(0),
                    downloaded: NumberOfBytes::new(0),
                    left: NumberOfBytes::new(0),
                    event: AnnounceEvent::Started,
                    announce_key: AnnounceKey::generate(),
                    connectable: Connectable::Unknown,
                },
            }
        }
    }

    impl PeerBuilder {
        #[must_use]
        pub fn with_peer_addr(mut self, addr: SocketAddr) -> Self {
            self.peer.peer_addr = addr;
            self
        }

        #[must_use]
        pub fn with_left(mut self, left: i64) -> Self {
            self.peer.left = NumberOfBytes::new(left);
            self
        }

        #[must_use]
        pub fn with_user_id(mut self, user_id: Option<i64>) -> Self {
            self.peer.user_id = user_id;
            self
        }

        #[must_use]
        pub fn into_peer(self) -> Peer {
            self.peer
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use super::{AnnounceKey, PeerKey};

    #[test]
    fn announce_key_roundtrips_through_its_hex_string() {
        let key = AnnounceKey::generate();
        let hex = key.to_string();
        assert_eq!(hex.len(), 16);
        let parsed: AnnounceKey = hex.parse().unwrap();
        assert_eq!(key, parsed);
    }

    #[test]
    fn peer_key_is_derived_from_the_socket_address() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 6881);
        let key = PeerKey::from(addr);
        assert_eq!(key.ip, addr.ip());
        assert_eq!(key.port, addr.port());
    }
}
