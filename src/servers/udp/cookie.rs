//! The connection-id registry BEP 15's `Connect` handshake requires before a
//! peer may announce or scrape (§4.1).
//!
//! Connection ids are issued on demand, not derived deterministically: each
//! successful `Connect` draws a fresh value from a CSPRNG and stores it in a
//! map keyed by the issuing address, next to its expiry. `check` looks the id
//! up again on the following announce/scrape and rejects anything expired,
//! unknown, or issued to a different remote address. `sweep_expired` is
//! driven by a background job (`bootstrap::jobs`) rather than on every
//! lookup, so a burst of expired entries doesn't pile up work on the request
//! path.
use std::net::SocketAddr;
use std::time::Duration;

use aquatic_udp_protocol::ConnectionId;
use dashmap::DashMap;
use privateer_tracker_primitives::DurationSinceUnixEpoch;
use rand::RngCore;

/// Why a connection id presented on an announce/scrape could not be
/// accepted.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("connection id was never issued, or has already been swept")]
    Unknown,
    #[error("connection id expired")]
    Expired,
    #[error("connection id was issued to a different address")]
    AddressMismatch,
}

struct Entry {
    remote_address: SocketAddr,
    expires_at: DurationSinceUnixEpoch,
}

/// A connection-id registry with a fixed time-to-live per entry.
pub struct ConnectionIdRegistry {
    entries: DashMap<ConnectionId, Entry>,
    ttl: Duration,
}

impl ConnectionIdRegistry {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Draws a fresh connection id for `remote_address` and stores it,
    /// valid until `now + ttl`.
    pub fn issue(&self, remote_address: SocketAddr, now: DurationSinceUnixEpoch) -> ConnectionId {
        loop {
            let candidate = ConnectionId(rand::thread_rng().next_u64() as i64);

            if let dashmap::mapref::entry::Entry::Vacant(vacant) = self.entries.entry(candidate) {
                vacant.insert(Entry {
                    remote_address,
                    expires_at: now + self.ttl,
                });
                return candidate;
            }
        }
    }

    /// Checks that `connection_id` was issued to `remote_address` and has
    /// not yet expired.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] describing why the id was rejected.
    pub fn check(&self, remote_address: SocketAddr, connection_id: ConnectionId, now: DurationSinceUnixEpoch) -> Result<(), Error> {
        let entry = self.entries.get(&connection_id).ok_or(Error::Unknown)?;

        if entry.expires_at < now {
            return Err(Error::Expired);
        }

        if entry.remote_address != remote_address {
            return Err(Error::AddressMismatch);
        }

        Ok(())
    }

    /// Removes every entry that has expired by `now`.
    pub fn sweep_expired(&self, now: DurationSinceUnixEpoch) {
        self.entries.retain(|_, entry| entry.expires_at >= now);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::time::Duration;

    use super::{ConnectionIdRegistry, Error};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    #[test]
    fn an_issued_connection_id_checks_out_for_its_own_address() {
        let registry = ConnectionIdRegistry::new(Duration::from_secs(120));
        let now = Duration::from_secs(1_000);

        let id = registry.issue(addr(6969), now);

        assert!(registry.check(addr(6969), id, now).is_ok());
    }

    #[test]
    fn an_unknown_connection_id_is_rejected() {
        let registry = ConnectionIdRegistry::new(Duration::from_secs(120));
        let now = Duration::from_secs(1_000);

        let result = registry.check(addr(6969), aquatic_udp_protocol::ConnectionId(42), now);

        assert_eq!(result.unwrap_err(), Error::Unknown);
    }

    #[test]
    fn a_connection_id_is_rejected_once_it_expires() {
        let registry = ConnectionIdRegistry::new(Duration::from_secs(120));
        let now = Duration::from_secs(1_000);

        let id = registry.issue(addr(6969), now);

        let result = registry.check(addr(6969), id, now + Duration::from_secs(121));
        assert_eq!(result.unwrap_err(), Error::Expired);
    }

    #[test]
    fn a_connection_id_is_rejected_for_a_different_address() {
        let registry = ConnectionIdRegistry::new(Duration::from_secs(120));
        let now = Duration::from_secs(1_000);

        let id = registry.issue(addr(6969), now);

        let result = registry.check(addr(7070), id, now);
        assert_eq!(result.unwrap_err(), Error::AddressMismatch);
    }

    #[test]
    fn sweeping_removes_only_expired_entries() {
        let registry = ConnectionIdRegistry::new(Duration::from_secs(120));
        let now = Duration::from_secs(1_000);

        registry.issue(addr(6969), now);
        registry.issue(addr(7070), now + Duration::from_secs(200));

        registry.sweep_expired(now + Duration::from_secs(121));

        assert_eq!(registry.len(), 1);
    }
}
