//! The gate cache (C4): the in-memory reflection of durable passkey, client
//! whitelist, and ban-list state that every request is checked against.
//!
//! The three tables share one contract: loaded from the durable store at
//! startup, mutated only through [`GateCache`]'s own methods (which also
//! write through to the store), and queried read-mostly on the hot path
//! without hopping across threads.
use std::collections::HashMap;
use std::net::IpAddr;
use std::panic::Location;
use std::sync::RwLock;

use privateer_tracker_primitives::passkey::Passkey;

use crate::core::databases::Database;

/// A client-id prefix, 1 to 8 raw bytes (§3 Whitelist entry).
pub type ClientPrefix = Vec<u8>;

/// An IP address or a CIDR block (`addr` alone, or `addr/prefix_len`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpMatcher {
    Exact(IpAddr),
    Cidr { base: IpAddr, prefix_len: u8 },
}

/// Failure parsing a ban's `ip` field.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ParseIpMatcherError {
    #[error("invalid IP address {raw:?}, {location}")]
    InvalidAddress { raw: String, location: &'static Location<'static> },
    #[error("invalid CIDR prefix length {prefix_len} for {raw:?}, {location}")]
    InvalidPrefixLength {
        raw: String,
        prefix_len: u32,
        location: &'static Location<'static>,
    },
}

impl IpMatcher {
    /// Parses either a bare address (`"10.1.2.3"`) or a CIDR block
    /// (`"10.0.0.0/8"`).
    ///
    /// # Errors
    ///
    /// Returns [`ParseIpMatcherError`] if the address or prefix length do
    /// not parse.
    #[track_caller]
    pub fn parse(raw: &str) -> Result<Self, ParseIpMatcherError> {
        match raw.split_once('/') {
            None => {
                let addr: IpAddr = raw.parse().map_err(|_| ParseIpMatcherError::InvalidAddress {
                    raw: raw.to_string(),
                    location: Location::caller(),
                })?;
                Ok(IpMatcher::Exact(addr))
            }
            Some((addr_part, prefix_part)) => {
                let base: IpAddr = addr_part.parse().map_err(|_| ParseIpMatcherError::InvalidAddress {
                    raw: raw.to_string(),
                    location: Location::caller(),
                })?;
                let prefix_len: u32 = prefix_part.parse().map_err(|_| ParseIpMatcherError::InvalidPrefixLength {
                    raw: raw.to_string(),
                    prefix_len: 0,
                    location: Location::caller(),
                })?;
                let max = if base.is_ipv4() { 32 } else { 128 };
                if prefix_len > max {
                    return Err(ParseIpMatcherError::InvalidPrefixLength {
                        raw: raw.to_string(),
                        prefix_len,
                        location: Location::caller(),
                    });
                }
                #[allow(clippy::cast_possible_truncation)]
                Ok(IpMatcher::Cidr {
                    base,
                    prefix_len: prefix_len as u8,
                })
            }
        }
    }

    /// Invariant (ban containment): `contains(ip)` holds iff `ip` equals the
    /// matcher, or falls within its CIDR block.
    #[must_use]
    pub fn contains(&self, ip: IpAddr) -> bool {
        match self {
            IpMatcher::Exact(addr) => *addr == ip,
            IpMatcher::Cidr { base, prefix_len } => match (base, ip) {
                (IpAddr::V4(base), IpAddr::V4(ip)) => {
                    let mask = mask_u32(*prefix_len);
                    u32::from(*base) & mask == u32::from(ip) & mask
                }
                (IpAddr::V6(base), IpAddr::V6(ip)) => {
                    let mask = mask_u128(*prefix_len);
                    u128::from(*base) & mask == u128::from(ip) & mask
                }
                _ => false,
            },
        }
    }
}

fn mask_u32(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix_len))
    }
}

fn mask_u128(prefix_len: u8) -> u128 {
    if prefix_len == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix_len))
    }
}

#[derive(Debug, Clone)]
pub struct BanRecord {
    pub matcher: IpMatcher,
    pub reason: String,
    pub expires_at: Option<privateer_tracker_primitives::DurationSinceUnixEpoch>,
}

/// The outcome of [`GateCache::check_banned`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BanCheck {
    Ok,
    Banned { reason: String },
}

/// In-memory reflection of the passkey table, client whitelist, and ban
/// list, rebuildable at any time from the durable store.
pub struct GateCache {
    passkeys: RwLock<HashMap<Passkey, i64>>,
    client_whitelist: RwLock<Vec<ClientPrefix>>,
    bans: RwLock<Vec<BanRecord>>,
}

impl Default for GateCache {
    fn default() -> Self {
        Self {
            passkeys: RwLock::new(HashMap::new()),
            client_whitelist: RwLock::new(Vec::new()),
            bans: RwLock::new(Vec::new()),
        }
    }
}

impl GateCache {
    /// Rebuilds all three tables from the durable store. O(n) in the total
    /// row count.
    ///
    /// # Errors
    ///
    /// Propagates any database error encountered while loading.
    pub async fn reload(&self, database: &dyn Database) -> Result<(), crate::core::databases::error::Error> {
        let passkeys = database.load_passkeys().await?;
        let whitelist = database.load_client_whitelist().await?;
        let bans = database.load_bans().await?;

        *self.passkeys.write().unwrap() = passkeys.into_iter().collect();
        *self.client_whitelist.write().unwrap() = whitelist;
        *self.bans.write().unwrap() = bans
            .into_iter()
            .filter_map(|(ip, reason, expires_at)| {
                IpMatcher::parse(&ip).ok().map(|matcher| BanRecord { matcher, reason, expires_at })
            })
            .collect();

        Ok(())
    }

    /// Looks up the user id owning a passkey. Read-only, lock-free on the
    /// hot path beyond the `RwLock` read guard (no cross-thread hop).
    #[must_use]
    pub fn user_id_for_passkey(&self, passkey: &Passkey) -> Option<i64> {
        self.passkeys.read().unwrap().get(passkey).copied()
    }

    /// `valid_client?(peer_id)`: true iff the first 3 bytes of `peer_id` are
    /// a registered client prefix. Longer registered prefixes (up to 8
    /// bytes, used by the ban table) cannot match here — see design note (a).
    #[must_use]
    pub fn is_valid_client(&self, peer_id: &[u8]) -> bool {
        if peer_id.len() < 3 {
            return false;
        }
        let head = &peer_id[..3];
        self.client_whitelist.read().unwrap().iter().any(|prefix| prefix.as_slice() == head)
    }

    /// `check_banned(addr)`.
    #[must_use]
    pub fn check_banned(&self, addr: IpAddr, now: privateer_tracker_primitives::DurationSinceUnixEpoch) -> BanCheck {
        let bans = self.bans.read().unwrap();
        for ban in bans.iter() {
            if let Some(expires_at) = ban.expires_at {
                if now >= expires_at {
                    continue;
                }
            }
            if ban.matcher.contains(addr) {
                return BanCheck::Banned { reason: ban.reason.clone() };
            }
        }
        BanCheck::Ok
    }

    /// Admin mutation: registers a new passkey immediately in the cache,
    /// ahead of the next reload.
    pub fn insert_passkey(&self, passkey: Passkey, user_id: i64) {
        self.passkeys.write().unwrap().insert(passkey, user_id);
    }

    pub fn remove_passkey(&self, passkey: &Passkey) {
        self.passkeys.write().unwrap().remove(passkey);
    }

    pub fn insert_client_prefix(&self, prefix: ClientPrefix) {
        self.client_whitelist.write().unwrap().push(prefix);
    }

    pub fn insert_ban(&self, ban: BanRecord) {
        self.bans.write().unwrap().push(ban);
    }

    /// Removes expired bans from the in-memory table. Does not touch the
    /// durable store; that is the admin-triggered cleanup's job.
    pub fn sweep_expired_bans(&self, now: privateer_tracker_primitives::DurationSinceUnixEpoch) {
        self.bans.write().unwrap().retain(|ban| ban.expires_at.map_or(true, |expiry| now < expiry));
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::{BanCheck, BanRecord, GateCache, IpMatcher};
    use privateer_tracker_primitives::passkey::Passkey;
    use privateer_tracker_primitives::DurationSinceUnixEpoch;

    #[test]
    fn a_cidr_matcher_contains_any_address_inside_the_block() {
        let matcher = IpMatcher::parse("10.0.0.0/8").unwrap();
        assert!(matcher.contains(IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3))));
        assert!(!matcher.contains(IpAddr::V4(Ipv4Addr::new(11, 0, 0, 1))));
    }

    #[test]
    fn an_unknown_passkey_misses() {
        let gate = GateCache::default();
        let passkey: Passkey = "00000000000000000000000000000001".parse().unwrap();
        assert_eq!(gate.user_id_for_passkey(&passkey), None);
    }

    #[test]
    fn a_registered_passkey_resolves_to_its_user_id() {
        let gate = GateCache::default();
        let passkey: Passkey = "00000000000000000000000000000001".parse().unwrap();
        gate.insert_passkey(passkey.clone(), 42);
        assert_eq!(gate.user_id_for_passkey(&passkey), Some(42));
    }

    #[test]
    fn the_client_whitelist_only_checks_the_first_three_bytes() {
        let gate = GateCache::default();
        gate.insert_client_prefix(b"-TR".to_vec());
        assert!(gate.is_valid_client(b"-TR3000-xxxxxxxxxxxx"));
        assert!(!gate.is_valid_client(b"-qB3000-xxxxxxxxxxxx"));
    }

    #[test]
    fn an_expired_ban_never_matches() {
        let gate = GateCache::default();
        gate.insert_ban(BanRecord {
            matcher: IpMatcher::parse("10.1.2.3").unwrap(),
            reason: "abuse".to_string(),
            expires_at: Some(DurationSinceUnixEpoch::from_secs(100)),
        });

        let addr = IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3));
        assert_eq!(gate.check_banned(addr, DurationSinceUnixEpoch::from_secs(50)), BanCheck::Banned { reason: "abuse".to_string() });
        assert_eq!(gate.check_banned(addr, DurationSinceUnixEpoch::from_secs(150)), BanCheck::Ok);
    }
}
