//! The pluggable peer-storage backend (C6): the contract a swarm worker
//! uses to read and mutate its peer set, substitutable between an
//! in-process map and an external, shared store.
use std::collections::HashMap;
use std::panic::Location;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use privateer_tracker_primitives::info_hash::InfoHash;
use privateer_tracker_primitives::peer::{Peer, PeerKey};
use privateer_tracker_primitives::DurationSinceUnixEpoch;

/// Failure reaching or using a peer-storage backend.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("the external peer-storage backend is not available in this build, {location}")]
    ExternalBackendUnavailable { location: &'static Location<'static> },
}

/// Behavioral contract of §4.2's peer-storage backend. Every method is
/// scoped to one `info_hash`; atomicity is per-call, not across calls.
#[async_trait]
pub trait PeerStorageBackend: Send + Sync {
    async fn get_peer(&self, info_hash: &InfoHash, key: &PeerKey) -> Result<Option<Peer>, Error>;

    /// Overwrites the peer at `key`. Must update the peer data and its
    /// timestamp index as one observable step.
    async fn put_peer(&self, info_hash: &InfoHash, key: PeerKey, peer: Peer) -> Result<(), Error>;

    async fn delete_peer(&self, info_hash: &InfoHash, key: &PeerKey) -> Result<(), Error>;

    async fn get_all_peers(&self, info_hash: &InfoHash) -> Result<HashMap<PeerKey, Peer>, Error>;

    async fn count_peers(&self, info_hash: &InfoHash) -> Result<usize, Error>;

    /// Removes every peer with `updated_at < cutoff`. Returns the number
    /// removed.
    async fn cleanup_expired(&self, info_hash: &InfoHash, cutoff: DurationSinceUnixEpoch) -> Result<usize, Error>;

    /// `(seeders, leechers)` among the currently stored peers.
    async fn get_counts(&self, info_hash: &InfoHash) -> Result<(u32, u32), Error>;

    async fn clear(&self, info_hash: &InfoHash) -> Result<(), Error>;
}

/// The single-node, in-process peer store: one `DashMap` of swarms, each a
/// `DashMap` of peers.
#[derive(Default)]
pub struct MemoryPeerStorage {
    swarms: DashMap<InfoHash, Arc<DashMap<PeerKey, Peer>>>,
}

impl MemoryPeerStorage {
    fn swarm(&self, info_hash: &InfoHash) -> Arc<DashMap<PeerKey, Peer>> {
        self.swarms.entry(*info_hash).or_default().clone()
    }
}

#[async_trait]
impl PeerStorageBackend for MemoryPeerStorage {
    async fn get_peer(&self, info_hash: &InfoHash, key: &PeerKey) -> Result<Option<Peer>, Error> {
        Ok(self.swarm(info_hash).get(key).map(|entry| entry.value().clone()))
    }

    async fn put_peer(&self, info_hash: &InfoHash, key: PeerKey, peer: Peer) -> Result<(), Error> {
        self.swarm(info_hash).insert(key, peer);
        Ok(())
    }

    async fn delete_peer(&self, info_hash: &InfoHash, key: &PeerKey) -> Result<(), Error> {
        self.swarm(info_hash).remove(key);
        Ok(())
    }

    async fn get_all_peers(&self, info_hash: &InfoHash) -> Result<HashMap<PeerKey, Peer>, Error> {
        Ok(self
            .swarm(info_hash)
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect())
    }

    async fn count_peers(&self, info_hash: &InfoHash) -> Result<usize, Error> {
        Ok(self.swarm(info_hash).len())
    }

    async fn cleanup_expired(&self, info_hash: &InfoHash, cutoff: DurationSinceUnixEpoch) -> Result<usize, Error> {
        let swarm = self.swarm(info_hash);
        let expired: Vec<PeerKey> = swarm
            .iter()
            .filter(|entry| entry.value().updated_at < cutoff)
            .map(|entry| *entry.key())
            .collect();

        for key in &expired {
            swarm.remove(key);
        }

        Ok(expired.len())
    }

    async fn get_counts(&self, info_hash: &InfoHash) -> Result<(u32, u32), Error> {
        let swarm = self.swarm(info_hash);
        #[allow(clippy::cast_possible_truncation)]
        let (mut seeders, mut leechers) = (0u32, 0u32);
        for entry in swarm.iter() {
            if entry.value().is_seeder() {
                seeders += 1;
            } else {
                leechers += 1;
            }
        }
        Ok((seeders, leechers))
    }

    async fn clear(&self, info_hash: &InfoHash) -> Result<(), Error> {
        self.swarms.remove(info_hash);
        Ok(())
    }
}

/// A remote, shared peer store for multi-node operation. No wire client is
/// bundled with the core; deployments that select this backend must supply
/// one out of tree. See `DESIGN.md`.
pub struct ExternalPeerStorage {
    #[allow(dead_code)]
    url: String,
}

impl ExternalPeerStorage {
    #[must_use]
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

#[async_trait]
impl PeerStorageBackend for ExternalPeerStorage {
    async fn get_peer(&self, _info_hash: &InfoHash, _key: &PeerKey) -> Result<Option<Peer>, Error> {
        Err(Error::ExternalBackendUnavailable { location: Location::caller() })
    }

    async fn put_peer(&self, _info_hash: &InfoHash, _key: PeerKey, _peer: Peer) -> Result<(), Error> {
        Err(Error::ExternalBackendUnavailable { location: Location::caller() })
    }

    async fn delete_peer(&self, _info_hash: &InfoHash, _key: &PeerKey) -> Result<(), Error> {
        Err(Error::ExternalBackendUnavailable { location: Location::caller() })
    }

    async fn get_all_peers(&self, _info_hash: &InfoHash) -> Result<HashMap<PeerKey, Peer>, Error> {
        Err(Error::ExternalBackendUnavailable { location: Location::caller() })
    }

    async fn count_peers(&self, _info_hash: &InfoHash) -> Result<usize, Error> {
        Err(Error::ExternalBackendUnavailable { location: Location::caller() })
    }

    async fn cleanup_expired(&self, _info_hash: &InfoHash, _cutoff: DurationSinceUnixEpoch) -> Result<usize, Error> {
        Err(Error::ExternalBackendUnavailable { location: Location::caller() })
    }

    async fn get_counts(&self, _info_hash: &InfoHash) -> Result<(u32, u32), Error> {
        Err(Error::ExternalBackendUnavailable { location: Location::caller() })
    }

    async fn clear(&self, _info_hash: &InfoHash) -> Result<(), Error> {
        Err(Error::ExternalBackendUnavailable { location: Location::caller() })
    }
}

/// Builds the configured backend.
#[must_use]
pub fn build(config: &privateer_tracker_configuration::PeerStorage) -> Arc<dyn PeerStorageBackend> {
    match config {
        privateer_tracker_configuration::PeerStorage::Memory => Arc::new(MemoryPeerStorage::default()),
        privateer_tracker_configuration::PeerStorage::External { url } => Arc::new(ExternalPeerStorage::new(url.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryPeerStorage, PeerStorageBackend};
    use privateer_tracker_primitives::info_hash::InfoHash;
    use privateer_tracker_primitives::peer::fixture::PeerBuilder;
    use privateer_tracker_primitives::DurationSinceUnixEpoch;

    fn info_hash() -> InfoHash {
        InfoHash::from_bytes(&[1u8; 20])
    }

    #[tokio::test]
    async fn a_stored_peer_can_be_retrieved_by_key() {
        let storage = MemoryPeerStorage::default();
        let peer = PeerBuilder::default().into_peer();
        let key = peer.key();

        storage.put_peer(&info_hash(), key, peer.clone()).await.unwrap();

        let fetched = storage.get_peer(&info_hash(), &key).await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn cleanup_expired_removes_only_stale_peers() {
        let storage = MemoryPeerStorage::default();

        let fresh = PeerBuilder::default()
            .with_peer_addr("127.0.0.1:1".parse().unwrap())
            .into_peer();
        let mut stale = PeerBuilder::default()
            .with_peer_addr("127.0.0.1:2".parse().unwrap())
            .into_peer();
        stale.updated_at = DurationSinceUnixEpoch::from_secs(0);

        storage.put_peer(&info_hash(), fresh.key(), fresh.clone()).await.unwrap();
        storage.put_peer(&info_hash(), stale.key(), stale.clone()).await.unwrap();

        let removed = storage
            .cleanup_expired(&info_hash(), DurationSinceUnixEpoch::from_secs(1))
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(storage.get_peer(&info_hash(), &stale.key()).await.unwrap().is_none());
        assert!(storage.get_peer(&info_hash(), &fresh.key()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn counts_split_seeders_from_leechers() {
        let storage = MemoryPeerStorage::default();

        let seeder = PeerBuilder::default()
            .with_peer_addr("127.0.0.1:1".parse().unwrap())
            .with_left(0)
            .into_peer();
        let leecher = PeerBuilder::default()
            .with_peer_addr("127.0.0.1:2".parse().unwrap())
            .with_left(100)
            .into_peer();

        storage.put_peer(&info_hash(), seeder.key(), seeder).await.unwrap();
        storage.put_peer(&info_hash(), leecher.key(), leecher).await.unwrap();

        assert_eq!(storage.get_counts(&info_hash()).await.unwrap(), (1, 1));
    }
}
