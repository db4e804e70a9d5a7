//! The swarm registry (C8): the `info_hash -> worker` map, with get-or-create
//! semantics and whitelist enforcement (§4.5).
use std::sync::Arc;

use dashmap::DashMap;
use privateer_tracker_primitives::info_hash::InfoHash;

use super::peer_storage::PeerStorageBackend;
use super::worker::SwarmWorker;

/// Why [`SwarmRegistry::get_or_create`] refused to hand back a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("torrent is not on the whitelist and whitelist enforcement is enabled")]
    NotWhitelisted,
}

/// A torrent row freshly created for a first-seen `info_hash`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTorrent {
    pub info_hash: InfoHash,
}

/// Looks up an existing torrent row, or tells the registry to create one.
///
/// Kept as a trait so the registry does not depend on the database crate
/// directly; the core wires a real implementation backed by the `Database`
/// trait.
#[async_trait::async_trait]
pub trait TorrentDirectory: Send + Sync {
    /// Returns `(torrent_id, completed)` for a known `info_hash`, or the
    /// registry creates one via [`TorrentDirectory::create`] when absent and
    /// whitelist enforcement allows it.
    async fn lookup(&self, info_hash: &InfoHash) -> Option<(i64, u32)>;

    async fn is_whitelisted(&self, info_hash: &InfoHash) -> bool;

    /// Inserts a new torrent row, race-safe: two concurrent first announces
    /// for the same `info_hash` must agree on one `torrent_id`.
    async fn create(&self, info_hash: &InfoHash) -> i64;
}

/// The `info_hash -> worker` map. One worker per currently-active torrent.
pub struct SwarmRegistry {
    workers: DashMap<InfoHash, Arc<SwarmWorker>>,
    storage: Arc<dyn PeerStorageBackend>,
    enforce_whitelist: bool,
}

impl SwarmRegistry {
    #[must_use]
    pub fn new(storage: Arc<dyn PeerStorageBackend>, enforce_whitelist: bool) -> Self {
        Self {
            workers: DashMap::new(),
            storage,
            enforce_whitelist,
        }
    }

    /// Returns the worker for `info_hash`, creating both the torrent row (if
    /// unknown) and the worker (if not yet active) as needed (§4.5).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotWhitelisted`] when whitelist enforcement
    /// is on and the torrent has neither a row nor a whitelist entry.
    pub async fn get_or_create(&self, info_hash: &InfoHash, directory: &dyn TorrentDirectory) -> Result<Arc<SwarmWorker>, RegistryError> {
        if let Some(worker) = self.workers.get(info_hash) {
            return Ok(worker.clone());
        }

        let (torrent_id, completed) = match directory.lookup(info_hash).await {
            Some(existing) => existing,
            None => {
                if self.enforce_whitelist && !directory.is_whitelisted(info_hash).await {
                    return Err(RegistryError::NotWhitelisted);
                }
                let torrent_id = directory.create(info_hash).await;
                (torrent_id, 0)
            }
        };

        let worker = self
            .workers
            .entry(*info_hash)
            .or_insert_with(|| Arc::new(SwarmWorker::new(*info_hash, torrent_id, completed, self.storage.clone())))
            .clone();

        Ok(worker)
    }

    /// Removes every worker left with no active peers, after running their
    /// own peer-expiry pass (§4.4.3).
    pub async fn sweep_idle_workers(&self, now: privateer_tracker_primitives::DurationSinceUnixEpoch) {
        let mut idle = Vec::new();
        for entry in self.workers.iter() {
            entry.value().cleanup_expired(now).await;
            if entry.value().is_empty().await {
                idle.push(*entry.key());
            }
        }
        for info_hash in idle {
            self.workers.remove(&info_hash);
        }
    }

    /// Drains `(torrent_id, seeders, leechers, completed_delta)` from every
    /// active worker, for the periodic torrent-stat sync (§4.4.4).
    pub async fn sync_snapshots(&self) -> Vec<(i64, u32, u32, u32)> {
        let workers: Vec<Arc<SwarmWorker>> = self.workers.iter().map(|entry| entry.value().clone()).collect();
        let mut snapshots = Vec::with_capacity(workers.len());
        for worker in workers {
            snapshots.push(worker.sync_snapshot().await);
        }
        snapshots
    }

    #[must_use]
    pub fn active_torrent_count(&self) -> usize {
        self.workers.len()
    }

    /// Snapshots every active worker for the bonus calculator (§4.9).
    pub async fn bonus_snapshots(&self) -> Vec<(i64, u32, u32, Vec<i64>)> {
        let workers: Vec<Arc<SwarmWorker>> = self.workers.iter().map(|entry| entry.value().clone()).collect();
        let mut snapshots = Vec::with_capacity(workers.len());
        for worker in workers {
            snapshots.push(worker.bonus_snapshot().await);
        }
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::{RegistryError, SwarmRegistry, TorrentDirectory};
    use crate::core::swarm::peer_storage::MemoryPeerStorage;
    use privateer_tracker_primitives::info_hash::InfoHash;

    struct FakeDirectory {
        known: bool,
        whitelisted: bool,
        next_id: AtomicI64,
    }

    #[async_trait::async_trait]
    impl TorrentDirectory for FakeDirectory {
        async fn lookup(&self, _info_hash: &InfoHash) -> Option<(i64, u32)> {
            self.known.then_some((1, 0))
        }

        async fn is_whitelisted(&self, _info_hash: &InfoHash) -> bool {
            self.whitelisted
        }

        async fn create(&self, _info_hash: &InfoHash) -> i64 {
            self.next_id.fetch_add(1, Ordering::SeqCst)
        }
    }

    fn registry(enforce_whitelist: bool) -> SwarmRegistry {
        SwarmRegistry::new(std::sync::Arc::new(MemoryPeerStorage::default()), enforce_whitelist)
    }

    #[tokio::test]
    async fn a_known_torrent_gets_a_worker_without_needing_the_whitelist() {
        let registry = registry(true);
        let directory = FakeDirectory {
            known: true,
            whitelisted: false,
            next_id: AtomicI64::new(2),
        };

        let worker = registry.get_or_create(&InfoHash::from_bytes(&[1u8; 20]), &directory).await;
        assert!(worker.is_ok());
    }

    #[tokio::test]
    async fn an_unknown_unwhitelisted_torrent_is_refused_when_enforcement_is_on() {
        let registry = registry(true);
        let directory = FakeDirectory {
            known: false,
            whitelisted: false,
            next_id: AtomicI64::new(2),
        };

        let result = registry.get_or_create(&InfoHash::from_bytes(&[2u8; 20]), &directory).await;
        assert_eq!(result.unwrap_err(), RegistryError::NotWhitelisted);
    }

    #[tokio::test]
    async fn an_unknown_torrent_is_auto_registered_when_enforcement_is_off() {
        let registry = registry(false);
        let directory = FakeDirectory {
            known: false,
            whitelisted: false,
            next_id: AtomicI64::new(2),
        };

        let result = registry.get_or_create(&InfoHash::from_bytes(&[3u8; 20]), &directory).await;
        assert!(result.is_ok());
        assert_eq!(registry.active_torrent_count(), 1);
    }

    #[tokio::test]
    async fn the_same_info_hash_returns_the_same_worker() {
        let registry = registry(false);
        let directory = FakeDirectory {
            known: false,
            whitelisted: false,
            next_id: AtomicI64::new(5),
        };
        let info_hash = InfoHash::from_bytes(&[4u8; 20]);

        let a = registry.get_or_create(&info_hash, &directory).await.unwrap();
        let b = registry.get_or_create(&info_hash, &directory).await.unwrap();
        assert!(std::sync::Arc::ptr_eq(&a, &b));
    }
}
