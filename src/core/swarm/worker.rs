//! The swarm worker (C7): the single-owner actor for one `info_hash`'s
//! announce processing, peer lifecycle, and periodic DB sync.
//!
//! Concurrency note (§9): this is implemented as a `tokio::sync::Mutex`
//! guarding the worker's mutable state rather than a literal spawned task.
//! The contract that matters — announces for the same `info_hash` serialize,
//! different `info_hash` values run in parallel — holds either way; see
//! [`super::registry::SwarmRegistry`] for the sharded-map side of this.
use std::net::SocketAddr;
use std::sync::Arc;

use aquatic_udp_protocol::PeerId;
use privateer_tracker_primitives::announce_event::AnnounceEvent;
use privateer_tracker_primitives::info_hash::InfoHash;
use privateer_tracker_primitives::peer::{AnnounceKey, Peer, PeerKey};
use privateer_tracker_primitives::DurationSinceUnixEpoch;
use rand::seq::SliceRandom;
use tokio::sync::Mutex;

use super::peer_storage::PeerStorageBackend;

/// A peer is active iff it announced within this window (§4.4.3).
pub const PEER_TIMEOUT_SECS: u64 = 3_600;

/// The maximum peer list length the swarm ever returns, irrespective of a
/// client's requested `num_want` (§4.4.1 step 7).
pub const MAX_PEERS_RETURNED: usize = 50;

/// One announce's reported state, transport-agnostic.
#[derive(Debug, Clone)]
pub struct AnnounceInput {
    pub user_id: Option<i64>,
    pub peer_addr: SocketAddr,
    pub peer_id: PeerId,
    pub left: i64,
    pub uploaded: i64,
    pub downloaded: i64,
    pub event: AnnounceEvent,
    /// The anti-spoof key carried on the request, if any.
    pub key: Option<AnnounceKey>,
    pub num_want: i32,
    pub prefer_seeders: bool,
}

/// Successful announce outcome (§4.4.1 step 8).
#[derive(Debug, Clone)]
pub struct AnnounceOutcome {
    pub seeders: u32,
    pub leechers: u32,
    pub peers: Vec<Peer>,
    pub uploaded_delta: u64,
    pub downloaded_delta: u64,
    pub announce_key: AnnounceKey,
    pub completed_this_announce: bool,
    /// Seconds of seeding credited by this announce, clamped per the abuse
    /// cap (invariant 7, design note c). Zero unless the peer is seeding.
    pub seedtime_delta: u64,
}

/// Why an announce was rejected by the anti-spoof check (§4.4.1 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AnnounceError {
    #[error("this peer was issued a key and must supply it")]
    KeyRequired,
    #[error("the supplied key does not match the one issued to this peer")]
    InvalidKey,
}

struct WorkerState {
    torrent_id: i64,
    completed: u32,
    completed_delta: u32,
}

/// One logical actor per active `info_hash`.
pub struct SwarmWorker {
    info_hash: InfoHash,
    storage: Arc<dyn PeerStorageBackend>,
    state: Mutex<WorkerState>,
}

impl SwarmWorker {
    #[must_use]
    pub fn new(info_hash: InfoHash, torrent_id: i64, completed: u32, storage: Arc<dyn PeerStorageBackend>) -> Self {
        Self {
            info_hash,
            storage,
            state: Mutex::new(WorkerState {
                torrent_id,
                completed,
                completed_delta: 0,
            }),
        }
    }

    /// Processes one announce (§4.4.1). Serializes with every other
    /// announce for this `info_hash` via the state mutex.
    ///
    /// # Errors
    ///
    /// Returns [`AnnounceError`] on an anti-spoof key mismatch.
    pub async fn announce(
        &self,
        input: AnnounceInput,
        verifier: &crate::core::verifier::PeerVerifier,
        now: DurationSinceUnixEpoch,
    ) -> Result<AnnounceOutcome, AnnounceError> {
        let key = PeerKey::from(input.peer_addr);
        let old = self
            .storage
            .get_peer(&self.info_hash, &key)
            .await
            .ok()
            .flatten();

        if let Some(old_peer) = &old {
            match &input.key {
                None => return Err(AnnounceError::KeyRequired),
                Some(supplied) if *supplied != old_peer.announce_key => return Err(AnnounceError::InvalidKey),
                Some(_) => {}
            }
        }

        let uploaded_delta = delta(input.uploaded, old.as_ref().map(|p| p.uploaded.0.get()).unwrap_or(0));
        let downloaded_delta = delta(input.downloaded, old.as_ref().map(|p| p.downloaded.0.get()).unwrap_or(0));

        let announce_key = old.as_ref().map(|p| p.announce_key).unwrap_or_else(AnnounceKey::generate);

        let seedtime_delta = if input.left == 0 && input.event != AnnounceEvent::Stopped {
            old.as_ref()
                .map(|p| crate::core::snatch::clamp_seedtime_delta(now.saturating_sub(p.updated_at).as_secs()))
                .unwrap_or(0)
        } else {
            0
        };

        let mut state = self.state.lock().await;

        let mut completed_this_announce = false;

        if input.event == AnnounceEvent::Stopped {
            let _ = self.storage.delete_peer(&self.info_hash, &key).await;
        } else {
            let connectable = verifier.check_connectable(input.peer_addr, now).await;
            let new_peer = Peer {
                user_id: input.user_id,
                peer_id: input.peer_id,
                peer_addr: input.peer_addr,
                updated_at: now,
                uploaded: aquatic_udp_protocol::NumberOfBytes::new(input.uploaded),
                downloaded: aquatic_udp_protocol::NumberOfBytes::new(input.downloaded),
                left: aquatic_udp_protocol::NumberOfBytes::new(input.left),
                event: input.event,
                announce_key,
                connectable,
            };
            let _ = self.storage.put_peer(&self.info_hash, key, new_peer).await;

            if input.event == AnnounceEvent::Completed {
                state.completed += 1;
                state.completed_delta += 1;
                completed_this_announce = true;
            }
        }
        drop(state);

        let (seeders, leechers) = self.storage.get_counts(&self.info_hash).await.unwrap_or((0, 0));

        let is_requester_leecher = input.left > 0;
        let num_want = clamp_num_want(input.num_want);
        let peers = self
            .select_peers(&key, is_requester_leecher, input.prefer_seeders, num_want)
            .await;

        Ok(AnnounceOutcome {
            seeders,
            leechers,
            peers,
            uploaded_delta,
            downloaded_delta,
            announce_key,
            completed_this_announce,
            seedtime_delta,
        })
    }

    /// Peer selection policy (§4.4.2): sort ascending by
    /// `(connectable_score, seeder_score, random)`, excluding the requester.
    async fn select_peers(&self, requester: &PeerKey, requester_is_leecher: bool, prefer_seeders: bool, num_want: usize) -> Vec<Peer> {
        let all = self.storage.get_all_peers(&self.info_hash).await.unwrap_or_default();

        let mut candidates: Vec<(u8, u8, Peer)> = all
            .into_iter()
            .filter(|(key, _)| key != requester)
            .map(|(_, peer)| {
                let connectable_score = peer.connectable.score();
                let seeder_score = if requester_is_leecher && peer.is_seeder() {
                    0
                } else if !prefer_seeders {
                    0
                } else {
                    1
                };
                (connectable_score, seeder_score, peer)
            })
            .collect();

        candidates.shuffle(&mut rand::thread_rng());
        candidates.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        candidates.into_iter().take(num_want).map(|(_, _, peer)| peer).collect()
    }

    /// Cleanup pass (§4.4.3): removes inactive peers. Returns the post-
    /// cleanup peer count, so the registry can decide whether to idle out
    /// the worker.
    pub async fn cleanup_expired(&self, now: DurationSinceUnixEpoch) -> usize {
        let cutoff = now.saturating_sub(DurationSinceUnixEpoch::from_secs(PEER_TIMEOUT_SECS));
        let _ = self.storage.cleanup_expired(&self.info_hash, cutoff).await;
        self.storage.count_peers(&self.info_hash).await.unwrap_or(0)
    }

    /// Torrent-stat sync (§4.4.4): returns `(torrent_id, seeders, leechers,
    /// completed_delta)` and zeros the delta.
    pub async fn sync_snapshot(&self) -> (i64, u32, u32, u32) {
        let (seeders, leechers) = self.storage.get_counts(&self.info_hash).await.unwrap_or((0, 0));
        let mut state = self.state.lock().await;
        let delta = state.completed_delta;
        state.completed_delta = 0;
        (state.torrent_id, seeders, leechers, delta)
    }

    pub async fn is_empty(&self) -> bool {
        self.storage.count_peers(&self.info_hash).await.unwrap_or(0) == 0
    }

    /// Snapshot for the bonus calculator (§4.9): `(torrent_id, seeders,
    /// leechers, seeder_user_ids)`.
    pub async fn bonus_snapshot(&self) -> (i64, u32, u32, Vec<i64>) {
        let all = self.storage.get_all_peers(&self.info_hash).await.unwrap_or_default();
        let (mut seeders, mut leechers) = (0u32, 0u32);
        let mut seeder_user_ids = Vec::new();
        for peer in all.values() {
            if peer.is_seeder() {
                seeders += 1;
                if let Some(user_id) = peer.user_id {
                    seeder_user_ids.push(user_id);
                }
            } else {
                leechers += 1;
            }
        }
        let torrent_id = self.state.lock().await.torrent_id;
        (torrent_id, seeders, leechers, seeder_user_ids)
    }
}

fn delta(reported: i64, previous: i64) -> u64 {
    (reported - previous).max(0) as u64
}

fn clamp_num_want(num_want: i32) -> usize {
    if num_want <= 0 {
        MAX_PEERS_RETURNED
    } else {
        (num_want as usize).min(MAX_PEERS_RETURNED)
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;

    use super::{AnnounceError, AnnounceInput, SwarmWorker};
    use aquatic_udp_protocol::PeerId;
    use privateer_tracker_configuration::PeerVerification;
    use privateer_tracker_primitives::announce_event::AnnounceEvent;
    use privateer_tracker_primitives::info_hash::InfoHash;
    use privateer_tracker_primitives::DurationSinceUnixEpoch;

    fn verifier() -> crate::core::verifier::PeerVerifier {
        Arc::into_inner(crate::core::verifier::PeerVerifier::new(&PeerVerification {
            enabled: false,
            connect_timeout_ms: 100,
            cache_ttl_secs: 60,
            max_concurrent: 1,
        }))
        .expect("no other references yet")
    }

    fn worker() -> SwarmWorker {
        SwarmWorker::new(
            InfoHash::from_bytes(&[9u8; 20]),
            1,
            0,
            Arc::new(crate::core::swarm::peer_storage::MemoryPeerStorage::default()),
        )
    }

    fn input(port: u16, key: Option<privateer_tracker_primitives::peer::AnnounceKey>) -> AnnounceInput {
        AnnounceInput {
            user_id: Some(1),
            peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port),
            peer_id: PeerId(*b"-TR3000-xxxxxxxxxxxx"),
            left: 100,
            uploaded: 0,
            downloaded: 0,
            event: AnnounceEvent::Started,
            key,
            num_want: 50,
            prefer_seeders: true,
        }
    }

    #[tokio::test]
    async fn a_first_announce_needs_no_key_and_issues_one() {
        let worker = worker();
        let v = verifier();
        let outcome = worker
            .announce(input(6881, None), &v, DurationSinceUnixEpoch::from_secs(0))
            .await
            .unwrap();
        assert_eq!(outcome.leechers, 1);
    }

    #[tokio::test]
    async fn a_second_announce_without_the_issued_key_is_rejected() {
        let worker = worker();
        let v = verifier();
        let first = worker
            .announce(input(6881, None), &v, DurationSinceUnixEpoch::from_secs(0))
            .await
            .unwrap();
        let _ = first;

        let result = worker.announce(input(6881, None), &v, DurationSinceUnixEpoch::from_secs(1)).await;
        assert_eq!(result.unwrap_err(), AnnounceError::KeyRequired);
    }

    #[tokio::test]
    async fn a_second_announce_with_the_right_key_succeeds() {
        let worker = worker();
        let v = verifier();
        let first = worker
            .announce(input(6881, None), &v, DurationSinceUnixEpoch::from_secs(0))
            .await
            .unwrap();

        let second = worker
            .announce(input(6881, Some(first.announce_key)), &v, DurationSinceUnixEpoch::from_secs(1))
            .await
            .unwrap();

        assert_eq!(second.announce_key, first.announce_key);
    }

    #[tokio::test]
    async fn the_requester_never_appears_in_its_own_peer_list() {
        let worker = worker();
        let v = verifier();
        let outcome = worker
            .announce(input(6881, None), &v, DurationSinceUnixEpoch::from_secs(0))
            .await
            .unwrap();

        assert!(outcome.peers.iter().all(|p| p.peer_addr.port() != 6881));
    }
}
