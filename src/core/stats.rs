//! The stats pipeline (C9): a lock-free multi-writer buffer of per-user and
//! per-torrent deltas, drained periodically into the durable store.
use dashmap::DashMap;
use privateer_tracker_primitives::DurationSinceUnixEpoch;
use tracing::warn;

use crate::core::databases::Database;

/// Accumulated `(uploaded, downloaded)` delta for one user, in bytes, after
/// multiplier application (§4.6).
#[derive(Debug, Clone, Copy, Default)]
pub struct UserDelta {
    pub uploaded: u64,
    pub downloaded: u64,
}

/// The last-known `(seeders, leechers)` for one torrent, overwritten (not
/// accumulated) by each sync pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct TorrentSnapshot {
    pub seeders: u32,
    pub leechers: u32,
    pub completed_delta: u32,
}

/// Multi-writer, single-drainer accounting buffer. Writers add under a
/// `DashMap` shard lock (short, uncontended in practice); the drain swaps
/// each map out for a fresh one, so readers never block on a full scan.
#[derive(Default)]
pub struct StatsBuffer {
    user_deltas: DashMap<i64, UserDelta>,
    torrent_snapshots: DashMap<i64, TorrentSnapshot>,
}

impl StatsBuffer {
    /// Records one announce's byte deltas for `user_id`. Anonymous
    /// (`user_id = None`) announces — always true for UDP, per design note
    /// (b) — are dropped, since there is no user row to credit.
    pub fn record_user_delta(&self, user_id: Option<i64>, uploaded: u64, downloaded: u64) {
        let Some(user_id) = user_id else {
            return;
        };
        let mut entry = self.user_deltas.entry(user_id).or_default();
        entry.uploaded += uploaded;
        entry.downloaded += downloaded;
    }

    /// Overwrites the latest snapshot for `torrent_id` and accumulates the
    /// completed-count delta observed since the last sync (§4.4.4).
    pub fn record_torrent_snapshot(&self, torrent_id: i64, seeders: u32, leechers: u32, completed_delta: u32) {
        let mut entry = self.torrent_snapshots.entry(torrent_id).or_insert_with(TorrentSnapshot::default);
        entry.seeders = seeders;
        entry.leechers = leechers;
        entry.completed_delta += completed_delta;
    }

    /// Drains both maps in a single retain pass each, returning their
    /// contents and leaving the buffer empty for the next accounting period.
    fn drain(&self) -> (Vec<(i64, UserDelta)>, Vec<(i64, TorrentSnapshot)>) {
        let mut users = Vec::new();
        self.user_deltas.retain(|key, value| {
            users.push((*key, *value));
            false
        });

        let mut torrents = Vec::new();
        self.torrent_snapshots.retain(|key, value| {
            torrents.push((*key, *value));
            false
        });

        (users, torrents)
    }
}

/// Drains the buffer and applies every entry to the durable store. Failures
/// on a single key are logged and skipped — the tracker prefers request-path
/// availability over exact per-announce durability (§4.6).
pub async fn collect(buffer: &StatsBuffer, database: &dyn Database, now: DurationSinceUnixEpoch) {
    let (users, torrents) = buffer.drain();

    for (user_id, delta) in users {
        if let Err(error) = database.apply_user_delta(user_id, delta.uploaded, delta.downloaded, now).await {
            warn!(%user_id, %error, "failed to persist user stats delta, dropping it");
        }
    }

    for (torrent_id, snapshot) in torrents {
        if let Err(error) = database
            .set_torrent_snapshot(torrent_id, snapshot.seeders, snapshot.leechers, snapshot.completed_delta)
            .await
        {
            warn!(%torrent_id, %error, "failed to persist torrent snapshot, dropping it");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StatsBuffer;

    #[test]
    fn an_anonymous_announce_contributes_no_user_delta() {
        let buffer = StatsBuffer::default();
        buffer.record_user_delta(None, 100, 200);
        assert!(buffer.user_deltas.is_empty());
    }

    #[test]
    fn user_deltas_accumulate_across_announces() {
        let buffer = StatsBuffer::default();
        buffer.record_user_delta(Some(1), 100, 0);
        buffer.record_user_delta(Some(1), 50, 10);
        let entry = buffer.user_deltas.get(&1).unwrap();
        assert_eq!(entry.uploaded, 150);
        assert_eq!(entry.downloaded, 10);
    }

    #[test]
    fn torrent_snapshots_overwrite_but_accumulate_completed_delta() {
        let buffer = StatsBuffer::default();
        buffer.record_torrent_snapshot(7, 1, 2, 1);
        buffer.record_torrent_snapshot(7, 3, 4, 1);
        let entry = buffer.torrent_snapshots.get(&7).unwrap();
        assert_eq!(entry.seeders, 3);
        assert_eq!(entry.leechers, 4);
        assert_eq!(entry.completed_delta, 2);
    }
}
