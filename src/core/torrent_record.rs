//! The durable torrent row: identity, cached swarm counters, and the
//! freeleech / multiplier economy applied at stats-recording time.
use privateer_tracker_primitives::info_hash::InfoHash;
use privateer_tracker_primitives::DurationSinceUnixEpoch;

/// A torrent known to the tracker.
///
/// The `seeders`/`leechers`/`completed` fields are a cache written by the
/// swarm worker's periodic sync (§4.4.4); they lag the in-memory swarm by up
/// to the sync period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorrentRecord {
    pub id: i64,
    pub info_hash: InfoHash,
    pub seeders: u32,
    pub leechers: u32,
    pub completed: u32,
    pub freeleech: bool,
    pub freeleech_until: Option<DurationSinceUnixEpoch>,
    pub upload_multiplier: f64,
    pub download_multiplier: f64,
}

impl TorrentRecord {
    #[must_use]
    pub fn new(id: i64, info_hash: InfoHash) -> Self {
        Self {
            id,
            info_hash,
            seeders: 0,
            leechers: 0,
            completed: 0,
            freeleech: false,
            freeleech_until: None,
            upload_multiplier: 1.0,
            download_multiplier: 1.0,
        }
    }

    /// Freeleech is active iff the flag is set and, when an expiry is set,
    /// `now` has not reached it yet.
    #[must_use]
    pub fn freeleech_active(&self, now: DurationSinceUnixEpoch) -> bool {
        self.freeleech && self.freeleech_until.map_or(true, |until| now < until)
    }

    /// The download multiplier actually charged against a user's ratio:
    /// forced to `0.0` while freeleech is active.
    #[must_use]
    pub fn effective_download_multiplier(&self, now: DurationSinceUnixEpoch) -> f64 {
        if self.freeleech_active(now) {
            0.0
        } else {
            self.download_multiplier
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TorrentRecord;
    use privateer_tracker_primitives::info_hash::InfoHash;
    use privateer_tracker_primitives::DurationSinceUnixEpoch;

    fn sample() -> TorrentRecord {
        TorrentRecord::new(1, InfoHash::from_bytes(&[0u8; 20]))
    }

    #[test]
    fn freeleech_with_no_expiry_never_lapses() {
        let record = TorrentRecord { freeleech: true, ..sample() };
        assert!(record.freeleech_active(DurationSinceUnixEpoch::from_secs(u64::MAX / 2)));
    }

    #[test]
    fn freeleech_forces_the_download_multiplier_to_zero() {
        let record = TorrentRecord {
            freeleech: true,
            download_multiplier: 1.0,
            ..sample()
        };
        assert_eq!(record.effective_download_multiplier(DurationSinceUnixEpoch::from_secs(0)), 0.0);
    }

    #[test]
    fn an_expired_freeleech_window_restores_the_configured_multiplier() {
        let record = TorrentRecord {
            freeleech: true,
            freeleech_until: Some(DurationSinceUnixEpoch::from_secs(100)),
            download_multiplier: 2.0,
            ..sample()
        };
        assert_eq!(record.effective_download_multiplier(DurationSinceUnixEpoch::from_secs(200)), 2.0);
    }
}
