//! The per-(user, torrent) snatch: completion marker and accumulated
//! seedtime, the record the hit-and-run detector scans.
use privateer_tracker_primitives::DurationSinceUnixEpoch;

/// The per-announce seedtime credit is clamped to this many seconds, so a
/// stalled or replayed announce cannot inflate a user's seedtime (invariant
/// 7, design note c).
pub const MAX_SEEDTIME_PER_ANNOUNCE_SECS: u64 = 7_200;

/// A unique `(user_id, torrent_id)` snatch row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snatch {
    pub user_id: i64,
    pub torrent_id: i64,
    pub completed_at: DurationSinceUnixEpoch,
    pub seedtime: u64,
    pub last_announce_at: DurationSinceUnixEpoch,
    pub hnr: bool,
}

/// Clamps a proposed seedtime increment to the per-announce abuse cap.
#[must_use]
pub fn clamp_seedtime_delta(delta_secs: u64) -> u64 {
    delta_secs.min(MAX_SEEDTIME_PER_ANNOUNCE_SECS)
}

#[cfg(test)]
mod tests {
    use super::{clamp_seedtime_delta, MAX_SEEDTIME_PER_ANNOUNCE_SECS};

    #[test]
    fn a_seedtime_delta_under_the_cap_passes_through_unchanged() {
        assert_eq!(clamp_seedtime_delta(120), 120);
    }

    #[test]
    fn a_seedtime_delta_over_the_cap_is_clamped() {
        assert_eq!(clamp_seedtime_delta(10_000), MAX_SEEDTIME_PER_ANNOUNCE_SECS);
    }
}
