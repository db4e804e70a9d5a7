//! The hit-and-run detector (C10): a periodic scan over snatches that marks
//! users who stopped seeding before their required seedtime (§4.8).
use privateer_tracker_configuration::HnrPolicy;
use privateer_tracker_primitives::DurationSinceUnixEpoch;
use tracing::info;

use crate::core::databases::Database;

/// Runs one detection pass: marks qualifying snatches `hnr = true` and
/// updates each affected user's warning count and leech eligibility.
///
/// # Errors
///
/// Propagates the first database failure encountered.
pub async fn run_pass(database: &dyn Database, policy: &HnrPolicy, now: DurationSinceUnixEpoch) -> Result<(), crate::core::databases::error::Error> {
    if !policy.enabled {
        return Ok(());
    }

    let grace_period = DurationSinceUnixEpoch::from_secs(u64::from(policy.grace_period_days) * 24 * 3600);
    let cutoff = now.saturating_sub(grace_period);

    let violations = database.mark_hit_and_runs(cutoff, policy.min_seedtime).await?;

    if violations.is_empty() {
        return Ok(());
    }

    let mut per_user: std::collections::HashMap<i64, u32> = std::collections::HashMap::new();
    for user_id in violations {
        *per_user.entry(user_id).or_insert(0) += 1;
    }

    for (user_id, new_violations) in per_user {
        database.apply_hnr_warnings(user_id, new_violations, policy.max_warnings).await?;
    }

    info!(pass = "hnr", "hit-and-run detection pass complete");
    Ok(())
}

/// The admin clear-warnings action: resets a user's warning count and
/// restores leech eligibility.
///
/// # Errors
///
/// Propagates a database failure.
pub async fn clear_warnings(database: &dyn Database, user_id: i64) -> Result<(), crate::core::databases::error::Error> {
    database.clear_hnr_warnings(user_id).await
}

#[cfg(test)]
mod tests {
    use std::env;

    use privateer_tracker_configuration::HnrPolicy;
    use privateer_tracker_primitives::info_hash::InfoHash;
    use privateer_tracker_primitives::DurationSinceUnixEpoch;

    use super::run_pass;
    use crate::core::databases::sqlite::Sqlite;
    use crate::core::databases::Database;

    fn temp_database() -> Sqlite {
        let path = env::temp_dir().join(format!("hnr_test_{}.db", privateer_tracker_test_helpers::random::string(16)));
        let database = Sqlite::new(path.to_str().expect("temp path should be valid utf-8")).expect("it should open a sqlite database");
        database.create_database_tables().expect("it should create the schema");
        database
    }

    #[tokio::test]
    async fn a_disabled_policy_runs_no_pass() {
        let database = temp_database();
        let policy = HnrPolicy {
            enabled: false,
            grace_period_days: 0,
            min_seedtime: 3600,
            max_warnings: 3,
        };

        run_pass(&database, &policy, DurationSinceUnixEpoch::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn it_marks_a_snatch_that_stopped_seeding_before_its_required_seedtime() {
        let database = temp_database();
        let info_hash = InfoHash::from_bytes(&[3u8; 20]);
        let torrent_id = database.get_or_insert_torrent(&info_hash).await.unwrap();

        database
            .record_snatch_activity(1, torrent_id, true, false, 0, DurationSinceUnixEpoch::from_secs(100))
            .await
            .unwrap();

        let policy = HnrPolicy {
            enabled: true,
            grace_period_days: 0,
            min_seedtime: 3600,
            max_warnings: 3,
        };

        run_pass(&database, &policy, DurationSinceUnixEpoch::from_secs(200)).await.unwrap();

        // The pass already consumed the violation; a second run over the same
        // window finds nothing left to mark.
        let remaining = database.mark_hit_and_runs(DurationSinceUnixEpoch::from_secs(200), 3600).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn it_does_not_mark_a_snatch_that_met_its_required_seedtime() {
        let database = temp_database();
        let info_hash = InfoHash::from_bytes(&[4u8; 20]);
        let torrent_id = database.get_or_insert_torrent(&info_hash).await.unwrap();

        database
            .record_snatch_activity(1, torrent_id, true, true, 7200, DurationSinceUnixEpoch::from_secs(100))
            .await
            .unwrap();

        let policy = HnrPolicy {
            enabled: true,
            grace_period_days: 0,
            min_seedtime: 3600,
            max_warnings: 3,
        };

        run_pass(&database, &policy, DurationSinceUnixEpoch::from_secs(200)).await.unwrap();

        let remaining = database.mark_hit_and_runs(DurationSinceUnixEpoch::from_secs(200), 3600).await.unwrap();
        assert!(remaining.is_empty());
    }
}
