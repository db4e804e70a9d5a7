//! The bonus-point calculator (C11): a periodic rarity-weighted award pass
//! over active swarms, plus point redemption into synthetic upload credit
//! (§4.9).
use std::collections::HashMap;

use privateer_tracker_configuration::BonusPointsPolicy;
use tracing::info;

use crate::core::databases::Database;
use crate::core::swarm::SwarmRegistry;

/// Why a redemption request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RedeemError {
    #[error("no such user")]
    NotFound,
    #[error("insufficient bonus points")]
    InsufficientPoints,
}

/// Points-per-seeder this tick for one torrent: rarer torrents (few seeders
/// relative to leechers) reward seeding more.
#[must_use]
pub fn points_per_seeder(base: f64, seeders: u32, leechers: u32) -> f64 {
    if seeders == 0 {
        return 0.0;
    }
    base * f64::from(seeders).sqrt() / f64::from(leechers.max(1))
}

/// Runs one award pass over every active swarm and applies the accumulated
/// increments to the durable store.
///
/// # Errors
///
/// Propagates the first database failure encountered.
pub async fn run_pass(
    registry: &SwarmRegistry,
    database: &dyn Database,
    policy: &BonusPointsPolicy,
) -> Result<(), crate::core::databases::error::Error> {
    if !policy.enabled {
        return Ok(());
    }

    let mut accumulator: HashMap<i64, f64> = HashMap::new();

    for (_torrent_id, seeders, leechers, seeder_user_ids) in registry.bonus_snapshots().await {
        let points = points_per_seeder(policy.base_points, seeders, leechers);
        if points == 0.0 {
            continue;
        }
        for user_id in seeder_user_ids {
            *accumulator.entry(user_id).or_insert(0.0) += points;
        }
    }

    for (user_id, points) in &accumulator {
        database.add_bonus_points(*user_id, *points).await?;
    }

    info!(pass = "bonus", users = accumulator.len(), "bonus-point award pass complete");
    Ok(())
}

/// Redeems `points` bonus points for `user_id` into `trunc(points *
/// bytes_per_point)` bytes of synthetic upload credit.
///
/// # Errors
///
/// Returns [`RedeemError::NotFound`] or [`RedeemError::InsufficientPoints`].
pub async fn redeem(
    database: &dyn Database,
    user_id: i64,
    points: f64,
    bytes_per_point: f64,
) -> Result<(), RedeemError> {
    let current = database
        .bonus_points_for(user_id)
        .await
        .map_err(|_| RedeemError::NotFound)?
        .ok_or(RedeemError::NotFound)?;

    if current < points {
        return Err(RedeemError::InsufficientPoints);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bonus_bytes = (points * bytes_per_point).trunc() as u64;

    database
        .redeem_bonus_points(user_id, points, bonus_bytes)
        .await
        .map_err(|_| RedeemError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::points_per_seeder;

    #[test]
    fn a_torrent_with_no_seeders_awards_nothing() {
        assert_eq!(points_per_seeder(1.0, 0, 5), 0.0);
    }

    #[test]
    fn rarer_torrents_reward_more_per_seeder() {
        let rare = points_per_seeder(1.0, 1, 10);
        let common = points_per_seeder(1.0, 10, 10);
        assert!(rare > common);
    }

    #[test]
    fn a_torrent_with_no_leechers_does_not_divide_by_zero() {
        let points = points_per_seeder(2.0, 4, 0);
        assert_eq!(points, 4.0);
    }
}
