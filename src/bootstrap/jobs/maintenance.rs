//! Jobs that drive the remaining background passes on their own interval,
//! each against a weak reference to the tracker so none of them keep the
//! application alive on their own.
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::core::Tracker;
use crate::CurrentClock;

/// Torrent-stat sync cadence (§4.4.4).
const SYNC_TORRENT_SNAPSHOTS_INTERVAL: Duration = Duration::from_secs(30);
/// Stats-buffer drain cadence (§4.6).
const COLLECT_STATS_INTERVAL: Duration = Duration::from_secs(10);
/// Rate-limiter sliding-window sweep cadence (§4.3).
const SWEEP_RATE_LIMITER_INTERVAL: Duration = Duration::from_secs(60);
/// Gate-cache ban sweep cadence (§4.2).
const SWEEP_EXPIRED_BANS_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Peer-reachability cache sweep cadence (§4.7).
const SWEEP_VERIFIER_CACHE_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Hit-and-run detection pass cadence (§4.8).
const HNR_PASS_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);
/// Bonus-point award pass cadence (§4.9).
const BONUS_PASS_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Starts every background maintenance pass, each on its own task and its
/// own interval, and returns their join handles.
pub fn start_jobs(tracker: &Arc<Tracker>) -> Vec<JoinHandle<()>> {
    vec![
        spawn_async(tracker, SYNC_TORRENT_SNAPSHOTS_INTERVAL, "torrent snapshot sync", |tracker| async move {
            tracker.sync_torrent_snapshots().await;
        }),
        spawn_async(tracker, COLLECT_STATS_INTERVAL, "stats collection", |tracker| async move {
            tracker.collect_stats(CurrentClock::now()).await;
        }),
        spawn_sync(tracker, SWEEP_RATE_LIMITER_INTERVAL, "rate limiter sweep", |tracker| {
            tracker.sweep_rate_limiter(CurrentClock::now());
        }),
        spawn_async(tracker, SWEEP_EXPIRED_BANS_INTERVAL, "ban sweep", |tracker| async move {
            if let Err(error) = tracker.sweep_expired_bans(CurrentClock::now()).await {
                tracing::error!(%error, "ban sweep failed");
            }
        }),
        spawn_async(tracker, SWEEP_VERIFIER_CACHE_INTERVAL, "verifier cache sweep", |tracker| async move {
            tracker.sweep_verifier_cache(CurrentClock::now()).await;
        }),
        spawn_async(tracker, HNR_PASS_INTERVAL, "hit-and-run pass", |tracker| async move {
            if let Err(error) = tracker.run_hnr_pass(CurrentClock::now()).await {
                tracing::error!(%error, "hit-and-run pass failed");
            }
        }),
        spawn_async(tracker, BONUS_PASS_INTERVAL, "bonus pass", |tracker| async move {
            if let Err(error) = tracker.run_bonus_pass().await {
                tracing::error!(%error, "bonus pass failed");
            }
        }),
    ]
}

fn spawn_sync<F>(tracker: &Arc<Tracker>, interval: Duration, name: &'static str, pass: F) -> JoinHandle<()>
where
    F: Fn(Arc<Tracker>) + Send + 'static,
{
    let weak_tracker = Arc::downgrade(tracker);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let Some(tracker) = weak_tracker.upgrade() else {
                break;
            };

            tracing::debug!(pass = name, "running background pass");
            pass(tracker);
        }
    })
}

fn spawn_async<F, Fut>(tracker: &Arc<Tracker>, interval: Duration, name: &'static str, pass: F) -> JoinHandle<()>
where
    F: Fn(Arc<Tracker>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let weak_tracker = Arc::downgrade(tracker);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let Some(tracker) = weak_tracker.upgrade() else {
                break;
            };

            tracing::debug!(pass = name, "running background pass");
            pass(tracker).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use privateer_tracker_test_helpers::configuration::ephemeral;

    use super::start_jobs;
    use crate::core::Tracker;

    #[tokio::test]
    async fn it_should_start_every_maintenance_job() {
        let cfg = ephemeral();
        let tracker = Arc::new(Tracker::new(cfg).await.expect("tracker should build"));

        let handles = start_jobs(&tracker);

        assert_eq!(handles.len(), 7);
        for handle in handles {
            assert!(!handle.is_finished());
            handle.abort();
        }
    }
}
