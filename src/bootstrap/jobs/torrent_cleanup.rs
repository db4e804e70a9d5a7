//! Job that periodically sweeps idle swarm workers and expired peers.
//!
//! It removes peers that have not announced for more than the swarm's idle
//! timeout, and tears down workers left with no peers at all (§4.4.3).
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::core::Tracker;
use crate::CurrentClock;

/// How often the idle-worker sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Starts the job that sweeps idle swarm workers on a fixed interval.
#[must_use]
pub fn start_job(tracker: &Arc<Tracker>) -> JoinHandle<()> {
    let weak_tracker = Arc::downgrade(tracker);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Stopping torrent cleanup job..");
                    break;
                }
                _ = interval.tick() => {
                    let Some(tracker) = weak_tracker.upgrade() else {
                        break;
                    };

                    let start_time = Utc::now().time();
                    tracing::info!("Sweeping idle torrents..");
                    tracker.sweep_idle_workers(CurrentClock::now()).await;
                    tracing::info!("Swept idle torrents in: {}ms", (Utc::now().time() - start_time).num_milliseconds());
                }
            }
        }
    })
}
