//! Privateer Tracker application.
//!
//! The tracker application has a global configuration for multiple jobs.
//! It's basically a container for other services.
//!
//! The application is responsible for starting jobs depending on the
//! configuration.
//!
//! Jobs executed always:
//!
//! - Health Check API
//! - Torrent cleanup (idle swarm worker sweep)
//! - Background maintenance passes (stats, rate limiter, bans, verifier
//!   cache, hit-and-run, bonus points)
//!
//! Optional jobs, one per configured block:
//!
//! - UDP trackers: the user can enable multiple UDP trackers on several ports.
//! - HTTP trackers: the user can enable multiple HTTP trackers on several ports.
use std::sync::Arc;

use privateer_tracker_configuration::Configuration;
use tokio::task::JoinHandle;

use crate::bootstrap::jobs::{health_check_api, http_tracker, maintenance, torrent_cleanup, udp_tracker};
use crate::core::Tracker;
use crate::servers::registar::Registar;

/// Starts every job the configuration enables, returning their join handles.
pub async fn start(config: &Configuration, tracker: Arc<Tracker>) -> Vec<JoinHandle<()>> {
    let mut jobs: Vec<JoinHandle<()>> = Vec::new();

    let registar = Registar::default();

    for udp_tracker_config in &config.udp_trackers {
        if let Some(job) = udp_tracker::start_job(udp_tracker_config, tracker.clone(), registar.give_form()).await {
            jobs.push(job);
        }
    }

    for http_tracker_config in &config.http_trackers {
        if let Some(job) = http_tracker::start_job(http_tracker_config, tracker.clone(), registar.give_form()).await {
            jobs.push(job);
        }
    }

    jobs.push(torrent_cleanup::start_job(&tracker));

    jobs.extend(maintenance::start_jobs(&tracker));

    jobs.push(health_check_api::start_job(&config.health_check_api, registar.registry(), registar.give_form()).await);

    jobs
}
