//! Privateer Tracker binary entry point.
//!
//! Loads the configuration, sets up tracing, builds the core tracker, and
//! starts every configured job (HTTP/UDP trackers, health check API,
//! background maintenance passes). Runs until a shutdown signal arrives.
use futures::future::join_all;
use privateer_tracker::{app, bootstrap};

#[tokio::main]
async fn main() {
    let configuration = bootstrap::app::config();

    bootstrap::tracing::setup(&configuration);

    let tracker = bootstrap::app::tracker(&configuration).await;

    let jobs = app::start(&configuration, tracker).await;

    drop(join_all(jobs).await);
}
