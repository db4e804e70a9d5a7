//! Setup for the main tracker application.
//!
//! [`tracker`] only builds the application and its dependencies, it does not
//! start anything. There is no such thing as "the main application process":
//! once built, the only thing the application does is start a bunch of
//! independent jobs. If you are looking for how things are started you
//! should read [`app::start`](crate::app::start) function documentation.
//!
//! Setup steps:
//!
//! 1. Load the global application configuration.
//! 2. Initialize static variables.
//! 3. Initialize the domain tracker.
use std::sync::Arc;

use privateer_tracker_clock::static_time;
use privateer_tracker_configuration::Configuration;

use super::config::initialize_configuration;
use crate::core::Tracker;

/// Loads the configuration from the environment.
#[must_use]
pub fn config() -> Configuration {
    initialize_configuration()
}

/// Initializes the application with the given configuration.
///
/// # Panics
///
/// It will panic if the tracker fails to build, for example because its
/// database cannot be opened.
#[must_use]
pub async fn tracker(configuration: &Configuration) -> Arc<Tracker> {
    initialize_static();

    Arc::new(Tracker::new(configuration.clone()).await.expect("tracker should build from a valid configuration"))
}

/// Initializes the application static values.
///
/// These values are accessible throughout the entire application: the time
/// at which the application started, used by the stopped clock outside of a
/// test context.
fn initialize_static() {
    lazy_static::initialize(&static_time::TIME_AT_APP_START);
}
