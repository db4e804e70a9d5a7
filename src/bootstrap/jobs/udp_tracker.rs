//! UDP tracker job starter.
//!
//! The [`udp_tracker::start_job`](crate::bootstrap::jobs::udp_tracker::start_job)
//! function starts a new UDP tracker server.
//!
//! > **NOTICE**: that the application can launch more than one UDP tracker
//! > on different ports. Refer to the [configuration documentation](https://docs.rs/privateer-tracker-configuration)
//! > for the configuration options.
use std::sync::Arc;
use std::time::Duration;

use privateer_tracker_configuration::UdpTracker;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::core::Tracker;
use crate::servers::registar::ServiceRegistrationForm;
use crate::servers::service::Service;
use crate::servers::udp::launcher::Launcher;

/// It starts a new UDP server with the provided configuration.
///
/// It spawns a new asynchronous task for the new UDP server.
///
/// # Panics
///
/// It will panic if `config.bind_address` is not a valid socket address.
/// It will panic if it is unable to start the UDP service.
/// It will panic if the task did not finish successfully.
#[must_use]
#[allow(clippy::async_yields_async)]
#[instrument(ret)]
pub async fn start_job(config: &UdpTracker, tracker: Arc<Tracker>, form: ServiceRegistrationForm) -> Option<JoinHandle<()>> {
    if !config.enabled {
        info!("Note: Not loading Udp Tracker Service, Not Enabled in Configuration.");
        return None;
    }

    let addr = config.bind_address.parse().expect("it should have a valid udp tracker bind address");
    let connection_cookie_lifetime = Duration::from_secs(u64::from(config.connection_timeout));

    let service = Service::new(Launcher::new(tracker, addr, connection_cookie_lifetime));

    let started = service.start().expect("it should start");

    started.reg_form(form).await.expect("it should register");

    let (task, _handle) = started.run();

    Some(tokio::spawn(async move {
        drop(task.await.expect("it should shutdown"));
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use privateer_tracker_test_helpers::configuration::ephemeral;

    use crate::bootstrap::app::tracker;
    use crate::bootstrap::jobs::udp_tracker::start_job;
    use crate::servers::registar::Registar;

    #[tokio::test]
    async fn it_should_start_udp_tracker() {
        let cfg = Arc::new(ephemeral());
        let config = &cfg.udp_trackers[0];
        let tracker = tracker(&cfg).await;

        start_job(config, tracker, Registar::default().give_form())
            .await
            .expect("it should be able to join to the udp tracker start-job");
    }
}
