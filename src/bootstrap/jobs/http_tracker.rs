//! HTTP tracker job starter.
//!
//! The function [`http_tracker::start_job`](crate::bootstrap::jobs::http_tracker::start_job) starts a new HTTP tracker server.
//!
//! > **NOTICE**: the application can launch more than one HTTP tracker on different ports.
//! Refer to the [configuration documentation](https://docs.rs/privateer-tracker-configuration) for the configuration options.
use std::sync::Arc;

use privateer_tracker_configuration::HttpTracker;
use tokio::task::JoinHandle;
use tracing::info;

use super::make_rust_tls;
use crate::core::Tracker;
use crate::servers::http::launcher::Launcher;
use crate::servers::registar::ServiceRegistrationForm;
use crate::servers::service::Service;

/// Starts a new HTTP tracker server with the provided configuration.
///
/// Returns `None`, without binding anything, if `config.enabled` is `false`.
///
/// # Panics
///
/// It would panic if `config.bind_address` is not a valid socket address, or
/// if the launcher fails to bind or to register with the health check API.
pub async fn start_job(config: &HttpTracker, tracker: Arc<Tracker>, form: ServiceRegistrationForm) -> Option<JoinHandle<()>> {
    if !config.enabled {
        info!("Note: Not loading Http Tracker Service, Not Enabled in Configuration.");
        return None;
    }

    let addr = config.bind_address.parse().expect("it should have a valid http tracker bind address");

    let tls = make_rust_tls(config.https_only, &config.tls_cert_path, &config.tls_key_path)
        .await
        .map(|tls| tls.expect("it should have a valid http tracker tls configuration"));

    let service = Service::new(Launcher::new(tracker, addr, tls));

    let started = service.start().expect("it should be able to start the http tracker");
    started
        .reg_form(form)
        .await
        .expect("it should be able to register the http tracker");

    let (task, _handle) = started.run();

    Some(tokio::spawn(async move {
        drop(task.await.expect("it should be able to join to the http tracker task"));
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use privateer_tracker_test_helpers::configuration::ephemeral;

    use crate::bootstrap::app::tracker;
    use crate::bootstrap::jobs::http_tracker::start_job;
    use crate::servers::registar::Registar;

    #[tokio::test]
    async fn it_should_start_http_tracker() {
        let cfg = Arc::new(ephemeral());
        let config = &cfg.http_trackers[0];
        let tracker = tracker(&cfg).await;

        start_job(config, tracker, Registar::default().give_form())
            .await
            .expect("it should be able to join to the http tracker start-job");
    }
}
