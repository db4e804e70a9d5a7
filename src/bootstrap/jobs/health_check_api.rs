//! Health Check API job starter.
//!
//! Unlike the HTTP/UDP trackers, this job is always started (it has no
//! `enabled` flag): it exists to let an orchestrator or load balancer ask
//! whether the rest of the application is up.
use std::sync::Arc;

use privateer_tracker_configuration::HealthCheckApi;
use tokio::task::JoinHandle;

use crate::servers::health_check_api::launcher::Launcher;
use crate::servers::registar::{ServiceRegistrationForm, ServiceRegistry};
use crate::servers::service::Service;

/// Starts the Health Check API with the provided configuration.
///
/// # Panics
///
/// It will panic if `config.bind_address` is not a valid socket address, or
/// if the launcher fails to bind or to register with itself.
pub async fn start_job(config: &HealthCheckApi, registry: ServiceRegistry, form: ServiceRegistrationForm) -> JoinHandle<()> {
    let addr = config.bind_address.parse().expect("it should have a valid health check api bind address");

    let service = Service::new(Launcher::new(addr, registry));

    let started = service.start().expect("it should start the health check api");
    started.reg_form(form).await.expect("it should register the health check api");

    let (task, _handle) = started.run();

    tokio::spawn(async move {
        drop(task.await.expect("it should be able to join to the health check api task"));
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use privateer_tracker_test_helpers::configuration::ephemeral;

    use crate::bootstrap::jobs::health_check_api::start_job;
    use crate::servers::registar::Registar;

    #[tokio::test]
    async fn it_should_start_health_check_api() {
        let cfg = Arc::new(ephemeral());
        let registar = Registar::default();

        let handle = start_job(&cfg.health_check_api, registar.registry(), registar.give_form()).await;

        assert!(!handle.is_finished());
        handle.abort();
    }
}
