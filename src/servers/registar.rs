//! Health check registration: every started service hands a
//! [`ServiceRegistration`] to the [`Registar`] so a health-check endpoint can
//! later poll each registered binding on demand.
use std::collections::HashMap;
use std::fmt::Debug;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

pub type ServiceHeathCheckResult = Result<String, String>;

#[derive(Debug)]
pub struct ServiceHealthCheckJob {
    pub binding: SocketAddr,
    pub info: String,
    pub job: JoinHandle<ServiceHeathCheckResult>,
}

impl ServiceHealthCheckJob {
    #[must_use]
    pub fn new(binding: SocketAddr, info: String, job: JoinHandle<ServiceHeathCheckResult>) -> Self {
        Self { binding, info, job }
    }
}

pub type FnSpawnServiceHeathCheck = fn(&SocketAddr) -> ServiceHealthCheckJob;

#[derive(Clone, Copy)]
pub struct ServiceRegistration {
    pub binding: SocketAddr,
    check_fn: FnSpawnServiceHeathCheck,
}

impl Debug for ServiceRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistration").field("binding", &self.binding).finish_non_exhaustive()
    }
}

impl ServiceRegistration {
    #[must_use]
    pub fn new(binding: SocketAddr, check_fn: FnSpawnServiceHeathCheck) -> Self {
        Self { binding, check_fn }
    }

    #[must_use]
    pub fn spawn_check(&self) -> ServiceHealthCheckJob {
        (self.check_fn)(&self.binding)
    }
}

pub type ServiceRegistrationForm = oneshot::Sender<ServiceRegistration>;

pub type ServiceRegistry = Arc<Mutex<HashMap<SocketAddr, ServiceRegistration>>>;

/// Collects registrations from started services so a health-check endpoint
/// can enumerate and probe them later.
#[derive(Clone, Debug, Default)]
pub struct Registar {
    registry: ServiceRegistry,
}

impl Registar {
    #[must_use]
    pub fn new(registry: ServiceRegistry) -> Self {
        Self { registry }
    }

    /// Returns a one-shot sender a service can use to register itself, and
    /// spawns a background task that waits for the registration and inserts
    /// it into the registry.
    #[instrument(skip(self))]
    pub fn give_form(&self) -> ServiceRegistrationForm {
        let (tx, rx) = oneshot::channel::<ServiceRegistration>();

        let registry = self.registry.clone();

        drop(tokio::spawn(async move {
            match rx.await {
                Ok(registration) => {
                    debug!("registering service at {}", registration.binding);
                    drop(registry.lock().await.insert(registration.binding, registration));
                }
                Err(err) => {
                    debug!("service registration dropped before completion: {err}");
                }
            }
        }));

        tx
    }

    pub async fn entries(&self) -> Vec<ServiceRegistration> {
        self.registry.lock().await.values().copied().collect()
    }

    /// Returns the shared registry itself, for services (the health check
    /// API) that poll registrations directly instead of through `entries`.
    #[must_use]
    pub fn registry(&self) -> ServiceRegistry {
        self.registry.clone()
    }
}
