use std::net::SocketAddr;

use tracing::info;

use crate::servers::registar::{ServiceHealthCheckJob, ServiceHeathCheckResult};

/// Builds a health check job for the HTTP tracker's `/health_check` endpoint.
#[must_use]
pub(super) fn check_builder(addr: &SocketAddr) -> ServiceHealthCheckJob {
    let addr = *addr;
    let url = format!("http://{addr}/health_check");
    let info = format!("checking http tracker health check at: {url}");

    info!("{info}");

    let job = tokio::spawn(async move {
        check(&url).await
    });

    ServiceHealthCheckJob::new(addr, info, job)
}

async fn check(url: &str) -> ServiceHeathCheckResult {
    match reqwest::get(url).await {
        Ok(response) => match response.error_for_status() {
            Ok(response) => Ok(response.status().to_string()),
            Err(err) => Err(format!("Error response from {url}: {err}")),
        },
        Err(err) => Err(format!("Failed to connect to {url}: {err}")),
    }
}
