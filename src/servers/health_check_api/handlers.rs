use std::collections::VecDeque;

use axum::extract::State;
use axum::Json;

use super::resources::{CheckReport, Report};
use super::responses;
use crate::servers::registar::{ServiceHealthCheckJob, ServiceRegistration, ServiceRegistry};

/// Endpoint for container health check.
///
/// Spawns a health check job for every registered service and waits for all
/// of them to complete before building the final report.
pub(crate) async fn health_check_handler(State(registry): State<ServiceRegistry>) -> Json<Report> {
    let mut checks: VecDeque<ServiceHealthCheckJob> = {
        let registrations = registry.lock().await;
        registrations.values().map(ServiceRegistration::spawn_check).collect()
    };

    if checks.is_empty() {
        return responses::none();
    }

    let jobs = checks.drain(..).map(|c| {
        tokio::spawn(async move {
            CheckReport {
                binding: c.binding,
                info: c.info.clone(),
                result: c.job.await.expect("the health check job should not panic"),
            }
        })
    });

    let results: Vec<CheckReport> = futures::future::join_all(jobs)
        .await
        .drain(..)
        .map(|r| r.expect("the health check task should be joinable"))
        .collect();

    if results.iter().any(CheckReport::fail) {
        responses::error("health check failed".to_string(), results)
    } else {
        responses::ok(results)
    }
}
