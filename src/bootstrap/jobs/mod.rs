//! Application jobs launchers.
//!
//! The main application setup has only two main stages:
//!
//! 1. Setup the domain layer: the core tracker.
//! 2. Launch all the application services as concurrent jobs.
//!
//! This module contains all the functions needed to start those jobs.
use std::panic::Location;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use camino::Utf8PathBuf;
use privateer_tracker_located_error::{DynError, LocatedError};
use thiserror::Error;
use tracing::{info, instrument};

pub mod health_check_api;
pub mod http_tracker;
pub mod maintenance;
pub mod torrent_cleanup;
pub mod udp_tracker;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Timeout elapsed for Task")]
    TimeoutError { err: Arc<tokio::time::error::Elapsed> },
    #[error("Error From Service: {err}")]
    ServiceError { err: crate::servers::service::Error },

    #[error("tls config missing")]
    MissingTlsConfig { location: &'static Location<'static> },

    #[error("bad tls config: {source}")]
    BadTlsConfig {
        source: LocatedError<'static, dyn std::error::Error + Send + Sync>,
    },
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(e: tokio::time::error::Elapsed) -> Self {
        Error::TimeoutError { err: e.into() }
    }
}

impl From<crate::servers::service::Error> for Error {
    fn from(err: crate::servers::service::Error) -> Self {
        Error::ServiceError { err }
    }
}

/// Builds a `rustls` config for an HTTP tracker block, given its
/// `https_only`/`tls_cert_path`/`tls_key_path` fields.
///
/// Returns `None` when the block does not request TLS, so callers can
/// distinguish "plain HTTP" from "TLS requested but misconfigured" by
/// matching on the outer `Option` versus the inner `Result`.
#[instrument(ret)]
pub async fn make_rust_tls(https_only: bool, cert_path: &Option<Utf8PathBuf>, key_path: &Option<Utf8PathBuf>) -> Option<Result<RustlsConfig, Error>> {
    if !https_only {
        return None;
    }

    match (cert_path, key_path) {
        (Some(cert), Some(key)) => Some(make_rust_tls_from_path_buf(cert, key).await),
        _ => Some(Err(Error::MissingTlsConfig { location: Location::caller() })),
    }
}

#[instrument(ret)]
pub async fn make_rust_tls_from_path_buf(cert: &Utf8PathBuf, key: &Utf8PathBuf) -> Result<RustlsConfig, Error> {
    info!("Using https: cert path: {cert}.");
    info!("Using https: key path: {key}.");

    RustlsConfig::from_pem_file(cert, key)
        .await
        .map_err(|err| Error::BadTlsConfig {
            source: (Arc::new(err) as DynError).into(),
        })
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::make_rust_tls;

    #[tokio::test]
    async fn it_should_skip_tls_when_not_requested() {
        let tls = make_rust_tls(false, &None, &None).await;
        assert!(tls.is_none());
    }

    #[tokio::test]
    async fn it_should_error_on_missing_cert_or_key_paths() {
        let err = make_rust_tls(true, &None, &None)
            .await
            .expect("https_only requests a result")
            .expect_err("missing paths");

        assert!(matches!(err, super::Error::MissingTlsConfig { location: _ }));
    }

    #[tokio::test]
    async fn it_should_error_on_bad_tls_config() {
        let err = make_rust_tls(true, &Some(Utf8PathBuf::from("bad cert path")), &Some(Utf8PathBuf::from("bad key path")))
            .await
            .expect("https_only requests a result")
            .expect_err("bad cert and key files");

        assert!(matches!(err, super::Error::BadTlsConfig { source: _ }));
    }
}
