//! Error types for the UDP server.
use std::panic::Location;

use privateer_tracker_located_error::LocatedError;
use thiserror::Error;

use crate::core::error::{AnnounceRequestError, ScrapeRequestError};

/// Error returned by the UDP server.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The core tracker rejected the announce (ban, rate limit, client not
    /// whitelisted, missing/invalid announce key, ...).
    #[error("announce rejected: {source}")]
    AnnounceRejected { source: AnnounceRequestError },

    /// The core tracker rejected the scrape (ban, rate limit, ...).
    #[error("scrape rejected: {source}")]
    ScrapeRejected { source: ScrapeRequestError },

    /// Error returned from a third-party library (`aquatic_udp_protocol`).
    #[error("internal server error: {message}, {location}")]
    InternalServer {
        location: &'static Location<'static>,
        message: String,
    },

    /// Error returned when the connection id could not be verified.
    #[error("connection id could not be verified")]
    InvalidConnectionId { location: &'static Location<'static> },

    /// Error returned when the request is invalid.
    #[error("bad request: {source}")]
    BadRequest {
        source: LocatedError<'static, dyn std::error::Error + Send + Sync>,
    },
}

impl From<AnnounceRequestError> for Error {
    fn from(source: AnnounceRequestError) -> Self {
        Error::AnnounceRejected { source }
    }
}

impl From<ScrapeRequestError> for Error {
    fn from(source: ScrapeRequestError) -> Self {
        Error::ScrapeRejected { source }
    }
}
