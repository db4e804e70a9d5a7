//! The unified error-kind taxonomy (§7): every fallible request-path
//! operation surfaces one of these, grouped by kind rather than by which
//! internal component raised it. Transport layers (HTTP/UDP) translate each
//! variant into their own wire representation (bencoded `failure reason` /
//! BEP 15 error frame); the core never formats a transport-specific payload.
use privateer_tracker_located_error::{DynError, Located, LocatedError};

use crate::core::databases;
use crate::core::swarm::RegistryError;
use crate::core::user::LeechDenied;

/// Errors an announce request can end in.
#[derive(thiserror::Error, Debug, Clone)]
pub enum AnnounceRequestError {
    // Authentication
    #[error("passkey required")]
    PasskeyRequired,
    #[error("invalid passkey")]
    InvalidPasskey,

    // Authorization
    #[error("banned: {reason}")]
    Banned { reason: String },
    #[error("client not whitelisted")]
    ClientNotWhitelisted,
    #[error("torrent not registered")]
    TorrentNotWhitelisted,
    #[error("this peer was issued a key and must supply it")]
    KeyRequired,
    #[error("the supplied key does not match the one issued to this peer")]
    InvalidKey,
    #[error("{0}")]
    LeechDenied(#[from] LeechDenied),

    // Capacity
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // Transient
    #[error("temporarily unavailable: {source}")]
    Transient {
        source: LocatedError<'static, dyn std::error::Error + Send + Sync>,
    },
}

impl From<RegistryError> for AnnounceRequestError {
    fn from(_: RegistryError) -> Self {
        AnnounceRequestError::TorrentNotWhitelisted
    }
}

#[track_caller]
fn transient(err: databases::error::Error) -> AnnounceRequestError {
    let source: DynError = std::sync::Arc::new(err);
    AnnounceRequestError::Transient { source: source.into() }
}

impl From<databases::error::Error> for AnnounceRequestError {
    #[track_caller]
    fn from(err: databases::error::Error) -> Self {
        transient(err)
    }
}

/// Errors a scrape request can end in. Scrape carries no swarm-mutating
/// side effects, so its error surface is a strict subset of announce's.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ScrapeRequestError {
    #[error("passkey required")]
    PasskeyRequired,
    #[error("invalid passkey")]
    InvalidPasskey,
    #[error("banned: {reason}")]
    Banned { reason: String },
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("temporarily unavailable: {source}")]
    Transient {
        source: LocatedError<'static, dyn std::error::Error + Send + Sync>,
    },
}

impl From<databases::error::Error> for ScrapeRequestError {
    #[track_caller]
    fn from(err: databases::error::Error) -> Self {
        let source: DynError = std::sync::Arc::new(err);
        ScrapeRequestError::Transient { source: source.into() }
    }
}

/// Errors the internal [`GateAdmin`](super::GateAdmin) mutation surface can
/// return. Policy-kind (duplicate/parse) and transient (store) failures.
#[derive(thiserror::Error, Debug, Clone)]
pub enum AdminError {
    #[error("no such user")]
    UserNotFound,
    #[error("invalid ip or cidr: {source}")]
    InvalidBan {
        source: LocatedError<'static, dyn std::error::Error + Send + Sync>,
    },
    #[error("temporarily unavailable: {source}")]
    Transient {
        source: LocatedError<'static, dyn std::error::Error + Send + Sync>,
    },
}

impl From<databases::error::Error> for AdminError {
    #[track_caller]
    fn from(err: databases::error::Error) -> Self {
        let source: DynError = std::sync::Arc::new(err);
        AdminError::Transient { source: source.into() }
    }
}

impl From<crate::core::gate::ParseIpMatcherError> for AdminError {
    #[track_caller]
    fn from(err: crate::core::gate::ParseIpMatcherError) -> Self {
        AdminError::InvalidBan {
            source: Located(err).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AnnounceRequestError, ScrapeRequestError};
    use crate::core::swarm::RegistryError;

    #[test]
    fn a_full_registry_surfaces_as_torrent_not_whitelisted() {
        let error: AnnounceRequestError = RegistryError::NotWhitelisted.into();
        assert!(matches!(error, AnnounceRequestError::TorrentNotWhitelisted));
    }

    #[test]
    fn announce_and_scrape_errors_carry_independent_rate_limit_variants() {
        let announce_error = AnnounceRequestError::RateLimited { retry_after_secs: 5 };
        let scrape_error = ScrapeRequestError::RateLimited { retry_after_secs: 5 };

        assert_eq!(announce_error.to_string(), "rate limited, retry after 5s");
        assert_eq!(scrape_error.to_string(), "rate limited, retry after 5s");
    }
}
