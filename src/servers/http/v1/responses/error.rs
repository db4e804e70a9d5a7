//! `Error` response for the [`HTTP tracker`](crate::servers::http).
//!
//! Data structures and logic to build the error responses.
//!
//! From the [BEP 03. The `BitTorrent` Protocol Specification](https://www.bittorrent.org/beps/bep_0003.html):
//!
//! _"Tracker responses are bencoded dictionaries. If a tracker response has a
//! key failure reason, then that maps to a human readable string which explains
//! why the query failed, and no other keys are required."_
//!
//! > **NOTICE**: error responses are bencoded and always have a `200 OK` status
//!  code. The official `BitTorrent` specification does not specify the status
//! code.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use privateer_tracker_contrib_bencode::{ben_dict, BValue};

use crate::core::error::{AnnounceRequestError, ScrapeRequestError};

/// `Error` response for the [`HTTP tracker`](crate::servers::http).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// Human readable string which explains why the request failed.
    pub failure_reason: String,
}

impl Error {
    /// Returns the bencoded representation of the `Error` struct.
    ///
    /// ```rust
    /// use privateer_tracker::servers::http::v1::responses::error::Error;
    ///
    /// let err = Error {
    ///    failure_reason: "error message".to_owned(),
    /// };
    ///
    /// // cspell:disable-next-line
    /// assert_eq!(err.write(), b"d14:failure reason13:error messagee".to_vec());
    /// ```
    #[must_use]
    pub fn write(&self) -> Vec<u8> {
        let dict = ben_dict!("failure reason" => BValue::from(self.failure_reason.as_str()));
        dict.encode()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.write()).into_response()
    }
}

impl From<AnnounceRequestError> for Error {
    fn from(err: AnnounceRequestError) -> Self {
        Error {
            failure_reason: format!("{err}"),
        }
    }
}

impl From<ScrapeRequestError> for Error {
    fn from(err: ScrapeRequestError) -> Self {
        Error {
            failure_reason: format!("{err}"),
        }
    }
}

#[cfg(test)]
mod tests {

    use super::Error;

    #[test]
    fn http_tracker_errors_can_be_bencoded() {
        let err = Error {
            failure_reason: "error message".to_owned(),
        };

        assert_eq!(err.write(), b"d14:failure reason13:error messagee".to_vec()); // cspell:disable-line
    }
}
