//! Axum [`extractor`](axum::extract) for the [`Announce`] request.
//!
//! It parses the query parameters returning an [`Announce`] request. It
//! returns a bencoded [`Error`](crate::servers::http::v1::responses::error)
//! response (`200`, per BEP 3) if the query parameters are missing or
//! invalid.
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::servers::http::v1::query::Query;
use crate::servers::http::v1::requests::announce::Announce;
use crate::servers::http::v1::responses;

/// Extractor for the [`Announce`] request.
pub struct ExtractRequest(pub Announce);

#[async_trait]
impl<S> FromRequestParts<S> for ExtractRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match extract_announce_from(parts.uri.query()) {
            Ok(announce_request) => Ok(ExtractRequest(announce_request)),
            Err(error) => Err(error.into_response()),
        }
    }
}

fn extract_announce_from(maybe_raw_query: Option<&str>) -> Result<Announce, responses::error::Error> {
    let query = maybe_raw_query.unwrap_or_default().parse::<Query>()?;

    Ok(Announce::try_from(query)?)
}

#[cfg(test)]
mod tests {
    use aquatic_udp_protocol::PeerId;
    use privateer_tracker_primitives::announce_event::AnnounceEvent;
    use privateer_tracker_primitives::info_hash::InfoHash;

    use super::extract_announce_from;
    use crate::servers::http::v1::responses::error::Error;

    fn assert_error_response(error: &Error, error_message: &str) {
        assert!(
            error.failure_reason.contains(error_message),
            "Error response does not contain message: '{error_message}'. Error: {error:?}"
        );
    }

    #[test]
    fn it_should_extract_the_announce_request_from_the_url_query_params() {
        let raw_query = "info_hash=%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0&downloaded=0&uploaded=0&peer_id=-qB00000000000000001&port=17548&left=0&event=completed&compact=0";

        let announce = extract_announce_from(Some(raw_query)).unwrap();

        assert_eq!(announce.info_hash, "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse::<InfoHash>().unwrap());
        assert_eq!(announce.peer_id, PeerId(*b"-qB00000000000000001"));
        assert_eq!(announce.port, 17548);
        assert_eq!(announce.event, AnnounceEvent::Completed);
        assert!(!announce.compact);
    }

    #[test]
    fn it_should_reject_a_request_without_query_params() {
        let response = extract_announce_from(None).unwrap_err();

        assert_error_response(&response, "Cannot parse query params");
    }

    #[test]
    fn it_should_reject_a_request_with_a_query_that_cannot_be_parsed() {
        let invalid_query = "param1=value1=value2";
        let response = extract_announce_from(Some(invalid_query)).unwrap_err();

        assert_error_response(&response, "Cannot parse query params");
    }

    #[test]
    fn it_should_reject_a_request_with_a_query_that_cannot_be_parsed_into_an_announce_request() {
        let response = extract_announce_from(Some("param1=value1")).unwrap_err();

        assert_error_response(&response, "Cannot parse query params for announce request");
    }
}
