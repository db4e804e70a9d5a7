//! Axum [`extractor`](axum::extract) for the [`Scrape`] request.
//!
//! It parses the query parameters returning a [`Scrape`] request. It returns
//! a bencoded [`Error`](crate::servers::http::v1::responses::error) response
//! (`200`, per BEP 3) if the query parameters are missing or invalid.
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::servers::http::v1::query::Query;
use crate::servers::http::v1::requests::scrape::Scrape;
use crate::servers::http::v1::responses;

/// Extractor for the [`Scrape`] request.
pub struct ExtractRequest(pub Scrape);

#[async_trait]
impl<S> FromRequestParts<S> for ExtractRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match extract_scrape_from(parts.uri.query()) {
            Ok(scrape_request) => Ok(ExtractRequest(scrape_request)),
            Err(error) => Err(error.into_response()),
        }
    }
}

fn extract_scrape_from(maybe_raw_query: Option<&str>) -> Result<Scrape, responses::error::Error> {
    let query = maybe_raw_query.unwrap_or_default().parse::<Query>()?;

    Ok(Scrape::try_from(query)?)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use privateer_tracker_primitives::info_hash::InfoHash;

    use super::extract_scrape_from;
    use crate::servers::http::v1::requests::scrape::Scrape;
    use crate::servers::http::v1::responses::error::Error;

    struct TestInfoHash {
        pub bencoded: String,
        pub value: InfoHash,
    }

    fn test_info_hash() -> TestInfoHash {
        TestInfoHash {
            bencoded: "%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0".to_owned(),
            value: InfoHash::from_str("3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0").unwrap(),
        }
    }

    fn assert_error_response(error: &Error, error_message: &str) {
        assert!(
            error.failure_reason.contains(error_message),
            "Error response does not contain message: '{error_message}'. Error: {error:?}"
        );
    }

    #[test]
    fn it_should_extract_the_scrape_request_from_the_url_query_params() {
        let info_hash = test_info_hash();

        let raw_query = format!("info_hash={}", info_hash.bencoded);

        let scrape = extract_scrape_from(Some(&raw_query)).unwrap();

        assert_eq!(
            scrape,
            Scrape {
                info_hashes: vec![info_hash.value],
            }
        );
    }

    #[test]
    fn it_should_extract_the_scrape_request_from_the_url_query_params_with_more_than_one_info_hash() {
        let info_hash = test_info_hash();

        let raw_query = format!("info_hash={}&info_hash={}", info_hash.bencoded, info_hash.bencoded);

        let scrape = extract_scrape_from(Some(&raw_query)).unwrap();

        assert_eq!(
            scrape,
            Scrape {
                info_hashes: vec![info_hash.value, info_hash.value],
            }
        );
    }

    #[test]
    fn it_should_reject_a_request_without_query_params() {
        let response = extract_scrape_from(None).unwrap_err();

        assert_error_response(&response, "Cannot parse query params");
    }

    #[test]
    fn it_should_reject_a_request_with_a_query_that_cannot_be_parsed() {
        let invalid_query = "param1=value1=value2";
        let response = extract_scrape_from(Some(invalid_query)).unwrap_err();

        assert_error_response(&response, "Cannot parse query params");
    }

    #[test]
    fn it_should_reject_a_request_with_no_info_hash() {
        let response = extract_scrape_from(Some("param1=value1")).unwrap_err();

        assert_error_response(&response, "No info_hash provided");
    }
}
