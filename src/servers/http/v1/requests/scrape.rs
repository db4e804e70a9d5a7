//! `Scrape` request for the HTTP tracker.
//!
//! Data structures and logic for parsing the `scrape` query string (§6).
use std::panic::Location;

use privateer_tracker_primitives::info_hash::{self, InfoHash};
use thiserror::Error;

use crate::servers::http::percent_encoding::percent_decode_info_hash;
use crate::servers::http::v1::query::Query;
use crate::servers::http::v1::responses;

const INFO_HASH: &str = "info_hash";

/// The `Scrape` request: one or more `info_hash` params (§6).
#[derive(Debug, PartialEq)]
pub struct Scrape {
    pub info_hashes: Vec<InfoHash>,
}

/// Errors that can occur when parsing the `Scrape` request.
#[derive(Error, Debug)]
pub enum ParseScrapeQueryError {
    /// No `info_hash` param was supplied at all (§6: `"No info_hash provided"`).
    #[error("no info_hash provided in {location}")]
    NoInfoHashProvided { location: &'static Location<'static> },
    #[error("invalid info_hash {param_value}: {source} in {location}")]
    InvalidInfoHashParam {
        param_value: String,
        source: info_hash::ConversionError,
        location: &'static Location<'static>,
    },
}

impl From<ParseScrapeQueryError> for responses::error::Error {
    fn from(err: ParseScrapeQueryError) -> Self {
        match err {
            ParseScrapeQueryError::NoInfoHashProvided { .. } => responses::error::Error {
                failure_reason: "No info_hash provided".to_owned(),
            },
            other => responses::error::Error {
                failure_reason: format!("Cannot parse query params for scrape request: {other}"),
            },
        }
    }
}

impl TryFrom<Query> for Scrape {
    type Error = ParseScrapeQueryError;

    fn try_from(query: Query) -> Result<Self, Self::Error> {
        let raw_info_hashes = query.get_param_vec(INFO_HASH).unwrap_or_default();

        if raw_info_hashes.is_empty() {
            return Err(ParseScrapeQueryError::NoInfoHashProvided { location: Location::caller() });
        }

        let info_hashes = raw_info_hashes
            .into_iter()
            .map(|raw| {
                percent_decode_info_hash(&raw).map_err(|err| ParseScrapeQueryError::InvalidInfoHashParam {
                    param_value: raw,
                    source: err,
                    location: Location::caller(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { info_hashes })
    }
}

#[cfg(test)]
mod tests {
    use privateer_tracker_primitives::info_hash::InfoHash;

    use super::{ParseScrapeQueryError, Scrape};
    use crate::servers::http::v1::query::Query;

    #[test]
    fn it_should_be_instantiated_from_a_single_info_hash() {
        let raw_query = Query::from(vec![("info_hash", "%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0")]).to_string();

        let scrape_request = Scrape::try_from(raw_query.parse::<Query>().unwrap()).unwrap();

        assert_eq!(
            scrape_request.info_hashes,
            vec!["3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse::<InfoHash>().unwrap()]
        );
    }

    #[test]
    fn it_should_be_instantiated_from_multiple_info_hashes() {
        let raw_query = Query::from(vec![
            ("info_hash", "%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0"),
            ("info_hash", "%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C1"),
        ])
        .to_string();

        let scrape_request = Scrape::try_from(raw_query.parse::<Query>().unwrap()).unwrap();

        assert_eq!(scrape_request.info_hashes.len(), 2);
    }

    #[test]
    fn it_should_fail_when_no_info_hash_is_provided() {
        let raw_query = "unrelated=value".to_owned();

        let error = Scrape::try_from(raw_query.parse::<Query>().unwrap()).unwrap_err();
        assert!(matches!(error, ParseScrapeQueryError::NoInfoHashProvided { .. }));
    }
}
