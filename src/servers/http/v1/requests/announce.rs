//! `Announce` request for the HTTP tracker.
//!
//! Data structures and logic for parsing the `announce` query string (§6).
use std::panic::Location;
use std::str::FromStr;

use aquatic_udp_protocol::PeerId;
use privateer_tracker_primitives::announce_event::AnnounceEvent;
use privateer_tracker_primitives::info_hash::{self, InfoHash};
use privateer_tracker_primitives::peer::AnnounceKey;
use thiserror::Error;

use crate::servers::http::percent_encoding::{percent_decode_info_hash, percent_decode_peer_id, PeerIdConversionError};
use crate::servers::http::v1::query::{ParseQueryError, Query};
use crate::servers::http::v1::responses;

/// The number of bytes `downloaded`, `uploaded` or `left`.
pub type NumberOfBytes = i64;

// Query param names
const INFO_HASH: &str = "info_hash";
const PEER_ID: &str = "peer_id";
const PORT: &str = "port";
const DOWNLOADED: &str = "downloaded";
const UPLOADED: &str = "uploaded";
const LEFT: &str = "left";
const EVENT: &str = "event";
const COMPACT: &str = "compact";
const KEY: &str = "key";
const NUMWANT: &str = "numwant";

/// When `numwant` is absent or out of the `1..=200` range, the tracker falls
/// back to this many peers (§6, §8).
const NUMWANT_FALLBACK: i32 = 50;

/// The `Announce` request, decoded from the query string. `uploaded`,
/// `downloaded` and `left` are mandatory (§6) — unlike BEP 3's baseline,
/// this tracker always requires them.
#[derive(Debug, PartialEq)]
pub struct Announce {
    pub info_hash: InfoHash,
    pub peer_id: PeerId,
    pub port: u16,
    pub downloaded: NumberOfBytes,
    pub uploaded: NumberOfBytes,
    pub left: NumberOfBytes,
    pub event: AnnounceEvent,
    pub compact: bool,
    /// The anti-spoof announce key issued on a previous announce. Required
    /// on return visits once one has been issued (§4.4.2).
    pub key: Option<AnnounceKey>,
    pub num_want: i32,
}

/// Errors that can occur when parsing the `Announce` request.
#[derive(Error, Debug)]
pub enum ParseAnnounceQueryError {
    #[error("missing param {param_name} in {location}")]
    MissingParam {
        location: &'static Location<'static>,
        param_name: String,
    },
    #[error("invalid param value {param_value} for {param_name} in {location}")]
    InvalidParam {
        param_name: String,
        param_value: String,
        location: &'static Location<'static>,
    },
    #[error("param value overflow {param_value} for {param_name} in {location}")]
    NumberOfBytesOverflow {
        param_name: String,
        param_value: String,
        location: &'static Location<'static>,
    },
    #[error("invalid info_hash {param_value}: {source} in {location}")]
    InvalidInfoHashParam {
        param_value: String,
        source: info_hash::ConversionError,
        location: &'static Location<'static>,
    },
    #[error("invalid peer_id {param_value}: {source} in {location}")]
    InvalidPeerIdParam {
        param_value: String,
        source: PeerIdConversionError,
        location: &'static Location<'static>,
    },
}

impl From<ParseQueryError> for responses::error::Error {
    fn from(err: ParseQueryError) -> Self {
        responses::error::Error {
            failure_reason: format!("Cannot parse query params: {err}"),
        }
    }
}

impl From<ParseAnnounceQueryError> for responses::error::Error {
    fn from(err: ParseAnnounceQueryError) -> Self {
        responses::error::Error {
            failure_reason: format!("Cannot parse query params for announce request: {err}"),
        }
    }
}

impl TryFrom<Query> for Announce {
    type Error = ParseAnnounceQueryError;

    fn try_from(query: Query) -> Result<Self, Self::Error> {
        Ok(Self {
            info_hash: extract_info_hash(&query)?,
            peer_id: extract_peer_id(&query)?,
            port: extract_port(&query)?,
            downloaded: extract_number_of_bytes(DOWNLOADED, &query)?,
            uploaded: extract_number_of_bytes(UPLOADED, &query)?,
            left: extract_number_of_bytes(LEFT, &query)?,
            event: extract_event(&query),
            compact: extract_compact(&query)?,
            key: extract_key(&query)?,
            num_want: extract_num_want(&query),
        })
    }
}

fn extract_info_hash(query: &Query) -> Result<InfoHash, ParseAnnounceQueryError> {
    match query.get_param(INFO_HASH) {
        Some(raw_param) => percent_decode_info_hash(&raw_param).map_err(|err| ParseAnnounceQueryError::InvalidInfoHashParam {
            param_value: raw_param,
            source: err,
            location: Location::caller(),
        }),
        None => Err(ParseAnnounceQueryError::MissingParam {
            location: Location::caller(),
            param_name: INFO_HASH.to_owned(),
        }),
    }
}

fn extract_peer_id(query: &Query) -> Result<PeerId, ParseAnnounceQueryError> {
    match query.get_param(PEER_ID) {
        Some(raw_param) => percent_decode_peer_id(&raw_param).map_err(|err| ParseAnnounceQueryError::InvalidPeerIdParam {
            param_value: raw_param,
            source: err,
            location: Location::caller(),
        }),
        None => Err(ParseAnnounceQueryError::MissingParam {
            location: Location::caller(),
            param_name: PEER_ID.to_owned(),
        }),
    }
}

fn extract_port(query: &Query) -> Result<u16, ParseAnnounceQueryError> {
    match query.get_param(PORT) {
        Some(raw_param) => u16::from_str(&raw_param).map_err(|_| ParseAnnounceQueryError::InvalidParam {
            param_name: PORT.to_owned(),
            param_value: raw_param,
            location: Location::caller(),
        }),
        None => Err(ParseAnnounceQueryError::MissingParam {
            location: Location::caller(),
            param_name: PORT.to_owned(),
        }),
    }
}

fn extract_number_of_bytes(param_name: &str, query: &Query) -> Result<NumberOfBytes, ParseAnnounceQueryError> {
    match query.get_param(param_name) {
        Some(raw_param) => {
            let number_of_bytes = u64::from_str(&raw_param).map_err(|_| ParseAnnounceQueryError::InvalidParam {
                param_name: param_name.to_owned(),
                param_value: raw_param.clone(),
                location: Location::caller(),
            })?;

            i64::try_from(number_of_bytes).map_err(|_| ParseAnnounceQueryError::NumberOfBytesOverflow {
                param_name: param_name.to_owned(),
                param_value: raw_param,
                location: Location::caller(),
            })
        }
        None => Err(ParseAnnounceQueryError::MissingParam {
            location: Location::caller(),
            param_name: param_name.to_owned(),
        }),
    }
}

/// An absent or unrecognized `event` means a regular-interval announce,
/// not an error (§4.1).
fn extract_event(query: &Query) -> AnnounceEvent {
    query.get_param(EVENT).map_or(AnnounceEvent::None, |raw| AnnounceEvent::from_query_param(&raw))
}

/// Defaults to `"1"` (compact) when absent (§6).
fn extract_compact(query: &Query) -> Result<bool, ParseAnnounceQueryError> {
    match query.get_param(COMPACT) {
        Some(raw_param) => match raw_param.as_str() {
            "1" => Ok(true),
            "0" => Ok(false),
            _ => Err(ParseAnnounceQueryError::InvalidParam {
                param_name: COMPACT.to_owned(),
                param_value: raw_param,
                location: Location::caller(),
            }),
        },
        None => Ok(true),
    }
}

fn extract_key(query: &Query) -> Result<Option<AnnounceKey>, ParseAnnounceQueryError> {
    match query.get_param(KEY) {
        Some(raw_param) => AnnounceKey::from_str(&raw_param)
            .map(Some)
            .map_err(|_| ParseAnnounceQueryError::InvalidParam {
                param_name: KEY.to_owned(),
                param_value: raw_param,
                location: Location::caller(),
            }),
        None => Ok(None),
    }
}

/// Out-of-range (including absent, zero, negative or `> 200`) values fall
/// back to [`NUMWANT_FALLBACK`] (§6, §8).
fn extract_num_want(query: &Query) -> i32 {
    match query.get_param(NUMWANT) {
        Some(raw_param) => match i32::from_str(&raw_param) {
            Ok(value) if (1..=200).contains(&value) => value,
            _ => NUMWANT_FALLBACK,
        },
        None => NUMWANT_FALLBACK,
    }
}

#[cfg(test)]
mod tests {
    use aquatic_udp_protocol::PeerId;
    use privateer_tracker_primitives::announce_event::AnnounceEvent;
    use privateer_tracker_primitives::info_hash::InfoHash;

    use super::{Announce, ParseAnnounceQueryError};
    use crate::servers::http::v1::query::Query;

    fn base_query() -> Vec<(&'static str, &'static str)> {
        vec![
            ("info_hash", "%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0"),
            ("peer_id", "-qB00000000000000001"),
            ("port", "17548"),
            ("downloaded", "1"),
            ("uploaded", "2"),
            ("left", "3"),
        ]
    }

    #[test]
    fn it_should_be_instantiated_from_the_mandatory_params() {
        let raw_query = Query::from(base_query()).to_string();
        let query = raw_query.parse::<Query>().unwrap();

        let announce_request = Announce::try_from(query).unwrap();

        assert_eq!(announce_request.info_hash, "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse::<InfoHash>().unwrap());
        assert_eq!(announce_request.peer_id, PeerId(*b"-qB00000000000000001"));
        assert_eq!(announce_request.port, 17548);
        assert_eq!(announce_request.event, AnnounceEvent::None);
        assert!(announce_request.compact);
        assert_eq!(announce_request.num_want, 50);
        assert!(announce_request.key.is_none());
    }

    #[test]
    fn it_should_fail_if_a_mandatory_param_is_missing() {
        let mut params = base_query();
        params.retain(|(name, _)| *name != "info_hash");
        let raw_query = Query::from(params).to_string();

        let error = Announce::try_from(raw_query.parse::<Query>().unwrap()).unwrap_err();
        assert!(matches!(error, ParseAnnounceQueryError::MissingParam { .. }));
    }

    #[test]
    fn it_should_default_numwant_to_fifty_when_out_of_range() {
        let mut params = base_query();
        params.push(("numwant", "0"));
        let raw_query = Query::from(params).to_string();

        let announce_request = Announce::try_from(raw_query.parse::<Query>().unwrap()).unwrap();
        assert_eq!(announce_request.num_want, 50);
    }

    #[test]
    fn it_should_honor_a_numwant_within_range() {
        let mut params = base_query();
        params.push(("numwant", "5"));
        let raw_query = Query::from(params).to_string();

        let announce_request = Announce::try_from(raw_query.parse::<Query>().unwrap()).unwrap();
        assert_eq!(announce_request.num_want, 5);
    }

    #[test]
    fn it_should_parse_compact_as_false_when_zero() {
        let mut params = base_query();
        params.push(("compact", "0"));
        let raw_query = Query::from(params).to_string();

        let announce_request = Announce::try_from(raw_query.parse::<Query>().unwrap()).unwrap();
        assert!(!announce_request.compact);
    }
}
