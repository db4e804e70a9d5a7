//! Percent decoding for `info_hash` and `peer_id`.
//!
//! Both fields are arbitrary 20-byte binary strings, percent-encoded like any
//! other URL query parameter. The decoded bytes are not guaranteed to be
//! valid UTF-8, so decoding happens byte-by-byte into a `Vec<u8>` rather than
//! through any UTF-8-validating path.
use aquatic_udp_protocol::PeerId;
use privateer_tracker_primitives::info_hash::{self, InfoHash};

/// A peer id did not decode to exactly 20 bytes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid peer id length: expected 20 bytes, got {0}")]
pub struct PeerIdConversionError(pub usize);

/// Percent decodes a percent-encoded `info_hash`.
///
/// # Errors
///
/// Returns an error if the decoded bytes are not a 20-byte `info_hash`.
pub fn percent_decode_info_hash(raw: &str) -> Result<InfoHash, info_hash::ConversionError> {
    let bytes = percent_decode_bytes(raw);
    InfoHash::try_from(bytes)
}

/// Percent decodes a percent-encoded `peer_id`.
///
/// # Errors
///
/// Returns an error if the decoded bytes are not a 20-byte peer id.
pub fn percent_decode_peer_id(raw: &str) -> Result<PeerId, PeerIdConversionError> {
    let bytes = percent_decode_bytes(raw);
    let array: [u8; 20] = bytes.as_slice().try_into().map_err(|_| PeerIdConversionError(bytes.len()))?;
    Ok(PeerId(array))
}

/// `application/x-www-form-urlencoded` decoding: a literal `+` means space,
/// everything else is plain percent-decoding. Operates byte-by-byte so the
/// output is not required to be valid UTF-8.
fn percent_decode_bytes(raw: &str) -> Vec<u8> {
    let with_spaces = raw.replace('+', " ");
    percent_encoding::percent_decode_str(&with_spaces).collect()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use aquatic_udp_protocol::PeerId;
    use privateer_tracker_primitives::info_hash::InfoHash;

    use super::{percent_decode_info_hash, percent_decode_peer_id};

    #[test]
    fn it_decodes_a_percent_encoded_info_hash() {
        let encoded = "%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0";
        let info_hash = percent_decode_info_hash(encoded).unwrap();
        assert_eq!(info_hash, InfoHash::from_str("3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0").unwrap());
    }

    #[test]
    fn it_fails_on_a_short_info_hash() {
        assert!(percent_decode_info_hash("%3B%24").is_err());
    }

    #[test]
    fn it_decodes_a_percent_encoded_peer_id() {
        let encoded = "%2DqB00000000000000000";
        let peer_id = percent_decode_peer_id(encoded).unwrap();
        assert_eq!(peer_id, PeerId(*b"-qB00000000000000000"));
    }

    #[test]
    fn it_fails_on_a_short_peer_id() {
        assert!(percent_decode_peer_id("%2DqB").is_err());
    }

    #[test]
    fn it_preserves_non_utf8_bytes() {
        let encoded = "%FF%FE%FD%00%01%02%03%04%05%06%07%08%09%0A%0B%0C%0D%0E%0F%10";
        let peer_id = percent_decode_peer_id(encoded).unwrap();
        assert_eq!(peer_id.0[0], 0xFF);
    }
}
