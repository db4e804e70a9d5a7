//! The per-user passkey placed in the announce/scrape URL path.
//!
//! A passkey is exactly 32 hex characters (16 bytes), unique per user. It is
//! the sole credential private HTTP announces carry; UDP announces (BEP 15)
//! have no passkey field and are therefore always anonymous.
use std::fmt;
use std::panic::Location;
use std::str::FromStr;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PASSKEY_LENGTH: usize = 32;

/// A validated, lower-case 32-hex-character passkey.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Passkey(String);

/// Errors converting a raw string into a [`Passkey`].
#[derive(Error, Debug)]
pub enum ParsePasskeyError {
    #[error("passkey must be exactly {expected} hex characters, got {actual} at {location}")]
    WrongLength {
        location: &'static Location<'static>,
        expected: usize,
        actual: usize,
    },
    #[error("passkey contains a non-hex character at {location}")]
    NotHex { location: &'static Location<'static> },
}

impl FromStr for Passkey {
    type Err = ParsePasskeyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.len() != PASSKEY_LENGTH {
            return Err(ParsePasskeyError::WrongLength {
                location: Location::caller(),
                expected: PASSKEY_LENGTH,
                actual: raw.len(),
            });
        }

        if !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParsePasskeyError::NotHex { location: Location::caller() });
        }

        Ok(Self(raw.to_ascii_lowercase()))
    }
}

impl fmt::Display for Passkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Passkey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Passkey {
    /// Generates a new random passkey suitable for issuing to a new user.
    #[must_use]
    pub fn generate() -> Self {
        let raw: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .filter(|b| b.is_ascii_hexdigit())
            .take(PASSKEY_LENGTH)
            .map(char::from)
            .collect();

        // Alphanumeric filtered to hexdigits can undershoot on rare draws;
        // pad deterministically from more random hex bytes if needed.
        if raw.len() == PASSKEY_LENGTH {
            Self(raw)
        } else {
            let mut bytes = [0u8; PASSKEY_LENGTH / 2];
            rand::thread_rng().fill(&mut bytes);
            let mut hex = String::with_capacity(PASSKEY_LENGTH);
            for b in bytes {
                hex.push_str(&format!("{b:02x}"));
            }
            Self(hex)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Passkey, PASSKEY_LENGTH};

    #[test]
    fn it_should_accept_a_32_hex_character_passkey() {
        let passkey: Passkey = "00000000000000000000000000000001".parse().unwrap();
        assert_eq!(passkey.to_string().len(), PASSKEY_LENGTH);
    }

    #[test]
    fn it_should_reject_the_wrong_length() {
        assert!("00112233".parse::<Passkey>().is_err());
    }

    #[test]
    fn it_should_reject_non_hex_characters() {
        let raw = "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz";
        assert_eq!(raw.len(), PASSKEY_LENGTH);
        assert!(raw.parse::<Passkey>().is_err());
    }

    #[test]
    fn generated_passkeys_have_the_right_length() {
        let passkey = Passkey::generate();
        assert_eq!(passkey.to_string().len(), PASSKEY_LENGTH);
    }
}
