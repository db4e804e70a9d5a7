//! Axum [`extractor`](axum::extract) to extract the [`Passkey`] from the URL
//! path.
//!
//! Given the route `/:passkey/announce` (or `/:passkey/scrape`), it extracts
//! the `passkey` path param. The passkey is mandatory (§6) — there is no
//! anonymous-announce path in this tracker, unlike the optional-key model
//! some public trackers use.
//!
//! It's a wrapper for Axum's `Path` extractor, returning the same bencoded
//! [`Error`](crate::servers::http::v1::responses::error) shape every other
//! rejection in this tracker uses, always with a `200 OK` status.
use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use privateer_tracker_primitives::passkey::Passkey;
use serde::Deserialize;

use crate::servers::http::v1::responses;

/// Extractor for the [`Passkey`] path param.
pub struct ExtractPasskey(pub Passkey);

#[derive(Deserialize)]
pub struct PasskeyParam(String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ExtractPasskey
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let path_result = Path::<PasskeyParam>::from_request_parts(parts, state).await;

        match extract_passkey(path_result) {
            Ok(passkey) => Ok(ExtractPasskey(passkey)),
            Err(error) => Err(error.into_response()),
        }
    }
}

fn extract_passkey(path_result: Result<Path<PasskeyParam>, PathRejection>) -> Result<Passkey, responses::error::Error> {
    match path_result {
        Ok(Path(PasskeyParam(raw))) => raw.parse::<Passkey>().map_err(|_| responses::error::Error {
            failure_reason: "invalid passkey".to_owned(),
        }),
        Err(_) => Err(responses::error::Error {
            failure_reason: "passkey required".to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{extract_passkey, PasskeyParam};
    use axum::extract::Path;

    #[test]
    fn it_should_extract_a_valid_passkey() {
        let path = Ok(Path(PasskeyParam("00000000000000000000000000000001".to_owned())));
        let passkey = extract_passkey(path).unwrap();
        assert_eq!(passkey.to_string(), "00000000000000000000000000000001");
    }

    #[test]
    fn it_should_reject_a_passkey_with_the_wrong_length() {
        let path = Ok(Path(PasskeyParam("too-short".to_owned())));
        let error = extract_passkey(path).unwrap_err();
        assert_eq!(error.failure_reason, "invalid passkey");
    }
}
