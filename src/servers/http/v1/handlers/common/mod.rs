//! Shared conversions from lower-level error types into the HTTP tracker's
//! bencoded [`error::Error`](crate::servers::http::v1::responses::error::Error)
//! response.
pub mod peer_ip;
