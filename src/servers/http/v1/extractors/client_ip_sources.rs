//! Axum [`extractor`](axum::extract) to get the relevant information to resolve the remote
//! client IP.
//!
//! It reads two sources from the request:
//!
//! The first is the `X-Forwarded-For` HTTP header, parsed directly off the request parts. Per
//! `spec.md`'s ambient header handling, only the first comma-separated token is taken — that's
//! the original client, with every hop after it appended by an intermediate proxy.
//!
//! The second is [`ConnectInfo`], Axum's extractor for the socket address of the immediate TCP
//! peer (the nearest proxy, if any).
//!
//! The `ClientIpSources` struct is a wrapper for the two.
//!
//! Which one the tracker actually uses is decided per-request, not from configuration: if the
//! header is present and parses, it wins (the tracker is assumed to sit behind a reverse proxy
//! for that request); otherwise the connection's socket address is used. See
//! [`peer_ip_resolver::invoke`](crate::servers::http::v1::services::peer_ip_resolver::invoke).
//!
//! Given the following scenario:
//!
//! ```text
//! client          <-> http proxy 1                 <-> http proxy 2                          <-> server
//! ip: 126.0.0.1       ip: 126.0.0.2                    ip: 126.0.0.3                             ip: 126.0.0.4
//!                     X-Forwarded-For: 126.0.0.1       X-Forwarded-For: 126.0.0.1,126.0.0.2
//! ```
//!
//! This extractor returns these values:
//!
//! ```text
//! `left_most_x_forwarded_for` = 126.0.0.1
//! `connection_info_ip`         = 126.0.0.3
//! ```
use std::net::{IpAddr, SocketAddr};

use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::HeaderMap;
use axum::http::request::Parts;
use axum::response::Response;

use crate::servers::http::v1::services::peer_ip_resolver::ClientIpSources;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Extractor for the [`ClientIpSources`](crate::servers::http::v1::services::peer_ip_resolver::ClientIpSources)
/// struct.
pub struct Extract(pub ClientIpSources);

#[async_trait]
impl<S> FromRequestParts<S> for Extract
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let left_most_x_forwarded_for = left_most_x_forwarded_for(&parts.headers);

        let connection_info_ip = match ConnectInfo::<SocketAddr>::from_request_parts(parts, state).await {
            Ok(connection_info_socket_addr) => Some(connection_info_socket_addr.0.ip()),
            Err(_) => None,
        };

        Ok(Extract(ClientIpSources {
            left_most_x_forwarded_for,
            connection_info_ip,
        }))
    }
}

/// Parses the `X-Forwarded-For` header and returns the first (left-most) address, the original
/// client per `spec.md`'s header-handling rule. Returns `None` when the header is absent or its
/// first token does not parse as an IP address.
fn left_most_x_forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    let value = headers.get(X_FORWARDED_FOR)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    first.parse().ok()
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use axum::http::header::HeaderMap;
    use axum::http::HeaderValue;

    use super::left_most_x_forwarded_for;

    #[test]
    fn it_takes_the_first_token_of_a_multi_hop_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("126.0.0.1,126.0.0.2"));

        assert_eq!(
            left_most_x_forwarded_for(&headers),
            Some(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)))
        );
    }

    #[test]
    fn it_trims_whitespace_around_the_first_token() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" 126.0.0.1 , 126.0.0.2"));

        assert_eq!(
            left_most_x_forwarded_for(&headers),
            Some(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)))
        );
    }

    #[test]
    fn it_returns_none_when_the_header_is_missing() {
        let headers = HeaderMap::new();
        assert_eq!(left_most_x_forwarded_for(&headers), None);
    }

    #[test]
    fn it_returns_none_when_the_first_token_does_not_parse() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip,126.0.0.2"));

        assert_eq!(left_most_x_forwarded_for(&headers), None);
    }
}
