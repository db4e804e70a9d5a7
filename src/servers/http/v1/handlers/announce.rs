//! Axum [`handlers`](axum#handlers) for the `announce` request.
//!
//! Refer to the generic [HTTP server](crate::servers::http) documentation
//! for more information about the `announce` request (§6).
//!
//! The handler resolves the passkey and client IP, then delegates entirely
//! to [`core::Tracker::announce`](crate::core::Tracker::announce).
use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use privateer_tracker_clock::clock::Time;
use privateer_tracker_primitives::passkey::Passkey;
use tracing::debug;

use crate::core::{AnnounceRequest, Tracker};
use crate::servers::http::v1::extractors::announce_request::ExtractRequest;
use crate::servers::http::v1::extractors::client_ip_sources::Extract as ExtractClientIpSources;
use crate::servers::http::v1::extractors::passkey::ExtractPasskey;
use crate::servers::http::v1::requests::announce::Announce;
use crate::servers::http::v1::responses;
use crate::servers::http::v1::responses::announce::Compact as ResponseCompact;
use crate::servers::http::v1::services::peer_ip_resolver::{self, ClientIpSources};
use crate::CurrentClock;

#[allow(clippy::unused_async)]
pub async fn handle(
    State(tracker): State<Arc<Tracker>>,
    ExtractPasskey(passkey): ExtractPasskey,
    ExtractRequest(announce_request): ExtractRequest,
    ExtractClientIpSources(client_ip_sources): ExtractClientIpSources,
) -> Response {
    debug!("http announce request: {:#?}", announce_request);

    handle_announce(&tracker, &announce_request, &client_ip_sources, passkey).await
}

async fn handle_announce(
    tracker: &Arc<Tracker>,
    announce_request: &Announce,
    client_ip_sources: &ClientIpSources,
    passkey: Passkey,
) -> Response {
    let peer_addr = match resolve_peer_addr(client_ip_sources, announce_request.port) {
        Ok(addr) => addr,
        Err(error) => return error.into_response(),
    };

    let request = AnnounceRequest {
        passkey: Some(passkey),
        info_hash: announce_request.info_hash,
        peer_id: announce_request.peer_id,
        peer_addr,
        uploaded: announce_request.uploaded,
        downloaded: announce_request.downloaded,
        left: announce_request.left,
        event: announce_request.event,
        key: announce_request.key,
        num_want: announce_request.num_want,
    };

    match tracker.announce(request, CurrentClock::now()).await {
        Ok(data) => {
            let compact = if announce_request.compact { ResponseCompact::Yes } else { ResponseCompact::No };
            responses::Announce::from_core(data, compact).into_response()
        }
        Err(error) => responses::error::Error::from(error).into_response(),
    }
}

fn resolve_peer_addr(client_ip_sources: &ClientIpSources, port: u16) -> Result<std::net::SocketAddr, responses::error::Error> {
    let on_reverse_proxy = client_ip_sources.left_most_x_forwarded_for.is_some();
    let ip = peer_ip_resolver::invoke(on_reverse_proxy, client_ip_sources)?;
    Ok(std::net::SocketAddr::new(ip, port))
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::resolve_peer_addr;
    use crate::servers::http::v1::services::peer_ip_resolver::ClientIpSources;

    #[test]
    fn it_should_resolve_the_peer_ip_from_the_connection_info_when_there_is_no_x_forwarded_for_header() {
        let sources = ClientIpSources {
            left_most_x_forwarded_for: None,
            connection_info_ip: Some(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1))),
        };

        let addr = resolve_peer_addr(&sources, 8080).unwrap();
        assert_eq!(addr.ip(), IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)));
    }

    #[test]
    fn it_should_prefer_the_x_forwarded_for_header_when_present() {
        let sources = ClientIpSources {
            left_most_x_forwarded_for: Some(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 2))),
            connection_info_ip: Some(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1))),
        };

        let addr = resolve_peer_addr(&sources, 8080).unwrap();
        assert_eq!(addr.ip(), IpAddr::V4(Ipv4Addr::new(126, 0, 0, 2)));
    }
}
