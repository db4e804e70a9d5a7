//! Axum [`handlers`](axum#handlers) for the `scrape` request.
//!
//! Refer to the generic [HTTP server](crate::servers::http) documentation
//! for more information about the `scrape` request (§6).
use std::net::IpAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use privateer_tracker_clock::clock::Time;
use privateer_tracker_primitives::passkey::Passkey;
use tracing::debug;

use crate::core::{ScrapeRequest, Tracker};
use crate::servers::http::v1::extractors::client_ip_sources::Extract as ExtractClientIpSources;
use crate::servers::http::v1::extractors::passkey::ExtractPasskey;
use crate::servers::http::v1::extractors::scrape_request::ExtractRequest;
use crate::servers::http::v1::requests::scrape::Scrape;
use crate::servers::http::v1::responses;
use crate::servers::http::v1::services::peer_ip_resolver::{self, ClientIpSources};
use crate::CurrentClock;

#[allow(clippy::unused_async)]
pub async fn handle(
    State(tracker): State<Arc<Tracker>>,
    ExtractPasskey(passkey): ExtractPasskey,
    ExtractRequest(scrape_request): ExtractRequest,
    ExtractClientIpSources(client_ip_sources): ExtractClientIpSources,
) -> Response {
    debug!("http scrape request: {:#?}", scrape_request);

    handle_scrape(&tracker, &scrape_request, &client_ip_sources, passkey).await
}

async fn handle_scrape(tracker: &Arc<Tracker>, scrape_request: &Scrape, client_ip_sources: &ClientIpSources, passkey: Passkey) -> Response {
    let source_ip = match resolve_source_ip(client_ip_sources) {
        Ok(ip) => ip,
        Err(error) => return error.into_response(),
    };

    let request = ScrapeRequest {
        passkey: Some(passkey),
        info_hashes: scrape_request.info_hashes.clone(),
    };

    match tracker.scrape(request, source_ip, CurrentClock::now()).await {
        Ok(data) => responses::Scrape::from_core(data).into_response(),
        Err(error) => responses::error::Error::from(error).into_response(),
    }
}

fn resolve_source_ip(client_ip_sources: &ClientIpSources) -> Result<IpAddr, responses::error::Error> {
    let on_reverse_proxy = client_ip_sources.left_most_x_forwarded_for.is_some();
    Ok(peer_ip_resolver::invoke(on_reverse_proxy, client_ip_sources)?)
}
