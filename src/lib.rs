//! **Privateer Tracker** is a private [`BitTorrent`](https://www.bittorrent.org/) tracker.
//!
//! [`BitTorrent`](https://en.wikipedia.org/wiki/BitTorrent) is a protocol for distributing files using a peer-to-peer network.
//!
//! Peers in the network need to know where they can find other peers with the files they are looking for.
//! Trackers are services that allow peers to quickly find other peers. Client peers announce their existence to a
//! tracker, and the tracker responds to the peer with a list of other peers in the swarm.
//!
//! Unlike a public tracker, every request here is gated: a passkey (HTTP) or an issued connection id (UDP) ties a
//! request to a user account, and a ratio/hit-and-run policy decides whether that user is still allowed to leech.
//!
//! You can learn more about `BitTorrent` and `BitTorrent` trackers on these sites:
//!
//! - <https://www.bittorrent.org/>
//! - <https://en.wikipedia.org/wiki/BitTorrent>
//! - <https://en.wikipedia.org/wiki/BitTorrent_tracker>
//!
//! # Table of contents
//!
//! - [Services](#services)
//! - [Configuration](#configuration)
//! - [Usage](#usage)
//!     - [HTTP Tracker](#http-tracker)
//!     - [UDP Tracker](#udp-tracker)
//! - [Components](#components)
//! - [Implemented BEPs](#implemented-beps)
//!
//! # Services
//!
//! From the end-user perspective the tracker exposes two services, plus an internal health check:
//!
//! - One or more [`HTTP`](crate::servers::http) trackers (BEP 3/7/23)
//! - One or more [`UDP`](crate::servers::udp) trackers (BEP 15)
//!
//! # Configuration
//!
//! In order to run the tracker you need to provide the configuration. If you run the tracker without providing a
//! configuration file, it will generate the default configuration the first time it runs, writing a `tracker.toml`
//! file in the current directory.
//!
//! For the full set of recognized fields, see the [privateer-tracker-configuration crate](https://docs.rs/privateer-tracker-configuration).
//!
//! Alternatively to the `tracker.toml` file you can use the `TORRUST_TRACKER_CONFIG` environment variable to pass the
//! configuration directly:
//!
//! ```text
//! TORRUST_TRACKER_CONFIG=$(cat tracker.toml)
//! cargo run
//! ```
//!
//! > NOTE: the `TORRUST_TRACKER_CONFIG` env var has priority over the `tracker.toml` file.
//!
//! # Usage
//!
//! Running the tracker with the default configuration exposes the services on these URLs:
//!
//! - UDP tracker: <udp://localhost:6969>
//! - HTTP tracker: <http://localhost:7070>
//!
//! ## HTTP tracker
//!
//! The HTTP tracker implements two types of requests, both authenticated by a passkey in the URL path:
//!
//! - Announce: <http://127.0.0.1:7070/<passkey>/announce>
//! - Scrape: <http://127.0.0.1:7070/<passkey>/scrape>
//!
//! Refer to [`servers::http`] for more information about the HTTP tracker.
//!
//! If you want to know more about the `announce`/`scrape` requests:
//!
//! - [BEP 3. The `BitTorrent` Protocol Specification](https://www.bittorrent.org/beps/bep_0003.html)
//! - [BEP 23. Tracker Returns Compact Peer Lists](https://www.bittorrent.org/beps/bep_0023.html)
//! - [BEP 48. Tracker Protocol Extension: Scrape](https://www.bittorrent.org/beps/bep_0048.html)
//!
//! ## UDP tracker
//!
//! The UDP tracker implements the same two requests over BEP 15's binary wire format, gated behind a connect
//! handshake that issues a short-lived connection id instead of carrying a passkey:
//!
//! - Connect, Announce, Scrape: <udp://127.0.0.1:6969>
//!
//! Refer to [`servers::udp`] for more information about the UDP tracker.
//!
//! # Components
//!
//! The tracker has three main components:
//!
//! - The transport-agnostic request pipeline: [`core`]
//! - The [`HTTP`](crate::servers::http) tracker
//! - The [`UDP`](crate::servers::udp) tracker
//!
//! ## Core tracker
//!
//! The core tracker holds the domain logic shared by both transports:
//!
//! - The gate: passkey/ban/client-whitelist authentication and authorization (`core::gate`)
//! - Rate limiting (`core::rate_limiter`)
//! - The swarm engine: per-`info_hash` peer workers (`core::swarm`)
//! - Ratio enforcement and hit-and-run detection (`core::user`, `core::hnr`)
//! - Bonus-point accounting (`core::bonus`)
//! - Peer-reachability verification (`core::verifier`)
//! - Statistics aggregation and persistence (`core::stats`)
//! - Persistence (`core::databases`)
//!
//! See [`core`] for more details.
//!
//! # Implemented BEPs
//!
//! BEP stands for `BitTorrent` Enhancement Proposal. BEPs are documents providing information to the `BitTorrent`
//! community or describing a new feature for the `BitTorrent` protocols. You can find all BEPs on <https://www.bittorrent.org/>.
//!
//! This tracker implements:
//!
//! - [BEP 3](https://www.bittorrent.org/beps/bep_0003.html): The `BitTorrent` Protocol
//! - [BEP 7](https://www.bittorrent.org/beps/bep_0007.html): IPv6 Support
//! - [BEP 15](https://www.bittorrent.org/beps/bep_0015.html): UDP Tracker Protocol for `BitTorrent`
//! - [BEP 23](https://www.bittorrent.org/beps/bep_0023.html): Tracker Returns Compact Peer Lists
//! - [BEP 27](https://www.bittorrent.org/beps/bep_0027.html): Private Torrents
//! - [BEP 48](https://www.bittorrent.org/beps/bep_0048.html): Tracker Protocol Extension: Scrape

use privateer_tracker_clock::clock;

pub mod app;
pub mod bootstrap;
pub mod core;
pub mod servers;
pub mod shared;

/// This code needs to be copied into each crate.
/// Working version, for production.
#[cfg(not(test))]
#[allow(dead_code)]
pub(crate) type CurrentClock = clock::Working;

/// Stopped version, for testing.
#[cfg(test)]
#[allow(dead_code)]
pub(crate) type CurrentClock = clock::Stopped;
