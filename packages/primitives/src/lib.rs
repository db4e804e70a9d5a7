//! Primitive types for the Privateer private `BitTorrent` tracker.
//!
//! These structures are shared by the core crate and by every package that
//! needs to talk about a torrent, a peer, or a time, without depending on
//! the whole tracker crate.
use std::time::Duration;

pub mod announce_event;
pub mod info_hash;
pub mod passkey;
pub mod peer;
pub mod swarm_metadata;

/// A duration since the Unix epoch, the unit every stored and wire timestamp
/// in this crate is expressed in.
pub type DurationSinceUnixEpoch = Duration;

/// The database management system used by the tracker.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, derive_more::Display, Clone)]
pub enum DatabaseDriver {
    /// The Sqlite3 database driver.
    Sqlite3,
    /// The `MySQL` database driver.
    MySQL,
}
