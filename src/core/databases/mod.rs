//! The persistence module.
//!
//! Persistence is currently implemented with one [`Database`] trait.
//!
//! There are two implementations of the trait (two drivers):
//!
//! - [`Mysql`](crate::core::databases::mysql::Mysql)
//! - [`Sqlite`](crate::core::databases::sqlite::Sqlite)
//!
//! > **NOTICE**: There are no database migrations. If there are any changes,
//! we will implement them or provide a script to migrate to the new schema.
//!
//! The persistent objects are:
//!
//! - [Users](#users) — accounts, ratio state, bonus points
//! - [Torrents](#torrents) — swarm identity, cached counters, freeleech
//! - [Snatches](#snatches) — per-(user, torrent) completion and seedtime
//! - [Client whitelist](#client-whitelist) — registered `peer_id` prefixes
//! - [Bans](#bans) — banned addresses and CIDR blocks
//!
//! # Users
//!
//! Field            | Sample data                          | Description
//! ---|---|---
//! `id`             | 1                                    | Autoincrement id
//! `passkey`        | `00000000000000000000000000000001` | 32-hex-character credential, unique
//! `uploaded`       | 1048576                             | Cumulative bytes uploaded
//! `downloaded`     | 2097152                             | Cumulative bytes downloaded
//! `hnr_warnings`   | 0                                    | Hit-and-run warning count
//! `can_leech`      | true                                  | Leech eligibility switch
//! `required_ratio` | 0.0                                   | Per-user override, `0.0` uses the global policy
//! `bonus_points`   | 0.0                                   | Redeemable bonus-point balance
//!
//! # Torrents
//!
//! Field                | Sample data                              | Description
//! ---|---|---
//! `id`                 | 1                                        | Autoincrement id
//! `info_hash`          | `c1277613db1d28709b034a017ab2cae4be07ae` | `BitTorrent` infohash V1
//! `seeders`             | 4                                         | Cached swarm counter, lags by up to a sync period
//! `leechers`            | 2                                         | Cached swarm counter
//! `completed`           | 20                                       | Cumulative completed-download count
//! `freeleech`           | false                                     | Whether downloads count against ratio
//! `freeleech_until`     | `null`                                    | Optional freeleech expiry
//! `upload_multiplier`   | 1.0                                       | Applied to credited uploaded bytes
//! `download_multiplier` | 1.0                                       | Applied to charged downloaded bytes
//!
//! # Snatches
//!
//! Unique `(user_id, torrent_id)`. Tracks `completed_at`, accumulated
//! `seedtime`, `last_announce_at`, and the `hnr` flag set by the periodic
//! detection pass.
//!
//! # Client whitelist
//!
//! Registered `peer_id` prefixes (1 to 8 raw bytes). The HTTP path only ever
//! checks the first 3 bytes (see design note (a) in the gate cache).
//!
//! # Bans
//!
//! Field         | Sample data       | Description
//! ---|---|---
//! `ip`          | `10.0.0.0/8`      | Exact address or CIDR block, unique
//! `reason`      | `"abuse"`         | Free text shown to admins
//! `expires_at`  | `null`            | Optional expiry; absent means permanent
pub mod driver;
pub mod error;
pub mod mysql;
pub mod sqlite;

use std::marker::PhantomData;

use async_trait::async_trait;
use privateer_tracker_primitives::info_hash::InfoHash;
use privateer_tracker_primitives::passkey::Passkey;
use privateer_tracker_primitives::DurationSinceUnixEpoch;

use self::error::Error;
use crate::core::gate::ClientPrefix;
use crate::core::torrent_record::TorrentRecord;
use crate::core::user::User;

struct Builder<T>
where
    T: Database,
{
    phantom: PhantomData<T>,
}

impl<T> Builder<T>
where
    T: Database + 'static,
{
    /// .
    ///
    /// # Errors
    ///
    /// Will return `r2d2::Error` if `db_path` is not able to create a database.
    pub(self) fn build(db_path: &str) -> Result<Box<dyn Database>, Error> {
        Ok(Box::new(T::new(db_path)?))
    }
}

/// The persistence trait. It contains all the methods needed to interact with
/// the durable store, for both the request-path gate cache and the
/// background accounting passes.
#[async_trait]
pub trait Database: Sync + Send {
    /// It instantiates a new database driver.
    ///
    /// # Errors
    ///
    /// Will return `r2d2::Error` if `db_path` is not able to create a database.
    fn new(db_path: &str) -> Result<Self, Error>
    where
        Self: std::marker::Sized;

    // Schema

    /// It generates the database tables. SQL queries are hardcoded in the trait
    /// implementation.
    ///
    /// # Context: Schema
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to create own tables.
    fn create_database_tables(&self) -> Result<(), Error>;

    /// It drops the database tables.
    ///
    /// # Context: Schema
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to drop tables.
    fn drop_database_tables(&self) -> Result<(), Error>;

    // Users

    /// Loads every `(passkey, user_id)` pair, for the gate cache's startup
    /// and periodic reloads.
    ///
    /// # Context: Users
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to load.
    async fn load_passkeys(&self) -> Result<Vec<(Passkey, i64)>, Error>;

    /// Looks up a user by id, for eligibility checks off the hot path.
    ///
    /// # Context: Users
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to load.
    async fn get_user(&self, user_id: i64) -> Result<Option<User>, Error>;

    /// Applies one accounting period's accumulated uploaded/downloaded delta
    /// to a user's cumulative totals (§4.6).
    ///
    /// # Context: Users
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn apply_user_delta(&self, user_id: i64, uploaded_delta: u64, downloaded_delta: u64, now: DurationSinceUnixEpoch) -> Result<(), Error>;

    /// Adds `new_violations` to a user's hit-and-run warning count, disabling
    /// leech once the count reaches `max_warnings` (§4.8).
    ///
    /// # Context: Users
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn apply_hnr_warnings(&self, user_id: i64, new_violations: u32, max_warnings: u32) -> Result<(), Error>;

    /// The admin clear-warnings action: resets a user's warning count and
    /// restores leech eligibility.
    ///
    /// # Context: Users
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn clear_hnr_warnings(&self, user_id: i64) -> Result<(), Error>;

    /// Credits `points` bonus points to a user's balance (§4.9).
    ///
    /// # Context: Users
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn add_bonus_points(&self, user_id: i64, points: f64) -> Result<(), Error>;

    /// Returns a user's current bonus-point balance, `None` if the user does
    /// not exist.
    ///
    /// # Context: Users
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to load.
    async fn bonus_points_for(&self, user_id: i64) -> Result<Option<f64>, Error>;

    /// Deducts `points` from a user's balance and credits `bonus_bytes` to
    /// their `uploaded` total, atomically.
    ///
    /// # Context: Users
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn redeem_bonus_points(&self, user_id: i64, points: f64, bonus_bytes: u64) -> Result<(), Error>;

    // Torrents

    /// Loads every known torrent's identity and cached swarm counters, for
    /// warm-starting the swarm registry at boot.
    ///
    /// # Context: Torrents
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to load.
    async fn load_torrents(&self) -> Result<Vec<TorrentRecord>, Error>;

    /// Looks up a torrent row by `info_hash`.
    ///
    /// # Context: Torrents
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to load.
    async fn get_torrent_by_info_hash(&self, info_hash: &InfoHash) -> Result<Option<TorrentRecord>, Error>;

    /// Inserts a new torrent row, race-safe: on a unique-constraint conflict
    /// the existing row's id is returned instead (§4.5).
    ///
    /// # Context: Torrents
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn get_or_insert_torrent(&self, info_hash: &InfoHash) -> Result<i64, Error>;

    /// Overwrites the cached `seeders`/`leechers` and adds to the cumulative
    /// `completed` counter (§4.4.4).
    ///
    /// # Context: Torrents
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn set_torrent_snapshot(&self, torrent_id: i64, seeders: u32, leechers: u32, completed_delta: u32) -> Result<(), Error>;

    /// Torrent whitelist membership check, used by the swarm registry when
    /// whitelist enforcement is enabled.
    ///
    /// # Context: Torrents
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to load.
    async fn is_torrent_whitelisted(&self, info_hash: &InfoHash) -> Result<bool, Error>;

    /// Adds a torrent to the whitelist ahead of its first announce.
    ///
    /// # Context: Torrents
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn add_torrent_to_whitelist(&self, info_hash: &InfoHash) -> Result<(), Error>;

    /// Removes a torrent from the whitelist.
    ///
    /// # Context: Torrents
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn remove_torrent_from_whitelist(&self, info_hash: &InfoHash) -> Result<(), Error>;

    // Snatches

    /// Records one announce's contribution to a (user, torrent) snatch row:
    /// creates it on a `completed` event, and always bumps `last_announce_at`
    /// and (while seeding) the clamped `seedtime` delta (§4.4.1, invariant 7).
    ///
    /// # Context: Snatches
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn record_snatch_activity(
        &self,
        user_id: i64,
        torrent_id: i64,
        completed: bool,
        is_seeding: bool,
        seedtime_delta: u64,
        now: DurationSinceUnixEpoch,
    ) -> Result<(), Error>;

    /// Marks every snatch that completed before `cutoff` with `seedtime <
    /// min_seedtime` and `hnr = false` as a hit-and-run, returning the owning
    /// `user_id` of each newly marked row (one entry per violation) (§4.8).
    ///
    /// # Context: Snatches
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn mark_hit_and_runs(&self, cutoff: DurationSinceUnixEpoch, min_seedtime: u64) -> Result<Vec<i64>, Error>;

    // Client whitelist

    /// Loads every registered client `peer_id` prefix, for the gate cache's
    /// startup and periodic reloads.
    ///
    /// # Context: Client whitelist
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to load.
    async fn load_client_whitelist(&self) -> Result<Vec<ClientPrefix>, Error>;

    /// Registers a new client prefix.
    ///
    /// # Context: Client whitelist
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn add_client_prefix(&self, prefix: &ClientPrefix) -> Result<(), Error>;

    /// Removes a registered client prefix.
    ///
    /// # Context: Client whitelist
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn remove_client_prefix(&self, prefix: &ClientPrefix) -> Result<(), Error>;

    // Bans

    /// Loads every ban as `(ip_or_cidr, reason, expires_at)`, for the gate
    /// cache's startup and periodic reloads.
    ///
    /// # Context: Bans
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to load.
    async fn load_bans(&self) -> Result<Vec<(String, String, Option<DurationSinceUnixEpoch>)>, Error>;

    /// Adds a ban by exact address or CIDR block.
    ///
    /// # Context: Bans
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn add_ban(&self, ip: &str, reason: &str, expires_at: Option<DurationSinceUnixEpoch>) -> Result<(), Error>;

    /// Removes a ban by its `ip` field.
    ///
    /// # Context: Bans
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn remove_ban(&self, ip: &str) -> Result<(), Error>;

    /// Deletes every ban whose `expires_at` is in the past, the durable
    /// counterpart to the gate cache's in-memory sweep.
    ///
    /// # Context: Bans
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn cleanup_expired_bans(&self, now: DurationSinceUnixEpoch) -> Result<(), Error>;
}
