//! The `MySQL` database driver.
use std::str::FromStr;

use async_trait::async_trait;
use privateer_tracker_primitives::info_hash::InfoHash;
use privateer_tracker_primitives::passkey::Passkey;
use privateer_tracker_primitives::DurationSinceUnixEpoch;
use r2d2::Pool;
use r2d2_mysql::mysql::prelude::Queryable;
use r2d2_mysql::mysql::{params, Opts, OptsBuilder};
use r2d2_mysql::MySqlConnectionManager;

use super::driver::Driver;
use super::{Database, Error};
use crate::core::gate::ClientPrefix;
use crate::core::torrent_record::TorrentRecord;
use crate::core::user::User;

const DRIVER: Driver = Driver::MySQL;

pub struct Mysql {
    pool: Pool<MySqlConnectionManager>,
}

type UserRow = (i64, String, i64, i64, i64, i8, f64, f64);

fn row_to_user((id, passkey, uploaded, downloaded, hnr_warnings, can_leech, required_ratio, bonus_points): UserRow) -> User {
    User {
        id,
        passkey: passkey.parse().unwrap_or_else(|_| Passkey::generate()),
        uploaded: u64::try_from(uploaded).unwrap_or(0),
        downloaded: u64::try_from(downloaded).unwrap_or(0),
        hnr_warnings: u32::try_from(hnr_warnings).unwrap_or(0),
        can_leech: can_leech != 0,
        required_ratio,
        bonus_points,
    }
}

type TorrentRow = (i64, String, u32, u32, u32, i8, Option<i64>, f64, f64);

fn row_to_torrent(
    (id, info_hash, seeders, leechers, completed, freeleech, freeleech_until, upload_multiplier, download_multiplier): TorrentRow,
) -> TorrentRecord {
    TorrentRecord {
        id,
        info_hash: InfoHash::from_str(&info_hash).unwrap_or_else(|_| InfoHash::from_bytes(&[0u8; 20])),
        seeders,
        leechers,
        completed,
        freeleech: freeleech != 0,
        freeleech_until: freeleech_until.map(|secs| DurationSinceUnixEpoch::from_secs(secs.unsigned_abs())),
        upload_multiplier,
        download_multiplier,
    }
}

#[async_trait]
impl Database for Mysql {
    /// It instantiates a new `MySQL` database driver.
    ///
    /// Refer to [`databases::Database::new`](crate::core::databases::Database::new).
    ///
    /// # Errors
    ///
    /// Will return `r2d2::Error` if `db_path` is not able to create `MySQL` database.
    fn new(db_path: &str) -> Result<Self, Error> {
        let opts = Opts::from_url(db_path)?;
        let builder = OptsBuilder::from_opts(opts);
        let manager = MySqlConnectionManager::new(builder);
        let pool = r2d2::Pool::builder().build(manager).map_err(|e| (e, DRIVER))?;

        Ok(Self { pool })
    }

    /// Refer to [`databases::Database::create_database_tables`](crate::core::databases::Database::create_database_tables).
    fn create_database_tables(&self) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_drop(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTO_INCREMENT,
                passkey VARCHAR(32) NOT NULL UNIQUE,
                uploaded BIGINT NOT NULL DEFAULT 0,
                downloaded BIGINT NOT NULL DEFAULT 0,
                hnr_warnings INTEGER NOT NULL DEFAULT 0,
                can_leech TINYINT NOT NULL DEFAULT 1,
                required_ratio DOUBLE NOT NULL DEFAULT 0.0,
                bonus_points DOUBLE NOT NULL DEFAULT 0.0
            );",
        )?;

        conn.query_drop(
            "CREATE TABLE IF NOT EXISTS torrents (
                id INTEGER PRIMARY KEY AUTO_INCREMENT,
                info_hash VARCHAR(40) NOT NULL UNIQUE,
                seeders INTEGER NOT NULL DEFAULT 0,
                leechers INTEGER NOT NULL DEFAULT 0,
                completed INTEGER NOT NULL DEFAULT 0,
                freeleech TINYINT NOT NULL DEFAULT 0,
                freeleech_until BIGINT,
                upload_multiplier DOUBLE NOT NULL DEFAULT 1.0,
                download_multiplier DOUBLE NOT NULL DEFAULT 1.0
            );",
        )?;

        conn.query_drop(
            "CREATE TABLE IF NOT EXISTS whitelist (
                id INTEGER PRIMARY KEY AUTO_INCREMENT,
                info_hash VARCHAR(40) NOT NULL UNIQUE
            );",
        )?;

        conn.query_drop(
            "CREATE TABLE IF NOT EXISTS client_whitelist (
                id INTEGER PRIMARY KEY AUTO_INCREMENT,
                prefix VARBINARY(8) NOT NULL UNIQUE
            );",
        )?;

        conn.query_drop(
            "CREATE TABLE IF NOT EXISTS bans (
                id INTEGER PRIMARY KEY AUTO_INCREMENT,
                ip VARCHAR(64) NOT NULL UNIQUE,
                reason VARCHAR(255) NOT NULL,
                expires_at BIGINT,
                INDEX idx_bans_expires_at (expires_at)
            );",
        )?;

        conn.query_drop(
            "CREATE TABLE IF NOT EXISTS snatches (
                user_id INTEGER NOT NULL,
                torrent_id INTEGER NOT NULL,
                completed_at BIGINT NOT NULL,
                seedtime BIGINT NOT NULL DEFAULT 0,
                last_announce_at BIGINT NOT NULL,
                hnr TINYINT NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, torrent_id),
                INDEX idx_snatches_hnr (hnr)
            );",
        )?;

        Ok(())
    }

    /// Refer to [`databases::Database::drop_database_tables`](crate::core::databases::Database::drop_database_tables).
    fn drop_database_tables(&self) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        for table in ["users", "torrents", "whitelist", "client_whitelist", "bans", "snatches"] {
            conn.query_drop(format!("DROP TABLE `{table}`;"))?;
        }

        Ok(())
    }

    async fn load_passkeys(&self) -> Result<Vec<(Passkey, i64)>, Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let rows: Vec<(String, i64)> = conn.query("SELECT passkey, id FROM users")?;

        Ok(rows.into_iter().filter_map(|(passkey, id)| passkey.parse::<Passkey>().ok().map(|passkey| (passkey, id))).collect())
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>, Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let row: Option<UserRow> = conn.exec_first(
            "SELECT id, passkey, uploaded, downloaded, hnr_warnings, can_leech, required_ratio, bonus_points FROM users WHERE id = :id",
            params! { "id" => user_id },
        )?;

        Ok(row.map(row_to_user))
    }

    async fn apply_user_delta(&self, user_id: i64, uploaded_delta: u64, downloaded_delta: u64, _now: DurationSinceUnixEpoch) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.exec_drop(
            "UPDATE users SET uploaded = uploaded + :uploaded_delta, downloaded = downloaded + :downloaded_delta WHERE id = :id",
            params! { "id" => user_id, uploaded_delta, downloaded_delta },
        )?;

        Ok(())
    }

    async fn apply_hnr_warnings(&self, user_id: i64, new_violations: u32, max_warnings: u32) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.exec_drop(
            "UPDATE users SET hnr_warnings = hnr_warnings + :new_violations WHERE id = :id",
            params! { "id" => user_id, new_violations },
        )?;
        conn.exec_drop(
            "UPDATE users SET can_leech = 0 WHERE id = :id AND hnr_warnings >= :max_warnings",
            params! { "id" => user_id, max_warnings },
        )?;

        Ok(())
    }

    async fn clear_hnr_warnings(&self, user_id: i64) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.exec_drop("UPDATE users SET hnr_warnings = 0, can_leech = 1 WHERE id = :id", params! { "id" => user_id })?;

        Ok(())
    }

    async fn add_bonus_points(&self, user_id: i64, points: f64) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.exec_drop(
            "UPDATE users SET bonus_points = bonus_points + :points WHERE id = :id",
            params! { "id" => user_id, points },
        )?;

        Ok(())
    }

    async fn bonus_points_for(&self, user_id: i64) -> Result<Option<f64>, Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let points = conn.exec_first("SELECT bonus_points FROM users WHERE id = :id", params! { "id" => user_id })?;

        Ok(points)
    }

    async fn redeem_bonus_points(&self, user_id: i64, points: f64, bonus_bytes: u64) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.exec_drop(
            "UPDATE users SET bonus_points = bonus_points - :points, uploaded = uploaded + :bonus_bytes
             WHERE id = :id AND bonus_points >= :points",
            params! { "id" => user_id, points, bonus_bytes },
        )?;

        Ok(())
    }

    async fn load_torrents(&self) -> Result<Vec<TorrentRecord>, Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let rows: Vec<TorrentRow> = conn.query(
            "SELECT id, info_hash, seeders, leechers, completed, freeleech, freeleech_until, upload_multiplier, download_multiplier FROM torrents",
        )?;

        Ok(rows.into_iter().map(row_to_torrent).collect())
    }

    async fn get_torrent_by_info_hash(&self, info_hash: &InfoHash) -> Result<Option<TorrentRecord>, Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let row: Option<TorrentRow> = conn.exec_first(
            "SELECT id, info_hash, seeders, leechers, completed, freeleech, freeleech_until, upload_multiplier, download_multiplier
             FROM torrents WHERE info_hash = :info_hash",
            params! { "info_hash" => info_hash.to_string() },
        )?;

        Ok(row.map(row_to_torrent))
    }

    async fn get_or_insert_torrent(&self, info_hash: &InfoHash) -> Result<i64, Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;
        let info_hash_str = info_hash.to_string();

        conn.exec_drop(
            "INSERT IGNORE INTO torrents (info_hash) VALUES (:info_hash)",
            params! { "info_hash" => &info_hash_str },
        )?;

        let id: i64 = conn
            .exec_first("SELECT id FROM torrents WHERE info_hash = :info_hash", params! { "info_hash" => info_hash_str })?
            .expect("row just inserted or already present");

        Ok(id)
    }

    async fn set_torrent_snapshot(&self, torrent_id: i64, seeders: u32, leechers: u32, completed_delta: u32) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.exec_drop(
            "UPDATE torrents SET seeders = :seeders, leechers = :leechers, completed = completed + :completed_delta WHERE id = :id",
            params! { "id" => torrent_id, seeders, leechers, completed_delta },
        )?;

        Ok(())
    }

    async fn is_torrent_whitelisted(&self, info_hash: &InfoHash) -> Result<bool, Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let found: Option<i64> = conn.exec_first(
            "SELECT id FROM whitelist WHERE info_hash = :info_hash",
            params! { "info_hash" => info_hash.to_string() },
        )?;

        Ok(found.is_some())
    }

    async fn add_torrent_to_whitelist(&self, info_hash: &InfoHash) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.exec_drop(
            "INSERT IGNORE INTO whitelist (info_hash) VALUES (:info_hash)",
            params! { "info_hash" => info_hash.to_string() },
        )?;

        Ok(())
    }

    async fn remove_torrent_from_whitelist(&self, info_hash: &InfoHash) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.exec_drop("DELETE FROM whitelist WHERE info_hash = :info_hash", params! { "info_hash" => info_hash.to_string() })?;

        Ok(())
    }

    async fn record_snatch_activity(
        &self,
        user_id: i64,
        torrent_id: i64,
        completed: bool,
        is_seeding: bool,
        seedtime_delta: u64,
        now: DurationSinceUnixEpoch,
    ) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;
        let now_secs = now.as_secs();

        conn.exec_drop(
            "INSERT INTO snatches (user_id, torrent_id, completed_at, seedtime, last_announce_at, hnr)
             VALUES (:user_id, :torrent_id, :now_secs, 0, :now_secs, 0)
             ON DUPLICATE KEY UPDATE last_announce_at = VALUES(last_announce_at)",
            params! { user_id, torrent_id, now_secs },
        )?;

        if completed {
            conn.exec_drop(
                "UPDATE snatches SET completed_at = :now_secs WHERE user_id = :user_id AND torrent_id = :torrent_id",
                params! { user_id, torrent_id, now_secs },
            )?;
        }

        if is_seeding && seedtime_delta > 0 {
            conn.exec_drop(
                "UPDATE snatches SET seedtime = seedtime + :seedtime_delta WHERE user_id = :user_id AND torrent_id = :torrent_id",
                params! { user_id, torrent_id, seedtime_delta },
            )?;
        }

        Ok(())
    }

    async fn mark_hit_and_runs(&self, cutoff: DurationSinceUnixEpoch, min_seedtime: u64) -> Result<Vec<i64>, Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;
        let cutoff_secs = cutoff.as_secs();

        let user_ids: Vec<i64> = conn.exec(
            "SELECT user_id FROM snatches WHERE completed_at < :cutoff_secs AND seedtime < :min_seedtime AND hnr = 0",
            params! { cutoff_secs, min_seedtime },
        )?;

        conn.exec_drop(
            "UPDATE snatches SET hnr = 1 WHERE completed_at < :cutoff_secs AND seedtime < :min_seedtime AND hnr = 0",
            params! { cutoff_secs, min_seedtime },
        )?;

        Ok(user_ids)
    }

    async fn load_client_whitelist(&self) -> Result<Vec<ClientPrefix>, Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let rows: Vec<Vec<u8>> = conn.query("SELECT prefix FROM client_whitelist")?;

        Ok(rows)
    }

    async fn add_client_prefix(&self, prefix: &ClientPrefix) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.exec_drop("INSERT IGNORE INTO client_whitelist (prefix) VALUES (:prefix)", params! { "prefix" => prefix })?;

        Ok(())
    }

    async fn remove_client_prefix(&self, prefix: &ClientPrefix) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.exec_drop("DELETE FROM client_whitelist WHERE prefix = :prefix", params! { "prefix" => prefix })?;

        Ok(())
    }

    async fn load_bans(&self) -> Result<Vec<(String, String, Option<DurationSinceUnixEpoch>)>, Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let rows: Vec<(String, String, Option<i64>)> = conn.query("SELECT ip, reason, expires_at FROM bans")?;

        Ok(rows
            .into_iter()
            .map(|(ip, reason, expires_at)| (ip, reason, expires_at.map(|secs| DurationSinceUnixEpoch::from_secs(secs.unsigned_abs()))))
            .collect())
    }

    async fn add_ban(&self, ip: &str, reason: &str, expires_at: Option<DurationSinceUnixEpoch>) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;
        let expires_at_secs = expires_at.map(|d| d.as_secs());

        conn.exec_drop(
            "INSERT INTO bans (ip, reason, expires_at) VALUES (:ip, :reason, :expires_at_secs)
             ON DUPLICATE KEY UPDATE reason = VALUES(reason), expires_at = VALUES(expires_at)",
            params! { ip, reason, expires_at_secs },
        )?;

        Ok(())
    }

    async fn remove_ban(&self, ip: &str) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.exec_drop("DELETE FROM bans WHERE ip = :ip", params! { ip })?;

        Ok(())
    }

    async fn cleanup_expired_bans(&self, now: DurationSinceUnixEpoch) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;
        let now_secs = now.as_secs();

        conn.exec_drop("DELETE FROM bans WHERE expires_at IS NOT NULL AND expires_at < :now_secs", params! { now_secs })?;

        Ok(())
    }
}
