//! The `SQLite3` database driver.
use std::panic::Location;
use std::str::FromStr;

use async_trait::async_trait;
use privateer_tracker_primitives::info_hash::InfoHash;
use privateer_tracker_primitives::passkey::Passkey;
use privateer_tracker_primitives::DurationSinceUnixEpoch;
use r2d2::Pool;
use r2d2_sqlite::rusqlite::{params, OptionalExtension};
use r2d2_sqlite::SqliteConnectionManager;

use super::driver::Driver;
use super::{Database, Error};
use crate::core::gate::ClientPrefix;
use crate::core::torrent_record::TorrentRecord;
use crate::core::user::User;

const DRIVER: Driver = Driver::Sqlite3;

pub struct Sqlite {
    pool: Pool<SqliteConnectionManager>,
}

fn row_to_user(row: &r2d2_sqlite::rusqlite::Row<'_>) -> r2d2_sqlite::rusqlite::Result<User> {
    let passkey_str: String = row.get("passkey")?;
    Ok(User {
        id: row.get("id")?,
        passkey: passkey_str.parse().unwrap_or_else(|_| Passkey::generate()),
        uploaded: u64::try_from(row.get::<_, i64>("uploaded")?).unwrap_or(0),
        downloaded: u64::try_from(row.get::<_, i64>("downloaded")?).unwrap_or(0),
        hnr_warnings: u32::try_from(row.get::<_, i64>("hnr_warnings")?).unwrap_or(0),
        can_leech: row.get::<_, i64>("can_leech")? != 0,
        required_ratio: row.get("required_ratio")?,
        bonus_points: row.get("bonus_points")?,
    })
}

fn row_to_torrent(row: &r2d2_sqlite::rusqlite::Row<'_>) -> r2d2_sqlite::rusqlite::Result<TorrentRecord> {
    let info_hash_str: String = row.get("info_hash")?;
    let freeleech_until: Option<i64> = row.get("freeleech_until")?;
    Ok(TorrentRecord {
        id: row.get("id")?,
        info_hash: InfoHash::from_str(&info_hash_str).unwrap_or_else(|_| InfoHash::from_bytes(&[0u8; 20])),
        seeders: row.get("seeders")?,
        leechers: row.get("leechers")?,
        completed: row.get("completed")?,
        freeleech: row.get::<_, i64>("freeleech")? != 0,
        freeleech_until: freeleech_until.map(|secs| DurationSinceUnixEpoch::from_secs(secs.unsigned_abs())),
        upload_multiplier: row.get("upload_multiplier")?,
        download_multiplier: row.get("download_multiplier")?,
    })
}

#[async_trait]
impl Database for Sqlite {
    /// It instantiates a new `SQLite3` database driver.
    ///
    /// Refer to [`databases::Database::new`](crate::core::databases::Database::new).
    ///
    /// # Errors
    ///
    /// Will return `r2d2::Error` if `db_path` is not able to create `SqLite` database.
    fn new(db_path: &str) -> Result<Sqlite, Error> {
        let cm = SqliteConnectionManager::file(db_path);
        Pool::new(cm).map_or_else(|err| Err((err, DRIVER).into()), |pool| Ok(Sqlite { pool }))
    }

    /// Refer to [`databases::Database::create_database_tables`](crate::core::databases::Database::create_database_tables).
    fn create_database_tables(&self) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                passkey TEXT NOT NULL UNIQUE,
                uploaded INTEGER NOT NULL DEFAULT 0,
                downloaded INTEGER NOT NULL DEFAULT 0,
                hnr_warnings INTEGER NOT NULL DEFAULT 0,
                can_leech INTEGER NOT NULL DEFAULT 1,
                required_ratio REAL NOT NULL DEFAULT 0.0,
                bonus_points REAL NOT NULL DEFAULT 0.0
            );

            CREATE TABLE IF NOT EXISTS torrents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                info_hash TEXT NOT NULL UNIQUE,
                seeders INTEGER NOT NULL DEFAULT 0,
                leechers INTEGER NOT NULL DEFAULT 0,
                completed INTEGER NOT NULL DEFAULT 0,
                freeleech INTEGER NOT NULL DEFAULT 0,
                freeleech_until INTEGER,
                upload_multiplier REAL NOT NULL DEFAULT 1.0,
                download_multiplier REAL NOT NULL DEFAULT 1.0
            );

            CREATE TABLE IF NOT EXISTS whitelist (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                info_hash TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS client_whitelist (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                prefix BLOB NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS bans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ip TEXT NOT NULL UNIQUE,
                reason TEXT NOT NULL,
                expires_at INTEGER
            );

            CREATE TABLE IF NOT EXISTS snatches (
                user_id INTEGER NOT NULL,
                torrent_id INTEGER NOT NULL,
                completed_at INTEGER NOT NULL,
                seedtime INTEGER NOT NULL DEFAULT 0,
                last_announce_at INTEGER NOT NULL,
                hnr INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, torrent_id)
            );

            CREATE INDEX IF NOT EXISTS idx_bans_expires_at ON bans (expires_at);
            CREATE INDEX IF NOT EXISTS idx_snatches_hnr ON snatches (hnr) WHERE hnr = 1;
            ",
        )?;

        Ok(())
    }

    /// Refer to [`databases::Database::drop_database_tables`](crate::core::databases::Database::drop_database_tables).
    fn drop_database_tables(&self) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute_batch(
            "
            DROP TABLE users;
            DROP TABLE torrents;
            DROP TABLE whitelist;
            DROP TABLE client_whitelist;
            DROP TABLE bans;
            DROP TABLE snatches;
            ",
        )?;

        Ok(())
    }

    async fn load_passkeys(&self) -> Result<Vec<(Passkey, i64)>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let mut stmt = conn.prepare("SELECT passkey, id FROM users")?;
        let rows = stmt.query_map([], |row| {
            let passkey: String = row.get(0)?;
            let id: i64 = row.get(1)?;
            Ok((passkey, id))
        })?;

        Ok(rows
            .filter_map(std::result::Result::ok)
            .filter_map(|(passkey, id)| passkey.parse::<Passkey>().ok().map(|passkey| (passkey, id)))
            .collect())
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_row("SELECT * FROM users WHERE id = ?1", params![user_id], row_to_user)
            .optional()
            .map_err(Into::into)
    }

    async fn apply_user_delta(&self, user_id: i64, uploaded_delta: u64, downloaded_delta: u64, _now: DurationSinceUnixEpoch) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        #[allow(clippy::cast_possible_wrap)]
        conn.execute(
            "UPDATE users SET uploaded = uploaded + ?2, downloaded = downloaded + ?3 WHERE id = ?1",
            params![user_id, uploaded_delta as i64, downloaded_delta as i64],
        )?;

        Ok(())
    }

    async fn apply_hnr_warnings(&self, user_id: i64, new_violations: u32, max_warnings: u32) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute(
            "UPDATE users SET hnr_warnings = hnr_warnings + ?2 WHERE id = ?1",
            params![user_id, new_violations],
        )?;
        conn.execute(
            "UPDATE users SET can_leech = 0 WHERE id = ?1 AND hnr_warnings >= ?2",
            params![user_id, max_warnings],
        )?;

        Ok(())
    }

    async fn clear_hnr_warnings(&self, user_id: i64) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute("UPDATE users SET hnr_warnings = 0, can_leech = 1 WHERE id = ?1", params![user_id])?;

        Ok(())
    }

    async fn add_bonus_points(&self, user_id: i64, points: f64) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute("UPDATE users SET bonus_points = bonus_points + ?2 WHERE id = ?1", params![user_id, points])?;

        Ok(())
    }

    async fn bonus_points_for(&self, user_id: i64) -> Result<Option<f64>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_row("SELECT bonus_points FROM users WHERE id = ?1", params![user_id], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    async fn redeem_bonus_points(&self, user_id: i64, points: f64, bonus_bytes: u64) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        #[allow(clippy::cast_possible_wrap)]
        let updated = conn.execute(
            "UPDATE users SET bonus_points = bonus_points - ?2, uploaded = uploaded + ?3 WHERE id = ?1 AND bonus_points >= ?2",
            params![user_id, points, bonus_bytes as i64],
        )?;

        if updated == 0 {
            return Err(Error::InsertFailed {
                location: Location::caller(),
                driver: DRIVER,
            });
        }

        Ok(())
    }

    async fn load_torrents(&self) -> Result<Vec<TorrentRecord>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let mut stmt = conn.prepare("SELECT * FROM torrents")?;
        let rows = stmt.query_map([], row_to_torrent)?;

        Ok(rows.filter_map(std::result::Result::ok).collect())
    }

    async fn get_torrent_by_info_hash(&self, info_hash: &InfoHash) -> Result<Option<TorrentRecord>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_row("SELECT * FROM torrents WHERE info_hash = ?1", params![info_hash.to_string()], row_to_torrent)
            .optional()
            .map_err(Into::into)
    }

    async fn get_or_insert_torrent(&self, info_hash: &InfoHash) -> Result<i64, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute(
            "INSERT INTO torrents (info_hash) VALUES (?1) ON CONFLICT(info_hash) DO NOTHING",
            params![info_hash.to_string()],
        )?;

        conn.query_row("SELECT id FROM torrents WHERE info_hash = ?1", params![info_hash.to_string()], |row| row.get(0))
            .map_err(Into::into)
    }

    async fn set_torrent_snapshot(&self, torrent_id: i64, seeders: u32, leechers: u32, completed_delta: u32) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute(
            "UPDATE torrents SET seeders = ?2, leechers = ?3, completed = completed + ?4 WHERE id = ?1",
            params![torrent_id, seeders, leechers, completed_delta],
        )?;

        Ok(())
    }

    async fn is_torrent_whitelisted(&self, info_hash: &InfoHash) -> Result<bool, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let found: Option<i64> = conn
            .query_row("SELECT id FROM whitelist WHERE info_hash = ?1", params![info_hash.to_string()], |row| row.get(0))
            .optional()?;

        Ok(found.is_some())
    }

    async fn add_torrent_to_whitelist(&self, info_hash: &InfoHash) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute(
            "INSERT INTO whitelist (info_hash) VALUES (?1) ON CONFLICT(info_hash) DO NOTHING",
            params![info_hash.to_string()],
        )?;

        Ok(())
    }

    async fn remove_torrent_from_whitelist(&self, info_hash: &InfoHash) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute("DELETE FROM whitelist WHERE info_hash = ?1", params![info_hash.to_string()])?;

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
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;
        let now_secs = i64::try_from(now.as_secs()).unwrap_or(i64::MAX);

        conn.execute(
            "INSERT INTO snatches (user_id, torrent_id, completed_at, seedtime, last_announce_at, hnr)
             VALUES (?1, ?2, ?3, 0, ?3, 0)
             ON CONFLICT(user_id, torrent_id) DO UPDATE SET last_announce_at = ?3",
            params![user_id, torrent_id, now_secs],
        )?;

        if completed {
            conn.execute(
                "UPDATE snatches SET completed_at = ?3 WHERE user_id = ?1 AND torrent_id = ?2",
                params![user_id, torrent_id, now_secs],
            )?;
        }

        if is_seeding && seedtime_delta > 0 {
            conn.execute(
                "UPDATE snatches SET seedtime = seedtime + ?3 WHERE user_id = ?1 AND torrent_id = ?2",
                params![user_id, torrent_id, seedtime_delta],
            )?;
        }

        Ok(())
    }

    async fn mark_hit_and_runs(&self, cutoff: DurationSinceUnixEpoch, min_seedtime: u64) -> Result<Vec<i64>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;
        let cutoff_secs = i64::try_from(cutoff.as_secs()).unwrap_or(i64::MAX);

        let mut stmt = conn.prepare("SELECT user_id FROM snatches WHERE completed_at < ?1 AND seedtime < ?2 AND hnr = 0")?;
        let user_ids: Vec<i64> = stmt
            .query_map(params![cutoff_secs, min_seedtime], |row| row.get(0))?
            .filter_map(std::result::Result::ok)
            .collect();

        conn.execute(
            "UPDATE snatches SET hnr = 1 WHERE completed_at < ?1 AND seedtime < ?2 AND hnr = 0",
            params![cutoff_secs, min_seedtime],
        )?;

        Ok(user_ids)
    }

    async fn load_client_whitelist(&self) -> Result<Vec<ClientPrefix>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let mut stmt = conn.prepare("SELECT prefix FROM client_whitelist")?;
        let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;

        Ok(rows.filter_map(std::result::Result::ok).collect())
    }

    async fn add_client_prefix(&self, prefix: &ClientPrefix) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute(
            "INSERT INTO client_whitelist (prefix) VALUES (?1) ON CONFLICT(prefix) DO NOTHING",
            params![prefix],
        )?;

        Ok(())
    }

    async fn remove_client_prefix(&self, prefix: &ClientPrefix) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute("DELETE FROM client_whitelist WHERE prefix = ?1", params![prefix])?;

        Ok(())
    }

    async fn load_bans(&self) -> Result<Vec<(String, String, Option<DurationSinceUnixEpoch>)>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let mut stmt = conn.prepare("SELECT ip, reason, expires_at FROM bans")?;
        let rows = stmt.query_map([], |row| {
            let ip: String = row.get(0)?;
            let reason: String = row.get(1)?;
            let expires_at: Option<i64> = row.get(2)?;
            Ok((ip, reason, expires_at.map(|secs| DurationSinceUnixEpoch::from_secs(secs.unsigned_abs()))))
        })?;

        Ok(rows.filter_map(std::result::Result::ok).collect())
    }

    async fn add_ban(&self, ip: &str, reason: &str, expires_at: Option<DurationSinceUnixEpoch>) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;
        let expires_at_secs = expires_at.map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX));

        conn.execute(
            "INSERT INTO bans (ip, reason, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(ip) DO UPDATE SET reason = ?2, expires_at = ?3",
            params![ip, reason, expires_at_secs],
        )?;

        Ok(())
    }

    async fn remove_ban(&self, ip: &str) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute("DELETE FROM bans WHERE ip = ?1", params![ip])?;

        Ok(())
    }

    async fn cleanup_expired_bans(&self, now: DurationSinceUnixEpoch) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;
        let now_secs = i64::try_from(now.as_secs()).unwrap_or(i64::MAX);

        conn.execute("DELETE FROM bans WHERE expires_at IS NOT NULL AND expires_at < ?1", params![now_secs])?;

        Ok(())
    }
}
