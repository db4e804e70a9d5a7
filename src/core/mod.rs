//! The request pipeline (C13): gate → decode (handled by `servers::*`) →
//! swarm dispatch → stats record → response. Everything transport-specific
//! (bencode, BEP 15 framing, HTTP query decoding) lives under `servers`;
//! this module is the transport-agnostic core the spec calls out as the
//! request pipeline, plus the background passes that keep it healthy.
pub mod bonus;
pub mod databases;
pub mod error;
pub mod gate;
pub mod hnr;
pub mod rate_limiter;
pub mod snatch;
pub mod stats;
pub mod swarm;
pub mod torrent_record;
pub mod user;
pub mod verifier;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use aquatic_udp_protocol::PeerId;
use privateer_tracker_configuration::{Configuration, DatabaseDriver};
use privateer_tracker_primitives::announce_event::AnnounceEvent;
use privateer_tracker_primitives::info_hash::InfoHash;
use privateer_tracker_primitives::passkey::Passkey;
use privateer_tracker_primitives::peer::{AnnounceKey, Peer};
use privateer_tracker_primitives::DurationSinceUnixEpoch;
use rand::Rng;
use tracing::debug;

use self::databases::Database;
use self::error::{AdminError, AnnounceRequestError, ScrapeRequestError};
use self::gate::{BanCheck, BanRecord, ClientPrefix, GateCache, IpMatcher};
use self::rate_limiter::{RateLimitDecision, RateLimiter, RequestClass};
use self::stats::StatsBuffer;
use self::swarm::{AnnounceError, AnnounceInput, SwarmRegistry, TorrentDirectory};
use self::verifier::PeerVerifier;

/// One announce, already decoded from its transport into transport-agnostic
/// fields. `passkey` is `Some` for HTTP (mandatory, carried in the URL path)
/// and always `None` for UDP (BEP 15 has no passkey field, design note b).
#[derive(Debug, Clone)]
pub struct AnnounceRequest {
    pub passkey: Option<Passkey>,
    pub info_hash: InfoHash,
    pub peer_id: PeerId,
    pub peer_addr: SocketAddr,
    pub uploaded: i64,
    pub downloaded: i64,
    pub left: i64,
    pub event: AnnounceEvent,
    pub key: Option<AnnounceKey>,
    pub num_want: i32,
}

/// The announce outcome, ready for either transport's encoder.
#[derive(Debug, Clone)]
pub struct AnnounceResponse {
    pub interval: u32,
    pub seeders: u32,
    pub leechers: u32,
    pub peers: Vec<Peer>,
    pub announce_key: AnnounceKey,
}

/// One scrape: one or more info hashes, same passkey convention as announce.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub passkey: Option<Passkey>,
    pub info_hashes: Vec<InfoHash>,
}

/// Per-`info_hash` scrape counters (§4.1 scrape response).
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrapeEntry {
    pub seeders: u32,
    pub completed: u32,
    pub leechers: u32,
}

#[derive(Debug, Clone)]
pub struct ScrapeResponse {
    pub files: Vec<(InfoHash, ScrapeEntry)>,
}

/// Why a gate-level check (shared by announce and scrape) rejected a
/// request, before either error type's own vocabulary is applied.
enum GateRejection {
    Banned(String),
    RateLimited(u64),
    InvalidPasskey,
}

/// Looks up and creates torrent rows through the durable store, the
/// [`TorrentDirectory`] implementation the swarm registry (C8) depends on.
struct DbTorrentDirectory<'a> {
    database: &'a dyn Database,
}

#[async_trait::async_trait]
impl TorrentDirectory for DbTorrentDirectory<'_> {
    async fn lookup(&self, info_hash: &InfoHash) -> Option<(i64, u32)> {
        self.database
            .get_torrent_by_info_hash(info_hash)
            .await
            .ok()
            .flatten()
            .map(|torrent| (torrent.id, torrent.completed))
    }

    async fn is_whitelisted(&self, info_hash: &InfoHash) -> bool {
        self.database.is_torrent_whitelisted(info_hash).await.unwrap_or(false)
    }

    async fn create(&self, info_hash: &InfoHash) -> i64 {
        self.database.get_or_insert_torrent(info_hash).await.unwrap_or_default()
    }
}

/// The request pipeline (C13) and the home of every long-lived component
/// the background jobs in `bootstrap::jobs` drive on a schedule.
pub struct Tracker {
    pub gate: GateCache,
    pub rate_limiter: RateLimiter,
    pub swarm: SwarmRegistry,
    pub stats: StatsBuffer,
    pub verifier: Arc<PeerVerifier>,
    pub database: Box<dyn Database>,
    pub config: Configuration,
}

impl Tracker {
    /// Builds a tracker from configuration: opens the durable store,
    /// performs the initial gate-cache load, and constructs the swarm
    /// registry over the configured peer-storage backend (§4.2, §4.5).
    ///
    /// # Errors
    ///
    /// Propagates a database error from opening the store or the initial
    /// gate-cache load.
    pub async fn new(config: Configuration) -> Result<Self, databases::error::Error> {
        let driver = match config.db_driver {
            DatabaseDriver::Sqlite3 => databases::driver::Driver::Sqlite3,
            DatabaseDriver::MySQL => databases::driver::Driver::MySQL,
        };
        let database = databases::driver::build(&driver, &config.db_path)?;

        let gate = GateCache::default();
        gate.reload(database.as_ref()).await?;

        let rate_limiter = RateLimiter::new(&config.rate_limiting);
        let verifier = PeerVerifier::new(&config.peer_verification);
        let storage = swarm::build_peer_storage(&config.peer_storage);
        let swarm = SwarmRegistry::new(storage, config.enforce_torrent_whitelist);

        Ok(Self {
            gate,
            rate_limiter,
            swarm,
            stats: StatsBuffer::default(),
            verifier,
            database,
            config,
        })
    }

    fn directory(&self) -> DbTorrentDirectory<'_> {
        DbTorrentDirectory { database: self.database.as_ref() }
    }

    /// `apply_jitter(base, j)` (§4.1): `max(1, base ± uniform(0, base·j))`.
    fn jittered_interval(&self) -> u32 {
        let base = self.config.announce_policy.interval;
        let jitter = self.config.announce_policy.jitter_ratio;
        if jitter <= 0.0 {
            return base.max(1);
        }

        #[allow(clippy::cast_possible_truncation)]
        let spread = (f64::from(base) * jitter) as i64;
        if spread <= 0 {
            return base.max(1);
        }

        let offset = rand::thread_rng().gen_range(-spread..=spread);
        let jittered = i64::from(base) + offset;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        jittered.max(1) as u32
    }

    /// Shared gate checks for both announce and scrape (§2 data flow): ban
    /// check, rate limit, then passkey resolution when one was supplied.
    fn gate_check(&self, ip: IpAddr, class: RequestClass, passkey: Option<&Passkey>, now: DurationSinceUnixEpoch) -> Result<Option<i64>, GateRejection> {
        if let BanCheck::Banned { reason } = self.gate.check_banned(ip, now) {
            return Err(GateRejection::Banned(reason));
        }

        if let RateLimitDecision::Deny { retry_after_secs } = self.rate_limiter.check(ip, class, now) {
            return Err(GateRejection::RateLimited(retry_after_secs));
        }

        match passkey {
            None => Ok(None),
            Some(passkey) => self.gate.user_id_for_passkey(passkey).map(Some).ok_or(GateRejection::InvalidPasskey),
        }
    }

    /// Processes one announce (§4.4.1, §4.10 eligibility, §4.6 stats).
    ///
    /// # Errors
    ///
    /// See [`AnnounceRequestError`] for the full error taxonomy.
    pub async fn announce(&self, request: AnnounceRequest, now: DurationSinceUnixEpoch) -> Result<AnnounceResponse, AnnounceRequestError> {
        let ip = request.peer_addr.ip();

        let user_id = match self.gate_check(ip, RequestClass::Announce, request.passkey.as_ref(), now) {
            Ok(user_id) => user_id,
            Err(GateRejection::Banned(reason)) => return Err(AnnounceRequestError::Banned { reason }),
            Err(GateRejection::RateLimited(retry_after_secs)) => return Err(AnnounceRequestError::RateLimited { retry_after_secs }),
            Err(GateRejection::InvalidPasskey) => return Err(AnnounceRequestError::InvalidPasskey),
        };

        if !self.gate.is_valid_client(&request.peer_id.0) {
            return Err(AnnounceRequestError::ClientNotWhitelisted);
        }

        let is_leecher = request.left > 0;

        if is_leecher {
            if let Some(user_id) = user_id {
                if let Some(user) = self.database.get_user(user_id).await? {
                    user.check_leech_eligibility(&self.config.ratio_policy)?;
                }
            }
        }

        let worker = self.swarm.get_or_create(&request.info_hash, &self.directory()).await?;

        let input = AnnounceInput {
            user_id,
            peer_addr: request.peer_addr,
            peer_id: request.peer_id,
            left: request.left,
            uploaded: request.uploaded,
            downloaded: request.downloaded,
            event: request.event,
            key: request.key,
            num_want: request.num_want,
            prefer_seeders: is_leecher,
        };

        let outcome = worker.announce(input, &self.verifier, now).await.map_err(|err| match err {
            AnnounceError::KeyRequired => AnnounceRequestError::KeyRequired,
            AnnounceError::InvalidKey => AnnounceRequestError::InvalidKey,
        })?;

        self.record_announce_stats(user_id, &request, &outcome, now).await;

        debug!(
            info_hash = %request.info_hash,
            peer = %request.peer_addr,
            seeders = outcome.seeders,
            leechers = outcome.leechers,
            "announce processed"
        );

        Ok(AnnounceResponse {
            interval: self.jittered_interval(),
            seeders: outcome.seeders,
            leechers: outcome.leechers,
            peers: outcome.peers,
            announce_key: outcome.announce_key,
        })
    }

    /// Applies torrent multipliers and freeleech (§4.6), then records the
    /// user delta and snatch activity. Stats-pipeline failures are logged
    /// and dropped, not surfaced to the caller — the announce already
    /// succeeded from the peer's perspective.
    async fn record_announce_stats(&self, user_id: Option<i64>, request: &AnnounceRequest, outcome: &swarm::AnnounceOutcome, now: DurationSinceUnixEpoch) {
        let torrent = self.database.get_torrent_by_info_hash(&request.info_hash).await.ok().flatten();

        let (upload_multiplier, download_multiplier) = torrent
            .as_ref()
            .map_or((1.0, 1.0), |t| (t.upload_multiplier, t.effective_download_multiplier(now)));

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let uploaded = (outcome.uploaded_delta as f64 * upload_multiplier).trunc() as u64;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let downloaded = (outcome.downloaded_delta as f64 * download_multiplier).trunc() as u64;

        self.stats.record_user_delta(user_id, uploaded, downloaded);

        if let (Some(user_id), Some(torrent)) = (user_id, torrent) {
            let is_seeding = request.left == 0 && request.event != AnnounceEvent::Stopped;
            if let Err(error) = self
                .database
                .record_snatch_activity(user_id, torrent.id, outcome.completed_this_announce, is_seeding, outcome.seedtime_delta, now)
                .await
            {
                tracing::warn!(%user_id, %error, "failed to record snatch activity, dropping it");
            }
        }
    }

    /// Processes one scrape (§4.1 scrape response). Read-only: no swarm
    /// worker is spawned for an info_hash that does not already have one.
    ///
    /// # Errors
    ///
    /// See [`ScrapeRequestError`] for the full error taxonomy.
    pub async fn scrape(&self, request: ScrapeRequest, source_ip: IpAddr, now: DurationSinceUnixEpoch) -> Result<ScrapeResponse, ScrapeRequestError> {
        match self.gate_check(source_ip, RequestClass::Scrape, request.passkey.as_ref(), now) {
            Ok(_) => {}
            Err(GateRejection::Banned(reason)) => return Err(ScrapeRequestError::Banned { reason }),
            Err(GateRejection::RateLimited(retry_after_secs)) => return Err(ScrapeRequestError::RateLimited { retry_after_secs }),
            Err(GateRejection::InvalidPasskey) => return Err(ScrapeRequestError::InvalidPasskey),
        }

        let mut files = Vec::with_capacity(request.info_hashes.len());
        for info_hash in request.info_hashes {
            let entry = match self.database.get_torrent_by_info_hash(&info_hash).await? {
                Some(torrent) => ScrapeEntry {
                    seeders: torrent.seeders,
                    completed: torrent.completed,
                    leechers: torrent.leechers,
                },
                None => ScrapeEntry::default(),
            };
            files.push((info_hash, entry));
        }

        Ok(ScrapeResponse { files })
    }

    // --- Background passes, driven by `bootstrap::jobs` on a schedule ---

    /// Peer cleanup + idle-worker teardown (§4.4.3).
    pub async fn sweep_idle_workers(&self, now: DurationSinceUnixEpoch) {
        self.swarm.sweep_idle_workers(now).await;
    }

    /// Torrent-stat sync (§4.4.4): drains every active worker's snapshot
    /// into the stats buffer.
    pub async fn sync_torrent_snapshots(&self) {
        for (torrent_id, seeders, leechers, completed_delta) in self.swarm.sync_snapshots().await {
            self.stats.record_torrent_snapshot(torrent_id, seeders, leechers, completed_delta);
        }
    }

    /// Drains the stats buffer into the durable store (§4.6).
    pub async fn collect_stats(&self, now: DurationSinceUnixEpoch) {
        stats::collect(&self.stats, self.database.as_ref(), now).await;
    }

    /// Hit-and-run detection pass (§4.8).
    ///
    /// # Errors
    ///
    /// Propagates the first database failure encountered.
    pub async fn run_hnr_pass(&self, now: DurationSinceUnixEpoch) -> Result<(), databases::error::Error> {
        hnr::run_pass(self.database.as_ref(), &self.config.hnr_policy, now).await
    }

    /// Bonus-point award pass (§4.9).
    ///
    /// # Errors
    ///
    /// Propagates the first database failure encountered.
    pub async fn run_bonus_pass(&self) -> Result<(), databases::error::Error> {
        bonus::run_pass(&self.swarm, self.database.as_ref(), &self.config.bonus_points).await
    }

    /// Peer-reachability cache sweep (§4.7).
    pub async fn sweep_verifier_cache(&self, now: DurationSinceUnixEpoch) {
        self.verifier.sweep_expired(now).await;
    }

    /// Rate-limit window sweep (§4.3).
    pub fn sweep_rate_limiter(&self, now: DurationSinceUnixEpoch) {
        self.rate_limiter.sweep(now);
    }

    /// Gate cache in-memory ban sweep, plus the durable-store counterpart.
    ///
    /// # Errors
    ///
    /// Propagates a database failure from the durable cleanup.
    pub async fn sweep_expired_bans(&self, now: DurationSinceUnixEpoch) -> Result<(), databases::error::Error> {
        self.gate.sweep_expired_bans(now);
        self.database.cleanup_expired_bans(now).await
    }

    /// Rebuilds the gate cache from the durable store (§4.2).
    ///
    /// # Errors
    ///
    /// Propagates a database failure.
    pub async fn reload_gate(&self) -> Result<(), databases::error::Error> {
        self.gate.reload(self.database.as_ref()).await
    }
}

/// The admin mutation surface (SUPPLEMENT: Admin mutation surface). Not a
/// network-exposed endpoint — `spec.md` places the admin REST API out of
/// scope, but the gate cache and durable store are stated to be mutated "by
/// admin commands"; this trait is that contract, implementable and testable
/// without inventing a REST surface.
#[async_trait::async_trait]
pub trait GateAdmin {
    async fn add_passkey(&self, passkey: Passkey, user_id: i64) -> Result<(), AdminError>;
    async fn remove_passkey(&self, passkey: &Passkey) -> Result<(), AdminError>;
    async fn add_client_prefix(&self, prefix: ClientPrefix) -> Result<(), AdminError>;
    async fn remove_client_prefix(&self, prefix: &ClientPrefix) -> Result<(), AdminError>;
    async fn add_ban(&self, ip: &str, reason: &str, expires_at: Option<DurationSinceUnixEpoch>) -> Result<(), AdminError>;
    async fn remove_ban(&self, ip: &str) -> Result<(), AdminError>;
    async fn clear_hnr_warnings(&self, user_id: i64) -> Result<(), AdminError>;
    async fn redeem_bonus_points(&self, user_id: i64, points: f64) -> Result<(), AdminError>;
}

#[async_trait::async_trait]
impl GateAdmin for Tracker {
    async fn add_passkey(&self, passkey: Passkey, user_id: i64) -> Result<(), AdminError> {
        self.gate.insert_passkey(passkey, user_id);
        Ok(())
    }

    async fn remove_passkey(&self, passkey: &Passkey) -> Result<(), AdminError> {
        self.gate.remove_passkey(passkey);
        Ok(())
    }

    async fn add_client_prefix(&self, prefix: ClientPrefix) -> Result<(), AdminError> {
        self.database.add_client_prefix(&prefix).await?;
        self.gate.insert_client_prefix(prefix);
        Ok(())
    }

    async fn remove_client_prefix(&self, prefix: &ClientPrefix) -> Result<(), AdminError> {
        self.database.remove_client_prefix(prefix).await?;
        Ok(())
    }

    async fn add_ban(&self, ip: &str, reason: &str, expires_at: Option<DurationSinceUnixEpoch>) -> Result<(), AdminError> {
        let matcher = IpMatcher::parse(ip)?;
        self.database.add_ban(ip, reason, expires_at).await?;
        self.gate.insert_ban(BanRecord {
            matcher,
            reason: reason.to_string(),
            expires_at,
        });
        Ok(())
    }

    async fn remove_ban(&self, ip: &str) -> Result<(), AdminError> {
        self.database.remove_ban(ip).await?;
        Ok(())
    }

    async fn clear_hnr_warnings(&self, user_id: i64) -> Result<(), AdminError> {
        hnr::clear_warnings(self.database.as_ref(), user_id).await?;
        Ok(())
    }

    async fn redeem_bonus_points(&self, user_id: i64, points: f64) -> Result<(), AdminError> {
        bonus::redeem(self.database.as_ref(), user_id, points, self.config.bonus_points.conversion_rate)
            .await
            .map_err(|_| AdminError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use aquatic_udp_protocol::PeerId;
    use privateer_tracker_primitives::announce_event::AnnounceEvent;
    use privateer_tracker_primitives::info_hash::InfoHash;
    use privateer_tracker_primitives::DurationSinceUnixEpoch;
    use privateer_tracker_test_helpers::configuration::ephemeral_with_no_services;

    use super::{AnnounceRequest, GateAdmin, ScrapeRequest, Tracker};

    async fn tracker() -> Tracker {
        let config = ephemeral_with_no_services();
        Tracker::new(config).await.expect("tracker should build from a valid ephemeral configuration")
    }

    fn announce(port: u16) -> AnnounceRequest {
        AnnounceRequest {
            passkey: None,
            info_hash: InfoHash::from_bytes(&[7u8; 20]),
            peer_id: PeerId(*b"-TR3000-xxxxxxxxxxxx"),
            peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port),
            uploaded: 0,
            downloaded: 0,
            left: 100,
            event: AnnounceEvent::Started,
            key: None,
            num_want: 50,
        }
    }

    #[tokio::test]
    async fn it_should_reject_an_announce_from_a_client_not_on_the_whitelist() {
        let tracker = tracker().await;

        let result = tracker.announce(announce(6881), DurationSinceUnixEpoch::from_secs(1)).await;

        assert!(matches!(result, Err(super::AnnounceRequestError::ClientNotWhitelisted)));
    }

    #[tokio::test]
    async fn it_should_accept_an_announce_from_a_whitelisted_client_and_reflect_it_in_a_scrape() {
        let tracker = tracker().await;

        tracker
            .add_client_prefix(b"-TR".to_vec())
            .await
            .expect("whitelisting a client prefix should not fail");

        let response = tracker
            .announce(announce(6881), DurationSinceUnixEpoch::from_secs(1))
            .await
            .expect("a whitelisted first announce should succeed");

        assert_eq!(response.leechers, 1);
        assert_eq!(response.seeders, 0);

        // Scrape reads cached counters off the durable store, which only see
        // a torrent's latest seeder/leecher split after a sync pass.
        tracker.sync_torrent_snapshots().await;

        let scrape = tracker
            .scrape(
                ScrapeRequest {
                    passkey: None,
                    info_hashes: vec![InfoHash::from_bytes(&[7u8; 20])],
                },
                IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
                DurationSinceUnixEpoch::from_secs(1),
            )
            .await
            .expect("scrape should not fail");

        assert_eq!(scrape.files.len(), 1);
        assert_eq!(scrape.files[0].1.leechers, 1);
    }
}
