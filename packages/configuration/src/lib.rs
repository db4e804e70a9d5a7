//! Configuration for the Privateer private `BitTorrent` tracker.
//!
//! All fields recognized by the tracker core are listed here, grouped the
//! way the core component that consumes them is grouped. Defaults are
//! chosen so that `Configuration::default()` is a runnable, single-node,
//! SQLite-backed development configuration.
//!
//! ```toml
//! [announce_policy]
//! interval = 120
//! jitter_ratio = 0.1
//!
//! [ratio_policy]
//! min_ratio = 1.0
//! grace_bytes = 50_000_000
//!
//! [hnr_policy]
//! enabled = true
//! min_seedtime = 259200
//! grace_period_days = 3
//! max_warnings = 3
//! ```
use std::time::Duration;

use camino::Utf8PathBuf;
use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use privateer_tracker_located_error::{DynError, Located, LocatedError};

/// Default request timeout applied by the HTTP tracker's middleware stack.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// The database management system used by the tracker.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub enum DatabaseDriver {
    Sqlite3,
    MySQL,
}

impl Default for DatabaseDriver {
    fn default() -> Self {
        Self::Sqlite3
    }
}

/// The peer-storage backend the swarm workers use.
///
/// Select at startup; the core does not mix backends within one process.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum PeerStorage {
    /// Per-process in-memory store. Not shared across nodes.
    Memory,
    /// A remote key-value store shared by multiple tracker nodes.
    External { url: String },
}

impl Default for PeerStorage {
    fn default() -> Self {
        Self::Memory
    }
}

/// HTTP tracker listener (BEP 3/7/23 announce/scrape).
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct HttpTracker {
    pub enabled: bool,
    pub bind_address: String,
    pub https_only: bool,
    pub tls_cert_path: Option<Utf8PathBuf>,
    pub tls_key_path: Option<Utf8PathBuf>,
}

impl Default for HttpTracker {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:7070".to_string(),
            https_only: false,
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

/// UDP tracker listener (BEP 15).
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct UdpTracker {
    pub enabled: bool,
    pub bind_address: String,
    /// Connection-id TTL, in seconds.
    pub connection_timeout: u32,
}

impl Default for UdpTracker {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:6969".to_string(),
            connection_timeout: 120,
        }
    }
}

/// Base announce interval and response jitter.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Copy)]
pub struct AnnouncePolicy {
    /// Base interval, in seconds, returned to clients.
    pub interval: u32,
    /// Jitter fraction in `[0, 1]`. `0` disables jitter.
    pub jitter_ratio: f64,
}

impl Default for AnnouncePolicy {
    fn default() -> Self {
        Self {
            interval: 120,
            jitter_ratio: 0.1,
        }
    }
}

/// Global ratio-enforcement policy. A per-user `required_ratio` overrides
/// `min_ratio` when nonzero.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Copy)]
pub struct RatioPolicy {
    pub min_ratio: f64,
    pub grace_bytes: u64,
}

impl Default for RatioPolicy {
    fn default() -> Self {
        Self {
            min_ratio: 1.0,
            grace_bytes: 50 * 1024 * 1024 * 1024,
        }
    }
}

/// Hit-and-run detector parameters. `enabled = false` disables the
/// background pass entirely.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Copy)]
pub struct HnrPolicy {
    pub enabled: bool,
    /// Minimum required seedtime, in seconds, to avoid an HnR mark.
    pub min_seedtime: u64,
    pub grace_period_days: u32,
    pub max_warnings: u32,
}

impl Default for HnrPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            min_seedtime: 3 * 24 * 3600,
            grace_period_days: 3,
            max_warnings: 3,
        }
    }
}

/// Bonus-point award rate and redemption exchange rate.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Copy)]
pub struct BonusPointsPolicy {
    pub enabled: bool,
    pub base_points: f64,
    /// Bytes of synthetic upload credit granted per redeemed point.
    pub conversion_rate: f64,
}

impl Default for BonusPointsPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            base_points: 1.0,
            conversion_rate: 1_073_741_824.0,
        }
    }
}

/// Per-class sliding-window rate limit: `(max_requests, per_minute)`.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Copy)]
pub struct RateLimit {
    pub max_requests: u32,
    pub per_minute: u32,
}

/// Rate-limiting configuration for the gate (C5).
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct RateLimiting {
    pub enabled: bool,
    pub announce: RateLimit,
    pub scrape: RateLimit,
    pub admin_api: RateLimit,
    /// IPs exempted from all rate limiting.
    pub whitelist: Vec<String>,
}

impl Default for RateLimiting {
    fn default() -> Self {
        Self {
            enabled: true,
            announce: RateLimit {
                max_requests: 60,
                per_minute: 60,
            },
            scrape: RateLimit {
                max_requests: 30,
                per_minute: 60,
            },
            admin_api: RateLimit {
                max_requests: 120,
                per_minute: 60,
            },
            whitelist: Vec::new(),
        }
    }
}

/// Peer-reachability verifier (C12) controls.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Copy)]
pub struct PeerVerification {
    pub enabled: bool,
    pub connect_timeout_ms: u64,
    pub cache_ttl_secs: u64,
    pub max_concurrent: usize,
}

impl Default for PeerVerification {
    fn default() -> Self {
        Self {
            enabled: true,
            connect_timeout_ms: 3_000,
            cache_ttl_secs: 3_600,
            max_concurrent: 50,
        }
    }
}

/// Admin-surface gating. The admin REST API itself is not part of this
/// crate; these fields are kept so the gate's contract (the sole external
/// mutator of gate-cache state) has somewhere to read its credentials and
/// network policy from.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct AdminApi {
    pub admin_token: String,
    pub cors_origins: Vec<String>,
    pub ip_whitelist: Vec<String>,
}

impl Default for AdminApi {
    fn default() -> Self {
        Self {
            admin_token: "MyAccessToken".to_string(),
            cors_origins: Vec::new(),
            ip_whitelist: Vec::new(),
        }
    }
}

/// Internal health-check API, used by orchestrators/load balancers to probe
/// whether the configured HTTP/UDP trackers are actually listening.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct HealthCheckApi {
    /// The address the API binds to, `ip:port`. Use `0.0.0.0` to listen on
    /// all interfaces, or port `0` to let the operating system choose.
    pub bind_address: String,
}

impl Default for HealthCheckApi {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:1313".to_string(),
        }
    }
}

/// Log verbosity, matching `tracing`'s filter syntax.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        write!(f, "{s}")
    }
}

/// Top-level tracker configuration.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct Configuration {
    pub log_level: LogLevel,
    pub log_json: bool,

    pub db_driver: DatabaseDriver,
    pub db_path: String,

    pub http_trackers: Vec<HttpTracker>,
    pub udp_trackers: Vec<UdpTracker>,

    pub announce_policy: AnnouncePolicy,
    pub ratio_policy: RatioPolicy,
    pub hnr_policy: HnrPolicy,
    pub bonus_points: BonusPointsPolicy,
    pub rate_limiting: RateLimiting,
    pub peer_verification: PeerVerification,
    pub peer_storage: PeerStorage,
    pub admin_api: AdminApi,
    pub health_check_api: HealthCheckApi,

    /// If true, an unknown `info_hash` is rejected instead of auto-registered.
    pub enforce_torrent_whitelist: bool,

    /// Graceful-shutdown grace period, in milliseconds, before background
    /// jobs are aborted.
    pub shutdown_timeout_ms: u64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_json: false,
            db_driver: DatabaseDriver::default(),
            db_path: "./storage/tracker/lib/database/sqlite3.db".to_string(),
            http_trackers: vec![HttpTracker::default()],
            udp_trackers: vec![UdpTracker::default()],
            announce_policy: AnnouncePolicy::default(),
            ratio_policy: RatioPolicy::default(),
            hnr_policy: HnrPolicy::default(),
            bonus_points: BonusPointsPolicy::default(),
            rate_limiting: RateLimiting::default(),
            peer_verification: PeerVerification::default(),
            peer_storage: PeerStorage::default(),
            admin_api: AdminApi::default(),
            health_check_api: HealthCheckApi::default(),
            enforce_torrent_whitelist: false,
            shutdown_timeout_ms: 5_000,
        }
    }
}

/// Errors produced while loading or saving the configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read configuration file: {source}")]
    ReadFile {
        #[source]
        source: LocatedError<'static, dyn std::error::Error + Send + Sync>,
    },
    #[error("Failed to parse configuration: {source}")]
    ParseFigment {
        #[source]
        source: LocatedError<'static, dyn std::error::Error + Send + Sync>,
    },
    #[error("Failed to write configuration file: {source}")]
    WriteFile {
        #[source]
        source: LocatedError<'static, dyn std::error::Error + Send + Sync>,
    },
}

impl Configuration {
    /// Loads the configuration from a TOML file, falling back to defaults
    /// for any field the file omits.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse as
    /// valid configuration.
    pub fn load_from_file(path: &str) -> Result<Self, Error> {
        let figment = Figment::from(Serialized::defaults(Configuration::default())).merge(Toml::file(path));

        figment.extract().map_err(|e| Error::ParseFigment {
            source: (Located(e).into()),
        })
    }

    /// Loads the configuration from an in-memory TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string does not parse as valid configuration.
    pub fn load(contents: &str) -> Result<Self, Error> {
        let figment = Figment::from(Serialized::defaults(Configuration::default())).merge(Toml::string(contents));

        figment.extract().map_err(|e| Error::ParseFigment {
            source: (Located(e).into()),
        })
    }

    /// Serializes the configuration to a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the configuration
    /// cannot be serialized.
    pub fn save_to_file(&self, path: &str) -> Result<(), Error> {
        let contents = toml::to_string_pretty(self).map_err(|e| Error::WriteFile {
            source: into_located(e),
        })?;

        std::fs::write(path, contents).map_err(|e| Error::WriteFile {
            source: into_located(e),
        })
    }
}

#[track_caller]
fn into_located<E: std::error::Error + Send + Sync + 'static>(e: E) -> LocatedError<'static, dyn std::error::Error + Send + Sync> {
    let dyn_err: DynError = std::sync::Arc::new(e);
    dyn_err.into()
}

#[cfg(test)]
mod tests {
    use super::Configuration;

    #[test]
    fn default_configuration_is_a_runnable_development_configuration() {
        let config = Configuration::default();
        assert!(config.http_trackers[0].enabled);
        assert!(config.udp_trackers[0].enabled);
        assert_eq!(config.announce_policy.interval, 120);
    }

    #[test]
    fn it_should_load_from_a_toml_string_overriding_only_the_given_fields() {
        let toml = "
            db_path = \"./storage/test/tracker.db\"

            [announce_policy]
            interval = 60
            jitter_ratio = 0.0
        ";

        let config = Configuration::load(toml).unwrap();

        assert_eq!(config.announce_policy.interval, 60);
        assert_eq!(config.ratio_policy.min_ratio, Configuration::default().ratio_policy.min_ratio);
    }
}
