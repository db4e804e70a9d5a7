//! Tracker configuration factories for testing.
use std::env;

use privateer_tracker_configuration::Configuration;

use crate::random;

/// This configuration is used for testing. It generates random config values
/// so they do not collide if you run more than one tracker at the same time.
///
/// > **NOTICE**: This configuration is not meant to be used in production.
///
/// > **NOTICE**: Port 0 is used for ephemeral ports, which means that the OS
/// will assign a random free port for the tracker to use.
///
/// > **NOTICE**: You can change the log level to `debug` to see the traces of
/// the tracker while running the tests. That can be particularly useful when
/// debugging tests.
///
/// # Panics
///
/// Will panic if it can't convert the temp file path to string
#[must_use]
pub fn ephemeral() -> Configuration {
    // todo: disable services that are not needed.
    // For example: a test for the UDP tracker should disable the HTTP tracker.

    let mut config = Configuration {
        log_level: privateer_tracker_configuration::LogLevel::Off, // Change to `Debug` for tests debugging
        ..Default::default()
    };

    // Ephemeral socket address for the HTTP tracker
    config.http_trackers[0].enabled = true;
    config.http_trackers[0].bind_address = "127.0.0.1:0".to_string();

    // Ephemeral socket address for the UDP tracker
    config.udp_trackers[0].enabled = true;
    config.udp_trackers[0].bind_address = "127.0.0.1:0".to_string();

    // Ephemeral socket address for the Health Check API
    config.health_check_api.bind_address = "127.0.0.1:0".to_string();

    // Ephemeral sqlite database
    let temp_directory = env::temp_dir();
    let random_db_id = random::string(16);
    let temp_file = temp_directory.join(format!("data_{random_db_id}.db"));
    temp_file.to_str().unwrap().clone_into(&mut config.db_path);

    config
}

/// Ephemeral configuration with the hit-and-run detector disabled.
#[must_use]
pub fn ephemeral_without_hnr() -> Configuration {
    let mut cfg = ephemeral();

    cfg.hnr_policy.enabled = false;

    cfg
}

/// Ephemeral configuration with rate limiting disabled, for tests that would
/// otherwise be flaky under a tight request budget.
#[must_use]
pub fn ephemeral_without_rate_limiting() -> Configuration {
    let mut cfg = ephemeral();

    cfg.rate_limiting.enabled = false;

    cfg
}

/// Ephemeral configuration that rejects any `info_hash` not already known to
/// the tracker, instead of auto-registering it on first announce.
#[must_use]
pub fn ephemeral_with_torrent_whitelist_enforced() -> Configuration {
    let mut cfg = ephemeral();

    cfg.enforce_torrent_whitelist = true;

    cfg
}

/// Ephemeral configuration with the peer-reachability verifier disabled.
#[must_use]
pub fn ephemeral_without_peer_verification() -> Configuration {
    let mut cfg = ephemeral();

    cfg.peer_verification.enabled = false;

    cfg
}

/// Ephemeral configuration using a wildcard IPv6 bind address for the UDP
/// and HTTP services.
#[must_use]
pub fn ephemeral_ipv6() -> Configuration {
    let mut cfg = ephemeral();

    let ipv6 = "[::1]:0".to_string();

    cfg.http_trackers[0].bind_address.clone_from(&ipv6);
    cfg.udp_trackers[0].bind_address = ipv6;

    cfg
}

/// Ephemeral configuration without running any services, for tests that only
/// exercise the core tracker directly.
#[must_use]
pub fn ephemeral_with_no_services() -> Configuration {
    let mut cfg = ephemeral();

    cfg.http_trackers[0].enabled = false;
    cfg.udp_trackers[0].enabled = false;

    cfg
}
