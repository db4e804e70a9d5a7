//! The per-(IP, class) sliding-window rate limiter (C5).
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::RwLock;

use privateer_tracker_configuration::{RateLimit, RateLimiting};
use privateer_tracker_primitives::DurationSinceUnixEpoch;

const WINDOW_SECS: u64 = 60;

/// The request classes the limiter tracks independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestClass {
    Announce,
    Scrape,
    AdminApi,
}

/// The outcome of [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allow,
    Deny { retry_after_secs: u64 },
}

#[derive(Default)]
struct Window {
    timestamps: Vec<DurationSinceUnixEpoch>,
}

/// A sliding-window counter per `(ip, class)`.
pub struct RateLimiter {
    enabled: bool,
    limits: HashMap<RequestClass, RateLimit>,
    whitelist: Vec<IpAddr>,
    windows: RwLock<HashMap<(IpAddr, RequestClass), Window>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: &RateLimiting) -> Self {
        let mut limits = HashMap::new();
        limits.insert(RequestClass::Announce, config.announce);
        limits.insert(RequestClass::Scrape, config.scrape);
        limits.insert(RequestClass::AdminApi, config.admin_api);

        let whitelist = config
            .whitelist
            .iter()
            .filter_map(|raw| raw.parse::<IpAddr>().ok())
            .collect();

        Self {
            enabled: config.enabled,
            limits,
            whitelist,
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Checks and, on allow, records one request from `ip` for `class` at
    /// `now` (§4.3).
    #[must_use]
    pub fn check(&self, ip: IpAddr, class: RequestClass, now: DurationSinceUnixEpoch) -> RateLimitDecision {
        if !self.enabled || self.whitelist.contains(&ip) {
            return RateLimitDecision::Allow;
        }

        let Some(limit) = self.limits.get(&class).copied() else {
            return RateLimitDecision::Allow;
        };

        let window_start = now.saturating_sub(DurationSinceUnixEpoch::from_secs(WINDOW_SECS));

        let mut windows = self.windows.write().unwrap();
        let window = windows.entry((ip, class)).or_default();

        window.timestamps.retain(|ts| *ts >= window_start);

        if window.timestamps.len() < limit.max_requests as usize {
            window.timestamps.push(now);
            RateLimitDecision::Allow
        } else {
            let oldest = window.timestamps.iter().min().copied().unwrap_or(now);
            let retry_at = oldest + DurationSinceUnixEpoch::from_secs(WINDOW_SECS);
            let retry_after_secs = retry_at.saturating_sub(now).as_secs();
            RateLimitDecision::Deny { retry_after_secs }
        }
    }

    /// Background sweep: drops windows that have gone empty (every
    /// timestamp aged out), so the map does not grow unbounded with
    /// one-shot clients.
    pub fn sweep(&self, now: DurationSinceUnixEpoch) {
        let window_start = now.saturating_sub(DurationSinceUnixEpoch::from_secs(WINDOW_SECS));
        let mut windows = self.windows.write().unwrap();
        windows.retain(|_, window| {
            window.timestamps.retain(|ts| *ts >= window_start);
            !window.timestamps.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::{RateLimitDecision, RateLimiter, RequestClass};
    use privateer_tracker_configuration::{RateLimit, RateLimiting};
    use privateer_tracker_primitives::DurationSinceUnixEpoch;

    fn config(max_requests: u32) -> RateLimiting {
        RateLimiting {
            enabled: true,
            announce: RateLimit { max_requests, per_minute: 60 },
            scrape: RateLimit { max_requests, per_minute: 60 },
            admin_api: RateLimit { max_requests, per_minute: 60 },
            whitelist: Vec::new(),
        }
    }

    fn ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
    }

    #[test]
    fn it_allows_up_to_the_configured_limit_then_denies() {
        let limiter = RateLimiter::new(&config(2));
        let now = DurationSinceUnixEpoch::from_secs(1000);

        assert_eq!(limiter.check(ip(), RequestClass::Announce, now), RateLimitDecision::Allow);
        assert_eq!(limiter.check(ip(), RequestClass::Announce, now), RateLimitDecision::Allow);
        assert_eq!(
            limiter.check(ip(), RequestClass::Announce, now),
            RateLimitDecision::Deny { retry_after_secs: 60 }
        );
    }

    #[test]
    fn a_whitelisted_ip_is_never_limited() {
        let mut cfg = config(1);
        cfg.whitelist.push(ip().to_string());
        let limiter = RateLimiter::new(&cfg);
        let now = DurationSinceUnixEpoch::from_secs(1000);

        for _ in 0..10 {
            assert_eq!(limiter.check(ip(), RequestClass::Announce, now), RateLimitDecision::Allow);
        }
    }

    #[test]
    fn the_window_slides_so_old_requests_age_out() {
        let limiter = RateLimiter::new(&config(1));
        let t0 = DurationSinceUnixEpoch::from_secs(1000);
        assert_eq!(limiter.check(ip(), RequestClass::Announce, t0), RateLimitDecision::Allow);

        let t1 = DurationSinceUnixEpoch::from_secs(1000 + 61);
        assert_eq!(limiter.check(ip(), RequestClass::Announce, t1), RateLimitDecision::Allow);
    }

    #[test]
    fn disabled_rate_limiting_always_allows() {
        let mut cfg = config(1);
        cfg.enabled = false;
        let limiter = RateLimiter::new(&cfg);
        let now = DurationSinceUnixEpoch::from_secs(1000);

        for _ in 0..5 {
            assert_eq!(limiter.check(ip(), RequestClass::Announce, now), RateLimitDecision::Allow);
        }
    }
}
