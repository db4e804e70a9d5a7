//! The peer reachability verifier (C12): asynchronous TCP dials, cached with
//! a TTL, that inform peer ordering (§4.4.2) without blocking the announce
//! fast path.
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use privateer_tracker_configuration::PeerVerification;
use privateer_tracker_primitives::peer::Connectable;
use privateer_tracker_primitives::DurationSinceUnixEpoch;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock, Semaphore};
use tracing::debug;

struct CacheEntry {
    connectable: Connectable,
    expires_at: DurationSinceUnixEpoch,
}

/// Caches the result of dialing a peer's announced address, and drives the
/// background dial queue.
pub struct PeerVerifier {
    enabled: bool,
    connect_timeout: Duration,
    cache_ttl: DurationSinceUnixEpoch,
    cache: RwLock<HashMap<SocketAddr, CacheEntry>>,
    semaphore: Arc<Semaphore>,
    queue_tx: mpsc::UnboundedSender<SocketAddr>,
}

impl PeerVerifier {
    #[must_use]
    pub fn new(config: &PeerVerification) -> Arc<Self> {
        let (queue_tx, mut queue_rx) = mpsc::unbounded_channel::<SocketAddr>();

        let verifier = Arc::new(Self {
            enabled: config.enabled,
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            cache_ttl: DurationSinceUnixEpoch::from_secs(config.cache_ttl_secs),
            cache: RwLock::new(HashMap::new()),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            queue_tx,
        });

        if config.enabled {
            let worker = verifier.clone();
            tokio::spawn(async move {
                while let Some(addr) = queue_rx.recv().await {
                    worker.clone().dial(addr).await;
                }
            });
        }

        verifier
    }

    /// `check_connectable(ip, port)`: returns the cached verdict, enqueuing
    /// a fresh probe on a cache miss or expiry. Never suspends the caller.
    pub async fn check_connectable(&self, addr: SocketAddr, now: DurationSinceUnixEpoch) -> Connectable {
        if !self.enabled {
            return Connectable::Unknown;
        }

        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&addr) {
                if entry.expires_at > now {
                    return entry.connectable;
                }
            }
        }

        let _ = self.queue_tx.send(addr);
        Connectable::Unknown
    }

    async fn dial(self: Arc<Self>, addr: SocketAddr) {
        let Ok(_permit) = self.semaphore.clone().acquire_owned().await else {
            return;
        };

        let connectable = match tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => Connectable::Yes,
            Ok(Err(_)) | Err(_) => Connectable::No,
        };

        debug!(%addr, ?connectable, "peer reachability probe finished");

        let expires_at = now_placeholder() + self.cache_ttl;
        let mut cache = self.cache.write().await;
        cache.insert(addr, CacheEntry { connectable, expires_at });
    }

    /// Sweeps expired cache entries. Called on a periodic background tick.
    pub async fn sweep_expired(&self, now: DurationSinceUnixEpoch) {
        let mut cache = self.cache.write().await;
        cache.retain(|_, entry| entry.expires_at > now);
    }
}

/// The probe's completion happens off the request path on its own clock;
/// unlike every other component it cannot be handed `now` by its caller.
fn now_placeholder() -> DurationSinceUnixEpoch {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use super::PeerVerifier;
    use privateer_tracker_configuration::PeerVerification;
    use privateer_tracker_primitives::peer::Connectable;
    use privateer_tracker_primitives::DurationSinceUnixEpoch;

    #[tokio::test]
    async fn a_disabled_verifier_always_reports_unknown() {
        let verifier = PeerVerifier::new(&PeerVerification {
            enabled: false,
            connect_timeout_ms: 100,
            cache_ttl_secs: 60,
            max_concurrent: 1,
        });

        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 1);
        let result = verifier.check_connectable(addr, DurationSinceUnixEpoch::from_secs(0)).await;
        assert_eq!(result, Connectable::Unknown);
    }

    #[tokio::test]
    async fn a_cache_miss_returns_unknown_and_enqueues_a_probe() {
        let verifier = PeerVerifier::new(&PeerVerification {
            enabled: true,
            connect_timeout_ms: 50,
            cache_ttl_secs: 60,
            max_concurrent: 4,
        });

        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 1);
        let result = verifier.check_connectable(addr, DurationSinceUnixEpoch::from_secs(0)).await;
        assert_eq!(result, Connectable::Unknown);
    }
}
