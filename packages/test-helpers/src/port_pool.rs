use lazy_static::lazy_static;
use tokio::sync::Mutex;

lazy_static! {
    static ref PORT_POOL_UDP: PortPool = PortPool::new(49152, 51000);
    static ref PORT_POOL_TCP: PortPool = PortPool::new(49152, 51000);
}

type Port = u16;

/// A resource pool of ports.
/// Can be used to avoid address already in use errors.
pub struct PortPool {
    ports: Mutex<Vec<Port>>,
}

impl PortPool {
    /// Returns a new `PortPool`.
    ///
    /// # Arguments
    ///
    /// * `start` - u16 inclusive.
    /// * `end` - u16 exclusive.
    ///
    /// # Panics
    ///
    /// Will panic if end is not higher than start.
    #[must_use]
    pub fn new(start: u16, end: u16) -> Self {
        assert!(end > start);

        let ports: Vec<Port> = (start..end).collect();

        Self { ports: Mutex::new(ports) }
    }

    pub async fn acquire(&self) -> Option<u16> {
        self.ports.lock().await.pop()
    }
}

pub async fn acquire_udp() -> u16 {
    PORT_POOL_UDP.acquire().await.expect("UDP port pool is exhausted.")
}

pub async fn acquire_tcp() -> u16 {
    PORT_POOL_TCP.acquire().await.expect("TCP port pool is exhausted.")
}
