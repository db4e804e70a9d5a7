//! The swarm engine: peer storage (C6), per-`info_hash` workers (C7), and the
//! registry that owns them (C8).
pub mod peer_storage;
pub mod registry;
pub mod worker;

pub use peer_storage::{build as build_peer_storage, PeerStorageBackend};
pub use registry::{RegistryError, SwarmRegistry, TorrentDirectory};
pub use worker::{AnnounceError, AnnounceInput, AnnounceOutcome, SwarmWorker};
