//! Test-only helpers shared across the tracker's crates: ephemeral
//! configuration builders, random-data generators, and a pool of ports for
//! integration tests that need to bind a real socket.
pub mod configuration;
pub mod port_pool;
pub mod random;
