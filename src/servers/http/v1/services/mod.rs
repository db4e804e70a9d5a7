//! Application services for the HTTP tracker.
//!
//! These modules contain logic that is specific to the HTTP tracker but does
//! not depend on the Axum web server itself; it could be reused by other web
//! frameworks.
pub mod peer_ip_resolver;
