//! Servers. Services that can be started and stopped.
pub mod custom_axum_server;
pub mod health_check_api;
pub mod http;
pub mod logging;
pub mod registar;
pub mod service;
pub mod signals;
pub mod tcp;
pub mod udp;
