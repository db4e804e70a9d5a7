//! Helper to wire an `axum_server::Handle`'s graceful shutdown to our own
//! halt-signal plumbing.
use tokio::sync::oneshot;
use tracing::info;

use super::signals::{shutdown_signal_with_message, Halted};

/// Spawns a task that calls `axum_handle.graceful_shutdown()` once the halt
/// signal (or a global shutdown signal) is received.
pub fn graceful_axum_shutdown(axum_handle: axum_server::Handle, rx_halt: oneshot::Receiver<Halted>, message: String) {
    drop(tokio::spawn(async move {
        shutdown_signal_with_message(rx_halt, message).await;

        info!("sending graceful shutdown signal to axum server");

        axum_handle.graceful_shutdown(Some(std::time::Duration::from_secs(90)));
    }));
}
