use ringbuf::traits::{Consumer, Observer, Producer};
use ringbuf::StaticRb;
use tokio::task::AbortHandle;

use super::UDP_TRACKER_LOG_TARGET;

/// A ring buffer for managing active UDP request abort handles.
///
/// The `ActiveRequests` struct maintains a fixed-size ring buffer of abort
/// handles for UDP request processor tasks. It ensures that at most 50 requests
/// are handled concurrently, and provides mechanisms to handle buffer overflow
/// by removing finished or oldest unfinished tasks.
#[derive(Default)]
pub struct ActiveRequests {
    rb: StaticRb<AbortHandle, 50>,
}

impl std::fmt::Debug for ActiveRequests {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (left, right) = &self.rb.as_slices();
        let dbg = format!("capacity: {}, left: {left:?}, right: {right:?}", &self.rb.capacity());
        f.debug_struct("ActiveRequests").field("rb", &dbg).finish()
    }
}

impl Drop for ActiveRequests {
    fn drop(&mut self) {
        for h in self.rb.pop_iter() {
            if !h.is_finished() {
                h.abort();
            }
        }
    }
}

impl ActiveRequests {
    /// Inserts an abort handle for a UDP request processor task.
    ///
    /// If the buffer is full, this method attempts to make space by:
    ///
    /// 1. Removing finished tasks.
    /// 2. Removing the oldest unfinished task if no finished tasks are found.
    ///
    /// # Panics
    ///
    /// This method will panic if it cannot make space for adding a new handle.
    pub async fn force_push(&mut self, abort_handle: AbortHandle, local_addr: &str) {
        match self.rb.try_push(abort_handle) {
            Ok(()) => {}
            Err(abort_handle) => {
                let mut finished: u64 = 0;
                let mut unfinished_task = None;

                for removed_abort_handle in self.rb.pop_iter() {
                    if removed_abort_handle.is_finished() {
                        finished += 1;
                        continue;
                    }

                    tokio::task::yield_now().await;

                    if removed_abort_handle.is_finished() {
                        finished += 1;
                        continue;
                    }

                    tracing::debug!(
                        target: UDP_TRACKER_LOG_TARGET,
                        local_addr,
                        removed_count = finished,
                        "active request buffer full (got unfinished task)"
                    );

                    if finished == 0 {
                        removed_abort_handle.abort();

                        tracing::warn!(
                            target: UDP_TRACKER_LOG_TARGET,
                            local_addr,
                            "aborting request: no finished tasks to reclaim"
                        );

                        break;
                    }

                    unfinished_task = Some(removed_abort_handle);
                }

                if let Some(h) = unfinished_task {
                    self.rb.try_push(h).expect("it was previously inserted");
                }

                if !abort_handle.is_finished() {
                    self.rb
                        .try_push(abort_handle)
                        .expect("it should remove at least one element");
                }
            }
        }
    }
}
