//! Request timeout decoration
//!
//! A timeout is a detached task holding the shared transport response and
//! the context's interruption handle. On expiry it interrupts the pipeline
//! and answers 504 itself; if the pipeline finished first, `end` being
//! idempotent makes the expiry a no-op.

use http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::context::InterruptionState;
use crate::dispatch::transport::TransportResponse;

pub struct TimeoutHandle {
    task: JoinHandle<()>,
}

impl TimeoutHandle {
    /// Arm a timeout for one exchange.
    pub fn arm(
        response: Arc<dyn TransportResponse>,
        timeout: Duration,
        interruption: InterruptionState,
    ) -> Self {
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if !response.is_ended() {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "request timed out");
                interruption.interrupt();
                response.set_status(StatusCode::GATEWAY_TIMEOUT);
                response.end();
            }
        });
        Self { task }
    }

    /// Disarm; used once the exchange completed normally.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for TimeoutHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
