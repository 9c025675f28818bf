//! Background dispatch loop for push-style consumers.
//!
//! Each iteration receives with the listen interval as timeout, hands the
//! message to the receiver, then sleeps out whatever is left of the
//! interval. Cancellation is checked between iterations, so `end_listen`
//! takes effect within one interval.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, trace, warn};

use crate::core::error::QueueError;
use crate::core::queue::memory::MemoryMessageQueue;
use crate::core::queue::{MessageQueue, MessageReceiver};

impl MemoryMessageQueue {
    /// Runs [`MessageQueue::listen`] on a spawned task and returns immediately.
    ///
    /// The cancellation flag is lowered before spawning, so an `end_listen`
    /// issued right after this call is never lost. Failures are logged.
    pub fn begin_listen(
        self: &Arc<Self>,
        correlation_id: &str,
        receiver: Arc<dyn MessageReceiver>,
    ) -> JoinHandle<()> {
        self.cancel.store(false, Ordering::Release);

        let queue = Arc::clone(self);
        let correlation_id = correlation_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = queue.listen_loop(&correlation_id, receiver.as_ref()).await {
                error!(
                    queue = %queue.name(),
                    correlation_id = %correlation_id,
                    error = %e,
                    "Failed to listen the message queue"
                );
            }
        })
    }

    pub(crate) async fn listen_loop(
        &self,
        correlation_id: &str,
        receiver: &dyn MessageReceiver,
    ) -> Result<(), QueueError> {
        self.base().check_open(correlation_id)?;

        let interval = self.config().listen_interval();
        trace!(queue = %self.name(), correlation_id, "Started listening messages");

        while !self.is_cancelled() {
            let started = Instant::now();

            match self.receive(correlation_id, interval).await {
                Ok(Some(mut message)) if self.is_cancelled() => {
                    // Stopped while waiting: hand the message back instead of dropping it.
                    if let Err(e) = self.abandon(&mut message).await {
                        warn!(queue = %self.name(), error = %e, "Failed to return message");
                    }
                }
                Ok(Some(mut message)) => {
                    if let Err(e) = receiver.receive_message(&mut message, self).await {
                        error!(
                            queue = %self.name(),
                            correlation_id,
                            message = %message,
                            error = %e,
                            "Failed to process the message"
                        );
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!(
                        queue = %self.name(),
                        correlation_id,
                        error = %e,
                        "Failed to receive the message"
                    );
                }
            }

            if self.is_cancelled() {
                break;
            }
            let elapsed = started.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }

        trace!(queue = %self.name(), correlation_id, "Stopped listening messages");
        Ok(())
    }
}
