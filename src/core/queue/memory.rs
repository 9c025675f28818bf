use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::{PeekBatchPolicy, QueueConfig, RenewPolicy};
use crate::core::capabilities::MessagingCapabilities;
use crate::core::connect::{ConnectionParams, CredentialParams};
use crate::core::error::QueueError;
use crate::core::message::{current_timestamp, LockToken, Message};
use crate::core::queue::base::QueueBase;
use crate::core::queue::lock::{deadline_after, LockedMessage};
use crate::core::queue::{MessageQueue, MessageReceiver};
use crate::metrics::QueueCounters;

#[derive(Debug, Default)]
struct QueueState {
    next_token: u64,
    pending: VecDeque<Message>,
    locked: HashMap<LockToken, LockedMessage>,
}

/// Queue that sends and receives messages within the process.
///
/// A message is always in exactly one place: the pending store, the lock
/// table, or with a caller. Both structures sit behind one mutex that is
/// held only for the in-memory mutation, never across a wait or a receiver
/// callback.
pub struct MemoryMessageQueue {
    base: QueueBase,
    config: QueueConfig,
    state: Mutex<QueueState>,
    arrivals: Notify,
    pub(crate) cancel: AtomicBool,
    counters: QueueCounters,
}

impl MemoryMessageQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, QueueConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: QueueConfig) -> Self {
        Self {
            base: QueueBase::new(name, MessagingCapabilities::memory()),
            config,
            state: Mutex::new(QueueState::default()),
            arrivals: Notify::new(),
            cancel: AtomicBool::new(false),
            counters: QueueCounters::new(),
        }
    }

    #[inline]
    pub(crate) fn base(&self) -> &QueueBase {
        &self.base
    }

    #[inline]
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    #[inline]
    pub fn counters(&self) -> &QueueCounters {
        &self.counters
    }

    /// Messages currently checked out to consumers.
    pub fn locked_count(&self) -> usize {
        self.state.lock().locked.len()
    }

    /// Encodes `value` as JSON into a fresh message and sends it.
    pub async fn send_as_object<T>(
        &self,
        correlation_id: &str,
        message_type: &str,
        value: &T,
    ) -> Result<(), QueueError>
    where
        T: Serialize + ?Sized,
    {
        let message = Message::from_json(correlation_id, message_type, value)?;
        self.send(correlation_id, message).await
    }

    #[inline]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    fn enqueue(&self, correlation_id: &str, mut message: Message) {
        message.stamp_sent(current_timestamp());
        debug!(
            queue = %self.base.name(),
            correlation_id,
            message = %message,
            "Sent message"
        );
        self.state.lock().pending.push_back(message);
        self.counters.inc_sent();
        self.arrivals.notify_waiters();
    }

    /// Pops the head and locks it for `lock_timeout` under a new token.
    fn lock_next(&self, lock_timeout: Duration) -> Option<Message> {
        let mut state = self.state.lock();
        let mut message = state.pending.pop_front()?;

        let token = LockToken::from_raw(state.next_token);
        state.next_token += 1;
        message.set_lock_token(token);

        let locked = LockedMessage::new(message.clone(), lock_timeout, Instant::now());
        state.locked.insert(token, locked);
        Some(message)
    }

    fn remove_lock(&self, token: LockToken) -> Option<LockedMessage> {
        self.state.lock().locked.remove(&token)
    }
}

#[async_trait]
impl MessageQueue for MemoryMessageQueue {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn capabilities(&self) -> MessagingCapabilities {
        self.base.capabilities()
    }

    fn is_open(&self) -> bool {
        self.base.is_open()
    }

    async fn open(&self, correlation_id: &str) -> Result<(), QueueError> {
        self.base.set_open(true);
        trace!(queue = %self.base.name(), correlation_id, "Opened queue");
        Ok(())
    }

    async fn open_with_params(
        &self,
        correlation_id: &str,
        connections: &[ConnectionParams],
        credential: Option<&CredentialParams>,
    ) -> Result<(), QueueError> {
        trace!(
            queue = %self.base.name(),
            correlation_id,
            connections = connections.len(),
            credential = credential.is_some(),
            "Ignoring connection parameters for in-memory queue"
        );
        self.open(correlation_id).await
    }

    async fn close(&self, correlation_id: &str) -> Result<(), QueueError> {
        self.base.set_open(false);
        self.cancel.store(true, Ordering::Release);
        trace!(queue = %self.base.name(), correlation_id, "Closed queue");
        Ok(())
    }

    async fn clear(&self, correlation_id: &str) -> Result<(), QueueError> {
        {
            let mut state = self.state.lock();
            state.pending.clear();
            state.locked.clear();
        }
        self.cancel.store(false, Ordering::Release);
        trace!(queue = %self.base.name(), correlation_id, "Cleared queue");
        Ok(())
    }

    async fn read_message_count(&self) -> Result<usize, QueueError> {
        Ok(self.state.lock().pending.len())
    }

    async fn send(&self, correlation_id: &str, message: Message) -> Result<(), QueueError> {
        self.enqueue(correlation_id, message);
        Ok(())
    }

    async fn peek(&self, correlation_id: &str) -> Result<Option<Message>, QueueError> {
        let message = self.state.lock().pending.front().cloned();
        if let Some(message) = &message {
            trace!(
                queue = %self.base.name(),
                correlation_id,
                message = %message,
                "Peeked message"
            );
        }
        Ok(message)
    }

    async fn peek_batch(
        &self,
        correlation_id: &str,
        message_count: usize,
    ) -> Result<Vec<Message>, QueueError> {
        let messages: Vec<Message> = {
            let state = self.state.lock();
            let available = state.pending.len();
            let take = if message_count <= available {
                message_count
            } else {
                match self.config.peek_batch_policy {
                    PeekBatchPolicy::Clamp => available,
                    PeekBatchPolicy::Strict => 0,
                }
            };
            state.pending.iter().take(take).cloned().collect()
        };
        trace!(
            queue = %self.base.name(),
            correlation_id,
            count = messages.len(),
            "Peeked messages"
        );
        Ok(messages)
    }

    async fn receive(
        &self,
        correlation_id: &str,
        wait_timeout: Duration,
    ) -> Result<Option<Message>, QueueError> {
        let deadline = deadline_after(Instant::now(), wait_timeout);
        let poll_interval = self.config.poll_interval();

        loop {
            // Registered before the check so a send in between still wakes us.
            let arrival = self.arrivals.notified();

            if let Some(message) = self.lock_next(wait_timeout) {
                self.counters.inc_received();
                debug!(
                    queue = %self.base.name(),
                    correlation_id,
                    message = %message,
                    lock_token = ?message.lock_token(),
                    "Received message"
                );
                return Ok(Some(message));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let wait = (deadline - now).min(poll_interval);
            let _ = tokio::time::timeout(wait, arrival).await;
        }
    }

    async fn renew_lock(
        &self,
        message: &Message,
        lock_timeout: Duration,
    ) -> Result<(), QueueError> {
        let Some(token) = message.lock_token() else {
            return Ok(());
        };

        let renewed = {
            let mut state = self.state.lock();
            match state.locked.get_mut(&token) {
                Some(locked) => {
                    let timeout = match self.config.renew_policy {
                        RenewPolicy::Requested => lock_timeout,
                        RenewPolicy::Original => locked.timeout,
                    };
                    locked.renew(timeout, Instant::now())
                }
                None => false,
            }
        };

        trace!(
            queue = %self.base.name(),
            correlation_id = message.correlation_id(),
            message = %message,
            renewed,
            "Renewed lock for message"
        );
        Ok(())
    }

    async fn complete(&self, message: &mut Message) -> Result<(), QueueError> {
        let Some(token) = message.take_lock_token() else {
            return Ok(());
        };

        if self.remove_lock(token).is_some() {
            self.counters.inc_completed();
        }
        trace!(
            queue = %self.base.name(),
            correlation_id = message.correlation_id(),
            message = %message,
            "Completed message"
        );
        Ok(())
    }

    async fn abandon(&self, message: &mut Message) -> Result<(), QueueError> {
        let Some(token) = message.lock_token() else {
            return Ok(());
        };
        let Some(mut locked) = self.remove_lock(token) else {
            return Ok(());
        };
        message.take_lock_token();

        if locked.is_expired(Instant::now()) {
            trace!(
                queue = %self.base.name(),
                correlation_id = message.correlation_id(),
                message = %message,
                "Lock already expired, message not returned"
            );
            return Ok(());
        }

        self.counters.inc_abandoned();
        trace!(
            queue = %self.base.name(),
            correlation_id = message.correlation_id(),
            message = %message,
            "Abandoned message"
        );

        locked.message.take_lock_token();
        let correlation_id = locked.message.correlation_id().to_string();
        self.enqueue(&correlation_id, locked.message);
        Ok(())
    }

    /// Counts as dead-lettered only when a live lock record was removed; a
    /// message whose token is stale (lock cleared or already settled) is not
    /// counted, even though it still carried a token.
    async fn move_to_dead_letter(&self, message: &mut Message) -> Result<(), QueueError> {
        let Some(token) = message.take_lock_token() else {
            return Ok(());
        };

        // No dead-letter destination in memory: the message is dropped.
        if self.remove_lock(token).is_some() {
            self.counters.inc_dead_lettered();
        }
        trace!(
            queue = %self.base.name(),
            correlation_id = message.correlation_id(),
            message = %message,
            "Moved to dead letter"
        );
        Ok(())
    }

    async fn listen(
        &self,
        correlation_id: &str,
        receiver: &dyn MessageReceiver,
    ) -> Result<(), QueueError> {
        self.cancel.store(false, Ordering::Release);
        self.listen_loop(correlation_id, receiver).await
    }

    fn end_listen(&self, correlation_id: &str) {
        self.cancel.store(true, Ordering::Release);
        trace!(queue = %self.base.name(), correlation_id, "End listening requested");
    }
}

impl fmt::Debug for MemoryMessageQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryMessageQueue")
            .field("name", &self.base.name())
            .field("open", &self.base.is_open())
            .field("pending", &state.pending.len())
            .field("locked", &state.locked.len())
            .finish()
    }
}

impl fmt::Display for MemoryMessageQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.base, f)
    }
}
