//! memq queue module.
//!
//! Defines the asynchronous queue abstraction and the in-memory engine that
//! implements it.
//!
//! Message lifecycle:
//! - `send` appends to the pending store
//! - `receive` moves the head into the lock table under a fresh token
//! - `complete` / `abandon` / `move_to_dead_letter` settle the lock
//! - `listen` automates receive → dispatch for push-style consumers

pub mod base;
pub mod listener;
pub mod lock;
pub mod manager;
pub mod memory;

pub use base::QueueBase;
pub use lock::LockedMessage;
pub use manager::QueueManager;
pub use memory::MemoryMessageQueue;

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::capabilities::MessagingCapabilities;
use crate::core::connect::{ConnectionParams, CredentialParams};
use crate::core::error::QueueError;
use crate::core::message::Message;

/// Common interface for queue implementations.
///
/// Not every implementation supports every operation; consult
/// [`MessageQueue::capabilities`] first. Settling operations on a message
/// without a live lock succeed without doing anything.
#[async_trait]
pub trait MessageQueue: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn capabilities(&self) -> MessagingCapabilities;

    fn is_open(&self) -> bool;

    async fn open(&self, correlation_id: &str) -> Result<(), QueueError>;

    /// Opens with connection and credential parameters resolved by the caller.
    async fn open_with_params(
        &self,
        correlation_id: &str,
        connections: &[ConnectionParams],
        credential: Option<&CredentialParams>,
    ) -> Result<(), QueueError>;

    async fn close(&self, correlation_id: &str) -> Result<(), QueueError>;

    /// Drops every pending and locked message.
    async fn clear(&self, correlation_id: &str) -> Result<(), QueueError>;

    /// Number of messages waiting to be delivered.
    async fn read_message_count(&self) -> Result<usize, QueueError>;

    async fn send(&self, correlation_id: &str, message: Message) -> Result<(), QueueError>;

    /// Head of the queue, left in place and unlocked.
    async fn peek(&self, correlation_id: &str) -> Result<Option<Message>, QueueError>;

    async fn peek_batch(
        &self,
        correlation_id: &str,
        message_count: usize,
    ) -> Result<Vec<Message>, QueueError>;

    /// Waits up to `wait_timeout` for a message and locks it for the same duration.
    async fn receive(
        &self,
        correlation_id: &str,
        wait_timeout: Duration,
    ) -> Result<Option<Message>, QueueError>;

    async fn renew_lock(&self, message: &Message, lock_timeout: Duration)
        -> Result<(), QueueError>;

    /// Removes the message permanently.
    async fn complete(&self, message: &mut Message) -> Result<(), QueueError>;

    /// Returns the message to the queue for another attempt.
    async fn abandon(&self, message: &mut Message) -> Result<(), QueueError>;

    async fn move_to_dead_letter(&self, message: &mut Message) -> Result<(), QueueError>;

    /// Dispatches incoming messages to `receiver` until [`end_listen`](Self::end_listen)
    /// or `close` is called.
    async fn listen(
        &self,
        correlation_id: &str,
        receiver: &dyn MessageReceiver,
    ) -> Result<(), QueueError>;

    /// Asks a running `listen` to stop; it does so before its next iteration.
    fn end_listen(&self, correlation_id: &str);
}

/// Push-style consumer invoked by `listen` for every received message.
///
/// Errors are logged by the listener and never stop it.
#[async_trait]
pub trait MessageReceiver: Send + Sync {
    async fn receive_message(
        &self,
        message: &mut Message,
        queue: &dyn MessageQueue,
    ) -> anyhow::Result<()>;
}
