//! Declares which optional operations a queue implementation supports.
//!
//! Callers consult the descriptor before invoking an operation. Queues do
//! not enforce it themselves; [`MessagingCapabilities::require`] is the
//! helper for callers that want a `NotSupported` error instead of a check.

use serde::{Deserialize, Serialize};

use crate::core::error::QueueError;

/// A single optional operation, used with [`MessagingCapabilities::require`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    MessageCount,
    Send,
    Receive,
    Peek,
    PeekBatch,
    RenewLock,
    Abandon,
    DeadLetter,
    Clear,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::MessageCount => "message_count",
            Capability::Send => "send",
            Capability::Receive => "receive",
            Capability::Peek => "peek",
            Capability::PeekBatch => "peek_batch",
            Capability::RenewLock => "renew_lock",
            Capability::Abandon => "abandon",
            Capability::DeadLetter => "dead_letter",
            Capability::Clear => "clear",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessagingCapabilities {
    can_message_count: bool,
    can_send: bool,
    can_receive: bool,
    can_peek: bool,
    can_peek_batch: bool,
    can_renew_lock: bool,
    can_abandon: bool,
    can_dead_letter: bool,
    can_clear: bool,
}

impl MessagingCapabilities {
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        can_message_count: bool,
        can_send: bool,
        can_receive: bool,
        can_peek: bool,
        can_peek_batch: bool,
        can_renew_lock: bool,
        can_abandon: bool,
        can_dead_letter: bool,
        can_clear: bool,
    ) -> Self {
        Self {
            can_message_count,
            can_send,
            can_receive,
            can_peek,
            can_peek_batch,
            can_renew_lock,
            can_abandon,
            can_dead_letter,
            can_clear,
        }
    }

    /// Nothing supported. Base default before an implementation declares its own.
    pub const fn none() -> Self {
        Self::new(false, false, false, false, false, false, false, false, false)
    }

    /// The in-memory queue: everything except a real dead-letter destination.
    pub const fn memory() -> Self {
        Self::new(true, true, true, true, true, true, true, false, true)
    }

    pub fn can_message_count(&self) -> bool {
        self.can_message_count
    }

    pub fn can_send(&self) -> bool {
        self.can_send
    }

    pub fn can_receive(&self) -> bool {
        self.can_receive
    }

    pub fn can_peek(&self) -> bool {
        self.can_peek
    }

    pub fn can_peek_batch(&self) -> bool {
        self.can_peek_batch
    }

    pub fn can_renew_lock(&self) -> bool {
        self.can_renew_lock
    }

    pub fn can_abandon(&self) -> bool {
        self.can_abandon
    }

    pub fn can_dead_letter(&self) -> bool {
        self.can_dead_letter
    }

    pub fn can_clear(&self) -> bool {
        self.can_clear
    }

    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::MessageCount => self.can_message_count,
            Capability::Send => self.can_send,
            Capability::Receive => self.can_receive,
            Capability::Peek => self.can_peek,
            Capability::PeekBatch => self.can_peek_batch,
            Capability::RenewLock => self.can_renew_lock,
            Capability::Abandon => self.can_abandon,
            Capability::DeadLetter => self.can_dead_letter,
            Capability::Clear => self.can_clear,
        }
    }

    /// `Ok(())` when supported, `QueueError::NotSupported` otherwise.
    pub fn require(&self, correlation_id: &str, capability: Capability) -> Result<(), QueueError> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(QueueError::not_supported(correlation_id, capability.as_str()))
        }
    }
}
