use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::capabilities::MessagingCapabilities;
use crate::core::connect::ConnectionParams;
use crate::core::error::QueueError;

/// Name, capabilities and open/closed flag shared by queue implementations.
#[derive(Debug)]
pub struct QueueBase {
    name: String,
    capabilities: MessagingCapabilities,
    opened: AtomicBool,
}

impl QueueBase {
    pub fn new(name: impl Into<String>, capabilities: MessagingCapabilities) -> Self {
        Self {
            name: name.into(),
            capabilities,
            opened: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn capabilities(&self) -> MessagingCapabilities {
        self.capabilities
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.opened.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_open(&self, open: bool) {
        self.opened.store(open, Ordering::Release);
    }

    pub fn check_open(&self, correlation_id: &str) -> Result<(), QueueError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(QueueError::invalid_state(
                correlation_id,
                "NOT_OPENED",
                "The queue is not opened",
            ))
        }
    }

    /// Fails with `NO_CONNECTION` when no connection parameters were resolved.
    pub fn resolve_connection<'a>(
        &self,
        correlation_id: &str,
        connections: &'a [ConnectionParams],
    ) -> Result<&'a [ConnectionParams], QueueError> {
        if connections.is_empty() {
            return Err(QueueError::config(
                correlation_id,
                "NO_CONNECTION",
                format!("Connection parameters are not set for queue {}", self.name),
            ));
        }
        Ok(connections)
    }
}

impl fmt::Display for QueueBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.name)
    }
}
