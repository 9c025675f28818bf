use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::error::QueueError;

/// Identifies the visibility lease of a received, not yet settled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockToken(u64);

impl LockToken {
    pub fn value(self) -> u64 {
        self.0
    }

    pub(crate) fn from_raw(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message envelope: correlation id, generated message id, type tag and an
/// opaque payload.
///
/// The payload is never interpreted by a queue. `sent_time` is stamped by
/// `send`, and `lock_token` is present exactly while the message is checked
/// out to a consumer.
#[derive(Debug, Clone)]
pub struct Message {
    correlation_id: String,
    message_id: String,
    message_type: String,
    payload: Bytes,
    sent_time: Option<u64>,
    lock_token: Option<LockToken>,
}

impl Message {
    pub fn new(
        correlation_id: impl Into<String>,
        message_type: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            message_id: generate_id(),
            message_type: message_type.into(),
            payload: payload.into(),
            sent_time: None,
            lock_token: None,
        }
    }

    /// Builds a message whose payload is the JSON encoding of `value`.
    pub fn from_json<T>(
        correlation_id: impl Into<String>,
        message_type: impl Into<String>,
        value: &T,
    ) -> Result<Self, QueueError>
    where
        T: Serialize + ?Sized,
    {
        let encoded = serde_json::to_vec(value)?;
        Ok(Self::new(correlation_id, message_type, encoded))
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload decoded as UTF-8; invalid sequences are replaced.
    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Payload decoded from JSON into `T`.
    pub fn as_json<T: DeserializeOwned>(&self) -> Result<T, QueueError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }

    /// Milliseconds since the Unix epoch at which the message was sent.
    pub fn sent_time(&self) -> Option<u64> {
        self.sent_time
    }

    pub fn lock_token(&self) -> Option<LockToken> {
        self.lock_token
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.lock_token.is_some()
    }

    pub(crate) fn stamp_sent(&mut self, at: u64) {
        self.sent_time = Some(at);
    }

    pub(crate) fn set_lock_token(&mut self, token: LockToken) {
        self.lock_token = Some(token);
    }

    pub(crate) fn take_lock_token(&mut self) -> Option<LockToken> {
        self.lock_token.take()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_dash(s: &str) -> &str {
            if s.is_empty() {
                "---"
            } else {
                s
            }
        }

        let payload = self.as_string();
        write!(
            f,
            "[{},{},{}]",
            or_dash(&self.correlation_id),
            or_dash(&self.message_type),
            or_dash(&payload)
        )
    }
}

/// Milliseconds since the Unix epoch.
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
