use std::time::Duration;

use tokio::time::Instant;

use crate::core::message::Message;

/// Stand-in for "never" when a timeout does not fit on the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + timeout`, saturating to roughly thirty years out.
pub(crate) fn deadline_after(now: Instant, timeout: Duration) -> Instant {
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}

/// A received message that has not been settled yet, hidden from other
/// receivers until `expires_at`.
#[derive(Debug, Clone)]
pub struct LockedMessage {
    pub message: Message,
    pub expires_at: Instant,
    pub timeout: Duration,
}

impl LockedMessage {
    pub fn new(message: Message, timeout: Duration, now: Instant) -> Self {
        Self {
            message,
            expires_at: deadline_after(now, timeout),
            timeout,
        }
    }

    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }

    /// Pushes expiry to `now + timeout` and remembers `timeout` as the lock
    /// duration. Expired locks are left alone; returns whether it renewed.
    pub fn renew(&mut self, timeout: Duration, now: Instant) -> bool {
        if self.is_expired(now) {
            return false;
        }
        self.timeout = timeout;
        self.expires_at = deadline_after(now, timeout);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_grant_time_plus_timeout() {
        let now = Instant::now();
        let lock = LockedMessage::new(Message::new("c", "t", "p"), Duration::from_millis(500), now);

        assert_eq!(lock.expires_at, now + Duration::from_millis(500));
        assert!(!lock.is_expired(now + Duration::from_millis(499)));
        assert!(lock.is_expired(now + Duration::from_millis(500)));
    }

    #[test]
    fn renew_extends_live_lock_only() {
        let now = Instant::now();
        let mut lock = LockedMessage::new(Message::new("c", "t", "p"), Duration::from_millis(100), now);

        let later = now + Duration::from_millis(50);
        assert!(lock.renew(Duration::from_millis(300), later));
        assert_eq!(lock.expires_at, later + Duration::from_millis(300));
        assert_eq!(lock.timeout, Duration::from_millis(300));

        let after_expiry = lock.expires_at + Duration::from_millis(1);
        let expires_at = lock.expires_at;
        assert!(!lock.renew(Duration::from_millis(300), after_expiry));
        assert_eq!(lock.expires_at, expires_at);
    }

    #[test]
    fn unbounded_timeout_saturates() {
        let now = Instant::now();
        let mut lock = LockedMessage::new(Message::new("c", "t", "p"), Duration::MAX, now);
        assert_eq!(lock.expires_at, now + FAR_FUTURE);
        assert_eq!(lock.timeout, Duration::MAX);

        assert!(lock.renew(Duration::MAX, now + Duration::from_secs(1)));
        assert!(!lock.is_expired(now + Duration::from_secs(86_400 * 365)));
    }
}
