use std::sync::Once;
use std::time::Duration;

use memq::{MemoryMessageQueue, QueueConfig};

pub const WAIT: Duration = Duration::from_millis(5_000);
pub const SHORT: Duration = Duration::from_millis(100);

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        memq::logging::init_logging("debug");
    });
}

/// Queue with a tight listen interval so listener tests stay fast.
#[allow(dead_code)]
pub fn fast_queue(name: &str) -> MemoryMessageQueue {
    MemoryMessageQueue::with_config(
        name,
        QueueConfig {
            poll_interval_ms: 10,
            listen_interval_ms: 20,
            ..QueueConfig::default()
        },
    )
}
