use std::sync::atomic::{AtomicU64, Ordering};

// Per-queue counters (low overhead, relaxed ordering). Coarse-grained; read
// them for diagnostics, not for synchronisation.
#[derive(Debug, Default)]
pub struct QueueCounters {
    sent: AtomicU64,
    received: AtomicU64,
    completed: AtomicU64,
    abandoned: AtomicU64,
    dead_lettered: AtomicU64,
}

/// Point-in-time copy of [`QueueCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub sent: u64,
    pub received: u64,
    pub completed: u64,
    pub abandoned: u64,
    pub dead_lettered: u64,
}

impl QueueCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inc_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_abandoned(&self) {
        self.abandoned.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_dead_lettered(&self) {
        self.dead_lettered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn load(&self) -> CountersSnapshot {
        CountersSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
        }
    }

    pub fn snapshot(&self, queue: &str) -> String {
        // Simple text format (Prometheus-style without HELP/TYPE lines for brevity)
        let c = self.load();
        format!(
            "memq_sent{{queue=\"{queue}\"}} {}\nmemq_received{{queue=\"{queue}\"}} {}\nmemq_completed{{queue=\"{queue}\"}} {}\nmemq_abandoned{{queue=\"{queue}\"}} {}\nmemq_dead_lettered{{queue=\"{queue}\"}} {}\n",
            c.sent, c.received, c.completed, c.abandoned, c.dead_lettered,
        )
    }
}
