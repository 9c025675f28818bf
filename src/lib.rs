//! memq – an in-process, in-memory message queue that emulates a broker's
//! message lifecycle (send, peek, receive-with-lock, complete, abandon,
//! dead-letter, listen) without any external infrastructure.
//!
//! This crate exports
//!  * `core`    – message envelope, capabilities, queue trait and memory engine
//!  * `config`  – TOML-driven queue configuration
//!  * `logging` – tracing subscriber setup
//!  * `metrics` – per-queue counters
//!
//! Intended for tests and local development where code written against a
//! real broker needs lock / redelivery semantics without network I/O.

// ───────────────────────────────────────────────────────────
// Public modules
// ───────────────────────────────────────────────────────────
pub mod config;
pub mod core;
pub mod logging;
pub mod metrics;

// ───────────────────────────────────────────────────────────
// Re-exports
// ───────────────────────────────────────────────────────────
pub use crate::config::{load_config, Config, QueueConfig};
pub use crate::core::capabilities::{Capability, MessagingCapabilities};
pub use crate::core::error::QueueError;
pub use crate::core::message::{LockToken, Message};
pub use crate::core::queue::{MemoryMessageQueue, MessageQueue, MessageReceiver, QueueManager};
