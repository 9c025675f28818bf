//! QueueManager keeps the named in-memory queues of a process.
//!
//! Uses DashMap so producers and consumers can look queues up concurrently
//! without a global lock.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::try_join_all;
use tracing::debug;

use crate::config::Config;
use crate::core::connect::QueueConnection;
use crate::core::error::QueueError;
use crate::core::queue::memory::MemoryMessageQueue;
use crate::core::queue::MessageQueue;

#[derive(Debug, Default)]
pub struct QueueManager {
    config: Config,
    /// Map of queue name → queue.
    queues: DashMap<String, Arc<MemoryMessageQueue>>,
}

impl QueueManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            queues: DashMap::new(),
        }
    }

    /// Builds a new queue named `name` from its `[[queues]]` entry, or from
    /// `[defaults]` when the name is not configured. The queue is not registered.
    ///
    /// Entries with `require_connection = true` and no connections fail with
    /// `NO_CONNECTION`.
    pub fn create_queue(&self, name: &str) -> Result<Arc<MemoryMessageQueue>, QueueError> {
        let queue = MemoryMessageQueue::with_config(name, self.config.queue_config(name));

        if let Some(entry) = self.config.queue_entry(name) {
            if entry.require_connection {
                queue.base().resolve_connection("", &entry.connections)?;
            }
        }

        debug!(queue = %name, "Created queue");
        Ok(Arc::new(queue))
    }

    /// Returns the queue registered as `name`, creating and registering it
    /// when absent.
    pub fn get_or_create(&self, name: &str) -> Result<Arc<MemoryMessageQueue>, QueueError> {
        if let Some(existing) = self.queues.get(name) {
            return Ok(Arc::clone(&*existing));
        }

        let queue = self.create_queue(name)?;

        // Insert only if not already present (handles race)
        let entry = self
            .queues
            .entry(name.to_string())
            .or_insert_with(|| Arc::clone(&queue));

        Ok(Arc::clone(&*entry))
    }

    pub fn get(&self, name: &str) -> Option<Arc<MemoryMessageQueue>> {
        self.queues.get(name).map(|q| Arc::clone(&*q))
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.queues.len()
    }

    pub fn remove(&self, name: &str) -> Option<Arc<MemoryMessageQueue>> {
        self.queues.remove(name).map(|(_, q)| q)
    }

    /// Registers every `[[queues]]` entry from the configuration.
    pub fn create_configured(&self) -> Result<(), QueueError> {
        for entry in &self.config.queues {
            self.get_or_create(&entry.name)?;
        }
        Ok(())
    }

    /// Opens every registered queue. Configured queues are opened with the
    /// connections and credential from their `[[queues]]` entry.
    pub async fn open_all(&self, correlation_id: &str) -> Result<(), QueueError> {
        let queues = self.snapshot();
        try_join_all(queues.iter().map(|q| self.open_queue(q, correlation_id))).await?;
        Ok(())
    }

    async fn open_queue(
        &self,
        queue: &MemoryMessageQueue,
        correlation_id: &str,
    ) -> Result<(), QueueError> {
        match self.config.queue_entry(queue.name()) {
            Some(entry) => {
                queue
                    .open_with_params(
                        correlation_id,
                        &entry.connections,
                        entry.credential.as_ref(),
                    )
                    .await
            }
            None => queue.open(correlation_id).await,
        }
    }

    pub async fn close_all(&self, correlation_id: &str) -> Result<(), QueueError> {
        let queues = self.snapshot();
        try_join_all(queues.iter().map(|q| q.close(correlation_id))).await?;
        Ok(())
    }

    // Clones the handles out so no map shard is held across an await.
    fn snapshot(&self) -> Vec<Arc<MemoryMessageQueue>> {
        self.queues.iter().map(|q| Arc::clone(q.value())).collect()
    }
}

impl QueueConnection for QueueManager {
    fn queue_names(&self) -> Result<Vec<String>, QueueError> {
        let mut names: Vec<String> = self.queues.iter().map(|q| q.key().clone()).collect();
        names.sort();
        Ok(names)
    }
}
