//! Throttled logging of chats outside the manager allow-list
//!
//! Events from such chats are dropped without a reply. To keep the log
//! readable each chat is reported at most once per cooldown period.

use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Cache of recently reported chats
#[derive(Clone)]
pub struct IgnoredChatLog {
    /// chat_id -> () with TTL equal to the cooldown
    cache: Cache<i64, ()>,
    /// Events dropped without a log line
    silenced_count: Arc<AtomicU64>,
}

impl IgnoredChatLog {
    /// Creates a log that reports each chat once per `cooldown_secs`
    ///
    /// # Examples
    ///
    /// ```
    /// use market_desk::bot::IgnoredChatLog;
    ///
    /// let log = IgnoredChatLog::new(1200, 10_000);
    /// assert_eq!(log.silenced_count(), 0);
    /// ```
    #[must_use]
    pub fn new(cooldown_secs: u64, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(cooldown_secs))
            .build();

        Self {
            cache,
            silenced_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records an ignored event, logging it unless the chat is in cooldown.
    ///
    /// Returns whether a log line was written.
    pub async fn record(&self, chat_id: i64, sender_id: i64) -> bool {
        if self.cache.get(&chat_id).await.is_none() {
            self.cache.insert(chat_id, ()).await;
            info!(chat_id, sender_id, "⛔️ Ignoring events from chat outside the manager list");
            return true;
        }

        let count = self.silenced_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count.is_multiple_of(100) {
            debug!(
                "⛔️ Silenced {} ignored events (recent: chat {} sender {})",
                count, chat_id, sender_id
            );
        }
        false
    }

    /// Total number of events dropped without a log line
    #[must_use]
    pub fn silenced_count(&self) -> u64 {
        self.silenced_count.load(Ordering::Relaxed)
    }
}
