//! Session store
//!
//! One session per chat behind a single async mutex. The engine, the
//! message janitor and the scheduler share one store instance.

use super::Session;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// Concurrency-safe registry of dialogue sessions keyed by chat id
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<i64, Session>>,
}

impl SessionStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the chat's session
    pub async fn get(&self, chat_id: i64) -> Option<Session> {
        self.sessions.lock().await.get(&chat_id).cloned()
    }

    /// Insert or replace the chat's session as is
    pub async fn put(&self, session: Session) {
        self.sessions.lock().await.insert(session.chat_id, session);
    }

    /// Replace the chat's session with a fresh one.
    ///
    /// Message ids tracked by the previous session are carried over so that
    /// they still get cleaned up.
    pub async fn begin(&self, mut session: Session) {
        let mut sessions = self.sessions.lock().await;
        if let Some(previous) = sessions.remove(&session.chat_id) {
            let mut ids = previous.live_message_ids;
            for id in session.live_message_ids.drain(..) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            session.live_message_ids = ids;
        }
        sessions.insert(session.chat_id, session);
    }

    /// Write the dialogue fields of `session` back.
    ///
    /// The stored `live_message_ids` win over the snapshot's, since cleanup
    /// tasks edit them concurrently. Inserts when the chat has no session.
    pub async fn save(&self, session: Session) {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(&session.chat_id) {
            Some(stored) => {
                let ids = std::mem::take(&mut stored.live_message_ids);
                *stored = session;
                stored.live_message_ids = ids;
            }
            None => {
                sessions.insert(session.chat_id, session);
            }
        }
    }

    /// Remove the chat's session
    pub async fn clear(&self, chat_id: i64) {
        self.take(chat_id).await;
    }

    /// Remove and return the chat's session
    pub async fn take(&self, chat_id: i64) -> Option<Session> {
        self.sessions.lock().await.remove(&chat_id)
    }

    /// Refresh the activity timestamp and return a snapshot
    pub async fn touch(&self, chat_id: i64, now: DateTime<Utc>) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&chat_id)?;
        session.last_activity_at = now;
        Some(session.clone())
    }

    /// Track a bot message; no-op when the chat has no session.
    ///
    /// Returns whether the id is tracked afterwards.
    pub async fn append_message_id(&self, chat_id: i64, message_id: i32) -> bool {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(&chat_id) else {
            debug!(chat_id, message_id, "No session to track message in");
            return false;
        };
        if !session.live_message_ids.contains(&message_id) {
            session.live_message_ids.push(message_id);
        }
        true
    }

    /// Split the tracked ids into doomed (returned) and kept (left tracked).
    ///
    /// Everything tracked before an explicit `keep` id is doomed; the keeper
    /// and anything sent after it survive. Without a tracked keeper only the
    /// newest id survives. Returns `None` when the chat has no session.
    pub async fn take_stale_message_ids(&self, chat_id: i64, keep: Option<i32>) -> Option<Vec<i32>> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&chat_id)?;
        let ids = &mut session.live_message_ids;
        let split = keep
            .and_then(|keeper| ids.iter().position(|id| *id == keeper))
            .unwrap_or_else(|| ids.len().saturating_sub(1));
        let kept = ids.split_off(split);
        Some(std::mem::replace(ids, kept))
    }

    /// Remove and return every tracked id of the chat's session
    pub async fn take_all_message_ids(&self, chat_id: i64) -> Vec<i32> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .get_mut(&chat_id)
            .map(|session| std::mem::take(&mut session.live_message_ids))
            .unwrap_or_default()
    }

    /// Evict sessions idle for longer than `max_idle`, returning how many went
    pub async fn sweep_idle(&self, max_idle: Duration, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_stale(max_idle, now));
        before - sessions.len()
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether no session is live
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
