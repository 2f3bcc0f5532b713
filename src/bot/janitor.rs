//! Message lifecycle manager
//!
//! Keeps the manager chat tidy: stale prompts fade out through shrinking
//! placeholders and are then deleted, while manager-authored messages are
//! deleted outright after a longer pause. Every cleanup runs as a detached
//! task that can be cancelled on shutdown.

use super::transport::{ChatTransport, TransportError};
use crate::config::{
    CLEANUP_DISPLAY_DELAY_MS, CLEANUP_FADE_STEP_MS, CLEANUP_FINAL_PAUSE_MS, CLEANUP_STAGGER_MS,
    MANAGER_MESSAGE_DELETE_DELAY_MS,
};
use crate::session::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// Placeholder texts shown while a message fades out
const FADE_FRAMES: [&str; 3] = ["...", "..", "."];

/// Delays used by the cleanup sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupTiming {
    /// Time a new prompt shares the screen with the old ones
    pub display_delay: Duration,
    /// Pause between fade frames
    pub fade_step: Duration,
    /// Pause between the last frame and deletion
    pub final_pause: Duration,
    /// Offset between two consecutive fade sequences
    pub stagger: Duration,
    /// Delay before a manager-authored message is deleted
    pub plain_delete_delay: Duration,
}

impl Default for CleanupTiming {
    fn default() -> Self {
        Self {
            display_delay: Duration::from_millis(CLEANUP_DISPLAY_DELAY_MS),
            fade_step: Duration::from_millis(CLEANUP_FADE_STEP_MS),
            final_pause: Duration::from_millis(CLEANUP_FINAL_PAUSE_MS),
            stagger: Duration::from_millis(CLEANUP_STAGGER_MS),
            plain_delete_delay: Duration::from_millis(MANAGER_MESSAGE_DELETE_DELAY_MS),
        }
    }
}

impl CleanupTiming {
    /// No delays at all, for tests
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            display_delay: Duration::ZERO,
            fade_step: Duration::ZERO,
            final_pause: Duration::ZERO,
            stagger: Duration::ZERO,
            plain_delete_delay: Duration::ZERO,
        }
    }
}

/// Schedules fade-outs and deletions of chat messages
pub struct MessageJanitor {
    transport: Arc<dyn ChatTransport>,
    sessions: Arc<SessionStore>,
    timing: CleanupTiming,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl MessageJanitor {
    /// Create a janitor whose tasks stop when `shutdown` is cancelled
    #[must_use]
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        sessions: Arc<SessionStore>,
        timing: CleanupTiming,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            transport,
            sessions,
            timing,
            shutdown,
            tracker: TaskTracker::new(),
        }
    }

    /// After the display delay, fade out every tracked message of the chat
    /// older than the keeper.
    ///
    /// The session is re-read when the delay elapses; a chat without a
    /// session by then has nothing to clean.
    pub fn schedule_cleanup(&self, chat_id: i64, keep: Option<i32>) -> JoinHandle<()> {
        let sessions = Arc::clone(&self.sessions);
        let transport = Arc::clone(&self.transport);
        let timing = self.timing;
        let token = self.shutdown.child_token();
        self.tracker.spawn(async move {
            tokio::select! {
                () = token.cancelled() => return,
                () = tokio::time::sleep(timing.display_delay) => {}
            }
            let Some(doomed) = sessions.take_stale_message_ids(chat_id, keep).await else {
                debug!(chat_id, "Session gone before cleanup, nothing to do");
                return;
            };
            fade_out_all(transport, chat_id, doomed, timing, token).await;
        })
    }

    /// Fade out the given messages right away.
    ///
    /// Used on terminal transitions, after the ids were taken out of the
    /// session.
    pub fn discard(&self, chat_id: i64, message_ids: Vec<i32>) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        let timing = self.timing;
        let token = self.shutdown.child_token();
        self.tracker.spawn(async move {
            fade_out_all(transport, chat_id, message_ids, timing, token).await;
        })
    }

    /// Delete a manager-authored message after the plain delete delay
    pub fn schedule_plain_delete(&self, chat_id: i64, message_id: i32) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        let delay = self.timing.plain_delete_delay;
        let token = self.shutdown.child_token();
        self.tracker.spawn(async move {
            tokio::select! {
                () = token.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }
            if let Err(e) = transport.delete(chat_id, message_id).await {
                log_failure(chat_id, message_id, "delete", &e);
            }
        })
    }

    /// Wait until every cleanup scheduled so far has finished
    pub async fn settle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Cancel pending cleanups and wait for running ones to stop
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.settle().await;
    }
}

async fn fade_out_all(
    transport: Arc<dyn ChatTransport>,
    chat_id: i64,
    message_ids: Vec<i32>,
    timing: CleanupTiming,
    token: CancellationToken,
) {
    let mut set = JoinSet::new();
    for (index, message_id) in message_ids.into_iter().enumerate() {
        let transport = Arc::clone(&transport);
        let token = token.clone();
        let offset = timing.stagger * u32::try_from(index).unwrap_or(u32::MAX);
        set.spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = async {
                    tokio::time::sleep(offset).await;
                    fade_out(transport.as_ref(), chat_id, message_id, timing).await;
                } => {}
            }
        });
    }
    while set.join_next().await.is_some() {}
}

async fn fade_out(transport: &dyn ChatTransport, chat_id: i64, message_id: i32, timing: CleanupTiming) {
    for frame in FADE_FRAMES {
        match transport.edit_text(chat_id, message_id, frame).await {
            Ok(()) => {}
            Err(TransportError::MessageGone(_)) => {
                debug!(chat_id, message_id, "Message already gone, skipping fade");
                break;
            }
            Err(e) => {
                log_failure(chat_id, message_id, "edit", &e);
                break;
            }
        }
        tokio::time::sleep(timing.fade_step).await;
    }
    tokio::time::sleep(timing.final_pause).await;
    if let Err(e) = transport.delete(chat_id, message_id).await {
        log_failure(chat_id, message_id, "delete", &e);
    }
}

fn log_failure(chat_id: i64, message_id: i32, action: &str, error: &TransportError) {
    match error {
        TransportError::MessageGone(_) => debug!(chat_id, message_id, "Cleanup {action} skipped: {error}"),
        TransportError::Request(_) => warn!(chat_id, message_id, "Cleanup {action} failed: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::transport::MockChatTransport;
    use crate::session::{Operation, Session, Stage};
    use chrono::Utc;
    use mockall::predicate::eq;

    fn janitor(transport: MockChatTransport, sessions: Arc<SessionStore>) -> MessageJanitor {
        MessageJanitor::new(
            Arc::new(transport),
            sessions,
            CleanupTiming::immediate(),
            CancellationToken::new(),
        )
    }

    async fn tracked_session(sessions: &SessionStore, ids: &[i32]) {
        sessions
            .put(Session::new(5, Operation::Create, Stage::AwaitTitle, Default::default(), Utc::now()))
            .await;
        for id in ids {
            sessions.append_message_id(5, *id).await;
        }
    }

    #[tokio::test]
    async fn test_cleanup_fades_everything_older_than_keeper() {
        let sessions = Arc::new(SessionStore::new());
        tracked_session(&sessions, &[1, 2, 3]).await;

        let mut transport = MockChatTransport::new();
        for id in [1, 2] {
            transport
                .expect_edit_text()
                .withf(move |chat, msg, _| *chat == 5 && *msg == id)
                .times(FADE_FRAMES.len())
                .returning(|_, _, _| Ok(()));
            transport
                .expect_delete()
                .with(eq(5), eq(id))
                .times(1)
                .returning(|_, _| Ok(()));
        }

        let janitor = janitor(transport, Arc::clone(&sessions));
        assert!(janitor.schedule_cleanup(5, Some(3)).await.is_ok());
        assert_eq!(sessions.get(5).await.map(|s| s.live_message_ids), Some(vec![3]));
    }

    #[tokio::test]
    async fn test_cleanup_without_session_does_nothing() {
        let sessions = Arc::new(SessionStore::new());
        // Any call on the mock would panic for lack of expectations
        let janitor = janitor(MockChatTransport::new(), sessions);
        assert!(janitor.schedule_cleanup(5, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_gone_message_is_still_deleted_once() {
        let sessions = Arc::new(SessionStore::new());
        let mut transport = MockChatTransport::new();
        transport
            .expect_edit_text()
            .times(1)
            .returning(|_, msg, _| Err(TransportError::MessageGone(msg)));
        transport
            .expect_delete()
            .times(1)
            .returning(|_, msg| Err(TransportError::MessageGone(msg)));

        let janitor = janitor(transport, sessions);
        assert!(janitor.discard(5, vec![9]).await.is_ok());
    }

    #[tokio::test]
    async fn test_plain_delete_skips_fade() {
        let sessions = Arc::new(SessionStore::new());
        let mut transport = MockChatTransport::new();
        transport.expect_edit_text().never();
        transport
            .expect_delete()
            .with(eq(5), eq(40))
            .times(1)
            .returning(|_, _| Ok(()));

        let janitor = janitor(transport, sessions);
        assert!(janitor.schedule_plain_delete(5, 40).await.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_pending_cleanup() {
        let sessions = Arc::new(SessionStore::new());
        tracked_session(&sessions, &[1, 2]).await;
        let timing = CleanupTiming {
            display_delay: Duration::from_secs(3600),
            ..CleanupTiming::immediate()
        };
        let janitor = MessageJanitor::new(
            Arc::new(MockChatTransport::new()),
            Arc::clone(&sessions),
            timing,
            CancellationToken::new(),
        );
        let handle = janitor.schedule_cleanup(5, None);
        janitor.shutdown().await;
        assert!(handle.await.is_ok());
        assert_eq!(sessions.get(5).await.map(|s| s.live_message_ids), Some(vec![1, 2]));
    }
}
