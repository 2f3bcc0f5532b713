//! Test doubles
//!
//! [`RecordingTransport`] stands in for Telegram: it hands out message ids,
//! remembers every call and can be told to fail.

use crate::bot::transport::{ChatTransport, Keyboard, TransportError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use tokio::sync::Mutex;

/// A message sent through the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub message_id: i32,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl SentMessage {
    /// Payloads of the attached buttons, in display order
    #[must_use]
    pub fn payloads(&self) -> Vec<String> {
        self.keyboard
            .as_ref()
            .map(|k| k.payloads().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[derive(Default)]
struct Journal {
    sent: Vec<SentMessage>,
    edits: Vec<(i64, i32, String)>,
    deletes: Vec<(i64, i32)>,
}

/// In-memory [`ChatTransport`] that records every call
#[derive(Default)]
pub struct RecordingTransport {
    last_id: AtomicI32,
    fail_sends: AtomicBool,
    journal: Mutex<Journal>,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (or succeed again)
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Every message sent so far
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.journal.lock().await.sent.clone()
    }

    /// Messages sent to one chat
    pub async fn sent_to(&self, chat_id: i64) -> Vec<SentMessage> {
        self.journal
            .lock()
            .await
            .sent
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }

    /// Last message sent to a chat
    pub async fn last_sent_to(&self, chat_id: i64) -> Option<SentMessage> {
        self.sent_to(chat_id).await.pop()
    }

    /// Every `(chat_id, message_id, text)` edit so far
    pub async fn edits(&self) -> Vec<(i64, i32, String)> {
        self.journal.lock().await.edits.clone()
    }

    /// Every `(chat_id, message_id)` deletion so far
    pub async fn deleted(&self) -> Vec<(i64, i32)> {
        self.journal.lock().await.deletes.clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<i32, TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Request("send disabled".to_string()));
        }
        let message_id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.journal.lock().await.sent.push(SentMessage {
            chat_id,
            message_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(message_id)
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
    ) -> Result<(), TransportError> {
        let mut journal = self.journal.lock().await;
        if journal.deletes.contains(&(chat_id, message_id)) {
            return Err(TransportError::MessageGone(message_id));
        }
        journal.edits.push((chat_id, message_id, text.to_string()));
        Ok(())
    }

    async fn delete(&self, chat_id: i64, message_id: i32) -> Result<(), TransportError> {
        let mut journal = self.journal.lock().await;
        if journal.deletes.contains(&(chat_id, message_id)) {
            return Err(TransportError::MessageGone(message_id));
        }
        journal.deletes.push((chat_id, message_id));
        Ok(())
    }
}
