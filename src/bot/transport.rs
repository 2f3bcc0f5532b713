//! Chat transport abstraction
//!
//! The engine talks to the chat service only through [`ChatTransport`] and
//! receives [`InboundEvent`]s built by the dispatcher adapter.

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    /// The chat service rejected or failed the request
    #[error("Transport request failed: {0}")]
    Request(String),
    /// The targeted message no longer exists or cannot be changed
    #[error("Message {0} is gone")]
    MessageGone(i32),
}

/// One inline button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    /// Button that sends `payload` back when pressed
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// Inline keyboard attached to a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// Empty keyboard
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row of buttons
    #[must_use]
    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        if !buttons.is_empty() {
            self.rows.push(buttons);
        }
        self
    }

    /// Append a single-button row
    #[must_use]
    pub fn button(self, label: impl Into<String>, payload: impl Into<String>) -> Self {
        self.row(vec![Button::new(label, payload)])
    }

    /// All payloads in display order
    pub fn payloads(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(|b| b.payload.as_str())
    }

    /// Label of the button carrying `payload`
    #[must_use]
    pub fn label_for(&self, payload: &str) -> Option<&str> {
        self.rows
            .iter()
            .flatten()
            .find(|b| b.payload == payload)
            .map(|b| b.label.as_str())
    }
}

/// Kind of inbound chat event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    /// Plain text message (commands included)
    Text(String),
    /// Photo message, largest size
    Photo { file_id: String, file_path: String },
    /// Message forwarded from another user or chat
    Forwarded {
        user_id: Option<i64>,
        username: Option<String>,
    },
    /// Inline button press
    ButtonPress {
        payload: String,
        /// Message carrying the pressed button
        message_id: Option<i32>,
    },
}

/// Inbound chat event addressed to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub chat_id: i64,
    pub sender_id: i64,
    /// Id of the inbound message itself; `None` for button presses
    pub message_id: Option<i32>,
    pub kind: InboundKind,
}

impl InboundEvent {
    /// Text message event
    pub fn text(chat_id: i64, message_id: i32, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            sender_id: chat_id,
            message_id: Some(message_id),
            kind: InboundKind::Text(text.into()),
        }
    }

    /// Button press event
    pub fn button(chat_id: i64, pressed_message: i32, payload: impl Into<String>) -> Self {
        Self {
            chat_id,
            sender_id: chat_id,
            message_id: None,
            kind: InboundKind::ButtonPress {
                payload: payload.into(),
                message_id: Some(pressed_message),
            },
        }
    }

    /// Forwarded message event
    #[must_use]
    pub fn forwarded(
        chat_id: i64,
        message_id: i32,
        user_id: Option<i64>,
        username: Option<String>,
    ) -> Self {
        Self {
            chat_id,
            sender_id: chat_id,
            message_id: Some(message_id),
            kind: InboundKind::Forwarded { user_id, username },
        }
    }

    /// Photo message event
    pub fn photo(
        chat_id: i64,
        message_id: i32,
        file_id: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            chat_id,
            sender_id: chat_id,
            message_id: Some(message_id),
            kind: InboundKind::Photo {
                file_id: file_id.into(),
                file_path: file_path.into(),
            },
        }
    }
}

/// Outbound chat operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send an HTML message, returning its id
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<i32, TransportError>;
    /// Replace the text of a message, dropping its keyboard
    async fn edit_text(&self, chat_id: i64, message_id: i32, text: &str)
        -> Result<(), TransportError>;
    /// Delete a message
    async fn delete(&self, chat_id: i64, message_id: i32) -> Result<(), TransportError>;
}
