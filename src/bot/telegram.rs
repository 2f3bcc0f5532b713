//! Telegram implementation of the chat transport

use super::resilient::{
    delete_message, edit_message_resilient, is_benign_error, send_message_resilient,
};
use super::transport::{ChatTransport, Keyboard, TransportError};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId};

/// [`ChatTransport`] backed by a teloxide [`Bot`]
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Wrap a bot handle
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Convert a keyboard into Telegram inline markup
#[must_use]
pub fn inline_markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.payload.clone()))
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

fn classify(message_id: i32, error: &anyhow::Error) -> TransportError {
    let text = error.to_string();
    if is_benign_error(&text) {
        TransportError::MessageGone(message_id)
    } else {
        TransportError::Request(text)
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<i32, TransportError> {
        let markup = keyboard.as_ref().map(inline_markup);
        send_message_resilient(&self.bot, ChatId(chat_id), text, markup)
            .await
            .map(|msg| msg.id.0)
            .map_err(|e| TransportError::Request(e.to_string()))
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
    ) -> Result<(), TransportError> {
        edit_message_resilient(&self.bot, ChatId(chat_id), MessageId(message_id), text)
            .await
            .map(|_| ())
            .map_err(|e| classify(message_id, &e))
    }

    async fn delete(&self, chat_id: i64, message_id: i32) -> Result<(), TransportError> {
        delete_message(&self.bot, ChatId(chat_id), MessageId(message_id))
            .await
            .map_err(|e| classify(message_id, &e))
    }
}
