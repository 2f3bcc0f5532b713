//! Resilient messaging utilities with automatic retry for Telegram API operations.
//!
//! Sends and edits retry transient network failures using exponential
//! backoff with jitter. Deletions are attempted once: a message that cannot
//! be deleted is usually already gone.

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, Message, MessageId, ParseMode};

/// Telegram error fragments that mean the target message is gone or unchanged
const BENIGN_ERRORS: [&str; 4] = [
    "message is not modified",
    "message to edit not found",
    "message to delete not found",
    "message can't be deleted",
];

/// Telegram rejects longer message texts
pub const MESSAGE_MAX_CHARS: usize = 4000;

/// Whether an error message describes an expected, harmless failure
#[must_use]
pub fn is_benign_error(message: &str) -> bool {
    BENIGN_ERRORS.iter().any(|fragment| message.contains(fragment))
}

fn clamp_text(text: &str) -> String {
    if text.chars().count() > MESSAGE_MAX_CHARS {
        let truncated_text = crate::utils::truncate_str(text, MESSAGE_MAX_CHARS);
        format!("{truncated_text}...")
    } else {
        text.to_string()
    }
}

/// Send an HTML message with an optional inline keyboard, retrying on network failures.
///
/// # Errors
///
/// Returns the last error after all retries are exhausted.
pub async fn send_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    markup: Option<InlineKeyboardMarkup>,
) -> Result<Message> {
    let text = clamp_text(text);
    crate::utils::retry_telegram_operation(|| async {
        let mut req = bot
            .send_message(chat_id, text.clone())
            .parse_mode(ParseMode::Html);
        if let Some(markup) = markup.clone() {
            req = req.reply_markup(markup);
        }
        req.await
            .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
    })
    .await
}

/// Edit a message with automatic retry on network failures.
///
/// # Errors
///
/// Returns the last error after all retries are exhausted.
pub async fn edit_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: &str,
) -> Result<Message> {
    let text = clamp_text(text);
    crate::utils::retry_telegram_operation(|| async {
        bot.edit_message_text(chat_id, msg_id, text.clone())
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| anyhow::anyhow!("Telegram edit error: {e}"))
    })
    .await
}

/// Delete a message once, without retries.
///
/// # Errors
///
/// Returns the Telegram error as is.
pub async fn delete_message(bot: &Bot, chat_id: ChatId, msg_id: MessageId) -> Result<()> {
    bot.delete_message(chat_id, msg_id)
        .await
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!("Telegram delete error: {e}"))
}
