//! Telegram update adapter
//!
//! Acknowledges button presses and converts teloxide updates into
//! [`InboundEvent`]s for the conversation engine.

use super::transport::{InboundEvent, InboundKind};
use crate::engine::ConversationEngine;
use crate::utils::retry_telegram_operation;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, MessageOrigin};
use tracing::{debug, warn};

/// Update handler tree of the console
#[must_use]
pub fn schema() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(Update::filter_message().endpoint(handle_message))
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    engine: Arc<ConversationEngine>,
) -> Result<(), teloxide::RequestError> {
    // Stops the client spinner; nothing to do if it fails
    let _ = bot.answer_callback_query(q.id.clone()).await;

    match callback_event(&q) {
        Some(event) => engine.handle(event).await,
        None => debug!(query_id = %q.id, "Callback without data or message"),
    }
    respond(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    engine: Arc<ConversationEngine>,
) -> Result<(), teloxide::RequestError> {
    match message_event(&bot, &msg).await {
        Some(event) => engine.handle(event).await,
        None => debug!(chat_id = msg.chat.id.0, "Unsupported message kind"),
    }
    respond(())
}

/// Button press event, if the query carries data and a message
#[must_use]
pub fn callback_event(q: &CallbackQuery) -> Option<InboundEvent> {
    let payload = q.data.clone()?;
    let message = q.message.as_ref()?;
    Some(InboundEvent {
        chat_id: message.chat().id.0,
        sender_id: q.from.id.0.cast_signed(),
        message_id: None,
        kind: InboundKind::ButtonPress {
            payload,
            message_id: Some(message.id().0),
        },
    })
}

/// Owner id and handle of a forwarded message.
///
/// Messages forwarded from a chat or channel fall back to its id.
#[must_use]
pub fn forward_source(origin: &MessageOrigin) -> (Option<i64>, Option<String>) {
    match origin {
        MessageOrigin::User { sender_user, .. } => (
            Some(sender_user.id.0.cast_signed()),
            sender_user.username.clone(),
        ),
        MessageOrigin::HiddenUser { .. } => (None, None),
        MessageOrigin::Chat { sender_chat, .. } => (
            Some(sender_chat.id.0),
            sender_chat.username().map(str::to_string),
        ),
        MessageOrigin::Channel { chat, .. } => {
            (Some(chat.id.0), chat.username().map(str::to_string))
        }
    }
}

async fn message_event(bot: &Bot, msg: &Message) -> Option<InboundEvent> {
    let chat_id = msg.chat.id.0;
    let sender_id = msg
        .from
        .as_ref()
        .map_or(chat_id, |user| user.id.0.cast_signed());

    let kind = if let Some(origin) = msg.forward_origin() {
        let (user_id, username) = forward_source(origin);
        InboundKind::Forwarded { user_id, username }
    } else if let Some(photo) = msg.photo().and_then(<[_]>::last) {
        let file_id = photo.file.id.to_string();
        let file_path = retry_telegram_operation(|| async {
            Ok(bot.get_file(photo.file.id.clone()).await?.path)
        })
        .await
        .unwrap_or_else(|e| {
            warn!(chat_id, "Failed to resolve photo path: {e}");
            String::new()
        });
        InboundKind::Photo { file_id, file_path }
    } else {
        InboundKind::Text(msg.text()?.to_string())
    };

    Some(InboundEvent {
        chat_id,
        sender_id,
        message_id: Some(msg.id.0),
        kind,
    })
}
