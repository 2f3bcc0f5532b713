//! Manager conversation engine
//!
//! Turns inbound chat events into session transitions, record store writes
//! and outbound prompts. Telegram specifics stay in [`crate::bot`]; the
//! engine only sees [`InboundEvent`]s and the [`ChatTransport`] trait, so it
//! runs unchanged against the recording transport in tests.

mod actions;
mod buttons;
mod dialogue;
pub mod navigation;

use crate::bot::janitor::MessageJanitor;
use crate::bot::transport::{ChatTransport, InboundEvent, InboundKind, TransportError};
use crate::bot::views::{self, Prompt};
use crate::bot::IgnoredChatLog;
use crate::config::{IGNORED_CHAT_CACHE_MAX_SIZE, IGNORED_CHAT_LOG_COOLDOWN_SECS};
use crate::market::rules::{self, PREMIUM_CAP};
use crate::market::Ad;
use crate::session::{Operation, Session, SessionStore, Stage};
use crate::store::{RecordStore, StoreError};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use teloxide::utils::command::BotCommands;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Manager commands
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Команды менеджера:")]
pub enum Command {
    #[command(description = "открыть меню.")]
    Start,
    #[command(description = "открыть меню.")]
    Menu,
    #[command(description = "создать объявление.")]
    NewAd,
    #[command(description = "отменить текущее действие.")]
    Cancel,
    #[command(description = "открыть объявление по номеру.")]
    Ad(String),
}

/// Failures that abort the handling of one event
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

type EngineResult = Result<(), EngineError>;

/// Static engine settings
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Chats allowed to operate the console
    pub managers: HashSet<i64>,
    /// Contact shown to ad owners in notifications
    pub help_link: String,
    /// Bot username, for commands addressed as `/menu@bot`
    pub bot_username: String,
}

/// Drives manager dialogues
pub struct ConversationEngine {
    transport: Arc<dyn ChatTransport>,
    records: Arc<dyn RecordStore>,
    sessions: Arc<SessionStore>,
    janitor: Arc<MessageJanitor>,
    options: EngineOptions,
    ignored: IgnoredChatLog,
}

impl ConversationEngine {
    #[must_use]
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        records: Arc<dyn RecordStore>,
        sessions: Arc<SessionStore>,
        janitor: Arc<MessageJanitor>,
        options: EngineOptions,
    ) -> Self {
        Self {
            transport,
            records,
            sessions,
            janitor,
            options,
            ignored: IgnoredChatLog::new(IGNORED_CHAT_LOG_COOLDOWN_SECS, IGNORED_CHAT_CACHE_MAX_SIZE),
        }
    }

    /// Handle one inbound event at the current time
    pub async fn handle(&self, event: InboundEvent) {
        self.handle_at(event, Utc::now()).await;
    }

    /// Handle one inbound event as if it arrived at `now`.
    ///
    /// Failures are logged; the dialogue stays where it was.
    pub async fn handle_at(&self, event: InboundEvent, now: DateTime<Utc>) {
        let chat_id = event.chat_id;
        if !self.options.managers.contains(&event.sender_id) {
            self.ignored.record(chat_id, event.sender_id).await;
            return;
        }
        if let Some(message_id) = event.message_id {
            self.janitor.schedule_plain_delete(chat_id, message_id);
        }
        let session = self.sessions.touch(chat_id, now).await;

        let result = match event.kind {
            InboundKind::Text(text) => self.on_text(chat_id, session, &text, now).await,
            InboundKind::Photo { file_id, file_path } => {
                self.on_photo(chat_id, session, file_id, file_path, now).await
            }
            InboundKind::Forwarded { user_id, username } => {
                self.on_forwarded(chat_id, session, user_id, username, now).await
            }
            InboundKind::ButtonPress { payload, .. } => {
                self.on_button(chat_id, session, &payload, now).await
            }
        };
        if let Err(e) = result {
            error!(chat_id, "Failed to handle event: {e}");
        }
    }

    async fn on_text(
        &self,
        chat_id: i64,
        session: Option<Session>,
        text: &str,
        now: DateTime<Utc>,
    ) -> EngineResult {
        if text.starts_with('/') {
            return match Command::parse(text, &self.options.bot_username) {
                Ok(command) => self.on_command(chat_id, command, now).await,
                Err(e) => {
                    debug!(chat_id, "Unknown command {text:?}: {e}");
                    self.show_main_menu(chat_id, now).await
                }
            };
        }
        match session {
            Some(session) if session.stage != Stage::Idle => {
                self.on_stage_text(session, text.trim(), now).await
            }
            _ => self.show_main_menu(chat_id, now).await,
        }
    }

    async fn on_command(&self, chat_id: i64, command: Command, now: DateTime<Utc>) -> EngineResult {
        info!(chat_id, ?command, "Manager command");
        match command {
            Command::Start | Command::Menu => self.show_main_menu(chat_id, now).await,
            Command::NewAd => self.start_create(chat_id, now).await,
            Command::Cancel => {
                self.drop_session(chat_id).await;
                self.show_main_menu(chat_id, now).await
            }
            Command::Ad(arg) => match arg.trim().parse() {
                Ok(id) => self.open_action_menu(chat_id, id, now).await,
                Err(_) => {
                    let prompt = views::result("ℹ️ Использование: /ad &lt;номер объявления&gt;");
                    self.finish(chat_id, prompt).await
                }
            },
        }
    }

    /// Prompt of the session's current stage
    async fn render(&self, session: &Session, now: DateTime<Utc>) -> Result<Prompt, EngineError> {
        let prompt = match session.stage {
            Stage::Idle => views::main_menu(),
            Stage::AwaitAction => views::action_menu(&session.draft, now),
            Stage::AwaitPhoto => views::photo(session),
            Stage::AwaitTitle => views::title(session),
            Stage::AwaitDescription => views::description(session),
            Stage::AwaitUserId => views::user_id(session),
            Stage::AwaitUsername => views::username(session),
            Stage::AwaitCategory => views::category(session),
            Stage::AwaitMode => views::mode(session),
            Stage::AwaitTag => views::tag(session),
            Stage::AwaitDuration => views::duration(session),
            Stage::AwaitPremium => {
                let active = rules::check_premium_capacity(
                    self.records.as_ref(),
                    session.draft.is_persisted().then_some(session.draft.id),
                )
                .await?;
                views::premium(session, active, PREMIUM_CAP)
            }
            Stage::AwaitConfirmation => views::confirmation(session, now),
            Stage::AwaitAllSettings => views::all_settings(session),
            Stage::AwaitRenewDuration => views::renew_duration(session),
            Stage::AwaitBlacklistAdd => views::blacklist_input(true),
            Stage::AwaitBlacklistRemove => views::blacklist_input(false),
            Stage::AwaitFindAdId => views::find_prompt(),
            Stage::AwaitSelectAd => {
                let ads = self
                    .records
                    .find_ads_by_client_id(&session.draft.client_id)
                    .await?;
                views::search_results(&ads)
            }
        };
        Ok(prompt)
    }

    /// Store the session and show the prompt of its stage
    async fn show(&self, session: Session, now: DateTime<Utc>) -> EngineResult {
        let prompt = self.render(&session, now).await?;
        self.present(session, prompt).await
    }

    /// Show the current stage again with an error line on top
    async fn reprompt(&self, session: Session, error: &str, now: DateTime<Utc>) -> EngineResult {
        debug!(chat_id = session.chat_id, stage = %session.stage, "Re-prompting: {error}");
        let prompt = self.render(&session, now).await?.with_error(error);
        self.present(session, prompt).await
    }

    /// Store the session, send the prompt and schedule removal of older ones
    async fn present(&self, session: Session, prompt: Prompt) -> EngineResult {
        let chat_id = session.chat_id;
        self.sessions.save(session).await;
        let message_id = self
            .transport
            .send(chat_id, &prompt.text, prompt.keyboard)
            .await?;
        self.sessions.append_message_id(chat_id, message_id).await;
        self.janitor.schedule_cleanup(chat_id, Some(message_id));
        Ok(())
    }

    /// Clear the session, fade out its prompts and send a final message
    async fn finish(&self, chat_id: i64, prompt: Prompt) -> EngineResult {
        self.drop_session(chat_id).await;
        self.transport
            .send(chat_id, &prompt.text, prompt.keyboard)
            .await?;
        Ok(())
    }

    async fn drop_session(&self, chat_id: i64) {
        let ids = self.sessions.take_all_message_ids(chat_id).await;
        self.sessions.clear(chat_id).await;
        if !ids.is_empty() {
            self.janitor.discard(chat_id, ids);
        }
    }

    async fn show_main_menu(&self, chat_id: i64, now: DateTime<Utc>) -> EngineResult {
        self.sessions.begin(Session::idle(chat_id, now)).await;
        self.show(Session::idle(chat_id, now), now).await
    }

    async fn start_create(&self, chat_id: i64, now: DateTime<Utc>) -> EngineResult {
        info!(chat_id, "Starting new ad");
        let session = Session::new(chat_id, Operation::Create, Stage::AwaitPhoto, Ad::default(), now);
        self.sessions.begin(session.clone()).await;
        self.show(session, now).await
    }

    /// Best-effort message to an ad owner
    async fn notify_owner(&self, ad: &Ad, text: &str) {
        if ad.user_id == 0 {
            debug!(ad_id = ad.id, "Ad has no owning chat, skipping notification");
            return;
        }
        if let Err(e) = self.transport.send(ad.user_id, text, None).await {
            warn!(ad_id = ad.id, user_id = ad.user_id, "Failed to notify ad owner: {e}");
        }
    }
}
