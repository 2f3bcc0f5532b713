//! Free-text, photo and forwarded-message input

use super::{ConversationEngine, EngineResult};
use crate::market::ad::{DESCRIPTION_MAX_CHARS, TITLE_MAX_CHARS};
use crate::session::{Session, Stage};
use crate::utils::{normalize_username, truncate_str};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

const USE_BUTTONS: &str = "Выберите вариант кнопками ниже.";

/// Parses a client id typed by a manager
pub(super) fn parse_client_id(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok().filter(|id| *id > 0)
}

impl ConversationEngine {
    pub(super) async fn on_stage_text(
        &self,
        mut session: Session,
        text: &str,
        now: DateTime<Utc>,
    ) -> EngineResult {
        match session.stage {
            Stage::AwaitPhoto => {
                self.reprompt(session, "Отправьте фото или нажмите «Пропустить».", now)
                    .await
            }
            Stage::AwaitTitle => {
                if text.is_empty() {
                    return self.reprompt(session, "Заголовок не может быть пустым.", now).await;
                }
                session.draft.title = truncate_str(text, TITLE_MAX_CHARS);
                session.stage = Stage::AwaitDescription;
                self.show(session, now).await
            }
            Stage::AwaitDescription => {
                if text.is_empty() {
                    return self.reprompt(session, "Описание не может быть пустым.", now).await;
                }
                session.draft.description = truncate_str(text, DESCRIPTION_MAX_CHARS);
                session.stage = Stage::AwaitUserId;
                self.show(session, now).await
            }
            Stage::AwaitUserId => self.on_typed_user_id(session, text, now).await,
            Stage::AwaitUsername => match normalize_username(text) {
                Some(username) => {
                    session.draft.username = username;
                    session.stage = Stage::AwaitCategory;
                    self.show(session, now).await
                }
                None => {
                    self.reprompt(session, "Некорректный username. Пример: @username", now)
                        .await
                }
            },
            Stage::AwaitFindAdId => match parse_client_id(text) {
                Some(id) => self.search(session.chat_id, &id.to_string(), now).await,
                None => {
                    self.reprompt(session, "ID клиента должен быть числом.", now)
                        .await
                }
            },
            Stage::AwaitBlacklistAdd | Stage::AwaitBlacklistRemove => {
                let add = session.stage == Stage::AwaitBlacklistAdd;
                match normalize_username(text) {
                    Some(username) => self.apply_blacklist(session.chat_id, &username, add).await,
                    None => {
                        self.reprompt(session, "Некорректный username. Пример: @username", now)
                            .await
                    }
                }
            }
            _ => self.reprompt(session, USE_BUTTONS, now).await,
        }
    }

    async fn on_typed_user_id(&self, mut session: Session, text: &str, now: DateTime<Utc>) -> EngineResult {
        let Some(user_id) = parse_client_id(text) else {
            let prompt = crate::bot::views::manual_user_id(&session)
                .with_error("ID клиента должен быть числом.");
            return self.present(session, prompt).await;
        };
        session.draft.client_id = user_id.to_string();
        session.draft.user_id = user_id;
        self.after_user_id(session, now).await
    }

    /// Continue once the owner id is known, detouring for a missing handle
    pub(super) async fn after_user_id(&self, mut session: Session, now: DateTime<Utc>) -> EngineResult {
        session.stage = if session.draft.username.is_empty() {
            Stage::AwaitUsername
        } else {
            Stage::AwaitCategory
        };
        self.show(session, now).await
    }

    pub(super) async fn on_photo(
        &self,
        chat_id: i64,
        session: Option<Session>,
        file_id: String,
        file_path: String,
        now: DateTime<Utc>,
    ) -> EngineResult {
        let Some(mut session) = session.filter(|s| s.stage != Stage::Idle) else {
            debug!(chat_id, "Photo outside of a dialogue");
            return self.show_main_menu(chat_id, now).await;
        };
        if session.stage != Stage::AwaitPhoto {
            return self.reprompt(session, "Фото сейчас не ожидается.", now).await;
        }
        session.draft.photo_id = file_id;
        session.draft.photo_path = file_path;
        session.stage = Stage::AwaitTitle;
        self.show(session, now).await
    }

    pub(super) async fn on_forwarded(
        &self,
        chat_id: i64,
        session: Option<Session>,
        user_id: Option<i64>,
        username: Option<String>,
        now: DateTime<Utc>,
    ) -> EngineResult {
        let session = match session {
            Some(s) if s.stage == Stage::AwaitUserId => s,
            Some(s) if !matches!(s.stage, Stage::Idle | Stage::AwaitFindAdId) => {
                return self.reprompt(s, USE_BUTTONS, now).await;
            }
            other => {
                // Forwarding outside a dialogue looks the sender's ads up
                return match user_id {
                    Some(id) => self.search(chat_id, &id.to_string(), now).await,
                    None => {
                        let session = other.unwrap_or_else(|| Session::idle(chat_id, now));
                        let session = Session {
                            stage: Stage::AwaitFindAdId,
                            ..session
                        };
                        self.reprompt(session, "Пользователь скрыл свой аккаунт. Введите ID вручную.", now)
                            .await
                    }
                };
            }
        };
        self.on_forwarded_owner(session, user_id, username, now).await
    }

    async fn on_forwarded_owner(
        &self,
        mut session: Session,
        user_id: Option<i64>,
        username: Option<String>,
        now: DateTime<Utc>,
    ) -> EngineResult {
        let Some(user_id) = user_id else {
            let prompt = crate::bot::views::manual_user_id(&session)
                .with_error("Пользователь скрыл свой аккаунт. Введите ID вручную.");
            return self.present(session, prompt).await;
        };
        info!(chat_id = session.chat_id, user_id, "Owner id taken from forwarded message");
        session.draft.client_id = user_id.to_string();
        session.draft.user_id = user_id;
        if let Some(username) = username.as_deref().and_then(normalize_username) {
            session.draft.username = username;
        }
        self.after_user_id(session, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::parse_client_id;

    #[test]
    fn test_parse_client_id() {
        assert_eq!(parse_client_id(" 12345 "), Some(12345));
        assert_eq!(parse_client_id("0"), None);
        assert_eq!(parse_client_id("-5"), None);
        assert_eq!(parse_client_id("12a"), None);
        assert_eq!(parse_client_id(""), None);
        assert_eq!(parse_client_id("99999999999999999999"), None);
    }
}
