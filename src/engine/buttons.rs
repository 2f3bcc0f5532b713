//! Button presses
//!
//! Menu buttons work from anywhere. Every other payload belongs to one
//! stage; pressing it after the session has moved on re-shows the current
//! prompt.

use super::navigation::{back_target, BackTarget};
use super::{ConversationEngine, EngineResult};
use crate::bot::callbacks::Callback;
use crate::bot::views;
use crate::market::rules::{self, RuleError};
use crate::market::vocabulary;
use crate::session::{Operation, Session, Stage};
use chrono::{DateTime, Utc};
use tracing::debug;

const STALE_BUTTON: &str = "Эта кнопка больше не актуальна.";

/// Whether `callback` may be pressed while the session is at `stage`
fn accepts(stage: Stage, callback: &Callback) -> bool {
    match callback {
        Callback::MainMenu
        | Callback::NewAd
        | Callback::FindAd
        | Callback::BlacklistMenu
        | Callback::BlacklistView
        | Callback::BlacklistAdd
        | Callback::BlacklistRemove
        | Callback::AdAction(_)
        | Callback::Back => true,
        Callback::SelectAd(_) => stage == Stage::AwaitSelectAd,
        Callback::AdEdit | Callback::AdRenew | Callback::AdRemove | Callback::AdPublish => {
            stage == Stage::AwaitAction
        }
        Callback::SkipPhoto => stage == Stage::AwaitPhoto,
        Callback::SkipUserId | Callback::KeepUserId => stage == Stage::AwaitUserId,
        Callback::SkipUsername => stage == Stage::AwaitUsername,
        Callback::Category(_) => stage == Stage::AwaitCategory,
        Callback::Mode(_) => stage == Stage::AwaitMode,
        Callback::Tag(_) => stage == Stage::AwaitTag,
        Callback::Duration(_) => stage == Stage::AwaitDuration,
        Callback::Premium(_) => stage == Stage::AwaitPremium,
        Callback::RenewDuration(_) => stage == Stage::AwaitRenewDuration,
        Callback::ConfirmYes | Callback::ConfirmNo | Callback::EditAfterPreview => {
            stage == Stage::AwaitConfirmation
        }
        Callback::EditCategory
        | Callback::EditMode
        | Callback::EditTag
        | Callback::EditDuration
        | Callback::EditPremium
        | Callback::SaveFromSettings => stage == Stage::AwaitAllSettings,
        Callback::Unknown(_) => false,
    }
}

/// Leave a field editor: back to settings when entered from there
fn leave_editor(session: &mut Session, linear_next: Stage) {
    if session.from_settings {
        session.from_settings = false;
        session.stage = Stage::AwaitAllSettings;
    } else {
        session.stage = linear_next;
    }
}

impl ConversationEngine {
    pub(super) async fn on_button(
        &self,
        chat_id: i64,
        session: Option<Session>,
        payload: &str,
        now: DateTime<Utc>,
    ) -> EngineResult {
        let callback = Callback::parse(payload);
        let stage = session.as_ref().map_or(Stage::Idle, |s| s.stage);
        if !accepts(stage, &callback) {
            debug!(chat_id, %stage, payload, "Stale or unknown button");
            return match session {
                Some(session) => self.reprompt(session, STALE_BUTTON, now).await,
                None => Ok(()),
            };
        }

        match callback {
            Callback::MainMenu => self.show_main_menu(chat_id, now).await,
            Callback::NewAd => self.start_create(chat_id, now).await,
            Callback::FindAd => self.enter_side_stage(chat_id, Stage::AwaitFindAdId, now).await,
            Callback::BlacklistMenu => self.show_blacklist_menu(chat_id, now).await,
            Callback::BlacklistView => self.show_blacklist(chat_id, now).await,
            Callback::BlacklistAdd => {
                self.enter_side_stage(chat_id, Stage::AwaitBlacklistAdd, now).await
            }
            Callback::BlacklistRemove => {
                self.enter_side_stage(chat_id, Stage::AwaitBlacklistRemove, now).await
            }
            Callback::AdAction(id) | Callback::SelectAd(id) => {
                self.open_action_menu(chat_id, id, now).await
            }
            Callback::Back => match session {
                Some(session) => self.go_back(session, now).await,
                None => self.show_main_menu(chat_id, now).await,
            },
            Callback::Unknown(_) => Ok(()),
            // Every remaining payload is accepted only with a session
            other => match session {
                Some(session) => self.on_stage_button(session, other, now).await,
                None => Ok(()),
            },
        }
    }

    async fn on_stage_button(&self, mut session: Session, callback: Callback, now: DateTime<Utc>) -> EngineResult {
        match callback {
            Callback::AdEdit => self.begin_edit(session, now).await,
            Callback::AdRenew => {
                session.operation = Operation::Renew;
                session.duration_days = 0;
                session.stage = Stage::AwaitRenewDuration;
                self.show(session, now).await
            }
            Callback::AdRemove => self.retire_ad(session).await,
            Callback::AdPublish => self.publish_ad(session, now).await,
            Callback::RenewDuration(days) => self.renew_ad(session, days, now).await,
            Callback::SkipPhoto => {
                if session.operation == Operation::Create {
                    session.draft.clear_photo();
                }
                session.stage = Stage::AwaitTitle;
                self.show(session, now).await
            }
            Callback::SkipUserId => {
                let prompt = views::manual_user_id(&session);
                self.present(session, prompt).await
            }
            Callback::KeepUserId if session.draft.client_id.is_empty() => {
                self.reprompt(session, "У объявления ещё нет ID клиента.", now).await
            }
            Callback::KeepUserId => self.after_user_id(session, now).await,
            Callback::SkipUsername => {
                session.draft.username.clear();
                session.stage = Stage::AwaitCategory;
                self.show(session, now).await
            }
            Callback::Category(value) => self.choose_category(session, &value, now).await,
            Callback::Mode(value) => self.choose_mode(session, &value, now).await,
            Callback::Tag(value) => self.choose_tag(session, &value, now).await,
            Callback::Duration(days) => match rules::validate_duration(days) {
                Ok(days) => {
                    session.duration_days = days;
                    leave_editor(&mut session, Stage::AwaitPremium);
                    self.show(session, now).await
                }
                Err(e) => self.reprompt(session, &e.to_string(), now).await,
            },
            Callback::Premium(value) => self.choose_premium(session, value, now).await,
            Callback::ConfirmYes | Callback::SaveFromSettings => self.persist(session, now).await,
            Callback::ConfirmNo => {
                let text = match session.operation {
                    Operation::Create => "❌ Создание объявления отменено.",
                    Operation::Edit | Operation::Renew => "❌ Изменения отменены.",
                };
                self.finish(session.chat_id, views::result(text)).await
            }
            Callback::EditAfterPreview => {
                session.stage = Stage::AwaitAllSettings;
                self.show(session, now).await
            }
            Callback::EditCategory => self.open_editor(session, Stage::AwaitCategory, now).await,
            Callback::EditMode => self.open_editor(session, Stage::AwaitMode, now).await,
            Callback::EditTag => self.open_editor(session, Stage::AwaitTag, now).await,
            Callback::EditDuration => self.open_editor(session, Stage::AwaitDuration, now).await,
            Callback::EditPremium => self.open_editor(session, Stage::AwaitPremium, now).await,
            other => {
                debug!(chat_id = session.chat_id, ?other, "Button has no stage handler");
                Ok(())
            }
        }
    }

    async fn open_editor(&self, mut session: Session, stage: Stage, now: DateTime<Utc>) -> EngineResult {
        session.from_settings = true;
        session.stage = stage;
        self.show(session, now).await
    }

    async fn enter_side_stage(&self, chat_id: i64, stage: Stage, now: DateTime<Utc>) -> EngineResult {
        let session = Session {
            stage,
            ..Session::idle(chat_id, now)
        };
        self.sessions.begin(session.clone()).await;
        self.show(session, now).await
    }

    async fn go_back(&self, mut session: Session, now: DateTime<Utc>) -> EngineResult {
        match back_target(&session) {
            BackTarget::Stage(stage) => {
                if stage == Stage::AwaitAllSettings || !stage.is_field_editor() {
                    session.from_settings = false;
                }
                session.stage = stage;
                self.show(session, now).await
            }
            BackTarget::ActionMenu(id) => self.open_action_menu(session.chat_id, id, now).await,
            BackTarget::MainMenu => self.show_main_menu(session.chat_id, now).await,
            BackTarget::BlacklistMenu => self.show_blacklist_menu(session.chat_id, now).await,
        }
    }

    async fn choose_category(&self, mut session: Session, value: &str, now: DateTime<Utc>) -> EngineResult {
        let Some(category) = vocabulary::category(value) else {
            let error = RuleError::OutOfVocabulary {
                field: "категория",
                value: value.to_string(),
            };
            return self.reprompt(session, &error.to_string(), now).await;
        };
        if session.draft.category != category.value {
            session.draft.category = category.value.to_string();
            session.draft.mode.clear();
            session.draft.tag.clear();
        }
        if let Some(implicit) = category.implicit_mode() {
            session.draft.mode = implicit.value.to_string();
        }

        session.stage = if session.draft.mode.is_empty() {
            Stage::AwaitMode
        } else if session.from_settings && !session.draft.tag.is_empty() {
            session.from_settings = false;
            Stage::AwaitAllSettings
        } else if session.from_settings || category.implicit_mode().is_some() {
            Stage::AwaitTag
        } else {
            Stage::AwaitMode
        };
        self.show(session, now).await
    }

    async fn choose_mode(&self, mut session: Session, value: &str, now: DateTime<Utc>) -> EngineResult {
        let entry = vocabulary::category(&session.draft.category).and_then(|c| c.mode(value));
        let Some(entry) = entry else {
            let error = RuleError::OutOfVocabulary {
                field: "режим",
                value: value.to_string(),
            };
            return self.reprompt(session, &error.to_string(), now).await;
        };
        session.draft.mode = entry.value.to_string();
        if session.from_settings && session.draft.tag.is_empty() {
            session.stage = Stage::AwaitTag;
        } else {
            leave_editor(&mut session, Stage::AwaitTag);
        }
        self.show(session, now).await
    }

    async fn choose_tag(&self, mut session: Session, value: &str, now: DateTime<Utc>) -> EngineResult {
        let entry = vocabulary::category(&session.draft.category).and_then(|c| c.tag(value));
        let Some(entry) = entry else {
            let error = RuleError::OutOfVocabulary {
                field: "тег",
                value: value.to_string(),
            };
            return self.reprompt(session, &error.to_string(), now).await;
        };
        session.draft.tag = entry.value.to_string();
        leave_editor(&mut session, Stage::AwaitDuration);
        self.show(session, now).await
    }

    async fn choose_premium(&self, mut session: Session, value: bool, now: DateTime<Utc>) -> EngineResult {
        if value {
            let exclude = session.draft.is_persisted().then_some(session.draft.id);
            let active = rules::check_premium_capacity(self.records.as_ref(), exclude).await?;
            if let Err(e) = rules::ensure_premium_slot(active) {
                return self.reprompt(session, &e.to_string(), now).await;
            }
        }
        session.draft.is_premium = value;
        leave_editor(&mut session, Stage::AwaitConfirmation);
        self.show(session, now).await
    }
}
