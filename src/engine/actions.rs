//! Terminal actions: persisting drafts, ad management, search and blacklist

use super::{ConversationEngine, EngineResult};
use crate::bot::views::{self, owner};
use crate::market::rules;
use crate::market::{Ad, AdId, AdStatus};
use crate::session::{Operation, Session, Stage};
use crate::utils::escape_html;
use chrono::{DateTime, Utc};
use tracing::{error, info};

const SAVE_FAILED: &str = "Не удалось сохранить объявление, попробуйте ещё раз.";

impl ConversationEngine {
    /// Validate and write the draft, then notify its owner
    pub(super) async fn persist(&self, session: Session, now: DateTime<Utc>) -> EngineResult {
        let mut ad = session.draft.clone();
        if ad.is_premium {
            let exclude = ad.is_persisted().then_some(ad.id);
            let active = rules::check_premium_capacity(self.records.as_ref(), exclude).await?;
            if let Err(e) = rules::ensure_premium_slot(active) {
                return self.reprompt(session, &e.to_string(), now).await;
            }
        }
        if let Err(e) = rules::validate_for_persist(&mut ad, session.operation, session.duration_days, now) {
            return self.reprompt(session, &e.to_string(), now).await;
        }

        let write = if session.operation == Operation::Create {
            let created = self.records.create_ad(&ad).await;
            created.map(|id| ad.id = id)
        } else {
            self.records.save_ad(&ad).await
        };
        if let Err(e) = write {
            error!(chat_id = session.chat_id, "Failed to persist ad: {e}");
            return self.reprompt(session, SAVE_FAILED, now).await;
        }

        let verb = if session.operation == Operation::Create {
            "опубликовано"
        } else {
            "обновлено"
        };
        info!(chat_id = session.chat_id, ad_id = ad.id, operation = ?session.operation, "Ad persisted");
        let text = format!("✅ Объявление #{} {verb}.", ad.id);
        self.finish(session.chat_id, views::result(text)).await?;
        self.notify_owner(&ad, &owner::published(&ad, &self.options.help_link))
            .await;
        Ok(())
    }

    /// Show the action menu of a stored ad
    pub(super) async fn open_action_menu(&self, chat_id: i64, id: AdId, now: DateTime<Utc>) -> EngineResult {
        let Some(ad) = self.records.find_ad_by_id(id).await? else {
            info!(chat_id, ad_id = id, "Ad not found");
            let text = format!("❌ Объявление #{id} не найдено.");
            return self.finish(chat_id, views::result(text)).await;
        };
        let session = Session::new(chat_id, Operation::Edit, Stage::AwaitAction, ad, now);
        self.sessions.begin(session.clone()).await;
        self.show(session, now).await
    }

    /// Start editing the ad of the action menu, from its stored state
    pub(super) async fn begin_edit(&self, mut session: Session, now: DateTime<Utc>) -> EngineResult {
        let Some(ad) = self.records.find_ad_by_id(session.draft.id).await? else {
            let text = format!("❌ Объявление #{} не найдено.", session.draft.id);
            return self.finish(session.chat_id, views::result(text)).await;
        };
        session.draft = ad;
        session.operation = Operation::Edit;
        session.duration_days = 0;
        session.from_settings = false;
        session.stage = Stage::AwaitPhoto;
        self.show(session, now).await
    }

    pub(super) async fn retire_ad(&self, session: Session) -> EngineResult {
        let id = session.draft.id;
        if !rules::retire(self.records.as_ref(), id).await? {
            let text = format!("❌ Объявление #{id} не найдено.");
            return self.finish(session.chat_id, views::result(text)).await;
        }
        info!(chat_id = session.chat_id, ad_id = id, "Ad retired");
        self.finish(session.chat_id, views::result(format!("✅ Объявление #{id} снято с биржи.")))
            .await?;
        self.notify_owner(&session.draft, &owner::retired(&session.draft, &self.options.help_link))
            .await;
        Ok(())
    }

    pub(super) async fn publish_ad(&self, session: Session, now: DateTime<Utc>) -> EngineResult {
        let id = session.draft.id;
        let Some(mut ad) = self.records.find_ad_by_id(id).await? else {
            let text = format!("❌ Объявление #{id} не найдено.");
            return self.finish(session.chat_id, views::result(text)).await;
        };
        if ad.is_premium && ad.status != AdStatus::Active {
            let active = rules::check_premium_capacity(self.records.as_ref(), Some(id)).await?;
            if let Err(e) = rules::ensure_premium_slot(active) {
                return self.reprompt(session, &e.to_string(), now).await;
            }
        }
        rules::publish(&mut ad, now);
        self.records.save_ad(&ad).await?;
        info!(chat_id = session.chat_id, ad_id = id, "Ad published");
        self.finish(
            session.chat_id,
            views::result(format!("✅ Объявление #{id} выложено на биржу.")),
        )
        .await?;
        self.notify_owner(&ad, &owner::republished(&ad, &self.options.help_link))
            .await;
        Ok(())
    }

    pub(super) async fn renew_ad(&self, session: Session, days: u32, now: DateTime<Utc>) -> EngineResult {
        let id = session.draft.id;
        let Some(mut ad) = self.records.find_ad_by_id(id).await? else {
            let text = format!("❌ Объявление #{id} не найдено.");
            return self.finish(session.chat_id, views::result(text)).await;
        };
        if let Err(e) = rules::renew(&mut ad, days, now) {
            return self.reprompt(session, &e.to_string(), now).await;
        }
        self.records.save_ad(&ad).await?;
        let until = ad.expires_at.map_or_else(String::new, views::format_date);
        info!(chat_id = session.chat_id, ad_id = id, days, "Ad renewed");
        self.finish(
            session.chat_id,
            views::result(format!("✅ Объявление #{id} продлено до {until}.")),
        )
        .await?;
        self.notify_owner(&ad, &owner::renewed(&ad)).await;
        Ok(())
    }

    /// Look the ads of a client up
    pub(super) async fn search(&self, chat_id: i64, client_id: &str, now: DateTime<Utc>) -> EngineResult {
        let ads = self.records.find_ads_by_client_id(client_id).await?;
        info!(chat_id, client_id, found = ads.len(), "Ad search");
        match ads.as_slice() {
            [] => {
                let text = format!("❌ Объявления для клиента ID {client_id} не найдены.");
                self.finish(chat_id, views::result(text)).await
            }
            [ad] => self.open_action_menu(chat_id, ad.id, now).await,
            _ => {
                let draft = Ad {
                    client_id: client_id.to_string(),
                    ..Ad::default()
                };
                let session = Session::new(chat_id, Operation::Edit, Stage::AwaitSelectAd, draft, now);
                self.sessions.begin(session.clone()).await;
                self.present(session, views::search_results(&ads)).await
            }
        }
    }

    pub(super) async fn show_blacklist_menu(&self, chat_id: i64, now: DateTime<Utc>) -> EngineResult {
        self.sessions.begin(Session::idle(chat_id, now)).await;
        self.present(Session::idle(chat_id, now), views::blacklist_menu())
            .await
    }

    pub(super) async fn show_blacklist(&self, chat_id: i64, now: DateTime<Utc>) -> EngineResult {
        let usernames = self.records.list_blacklist().await?;
        self.sessions.begin(Session::idle(chat_id, now)).await;
        self.present(Session::idle(chat_id, now), views::blacklist_list(&usernames))
            .await
    }

    pub(super) async fn apply_blacklist(&self, chat_id: i64, username: &str, add: bool) -> EngineResult {
        let changed = self.records.set_blacklist_flag(username, add).await?;
        info!(chat_id, username, add, changed, "Blacklist updated");
        let username = escape_html(username);
        let text = match (add, changed) {
            (true, _) => format!("✅ @{username} добавлен в чёрный список."),
            (false, true) => format!("✅ @{username} удалён из чёрного списка."),
            (false, false) => format!("ℹ️ @{username} не найден в чёрном списке."),
        };
        self.finish(chat_id, views::result(text)).await
    }
}
