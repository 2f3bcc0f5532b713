use chrono::{DateTime, Duration, Utc};
use market_desk::bot::janitor::{CleanupTiming, MessageJanitor};
use market_desk::bot::transport::{ChatTransport, InboundEvent};
use market_desk::engine::{ConversationEngine, EngineOptions};
use market_desk::market::{Ad, AdStatus};
use market_desk::session::{Operation, Session, SessionStore, Stage};
use market_desk::store::{AdFieldUpdate, InMemoryRecordStore, RecordStore, StoreError};
use market_desk::testing::{RecordingTransport, SentMessage};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const MANAGER: i64 = 42;
const OWNER: i64 = 12345;

struct Desk {
    engine: ConversationEngine,
    transport: Arc<RecordingTransport>,
    records: Arc<InMemoryRecordStore>,
    sessions: Arc<SessionStore>,
    janitor: Arc<MessageJanitor>,
    next_inbound: i32,
    now: DateTime<Utc>,
}

impl Desk {
    fn new() -> Self {
        let transport = Arc::new(RecordingTransport::new());
        let records = Arc::new(InMemoryRecordStore::new());
        let sessions = Arc::new(SessionStore::new());
        let chat: Arc<dyn ChatTransport> = transport.clone();
        let store: Arc<dyn RecordStore> = records.clone();
        let janitor = Arc::new(MessageJanitor::new(
            Arc::clone(&chat),
            Arc::clone(&sessions),
            CleanupTiming::immediate(),
            CancellationToken::new(),
        ));
        let engine = ConversationEngine::new(
            chat,
            store,
            Arc::clone(&sessions),
            Arc::clone(&janitor),
            EngineOptions {
                managers: HashSet::from([MANAGER]),
                help_link: "@desk_help".to_string(),
                bot_username: "desk_bot".to_string(),
            },
        );
        Self {
            engine,
            transport,
            records,
            sessions,
            janitor,
            next_inbound: 10_000,
            now: Utc::now(),
        }
    }

    fn inbound_id(&mut self) -> i32 {
        self.next_inbound += 1;
        self.next_inbound
    }

    async fn text(&mut self, text: &str) {
        let event = InboundEvent::text(MANAGER, self.inbound_id(), text);
        self.engine.handle_at(event, self.now).await;
    }

    async fn press(&mut self, payload: &str) {
        let pressed = self.last_prompt().await.message_id;
        let event = InboundEvent::button(MANAGER, pressed, payload);
        self.engine.handle_at(event, self.now).await;
    }

    async fn forward(&mut self, user_id: Option<i64>, username: Option<&str>) {
        let event = InboundEvent::forwarded(
            MANAGER,
            self.inbound_id(),
            user_id,
            username.map(str::to_string),
        );
        self.engine.handle_at(event, self.now).await;
    }

    async fn session(&self) -> Session {
        let Some(session) = self.sessions.get(MANAGER).await else {
            panic!("manager chat has no session");
        };
        session
    }

    async fn stage(&self) -> Stage {
        self.session().await.stage
    }

    async fn last_prompt(&self) -> SentMessage {
        let Some(message) = self.transport.last_sent_to(MANAGER).await else {
            panic!("nothing was sent to the manager");
        };
        message
    }

    async fn press_menu_find(&mut self) {
        self.text("/menu").await;
        self.press("menu_find_ad").await;
    }

    /// Runs a create flow up to the premium step
    async fn fill_until_premium(&mut self, category: &str, mode: Option<&str>, tag: &str) {
        self.text("/newad").await;
        self.press("skip_photo").await;
        self.text("Selling channel").await;
        self.text("50k subs").await;
        self.forward(Some(OWNER), Some("seller")).await;
        self.press(&format!("category_{category}")).await;
        if let Some(mode) = mode {
            self.press(&format!("mode_{mode}")).await;
        }
        self.press(&format!("tag_{tag}")).await;
        self.press("duration_7").await;
    }
}

fn premium_ad(client: &str) -> Ad {
    Ad {
        client_id: client.to_string(),
        title: format!("Premium {client}"),
        description: "featured".to_string(),
        category: "buysell".to_string(),
        mode: "sell".to_string(),
        tag: "all".to_string(),
        is_premium: true,
        status: AdStatus::Active,
        expires_at: Some(Utc::now() + Duration::days(5)),
        ..Ad::default()
    }
}

#[tokio::test]
async fn forwarded_owner_without_handle_detours_through_username() {
    let mut desk = Desk::new();
    desk.text("/newad").await;
    assert_eq!(desk.stage().await, Stage::AwaitPhoto);
    assert_eq!(desk.session().await.operation, Operation::Create);

    desk.press("skip_photo").await;
    desk.text("Selling channel").await;
    desk.text("50k subs").await;
    assert_eq!(desk.stage().await, Stage::AwaitUserId);

    desk.forward(Some(OWNER), None).await;
    assert_eq!(desk.stage().await, Stage::AwaitUsername);

    desk.press("skip_username").await;
    let session = desk.session().await;
    assert_eq!(session.stage, Stage::AwaitCategory);
    assert_eq!(session.draft.title, "Selling channel");
    assert_eq!(session.draft.description, "50k subs");
    assert_eq!(session.draft.client_id, "12345");
    assert_eq!(session.draft.user_id, OWNER);
    assert!(session.draft.username.is_empty());
}

#[tokio::test]
async fn forwarded_owner_with_handle_goes_straight_to_category() {
    let mut desk = Desk::new();
    desk.text("/newad").await;
    desk.press("skip_photo").await;
    desk.text("Title").await;
    desk.text("Description").await;
    desk.forward(Some(OWNER), Some("seller")).await;

    let session = desk.session().await;
    assert_eq!(session.stage, Stage::AwaitCategory);
    assert_eq!(session.draft.username, "seller");
}

#[tokio::test]
async fn typed_user_id_must_be_numeric() {
    let mut desk = Desk::new();
    desk.text("/newad").await;
    desk.press("skip_photo").await;
    desk.text("Title").await;
    desk.text("Description").await;
    desk.press("skip_user_id").await;
    assert!(desk.last_prompt().await.text.contains("Введите ID клиента вручную"));

    desk.text("not a number").await;
    assert_eq!(desk.stage().await, Stage::AwaitUserId);
    assert!(desk.last_prompt().await.text.contains("должен быть числом"));

    desk.text("777").await;
    let session = desk.session().await;
    assert_eq!(session.stage, Stage::AwaitUsername);
    assert_eq!(session.draft.user_id, 777);

    desk.text("@owner_777").await;
    let session = desk.session().await;
    assert_eq!(session.stage, Stage::AwaitCategory);
    assert_eq!(session.draft.username, "owner_777");
}

#[tokio::test]
async fn premium_respects_the_cap() -> Result<(), StoreError> {
    let mut desk = Desk::new();
    desk.records.create_ad(&premium_ad("1")).await?;
    desk.records.create_ad(&premium_ad("2")).await?;

    desk.fill_until_premium("buysell", Some("sell"), "channel").await;
    assert_eq!(desk.stage().await, Stage::AwaitPremium);
    desk.press("premium_yes").await;
    let session = desk.session().await;
    assert_eq!(session.stage, Stage::AwaitConfirmation);
    assert!(session.draft.is_premium);

    desk.press("confirm_yes").await;
    assert!(desk.sessions.get(MANAGER).await.is_none());
    assert_eq!(desk.records.count_active_premium(None).await?, 3);
    assert!(desk.last_prompt().await.text.contains("опубликовано"));
    let Some(stored) = desk.records.find_ad_by_id(3).await? else {
        panic!("ad was not stored");
    };
    assert_eq!(stored.user_id, OWNER);
    assert_eq!(stored.expires_at, Some(desk.now + Duration::days(7)));

    // The owner heard about it
    let notices = desk.transport.sent_to(OWNER).await;
    assert_eq!(notices.len(), 1);
    assert!(notices[0].text.contains("опубликовано"));
    assert!(notices[0].text.contains("@desk_help"));

    desk.fill_until_premium("buysell", Some("buy"), "video").await;
    desk.press("premium_yes").await;
    let session = desk.session().await;
    assert_eq!(session.stage, Stage::AwaitPremium);
    assert!(!session.draft.is_premium);
    assert!(desk.last_prompt().await.text.starts_with("❌ лимит премиум-объявлений (3)"));
    Ok(())
}

#[tokio::test]
async fn back_from_mode_highlights_chosen_category() {
    let mut desk = Desk::new();
    desk.text("/newad").await;
    desk.press("skip_photo").await;
    desk.text("Title").await;
    desk.text("Description").await;
    desk.forward(Some(OWNER), Some("seller")).await;
    desk.press("category_buysell").await;
    assert_eq!(desk.stage().await, Stage::AwaitMode);

    desk.press("back").await;
    assert_eq!(desk.stage().await, Stage::AwaitCategory);
    let Some(keyboard) = desk.last_prompt().await.keyboard else {
        panic!("category prompt without keyboard");
    };
    assert_eq!(keyboard.label_for("category_buysell"), Some("✅ Купля/Продажа"));
    assert_eq!(keyboard.label_for("category_services"), Some("Услуги"));
}

#[tokio::test]
async fn other_category_skips_mode() {
    let mut desk = Desk::new();
    desk.text("/newad").await;
    desk.press("skip_photo").await;
    desk.text("Title").await;
    desk.text("Description").await;
    desk.forward(Some(OWNER), Some("seller")).await;
    desk.press("category_other").await;

    let session = desk.session().await;
    assert_eq!(session.stage, Stage::AwaitTag);
    assert_eq!(session.draft.mode, "general");
    let mode_prompts = desk
        .transport
        .sent_to(MANAGER)
        .await
        .into_iter()
        .filter(|m| m.text.contains("Шаг 6"))
        .count();
    assert_eq!(mode_prompts, 0);

    desk.press("back").await;
    assert_eq!(desk.stage().await, Stage::AwaitCategory);
}

#[tokio::test]
async fn invalid_duration_is_rejected() {
    let mut desk = Desk::new();
    desk.text("/newad").await;
    desk.press("skip_photo").await;
    desk.text("Title").await;
    desk.text("Description").await;
    desk.forward(Some(OWNER), Some("seller")).await;
    desk.press("category_other").await;
    desk.press("tag_all").await;
    assert_eq!(desk.stage().await, Stage::AwaitDuration);

    desk.press("duration_5").await;
    let session = desk.session().await;
    assert_eq!(session.stage, Stage::AwaitDuration);
    assert_eq!(session.duration_days, 0);
    assert!(desk.last_prompt().await.text.contains("недопустимый срок: 5"));
}

#[tokio::test]
async fn stale_buttons_reprompt_without_advancing() {
    let mut desk = Desk::new();
    desk.text("/newad").await;
    desk.press("skip_photo").await;
    let sent_before = desk.transport.sent().await.len();

    desk.press("category_buysell").await;
    desk.press("confirm_yes").await;
    assert_eq!(desk.stage().await, Stage::AwaitTitle);
    assert_eq!(desk.transport.sent().await.len(), sent_before + 2);
    let prompt = desk.last_prompt().await;
    assert!(prompt.text.starts_with("❌ Эта кнопка больше не актуальна."));
    assert!(prompt.text.contains("Шаг 2"));
    assert_eq!(desk.records.ad_count().await, 0);
}

#[tokio::test]
async fn buttons_without_a_session_are_dropped() {
    let mut desk = Desk::new();
    let event = InboundEvent::button(MANAGER, 1, "confirm_yes");
    desk.engine.handle_at(event, desk.now).await;
    assert!(desk.transport.sent().await.is_empty());
    desk.text("/menu").await;
    assert_eq!(desk.transport.sent().await.len(), 1);
}

#[tokio::test]
async fn events_from_other_chats_are_ignored() {
    let desk = Desk::new();
    let stranger = InboundEvent::text(777, 1, "/newad");
    desk.engine.handle_at(stranger, desk.now).await;
    assert!(desk.transport.sent().await.is_empty());
    assert!(desk.sessions.is_empty().await);
}

#[tokio::test]
async fn category_change_from_settings_walks_through_missing_fields() {
    let mut desk = Desk::new();
    desk.fill_until_premium("buysell", Some("sell"), "channel").await;
    desk.press("premium_no").await;
    desk.press("edit_after_preview").await;
    assert_eq!(desk.stage().await, Stage::AwaitAllSettings);

    desk.press("category_edit").await;
    desk.press("category_services").await;
    let session = desk.session().await;
    assert_eq!(session.stage, Stage::AwaitMode);
    assert!(session.draft.tag.is_empty());

    desk.press("mode_offer").await;
    assert_eq!(desk.stage().await, Stage::AwaitTag);
    desk.press("tag_designer").await;
    let session = desk.session().await;
    assert_eq!(session.stage, Stage::AwaitAllSettings);
    assert!(!session.from_settings);
    assert_eq!(
        (session.draft.category.as_str(), session.draft.mode.as_str(), session.draft.tag.as_str()),
        ("services", "offer", "designer")
    );

    // Single-field editors return to settings right away
    desk.press("duration_edit").await;
    desk.press("duration_30").await;
    let session = desk.session().await;
    assert_eq!(session.stage, Stage::AwaitAllSettings);
    assert_eq!(session.duration_days, 30);
}

#[tokio::test]
async fn search_then_retire() -> Result<(), StoreError> {
    let mut desk = Desk::new();
    let id = desk
        .records
        .create_ad(&Ad {
            user_id: 555,
            ..premium_ad("555")
        })
        .await?;

    desk.text("/menu").await;
    desk.press("menu_find_ad").await;
    desk.text("abc").await;
    assert_eq!(desk.stage().await, Stage::AwaitFindAdId);

    desk.text("555").await;
    assert_eq!(desk.stage().await, Stage::AwaitAction);
    let prompt = desk.last_prompt().await;
    assert!(prompt.text.contains(&format!("Объявление #{id}")));
    assert!(prompt.payloads().contains(&"ad_remove".to_string()));

    desk.press("ad_remove").await;
    assert!(desk.sessions.get(MANAGER).await.is_none());
    let Some(stored) = desk.records.find_ad_by_id(id).await? else {
        panic!("retired ad must be kept");
    };
    assert_eq!(stored.status, AdStatus::Inactive);
    assert_eq!(desk.transport.sent_to(555).await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn search_without_results_clears_session() {
    let mut desk = Desk::new();
    desk.press_menu_find().await;
    desk.text("999").await;
    assert!(desk.sessions.get(MANAGER).await.is_none());
    assert!(desk.last_prompt().await.text.contains("не найдены"));
}

#[tokio::test]
async fn forwarded_message_outside_dialogue_searches_owner() -> Result<(), StoreError> {
    let mut desk = Desk::new();
    desk.records.create_ad(&premium_ad("12345")).await?;
    desk.records.create_ad(&premium_ad("12345")).await?;

    desk.forward(Some(OWNER), None).await;
    let session = desk.session().await;
    assert_eq!(session.stage, Stage::AwaitSelectAd);
    let payloads = desk.last_prompt().await.payloads();
    assert_eq!(payloads, vec!["select_ad_2", "select_ad_1", "menu_main"]);

    desk.press("select_ad_1").await;
    assert_eq!(desk.stage().await, Stage::AwaitAction);
    Ok(())
}

#[tokio::test]
async fn unknown_ad_command_reports_not_found() {
    let mut desk = Desk::new();
    desk.text("/ad 999").await;
    assert!(desk.sessions.get(MANAGER).await.is_none());
    assert!(desk.last_prompt().await.text.contains("#999 не найдено"));
}

#[tokio::test]
async fn blacklist_add_and_view() -> Result<(), StoreError> {
    let mut desk = Desk::new();
    desk.text("/menu").await;
    desk.press("menu_blacklist").await;
    desk.press("blacklist_add").await;
    assert_eq!(desk.stage().await, Stage::AwaitBlacklistAdd);

    desk.text("not a handle!").await;
    assert_eq!(desk.stage().await, Stage::AwaitBlacklistAdd);

    desk.text("@Scammer_1").await;
    assert!(desk.sessions.get(MANAGER).await.is_none());
    assert_eq!(desk.records.list_blacklist().await?, vec!["Scammer_1".to_string()]);

    desk.press("blacklist_view").await;
    assert!(desk.last_prompt().await.text.contains("@Scammer_1"));

    desk.press("blacklist_remove").await;
    desk.text("nobody").await;
    assert!(desk.last_prompt().await.text.contains("не найден"));
    Ok(())
}

#[tokio::test]
async fn stale_prompts_and_manager_messages_are_cleaned_up() {
    let mut desk = Desk::new();
    desk.text("/newad").await;
    desk.press("skip_photo").await;
    desk.text("Title").await;
    desk.janitor.settle().await;

    let prompts: Vec<i32> = desk
        .transport
        .sent_to(MANAGER)
        .await
        .iter()
        .map(|m| m.message_id)
        .collect();
    let Some((current, older)) = prompts.split_last() else {
        panic!("no prompts were sent");
    };
    assert_eq!(desk.session().await.live_message_ids, vec![*current]);

    let deleted = desk.transport.deleted().await;
    for id in older {
        assert!(deleted.contains(&(MANAGER, *id)), "prompt {id} was not removed");
    }
    assert!(!deleted.contains(&(MANAGER, *current)));
    // Typed messages go too
    assert!(deleted.contains(&(MANAGER, 10_001)));
    assert!(deleted.contains(&(MANAGER, 10_002)));
}

#[tokio::test]
async fn photo_is_kept_on_the_draft() {
    let mut desk = Desk::new();
    desk.text("/newad").await;
    let event = InboundEvent::photo(MANAGER, desk.inbound_id(), "file-1", "photos/file_1.jpg");
    desk.engine.handle_at(event, desk.now).await;

    let session = desk.session().await;
    assert_eq!(session.stage, Stage::AwaitTitle);
    assert_eq!(session.draft.photo_id, "file-1");
    assert_eq!(session.draft.photo_path, "photos/file_1.jpg");
}

#[tokio::test]
async fn cancel_drops_the_dialogue() {
    let mut desk = Desk::new();
    desk.text("/newad").await;
    desk.press("skip_photo").await;
    desk.text("/cancel").await;
    assert_eq!(desk.stage().await, Stage::Idle);
    assert!(desk.last_prompt().await.text.contains("Меню менеджера"));
}

fn stored_ad() -> Ad {
    Ad {
        user_id: OWNER,
        client_id: OWNER.to_string(),
        username: "seller".to_string(),
        photo_id: "photo-old".to_string(),
        photo_path: "photos/old.jpg".to_string(),
        title: "Old title".to_string(),
        description: "Old description".to_string(),
        category: "buysell".to_string(),
        mode: "sell".to_string(),
        tag: "channel".to_string(),
        status: AdStatus::Active,
        expires_at: Some(Utc::now() + Duration::days(3)),
        ..Ad::default()
    }
}

#[tokio::test]
async fn edit_flow_keeps_photo_and_owner() -> Result<(), StoreError> {
    let mut desk = Desk::new();
    let id = desk.records.create_ad(&stored_ad()).await?;

    desk.text(&format!("/ad {id}")).await;
    assert_eq!(desk.stage().await, Stage::AwaitAction);
    desk.press("ad_edit").await;
    let session = desk.session().await;
    assert_eq!(session.stage, Stage::AwaitPhoto);
    assert_eq!(session.operation, Operation::Edit);

    // Back from the first step returns to the ad, not the main menu
    let back = format!("ad_action_{id}");
    assert!(desk.last_prompt().await.payloads().contains(&back));
    desk.press("back").await;
    assert_eq!(desk.stage().await, Stage::AwaitAction);
    assert!(desk.last_prompt().await.text.contains(&format!("Объявление #{id}")));

    desk.press("ad_edit").await;
    desk.press("skip_photo").await;
    assert_eq!(desk.session().await.draft.photo_id, "photo-old");
    desk.text("New title").await;
    desk.text("New description").await;
    assert_eq!(desk.stage().await, Stage::AwaitUserId);
    assert!(desk.last_prompt().await.payloads().contains(&"keep_user_id".to_string()));

    desk.press("keep_user_id").await;
    assert_eq!(desk.stage().await, Stage::AwaitCategory);
    desk.press("category_buysell").await;
    desk.press("mode_sell").await;
    desk.press("tag_channel").await;
    desk.press("duration_14").await;
    desk.press("premium_no").await;
    desk.press("confirm_yes").await;
    assert!(desk.sessions.get(MANAGER).await.is_none());
    assert!(desk.last_prompt().await.text.contains("обновлено"));

    let Some(stored) = desk.records.find_ad_by_id(id).await? else {
        panic!("edited ad disappeared");
    };
    assert_eq!(stored.title, "New title");
    assert_eq!(stored.description, "New description");
    assert_eq!(stored.photo_id, "photo-old");
    assert_eq!(stored.client_id, OWNER.to_string());
    assert_eq!(stored.username, "seller");
    assert_eq!(stored.expires_at, Some(desk.now + Duration::days(14)));
    // Edited in place
    assert_eq!(desk.records.ad_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn keep_user_id_needs_a_known_owner() {
    let mut desk = Desk::new();
    desk.text("/newad").await;
    desk.press("skip_photo").await;
    desk.text("Title").await;
    desk.text("Description").await;
    assert!(!desk.last_prompt().await.payloads().contains(&"keep_user_id".to_string()));

    desk.press("keep_user_id").await;
    let session = desk.session().await;
    assert_eq!(session.stage, Stage::AwaitUserId);
    assert!(session.draft.client_id.is_empty());
    assert!(desk.last_prompt().await.text.starts_with("❌ У объявления ещё нет ID клиента."));
}

#[tokio::test]
async fn publishing_inactive_premium_ad_rechecks_the_cap() -> Result<(), StoreError> {
    let mut desk = Desk::new();
    let mut blockers = Vec::new();
    for client in ["1", "2", "3"] {
        blockers.push(desk.records.create_ad(&premium_ad(client)).await?);
    }
    let id = desk
        .records
        .create_ad(&Ad {
            user_id: 777,
            status: AdStatus::Inactive,
            expires_at: Some(desk.now - Duration::days(1)),
            ..premium_ad("777")
        })
        .await?;

    desk.text(&format!("/ad {id}")).await;
    assert!(desk.last_prompt().await.payloads().contains(&"ad_publish".to_string()));
    desk.press("ad_publish").await;
    assert_eq!(desk.stage().await, Stage::AwaitAction);
    assert!(desk.last_prompt().await.text.starts_with("❌ лимит премиум-объявлений (3)"));
    let Some(stored) = desk.records.find_ad_by_id(id).await? else {
        panic!("ad disappeared");
    };
    assert_eq!(stored.status, AdStatus::Inactive);

    desk.records
        .update_ad_fields(blockers[0], AdFieldUpdate::status_reset(AdStatus::Inactive))
        .await?;
    desk.press("ad_publish").await;
    assert!(desk.sessions.get(MANAGER).await.is_none());
    let Some(stored) = desk.records.find_ad_by_id(id).await? else {
        panic!("ad disappeared");
    };
    assert_eq!(stored.status, AdStatus::Active);
    assert_eq!(stored.expires_at, Some(desk.now + Duration::days(7)));
    assert_eq!(desk.records.count_active_premium(None).await?, 3);
    let notices = desk.transport.sent_to(777).await;
    assert_eq!(notices.len(), 1);
    assert!(notices[0].text.contains("выложено"));
    Ok(())
}

#[tokio::test]
async fn renew_goes_through_the_duration_prompt() -> Result<(), StoreError> {
    let mut desk = Desk::new();
    let mut ad = stored_ad();
    ad.pre_expiry_notified = true;
    let id = desk.records.create_ad(&ad).await?;

    desk.text(&format!("/ad {id}")).await;
    desk.press("ad_renew").await;
    assert_eq!(desk.stage().await, Stage::AwaitRenewDuration);
    assert!(desk.last_prompt().await.payloads().contains(&"renew_duration_30".to_string()));

    desk.press("renew_duration_5").await;
    assert_eq!(desk.stage().await, Stage::AwaitRenewDuration);
    assert!(desk.last_prompt().await.text.contains("недопустимый срок: 5"));

    desk.press("renew_duration_30").await;
    assert!(desk.sessions.get(MANAGER).await.is_none());
    assert!(desk.last_prompt().await.text.contains("продлено"));
    let Some(stored) = desk.records.find_ad_by_id(id).await? else {
        panic!("ad disappeared");
    };
    assert_eq!(stored.status, AdStatus::Active);
    assert_eq!(stored.expires_at, Some(desk.now + Duration::days(30)));
    assert!(!stored.pre_expiry_notified);
    assert_eq!(desk.transport.sent_to(OWNER).await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn empty_title_and_description_are_reprompted() {
    let mut desk = Desk::new();
    desk.text("/newad").await;
    desk.press("skip_photo").await;

    desk.text("   ").await;
    assert_eq!(desk.stage().await, Stage::AwaitTitle);
    assert!(desk.last_prompt().await.text.starts_with("❌ Заголовок не может быть пустым."));

    desk.text("Title").await;
    desk.text("  ").await;
    assert_eq!(desk.stage().await, Stage::AwaitDescription);
    assert!(desk.last_prompt().await.text.starts_with("❌ Описание не может быть пустым."));
}

#[tokio::test]
async fn long_title_and_description_are_cut() {
    let mut desk = Desk::new();
    desk.text("/newad").await;
    desk.press("skip_photo").await;

    desk.text(&"я".repeat(200)).await;
    let session = desk.session().await;
    assert_eq!(session.stage, Stage::AwaitDescription);
    assert_eq!(session.draft.title.chars().count(), 128);

    desk.text(&"d".repeat(3000)).await;
    let session = desk.session().await;
    assert_eq!(session.stage, Stage::AwaitUserId);
    assert_eq!(session.draft.description.chars().count(), 2048);
}
