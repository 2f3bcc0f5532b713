//! Prompt texts and keyboards of the manager console (Russian, HTML parse mode)
//!
//! Every function here is pure: it renders a [`Prompt`] from the session or
//! the ad it is given and never touches the transport.

use super::callbacks::Callback;
use super::transport::{Button, Keyboard};
use crate::market::rules::ALLOWED_DURATIONS;
use crate::market::vocabulary::{self, Entry};
use crate::market::{Ad, AdStatus};
use crate::session::{Operation, Session, Stage};
use crate::utils::{escape_html, truncate_str};
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Maximum number of ads listed in a search result
pub const SEARCH_LIST_MAX: usize = 10;
/// Maximum number of usernames listed in the blacklist view
pub const BLACKLIST_LIST_MAX: usize = 50;

const MARK: &str = "✅ ";
const BACK: &str = "◀️ Назад";
const TO_MENU: &str = "◀️ В меню";
const DATE_FORMAT: &str = "%d.%m.%Y";
const DATE_TIME_FORMAT: &str = "%d.%m.%Y %H:%M";
/// Escaped characters of a description shown in a card, leaving room for the
/// rest of the card under the message size limit
const DESCRIPTION_PREVIEW_BUDGET: usize = 2800;

/// Text plus inline keyboard of one bot message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Prompt {
    fn new(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    /// Message without buttons
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    /// Same prompt with an error line on top
    #[must_use]
    pub fn with_error(mut self, error: &str) -> Self {
        self.text = format!("❌ {}\n\n{}", escape_html(error), self.text);
        self
    }
}

fn mark(label: &str, selected: bool) -> String {
    if selected {
        format!("{MARK}{label}")
    } else {
        label.to_string()
    }
}

/// Escapes `text`, cutting the raw text so the escaped result fits `budget`
/// characters. The cut never lands inside an entity.
fn escape_within(text: &str, budget: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for (pos, ch) in text.char_indices() {
        let piece = escape_html(&text[pos..pos + ch.len_utf8()]);
        let width = piece.chars().count();
        if used + width > budget {
            out.push('…');
            break;
        }
        used += width;
        out.push_str(&piece);
    }
    out
}

/// Formats a date the way the console shows it
#[must_use]
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format(DATE_FORMAT).to_string()
}

/// Payload of the "back" button for the session's current stage
#[must_use]
pub fn back_payload(session: &Session) -> String {
    match (session.operation, session.stage) {
        (Operation::Edit, Stage::AwaitPhoto) => Callback::AdAction(session.draft.id).payload(),
        (_, Stage::AwaitPhoto) => Callback::MainMenu.payload(),
        _ => Callback::Back.payload(),
    }
}

fn back_button(session: &Session) -> Button {
    Button::new(BACK, back_payload(session))
}

/// Human-readable status of an ad
#[must_use]
pub const fn status_label(status: AdStatus) -> &'static str {
    match status {
        AdStatus::Active => "🟢 Активно",
        AdStatus::Expired => "🔴 Истекло",
        AdStatus::Inactive => "⚫ Снято",
    }
}

fn duration_label(days: u32) -> String {
    match days {
        1 => "1 день".to_string(),
        n => format!("{n} дней"),
    }
}

fn contact(ad: &Ad) -> String {
    if ad.username.is_empty() {
        "не указан".to_string()
    } else {
        format!("@{}", escape_html(&ad.username))
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "да"
    } else {
        "нет"
    }
}

/// Main menu
#[must_use]
pub fn main_menu() -> Prompt {
    let keyboard = Keyboard::new()
        .button("➕ Создать объявление", Callback::NewAd.payload())
        .button("🔍 Найти объявление", Callback::FindAd.payload())
        .button("🚫 Чёрный список", Callback::BlacklistMenu.payload());
    Prompt::new("📋 <b>Меню менеджера</b>\n\nВыберите действие:", keyboard)
}

/// Keyboard with a single "back to menu" button
#[must_use]
pub fn to_menu_keyboard() -> Keyboard {
    Keyboard::new().button(TO_MENU, Callback::MainMenu.payload())
}

/// Outcome of a terminal action, offering a way back to the menu
pub fn result(text: impl Into<String>) -> Prompt {
    Prompt::new(text, to_menu_keyboard())
}

/// Blacklist menu
#[must_use]
pub fn blacklist_menu() -> Prompt {
    let keyboard = Keyboard::new()
        .button("📋 Просмотр", Callback::BlacklistView.payload())
        .row(vec![
            Button::new("➕ Добавить", Callback::BlacklistAdd.payload()),
            Button::new("➖ Удалить", Callback::BlacklistRemove.payload()),
        ])
        .button(BACK, Callback::MainMenu.payload());
    Prompt::new("🚫 <b>Управление чёрным списком</b>", keyboard)
}

/// Username input for adding to or removing from the blacklist
#[must_use]
pub fn blacklist_input(add: bool) -> Prompt {
    let title = if add {
        "➕ <b>Добавить в чёрный список</b>"
    } else {
        "➖ <b>Удалить из чёрного списка</b>"
    };
    let keyboard = Keyboard::new().button(BACK, Callback::BlacklistMenu.payload());
    Prompt::new(
        format!("{title}\n\nОтправьте username (например: @username)"),
        keyboard,
    )
}

/// Alphabetical blacklist, capped
#[must_use]
pub fn blacklist_list(usernames: &[String]) -> Prompt {
    let keyboard = Keyboard::new().button(BACK, Callback::BlacklistMenu.payload());
    if usernames.is_empty() {
        return Prompt::new("📋 <b>Чёрный список пуст</b>", keyboard);
    }
    let mut text = String::from("📋 <b>Чёрный список:</b>\n\n");
    for username in usernames.iter().take(BLACKLIST_LIST_MAX) {
        let _ = writeln!(text, "• @{}", escape_html(username));
    }
    if usernames.len() > BLACKLIST_LIST_MAX {
        let _ = write!(
            text,
            "\n... и ещё {} пользователей",
            usernames.len() - BLACKLIST_LIST_MAX
        );
    }
    Prompt::new(text, keyboard)
}

/// Client id input of the search flow
#[must_use]
pub fn find_prompt() -> Prompt {
    Prompt::new(
        "🔍 <b>Найти объявления</b>\n\nОтправьте ID клиента (только цифры) или перешлите любое сообщение от пользователя:",
        Keyboard::new().button(BACK, Callback::MainMenu.payload()),
    )
}

/// List of several search hits, capped
#[must_use]
pub fn search_results(ads: &[Ad]) -> Prompt {
    let mut text = format!("📋 <b>Найдено объявлений: {}</b>\n\n", ads.len());
    let mut keyboard = Keyboard::new();
    for ad in ads.iter().take(SEARCH_LIST_MAX) {
        let _ = writeln!(
            text,
            "{}. {} - {}",
            ad.id,
            escape_html(&ad.title),
            status_label(ad.status)
        );
        keyboard = keyboard.button(
            format!("#{}: {}", ad.id, truncate_str(&ad.title, 30)),
            Callback::SelectAd(ad.id).payload(),
        );
    }
    if ads.len() > SEARCH_LIST_MAX {
        let _ = write!(text, "\n... и ещё {} объявлений", ads.len() - SEARCH_LIST_MAX);
    }
    Prompt::new(text, keyboard.button(BACK, Callback::MainMenu.payload()))
}

/// Full card of a stored ad
#[must_use]
pub fn ad_summary(ad: &Ad) -> String {
    let expiry = ad
        .expires_at
        .map_or_else(|| "не задан".to_string(), |at| at.format(DATE_TIME_FORMAT).to_string());
    format!(
        "📋 <b>Объявление #{id}</b>\n\n\
         📝 Заголовок: {title}\n\
         📄 Описание: {description}\n\
         👤 Контакт: {contact}\n\
         📂 Категория: {category}\n\
         🎯 Режим: {mode}\n\
         🏷 Тег: {tag}\n\
         ⭐ Премиум: {premium}\n\
         🆔 ID клиента: {client}\n\
         📊 Статус: {status}\n\
         ⏱ Действительно до: {expiry}",
        id = ad.id,
        title = escape_html(&ad.title),
        description = escape_within(&ad.description, DESCRIPTION_PREVIEW_BUDGET),
        contact = contact(ad),
        category = vocabulary::category_label(&ad.category),
        mode = vocabulary::mode_label(&ad.category, &ad.mode),
        tag = vocabulary::tag_label(&ad.category, &ad.tag),
        premium = yes_no(ad.is_premium),
        client = escape_html(&ad.client_id),
        status = status_label(ad.status),
    )
}

/// Card of a stored ad with the actions that apply to it
#[must_use]
pub fn action_menu(ad: &Ad, now: DateTime<Utc>) -> Prompt {
    let mut keyboard = Keyboard::new();
    if ad.status == AdStatus::Inactive || ad.is_past_expiry(now) {
        keyboard = keyboard.button("✅ Выложить", Callback::AdPublish.payload());
    }
    keyboard = keyboard.button("✏️ Изменить", Callback::AdEdit.payload());
    if ad.status == AdStatus::Active {
        keyboard = keyboard.row(vec![
            Button::new("🔄 Продлить", Callback::AdRenew.payload()),
            Button::new("❌ Снять", Callback::AdRemove.payload()),
        ]);
    }
    Prompt::new(
        ad_summary(ad),
        keyboard.button(BACK, Callback::MainMenu.payload()),
    )
}

/// Step 1: photo
#[must_use]
pub fn photo(session: &Session) -> Prompt {
    let text = if session.operation == Operation::Edit {
        "📸 <b>Шаг 1: Фото</b>\n\nОтправьте новое фото или пропустите этот шаг, чтобы оставить текущее."
    } else {
        "📸 <b>Шаг 1: Фото</b>\n\nОтправьте фото объявления или пропустите этот шаг."
    };
    let keyboard = Keyboard::new()
        .button("⏭ Пропустить", Callback::SkipPhoto.payload())
        .row(vec![back_button(session)]);
    Prompt::new(text, keyboard)
}

/// Step 2: title
#[must_use]
pub fn title(session: &Session) -> Prompt {
    let mut text = String::from("📝 <b>Шаг 2: Заголовок</b>\n\nВведите заголовок объявления (до 128 символов).");
    if !session.draft.title.is_empty() {
        let _ = write!(text, "\n\nТекущий: {}", escape_html(&session.draft.title));
    }
    Prompt::new(text, Keyboard::new().row(vec![back_button(session)]))
}

/// Step 3: description
#[must_use]
pub fn description(session: &Session) -> Prompt {
    let mut text = String::from("📄 <b>Шаг 3: Описание</b>\n\nВведите описание объявления.");
    if !session.draft.description.is_empty() {
        let current = truncate_str(&session.draft.description, 100);
        let _ = write!(text, "\n\nТекущее: {}", escape_html(&current));
    }
    Prompt::new(text, Keyboard::new().row(vec![back_button(session)]))
}

/// Step 4: owner id via forwarded message
#[must_use]
pub fn user_id(session: &Session) -> Prompt {
    let mut text = String::from(
        "🆔 <b>Шаг 4: ID пользователя</b>\n\nПерешлите любое сообщение от пользователя, чтобы автоматически получить его ID.\n\nИли нажмите «Пропустить», чтобы ввести ID вручную.",
    );
    let mut keyboard = Keyboard::new();
    if session.operation == Operation::Edit && !session.draft.client_id.is_empty() {
        let _ = write!(text, "\n\nТекущий ID: {}", escape_html(&session.draft.client_id));
        keyboard = keyboard.button("✅ Оставить текущий ID", Callback::KeepUserId.payload());
    }
    let keyboard = keyboard
        .button("⏭ Пропустить (указать ID вручную)", Callback::SkipUserId.payload())
        .row(vec![back_button(session)]);
    Prompt::new(text, keyboard)
}

/// Step 4, typed variant
#[must_use]
pub fn manual_user_id(session: &Session) -> Prompt {
    Prompt::new(
        "🆔 <b>Ввод ID клиента</b>\n\nВведите ID клиента вручную (только цифры):",
        Keyboard::new().row(vec![back_button(session)]),
    )
}

/// Contact handle detour after a forwarded message without one
#[must_use]
pub fn username(session: &Session) -> Prompt {
    let text = format!(
        "✅ ID пользователя получен: {}\n\n👤 <b>Введите username для контакта</b> (например: @username)\n\nИли нажмите «Пропустить», если username не нужен.",
        escape_html(&session.draft.client_id)
    );
    let keyboard = Keyboard::new()
        .button("⏭ Пропустить (без username)", Callback::SkipUsername.payload())
        .row(vec![back_button(session)]);
    Prompt::new(text, keyboard)
}

/// Step 5: category, current choice highlighted
#[must_use]
pub fn category(session: &Session) -> Prompt {
    let mut keyboard = Keyboard::new();
    for c in vocabulary::CATEGORIES {
        keyboard = keyboard.button(
            mark(c.label, session.draft.category == c.value),
            Callback::Category(c.value.to_string()).payload(),
        );
    }
    Prompt::new(
        "📂 <b>Шаг 5: Категория</b>\n\nВыберите категорию объявления.",
        keyboard.row(vec![back_button(session)]),
    )
}

fn entry_rows(entries: &[Entry], current: &str, to_callback: fn(String) -> Callback) -> Keyboard {
    let buttons: Vec<Button> = entries
        .iter()
        .map(|e| {
            Button::new(
                mark(e.label, current == e.value),
                to_callback(e.value.to_string()).payload(),
            )
        })
        .collect();
    buttons
        .chunks(2)
        .fold(Keyboard::new(), |keyboard, row| keyboard.row(row.to_vec()))
}

/// Step 6: mode of the chosen category
#[must_use]
pub fn mode(session: &Session) -> Prompt {
    let entries = vocabulary::category(&session.draft.category).map_or(&[][..], |c| c.modes);
    let keyboard = entry_rows(entries, &session.draft.mode, Callback::Mode);
    Prompt::new(
        "🎯 <b>Шаг 6: Режим</b>\n\nВыберите режим объявления.",
        keyboard.row(vec![back_button(session)]),
    )
}

/// Step 7: tag of the chosen category
#[must_use]
pub fn tag(session: &Session) -> Prompt {
    let entries = vocabulary::category(&session.draft.category).map_or(&[][..], |c| c.tags);
    let keyboard = entry_rows(entries, &session.draft.tag, Callback::Tag);
    Prompt::new(
        "🏷 <b>Шаг 7: Тег</b>\n\nВыберите тег объявления.",
        keyboard.row(vec![back_button(session)]),
    )
}

fn duration_keyboard(selected: u32, to_callback: fn(u32) -> Callback) -> Keyboard {
    let buttons: Vec<Button> = ALLOWED_DURATIONS
        .iter()
        .map(|days| {
            Button::new(
                mark(&duration_label(*days), selected == *days),
                to_callback(*days).payload(),
            )
        })
        .collect();
    buttons
        .chunks(2)
        .fold(Keyboard::new(), |keyboard, row| keyboard.row(row.to_vec()))
}

/// Step 8: validity window
#[must_use]
pub fn duration(session: &Session) -> Prompt {
    let keyboard = duration_keyboard(session.duration_days, Callback::Duration);
    Prompt::new(
        "⏱ <b>Шаг 8: Срок действия</b>\n\nВыберите срок отображения объявления.",
        keyboard.row(vec![back_button(session)]),
    )
}

/// Step 9: premium placement, with a warning when every slot is taken
#[must_use]
pub fn premium(session: &Session, active_premium: u32, cap: u32) -> Prompt {
    let mut text = String::from(
        "⭐ <b>Шаг 9: Премиум размещение</b>\n\nПремиум объявление будет отображаться вверху списка.",
    );
    if active_premium >= cap {
        let _ = write!(
            text,
            "\n\n⚠️ Лимит премиум-объявлений ({cap}) исчерпан. Сначала снимите одно из текущих."
        );
    }
    let keyboard = Keyboard::new()
        .row(vec![
            Button::new(mark("Да", session.draft.is_premium), Callback::Premium(true).payload()),
            Button::new(mark("Нет", !session.draft.is_premium), Callback::Premium(false).payload()),
        ])
        .row(vec![back_button(session)]);
    Prompt::new(text, keyboard)
}

fn pending_expiry(session: &Session, now: DateTime<Utc>) -> String {
    if session.duration_days > 0 {
        format_date(now + chrono::Duration::days(i64::from(session.duration_days)))
    } else {
        session
            .draft
            .expires_at
            .map_or_else(|| "не задан".to_string(), format_date)
    }
}

/// Preview of the draft before it is saved
#[must_use]
pub fn confirmation(session: &Session, now: DateTime<Utc>) -> Prompt {
    let ad = &session.draft;
    let photo = if ad.photo_id.is_empty() { "нет" } else { "есть" };
    let text = format!(
        "📋 <b>Предпросмотр объявления</b>\n\n\
         📝 Заголовок: {title}\n\
         📄 Описание: {description}\n\
         👤 Контакт: {contact}\n\
         📸 Фото: {photo}\n\
         📂 Категория: {category}\n\
         🎯 Режим: {mode}\n\
         🏷 Тег: {tag}\n\
         ⭐ Премиум: {premium}\n\
         🆔 ID клиента: {client}\n\
         ⏱ Действительно до: {expiry}\n\n\
         Подтвердите публикацию:",
        title = escape_html(&ad.title),
        description = escape_within(&ad.description, DESCRIPTION_PREVIEW_BUDGET),
        contact = contact(ad),
        category = vocabulary::category_label(&ad.category),
        mode = vocabulary::mode_label(&ad.category, &ad.mode),
        tag = vocabulary::tag_label(&ad.category, &ad.tag),
        premium = yes_no(ad.is_premium),
        client = escape_html(&ad.client_id),
        expiry = pending_expiry(session, now),
    );
    let keyboard = Keyboard::new()
        .row(vec![
            Button::new("✅ Подтвердить", Callback::ConfirmYes.payload()),
            Button::new("✏️ Изменить", Callback::EditAfterPreview.payload()),
        ])
        .row(vec![
            back_button(session),
            Button::new("✖️ Отмена", Callback::ConfirmNo.payload()),
        ]);
    Prompt::new(text, keyboard)
}

/// Bulk settings view reachable from the preview
#[must_use]
pub fn all_settings(session: &Session) -> Prompt {
    let ad = &session.draft;
    let implicit_mode = vocabulary::category(&ad.category)
        .and_then(vocabulary::Category::implicit_mode)
        .is_some();
    let mut text = String::from("⚙️ <b>Настройки объявления</b>\n\n");
    let _ = writeln!(text, "📂 Категория: {}", vocabulary::category_label(&ad.category));
    if !implicit_mode {
        let _ = writeln!(text, "🎯 Режим: {}", vocabulary::mode_label(&ad.category, &ad.mode));
    }
    let _ = writeln!(text, "🏷 Тег: {}", vocabulary::tag_label(&ad.category, &ad.tag));
    let _ = writeln!(text, "⭐ Премиум: {}", yes_no(ad.is_premium));
    let duration = if session.duration_days > 0 {
        format!("{} дн.", session.duration_days)
    } else {
        ad.expires_at.map_or_else(|| "не задан".to_string(), format_date)
    };
    let _ = write!(text, "⏱ Срок действия: {duration}\n\nВыберите, что хотите изменить:");

    let mut first_row = vec![Button::new("📂 Категория", Callback::EditCategory.payload())];
    if !implicit_mode {
        first_row.push(Button::new("🎯 Режим", Callback::EditMode.payload()));
    }
    let keyboard = Keyboard::new()
        .row(first_row)
        .row(vec![
            Button::new("🏷 Тег", Callback::EditTag.payload()),
            Button::new("⏱ Срок", Callback::EditDuration.payload()),
        ])
        .button("⭐ Премиум", Callback::EditPremium.payload())
        .button("✅ Сохранить", Callback::SaveFromSettings.payload())
        .row(vec![back_button(session)]);
    Prompt::new(text, keyboard)
}

/// Validity window for renewing a stored ad
#[must_use]
pub fn renew_duration(session: &Session) -> Prompt {
    let text = format!(
        "🔄 <b>Продление объявления #{}</b>\n\nВыберите новый срок действия.",
        session.draft.id
    );
    let keyboard =
        duration_keyboard(session.duration_days, Callback::RenewDuration).row(vec![back_button(session)]);
    Prompt::new(text, keyboard)
}

/// Notification texts addressed to ad owners
pub mod owner {
    use super::format_date;
    use crate::market::Ad;
    use crate::utils::escape_html;

    fn expiry(ad: &Ad) -> String {
        ad.expires_at.map_or_else(|| "—".to_string(), format_date)
    }

    /// A new or edited ad went live
    #[must_use]
    pub fn published(ad: &Ad, help_link: &str) -> String {
        format!(
            "✅ Ваше объявление «{}» опубликовано до {}.\n\nДля управления обратитесь к {}.",
            escape_html(&ad.title),
            expiry(ad),
            escape_html(help_link)
        )
    }

    /// A stored ad was put back on the marketplace
    #[must_use]
    pub fn republished(ad: &Ad, help_link: &str) -> String {
        format!(
            "Ваше объявление «{}» выложено на биржу. Свяжитесь с {} для управления.",
            escape_html(&ad.title),
            escape_html(help_link)
        )
    }

    /// The validity window was restarted
    #[must_use]
    pub fn renewed(ad: &Ad) -> String {
        format!(
            "Ваше объявление «{}» продлено до {}.",
            escape_html(&ad.title),
            expiry(ad)
        )
    }

    /// A manager took the ad down
    #[must_use]
    pub fn retired(ad: &Ad, help_link: &str) -> String {
        format!(
            "Ваше объявление «{}» снято с биржи. Свяжитесь с {}, если хотите разместить его снова.",
            escape_html(&ad.title),
            escape_html(help_link)
        )
    }

    /// Expiry is near
    #[must_use]
    pub fn reminder(ad: &Ad, help_link: &str) -> String {
        format!(
            "Напоминание: срок действия вашего объявления «{}» истекает {}. Свяжитесь с {}, чтобы продлить размещение.",
            escape_html(&ad.title),
            expiry(ad),
            escape_html(help_link)
        )
    }

    /// Expiry passed
    #[must_use]
    pub fn expired(ad: &Ad, help_link: &str) -> String {
        format!(
            "Ваше объявление «{}» больше не отображается на бирже. Свяжитесь с {}, чтобы поднять его снова.",
            escape_html(&ad.title),
            escape_html(help_link)
        )
    }
}
