//! Category vocabulary registry.
//!
//! Every category owns an ordered list of modes and tags. Each entry pairs
//! the stored value with the Russian label shown on buttons; lookups work in
//! both directions from the same table.

/// A value/label pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub value: &'static str,
    pub label: &'static str,
}

const fn entry(value: &'static str, label: &'static str) -> Entry {
    Entry { value, label }
}

/// A category with its modes and tags
#[derive(Debug, PartialEq, Eq)]
pub struct Category {
    pub value: &'static str,
    pub label: &'static str,
    pub modes: &'static [Entry],
    pub tags: &'static [Entry],
}

/// Value of the catch-all category that has a single implicit mode
pub const OTHER_CATEGORY: &str = "other";

/// All categories in display order
pub static CATEGORIES: &[Category] = &[
    Category {
        value: "services",
        label: "Услуги",
        modes: &[entry("offer", "Предлагаю услугу"), entry("search", "Ищу услугу")],
        tags: &[
            entry("all", "Все"),
            entry("designer", "Дизайнер"),
            entry("script", "Сценарист"),
            entry("voice", "Озвучивание"),
            entry("other", "Другое"),
        ],
    },
    Category {
        value: "buysell",
        label: "Купля/Продажа",
        modes: &[entry("sell", "Продаю"), entry("buy", "Покупаю")],
        tags: &[
            entry("all", "Все"),
            entry("konechka", "Конечка"),
            entry("channel", "Канал"),
            entry("video", "Видео"),
            entry("adsense", "Адсенс"),
            entry("templates", "Шаблоны"),
        ],
    },
    Category {
        value: OTHER_CATEGORY,
        label: "Другое",
        modes: &[entry("general", "Объявление")],
        tags: &[
            entry("all", "Все"),
            entry("education", "Обучение"),
            entry("courses", "Курсы"),
            entry("cheats", "Читы"),
            entry("mods", "Моды"),
            entry("niche", "Ниша"),
            entry("schemes", "Схемы"),
            entry("boost", "Накрутка"),
        ],
    },
];

/// Looks a category up by its stored value
#[must_use]
pub fn category(value: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.value == value)
}

/// Looks a category up by its label
#[must_use]
pub fn category_by_label(label: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.label == label)
}

/// Label of a category value, falling back to the raw value
#[must_use]
pub fn category_label(value: &str) -> &str {
    category(value).map_or(value, |c| c.label)
}

/// Label of a mode within a category, falling back to the raw value
#[must_use]
pub fn mode_label<'a>(category_value: &str, mode: &'a str) -> &'a str {
    category(category_value)
        .and_then(|c| c.mode(mode))
        .map_or(mode, |e| e.label)
}

/// Label of a tag within a category, falling back to the raw value
#[must_use]
pub fn tag_label<'a>(category_value: &str, tag: &'a str) -> &'a str {
    category(category_value)
        .and_then(|c| c.tag(tag))
        .map_or(tag, |e| e.label)
}

fn by_value(entries: &'static [Entry], value: &str) -> Option<&'static Entry> {
    entries.iter().find(|e| e.value == value)
}

fn by_label(entries: &'static [Entry], label: &str) -> Option<&'static Entry> {
    entries.iter().find(|e| e.label == label)
}

impl Category {
    /// Mode entry by value
    #[must_use]
    pub fn mode(&self, value: &str) -> Option<&'static Entry> {
        by_value(self.modes, value)
    }

    /// Mode entry by label
    #[must_use]
    pub fn mode_by_label(&self, label: &str) -> Option<&'static Entry> {
        by_label(self.modes, label)
    }

    /// Tag entry by value
    #[must_use]
    pub fn tag(&self, value: &str) -> Option<&'static Entry> {
        by_value(self.tags, value)
    }

    /// Tag entry by label
    #[must_use]
    pub fn tag_by_label(&self, label: &str) -> Option<&'static Entry> {
        by_label(self.tags, label)
    }

    /// The only mode of a single-mode category; such categories skip mode selection
    #[must_use]
    pub fn implicit_mode(&self) -> Option<&'static Entry> {
        match self.modes {
            [only] => Some(only),
            _ => None,
        }
    }
}
