//! Inline button payloads
//!
//! Every button the console shows carries one of these payloads. Parsing is
//! total: anything unrecognised becomes [`Callback::Unknown`].

use crate::market::AdId;
use std::fmt;

/// Decoded button payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    MainMenu,
    NewAd,
    FindAd,
    BlacklistMenu,
    BlacklistView,
    BlacklistAdd,
    BlacklistRemove,
    /// Open the action menu of an ad
    AdAction(AdId),
    /// Pick an ad from a search result list
    SelectAd(AdId),
    AdEdit,
    AdRenew,
    AdRemove,
    AdPublish,
    EditCategory,
    EditMode,
    EditTag,
    EditDuration,
    EditPremium,
    Category(String),
    Mode(String),
    Tag(String),
    Duration(u32),
    RenewDuration(u32),
    Premium(bool),
    SaveFromSettings,
    ConfirmYes,
    ConfirmNo,
    EditAfterPreview,
    Back,
    SkipPhoto,
    SkipUserId,
    KeepUserId,
    SkipUsername,
    Unknown(String),
}

impl Callback {
    /// Decode a payload
    #[must_use]
    pub fn parse(payload: &str) -> Self {
        if let Some(fixed) = Self::parse_fixed(payload) {
            return fixed;
        }
        Self::parse_prefixed(payload).unwrap_or_else(|| Self::Unknown(payload.to_string()))
    }

    fn parse_fixed(payload: &str) -> Option<Self> {
        let callback = match payload {
            "menu_main" => Self::MainMenu,
            "menu_new_ad" => Self::NewAd,
            "menu_find_ad" => Self::FindAd,
            "menu_blacklist" => Self::BlacklistMenu,
            "blacklist_view" => Self::BlacklistView,
            "blacklist_add" => Self::BlacklistAdd,
            "blacklist_remove" => Self::BlacklistRemove,
            "ad_edit" => Self::AdEdit,
            "ad_renew" => Self::AdRenew,
            "ad_remove" => Self::AdRemove,
            "ad_publish" => Self::AdPublish,
            // Editor entries share the prefixes of the value payloads below
            "category_edit" => Self::EditCategory,
            "mode_edit" => Self::EditMode,
            "tag_edit" => Self::EditTag,
            "duration_edit" => Self::EditDuration,
            "premium_edit" => Self::EditPremium,
            "premium_yes" => Self::Premium(true),
            "premium_no" => Self::Premium(false),
            "save_from_settings" => Self::SaveFromSettings,
            "confirm_yes" => Self::ConfirmYes,
            "confirm_no" => Self::ConfirmNo,
            "edit_after_preview" => Self::EditAfterPreview,
            "back" => Self::Back,
            "skip_photo" => Self::SkipPhoto,
            "skip_user_id" => Self::SkipUserId,
            "keep_user_id" => Self::KeepUserId,
            "skip_username" => Self::SkipUsername,
            _ => return None,
        };
        Some(callback)
    }

    fn parse_prefixed(payload: &str) -> Option<Self> {
        if let Some(rest) = payload.strip_prefix("ad_action_") {
            return rest.parse().ok().map(Self::AdAction);
        }
        if let Some(rest) = payload.strip_prefix("select_ad_") {
            return rest.parse().ok().map(Self::SelectAd);
        }
        if let Some(rest) = payload.strip_prefix("renew_duration_") {
            return rest.parse().ok().map(Self::RenewDuration);
        }
        if let Some(rest) = payload.strip_prefix("duration_") {
            return rest.parse().ok().map(Self::Duration);
        }
        let value = |rest: &str| (!rest.is_empty()).then(|| rest.to_string());
        if let Some(rest) = payload.strip_prefix("category_") {
            return value(rest).map(Self::Category);
        }
        if let Some(rest) = payload.strip_prefix("mode_") {
            return value(rest).map(Self::Mode);
        }
        if let Some(rest) = payload.strip_prefix("tag_") {
            return value(rest).map(Self::Tag);
        }
        None
    }

    /// Encode back into a payload
    #[must_use]
    pub fn payload(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MainMenu => f.write_str("menu_main"),
            Self::NewAd => f.write_str("menu_new_ad"),
            Self::FindAd => f.write_str("menu_find_ad"),
            Self::BlacklistMenu => f.write_str("menu_blacklist"),
            Self::BlacklistView => f.write_str("blacklist_view"),
            Self::BlacklistAdd => f.write_str("blacklist_add"),
            Self::BlacklistRemove => f.write_str("blacklist_remove"),
            Self::AdAction(id) => write!(f, "ad_action_{id}"),
            Self::SelectAd(id) => write!(f, "select_ad_{id}"),
            Self::AdEdit => f.write_str("ad_edit"),
            Self::AdRenew => f.write_str("ad_renew"),
            Self::AdRemove => f.write_str("ad_remove"),
            Self::AdPublish => f.write_str("ad_publish"),
            Self::EditCategory => f.write_str("category_edit"),
            Self::EditMode => f.write_str("mode_edit"),
            Self::EditTag => f.write_str("tag_edit"),
            Self::EditDuration => f.write_str("duration_edit"),
            Self::EditPremium => f.write_str("premium_edit"),
            Self::Category(value) => write!(f, "category_{value}"),
            Self::Mode(value) => write!(f, "mode_{value}"),
            Self::Tag(value) => write!(f, "tag_{value}"),
            Self::Duration(days) => write!(f, "duration_{days}"),
            Self::RenewDuration(days) => write!(f, "renew_duration_{days}"),
            Self::Premium(true) => f.write_str("premium_yes"),
            Self::Premium(false) => f.write_str("premium_no"),
            Self::SaveFromSettings => f.write_str("save_from_settings"),
            Self::ConfirmYes => f.write_str("confirm_yes"),
            Self::ConfirmNo => f.write_str("confirm_no"),
            Self::EditAfterPreview => f.write_str("edit_after_preview"),
            Self::Back => f.write_str("back"),
            Self::SkipPhoto => f.write_str("skip_photo"),
            Self::SkipUserId => f.write_str("skip_user_id"),
            Self::KeepUserId => f.write_str("keep_user_id"),
            Self::SkipUsername => f.write_str("skip_username"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}
