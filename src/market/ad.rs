use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Record store identifier of an ad
pub type AdId = i64;

/// Maximum title length in characters
pub const TITLE_MAX_CHARS: usize = 128;
/// Maximum description length in characters
pub const DESCRIPTION_MAX_CHARS: usize = 2048;

/// Publication status of an ad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdStatus {
    /// Listed on the marketplace
    #[default]
    Active,
    /// Validity window ran out
    Expired,
    /// Taken down by a manager
    Inactive,
}

impl AdStatus {
    /// Storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for AdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("unknown ad status: {other}")),
        }
    }
}

/// A classified ad.
///
/// Doubles as the draft assembled by a dialogue session; `id == 0` means
/// the ad has not been persisted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ad {
    pub id: AdId,
    /// Chat id of the end user who owns the ad, `0` when unknown
    pub user_id: i64,
    /// Free-text client identifier, usually the owner's chat id
    pub client_id: String,
    /// Contact handle without the leading `@`, may be empty
    pub username: String,
    pub title: String,
    pub description: String,
    /// Telegram file id of the photo, empty when there is none
    pub photo_id: String,
    /// Telegram file path of the photo, empty when there is none
    pub photo_path: String,
    pub category: String,
    pub mode: String,
    pub tag: String,
    pub is_premium: bool,
    pub status: AdStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub pre_expiry_notified: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Ad {
    /// Whether the ad has been written to the record store
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.id != 0
    }

    /// Whether the stored expiry is at or before `now`
    #[must_use]
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at <= now)
    }

    /// Whether the ad currently occupies a premium slot
    #[must_use]
    pub fn holds_premium_slot(&self) -> bool {
        self.is_premium && self.status == AdStatus::Active
    }

    /// Clears the photo reference
    pub fn clear_photo(&mut self) {
        self.photo_id.clear();
        self.photo_path.clear();
    }
}
