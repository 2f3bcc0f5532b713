//! Manager dialogue sessions
//!
//! A session is the ephemeral state of one chat's conversation with the
//! console: which flow is running, where in it the manager is, and the ad
//! being assembled.

pub mod store;

use crate::market::Ad;
use chrono::{DateTime, Utc};
use std::fmt;

pub use store::SessionStore;

/// What the dialogue will do with the draft once it completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operation {
    /// Persist a brand-new ad
    #[default]
    Create,
    /// Overwrite an existing ad
    Edit,
    /// Restart the validity window of an existing ad
    Renew,
}

/// Node of the conversation state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Stage {
    /// A menu is on screen, no flow in progress
    #[default]
    Idle,
    AwaitAction,
    AwaitPhoto,
    AwaitTitle,
    AwaitDescription,
    AwaitUserId,
    AwaitUsername,
    AwaitCategory,
    AwaitMode,
    AwaitTag,
    AwaitDuration,
    AwaitPremium,
    AwaitConfirmation,
    AwaitAllSettings,
    AwaitRenewDuration,
    AwaitBlacklistAdd,
    AwaitBlacklistRemove,
    AwaitFindAdId,
    AwaitSelectAd,
}

impl Stage {
    /// Stages that edit a single field of the draft
    #[must_use]
    pub const fn is_field_editor(self) -> bool {
        matches!(
            self,
            Self::AwaitCategory
                | Self::AwaitMode
                | Self::AwaitTag
                | Self::AwaitDuration
                | Self::AwaitPremium
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Per-chat conversation state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub chat_id: i64,
    pub operation: Operation,
    pub stage: Stage,
    pub draft: Ad,
    /// Pending validity selection in days, `0` when unset
    pub duration_days: u32,
    pub last_activity_at: DateTime<Utc>,
    /// Bot messages still visible in the chat, oldest first
    pub live_message_ids: Vec<i32>,
    /// Whether the current field editor was opened from the settings view
    pub from_settings: bool,
}

impl Session {
    /// Create a session positioned at `stage`
    #[must_use]
    pub fn new(
        chat_id: i64,
        operation: Operation,
        stage: Stage,
        draft: Ad,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            chat_id,
            operation,
            stage,
            draft,
            duration_days: 0,
            last_activity_at: now,
            live_message_ids: Vec::new(),
            from_settings: false,
        }
    }

    /// Session for a menu screen with no flow in progress
    #[must_use]
    pub fn idle(chat_id: i64, now: DateTime<Utc>) -> Self {
        Self::new(chat_id, Operation::Create, Stage::Idle, Ad::default(), now)
    }

    /// Whether the session was idle for longer than `max_idle` at `now`
    #[must_use]
    pub fn is_stale(&self, max_idle: chrono::Duration, now: DateTime<Utc>) -> bool {
        now - self.last_activity_at > max_idle
    }
}
