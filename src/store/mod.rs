//! Durable record store for ads and users
//!
//! The engine and the scheduler only see the [`RecordStore`] trait. Two
//! implementations ship with the crate: an in-memory store for tests and
//! database-less runs, and a SQLite store built on sqlx.

pub mod memory;
pub mod sqlite;

use crate::market::{Ad, AdId, AdStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::InMemoryRecordStore;
pub use sqlite::SqliteRecordStore;

/// Errors that can occur during record store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database driver error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A stored row could not be mapped back to a domain value
    #[error("Corrupt row: {0}")]
    Corrupt(String),
    /// The targeted record does not exist
    #[error("Ad {0} not found")]
    NotFound(AdId),
}

/// Partial update of an ad's lifecycle fields.
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdFieldUpdate {
    pub status: Option<AdStatus>,
    pub pre_expiry_notified: Option<bool>,
    /// When set, the update only applies to an ad that is still active and
    /// still expires at exactly this instant
    pub expected_expiry: Option<DateTime<Utc>>,
}

impl AdFieldUpdate {
    /// Update that only sets the notified flag
    #[must_use]
    pub const fn notified(value: bool) -> Self {
        Self {
            status: None,
            pre_expiry_notified: Some(value),
            expected_expiry: None,
        }
    }

    /// Update that sets the status and clears the notified flag
    #[must_use]
    pub const fn status_reset(status: AdStatus) -> Self {
        Self {
            status: Some(status),
            pre_expiry_notified: Some(false),
            expected_expiry: None,
        }
    }

    /// Expire an active ad, unless it was renewed or retired since `read_expiry`
    #[must_use]
    pub const fn expire(read_expiry: DateTime<Utc>) -> Self {
        Self {
            status: Some(AdStatus::Expired),
            pre_expiry_notified: Some(false),
            expected_expiry: Some(read_expiry),
        }
    }
}

/// Interface for record store providers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new ad and return its id
    async fn create_ad(&self, ad: &Ad) -> Result<AdId, StoreError>;
    /// Overwrite an existing ad with the given content
    async fn save_ad(&self, ad: &Ad) -> Result<(), StoreError>;
    /// Look an ad up by id
    async fn find_ad_by_id(&self, id: AdId) -> Result<Option<Ad>, StoreError>;
    /// All ads of a client, newest first
    async fn find_ads_by_client_id(&self, client_id: &str) -> Result<Vec<Ad>, StoreError>;
    /// Apply a partial update, returning whether a record was changed
    async fn update_ad_fields(&self, id: AdId, update: AdFieldUpdate) -> Result<bool, StoreError>;
    /// Set the scammer flag of a username.
    ///
    /// Setting `true` upserts the user record. Returns whether a record now
    /// carries the requested value because of this call.
    async fn set_blacklist_flag(&self, username: &str, value: bool) -> Result<bool, StoreError>;
    /// Blacklisted usernames in alphabetical order
    async fn list_blacklist(&self) -> Result<Vec<String>, StoreError>;
    /// Number of active premium ads, optionally ignoring one ad
    async fn count_active_premium(&self, exclude: Option<AdId>) -> Result<u32, StoreError>;
    /// Active, not yet notified ads with an expiry inside `[from, to]`
    async fn find_ads_expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Ad>, StoreError>;
    /// Active ads whose expiry is at or before `now`
    async fn find_ads_expired_at(&self, now: DateTime<Utc>) -> Result<Vec<Ad>, StoreError>;
}
