//! In-memory record store

use super::{AdFieldUpdate, RecordStore, StoreError};
use crate::market::{Ad, AdId, AdStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    next_id: AdId,
    ads: BTreeMap<AdId, Ad>,
    scammers: BTreeSet<String>,
}

/// Record store kept entirely in process memory
#[derive(Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<Tables>,
}

impl InMemoryRecordStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored ads
    pub async fn ad_count(&self) -> usize {
        self.tables.read().await.ads.len()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create_ad(&self, ad: &Ad) -> Result<AdId, StoreError> {
        let mut tables = self.tables.write().await;
        tables.next_id += 1;
        let id = tables.next_id;
        let now = Utc::now();
        let mut stored = ad.clone();
        stored.id = id;
        stored.created_at = Some(now);
        stored.updated_at = Some(now);
        tables.ads.insert(id, stored);
        Ok(id)
    }

    async fn save_ad(&self, ad: &Ad) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let existing = tables.ads.get_mut(&ad.id).ok_or(StoreError::NotFound(ad.id))?;
        let created_at = existing.created_at;
        *existing = ad.clone();
        existing.created_at = created_at;
        existing.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn find_ad_by_id(&self, id: AdId) -> Result<Option<Ad>, StoreError> {
        Ok(self.tables.read().await.ads.get(&id).cloned())
    }

    async fn find_ads_by_client_id(&self, client_id: &str) -> Result<Vec<Ad>, StoreError> {
        let tables = self.tables.read().await;
        // Ids grow monotonically, so reverse id order is newest first
        Ok(tables
            .ads
            .values()
            .rev()
            .filter(|ad| ad.client_id == client_id)
            .cloned()
            .collect())
    }

    async fn update_ad_fields(&self, id: AdId, update: AdFieldUpdate) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(ad) = tables.ads.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(expected) = update.expected_expiry {
            if ad.status != AdStatus::Active || ad.expires_at != Some(expected) {
                return Ok(false);
            }
        }
        if let Some(status) = update.status {
            ad.status = status;
        }
        if let Some(notified) = update.pre_expiry_notified {
            ad.pre_expiry_notified = notified;
        }
        ad.updated_at = Some(Utc::now());
        Ok(true)
    }

    async fn set_blacklist_flag(&self, username: &str, value: bool) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if value {
            tables.scammers.insert(username.to_string());
            Ok(true)
        } else {
            Ok(tables.scammers.remove(username))
        }
    }

    async fn list_blacklist(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.tables.read().await.scammers.iter().cloned().collect())
    }

    async fn count_active_premium(&self, exclude: Option<AdId>) -> Result<u32, StoreError> {
        let tables = self.tables.read().await;
        let count = tables
            .ads
            .values()
            .filter(|ad| ad.holds_premium_slot() && Some(ad.id) != exclude)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn find_ads_expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Ad>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .ads
            .values()
            .filter(|ad| ad.status == AdStatus::Active && !ad.pre_expiry_notified)
            .filter(|ad| ad.expires_at.is_some_and(|at| at >= from && at <= to))
            .cloned()
            .collect())
    }

    async fn find_ads_expired_at(&self, now: DateTime<Utc>) -> Result<Vec<Ad>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .ads
            .values()
            .filter(|ad| ad.status == AdStatus::Active)
            .filter(|ad| ad.expires_at.is_some_and(|at| at <= now))
            .cloned()
            .collect())
    }
}
