//! SQLite record store built on sqlx.
//!
//! Timestamps are stored as unix milliseconds so that expiry range queries
//! compare plain integers.

use super::{AdFieldUpdate, RecordStore, StoreError};
use crate::market::{Ad, AdId, AdStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const SCHEMA: [&str; 4] = [
    r"CREATE TABLE IF NOT EXISTS ads (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL DEFAULT 0,
        client_id TEXT NOT NULL,
        username TEXT NOT NULL DEFAULT '',
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        photo_id TEXT NOT NULL DEFAULT '',
        photo_path TEXT NOT NULL DEFAULT '',
        category TEXT NOT NULL,
        mode TEXT NOT NULL,
        tag TEXT NOT NULL,
        is_premium INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'active',
        expires_at INTEGER,
        pre_expiry_notified INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    r"CREATE INDEX IF NOT EXISTS idx_ads_client_id ON ads (client_id)",
    r"CREATE INDEX IF NOT EXISTS idx_ads_status_expires ON ads (status, expires_at)",
    r"CREATE TABLE IF NOT EXISTS users (
        username TEXT PRIMARY KEY,
        is_scammer INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL
    )",
];

const AD_COLUMNS: &str = "id, user_id, client_id, username, title, description, photo_id, \
     photo_path, category, mode, tag, is_premium, status, expires_at, pre_expiry_notified, \
     created_at, updated_at";

/// SQLite-backed implementation of [`RecordStore`]
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Open (or create) the database at `database_url` and ensure the schema.
    ///
    /// In-memory URLs get a single connection so that every query sees the
    /// same database.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the database cannot be opened
    /// or the schema cannot be created.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        let max_connections = if database_url.contains(":memory:") { 1 } else { 4 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        info!(max_connections, "Record store connected");
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn fetch_ads(&self, sql: &str, binds: &[i64]) -> Result<Vec<Ad>, StoreError> {
        let mut query = sqlx::query(sql);
        for value in binds {
            query = query.bind(*value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| AdRow::from_row(row)?.into_ad())
            .collect()
    }
}

// Private row type for SQLite-to-domain mapping
struct AdRow {
    id: i64,
    user_id: i64,
    client_id: String,
    username: String,
    title: String,
    description: String,
    photo_id: String,
    photo_path: String,
    category: String,
    mode: String,
    tag: String,
    is_premium: bool,
    status: String,
    expires_at: Option<i64>,
    pre_expiry_notified: bool,
    created_at: i64,
    updated_at: i64,
}

impl AdRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            client_id: row.try_get("client_id")?,
            username: row.try_get("username")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            photo_id: row.try_get("photo_id")?,
            photo_path: row.try_get("photo_path")?,
            category: row.try_get("category")?,
            mode: row.try_get("mode")?,
            tag: row.try_get("tag")?,
            is_premium: row.try_get("is_premium")?,
            status: row.try_get("status")?,
            expires_at: row.try_get("expires_at")?,
            pre_expiry_notified: row.try_get("pre_expiry_notified")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_ad(self) -> Result<Ad, StoreError> {
        let status = self.status.parse::<AdStatus>().map_err(StoreError::Corrupt)?;
        Ok(Ad {
            id: self.id,
            user_id: self.user_id,
            client_id: self.client_id,
            username: self.username,
            title: self.title,
            description: self.description,
            photo_id: self.photo_id,
            photo_path: self.photo_path,
            category: self.category,
            mode: self.mode,
            tag: self.tag,
            is_premium: self.is_premium,
            status,
            expires_at: self.expires_at.map(from_millis).transpose()?,
            pre_expiry_notified: self.pre_expiry_notified,
            created_at: Some(from_millis(self.created_at)?),
            updated_at: Some(from_millis(self.updated_at)?),
        })
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {ms}")))
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn create_ad(&self, ad: &Ad) -> Result<AdId, StoreError> {
        let now = Utc::now().timestamp_millis();
        let result = sqlx::query(
            r"INSERT INTO ads (user_id, client_id, username, title, description, photo_id,
                photo_path, category, mode, tag, is_premium, status, expires_at,
                pre_expiry_notified, created_at, updated_at)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(ad.user_id)
        .bind(&ad.client_id)
        .bind(&ad.username)
        .bind(&ad.title)
        .bind(&ad.description)
        .bind(&ad.photo_id)
        .bind(&ad.photo_path)
        .bind(&ad.category)
        .bind(&ad.mode)
        .bind(&ad.tag)
        .bind(ad.is_premium)
        .bind(ad.status.as_str())
        .bind(ad.expires_at.map(|at| at.timestamp_millis()))
        .bind(ad.pre_expiry_notified)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn save_ad(&self, ad: &Ad) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"UPDATE ads SET user_id = ?, client_id = ?, username = ?, title = ?,
                description = ?, photo_id = ?, photo_path = ?, category = ?, mode = ?,
                tag = ?, is_premium = ?, status = ?, expires_at = ?,
                pre_expiry_notified = ?, updated_at = ?
              WHERE id = ?",
        )
        .bind(ad.user_id)
        .bind(&ad.client_id)
        .bind(&ad.username)
        .bind(&ad.title)
        .bind(&ad.description)
        .bind(&ad.photo_id)
        .bind(&ad.photo_path)
        .bind(&ad.category)
        .bind(&ad.mode)
        .bind(&ad.tag)
        .bind(ad.is_premium)
        .bind(ad.status.as_str())
        .bind(ad.expires_at.map(|at| at.timestamp_millis()))
        .bind(ad.pre_expiry_notified)
        .bind(Utc::now().timestamp_millis())
        .bind(ad.id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(ad.id));
        }
        Ok(())
    }

    async fn find_ad_by_id(&self, id: AdId) -> Result<Option<Ad>, StoreError> {
        let sql = format!("SELECT {AD_COLUMNS} FROM ads WHERE id = ?");
        Ok(self.fetch_ads(&sql, &[id]).await?.into_iter().next())
    }

    async fn find_ads_by_client_id(&self, client_id: &str) -> Result<Vec<Ad>, StoreError> {
        let sql = format!(
            "SELECT {AD_COLUMNS} FROM ads WHERE client_id = ? ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| AdRow::from_row(row)?.into_ad())
            .collect()
    }

    async fn update_ad_fields(&self, id: AdId, update: AdFieldUpdate) -> Result<bool, StoreError> {
        let expected_expiry = update.expected_expiry.map(|at| at.timestamp_millis());
        let result = sqlx::query(
            r"UPDATE ads SET
                status = COALESCE(?, status),
                pre_expiry_notified = COALESCE(?, pre_expiry_notified),
                updated_at = ?
              WHERE id = ? AND (? IS NULL OR (status = 'active' AND expires_at = ?))",
        )
        .bind(update.status.map(AdStatus::as_str))
        .bind(update.pre_expiry_notified)
        .bind(Utc::now().timestamp_millis())
        .bind(id)
        .bind(expected_expiry)
        .bind(expected_expiry)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_blacklist_flag(&self, username: &str, value: bool) -> Result<bool, StoreError> {
        let now = Utc::now().timestamp_millis();
        let result = if value {
            sqlx::query(
                r"INSERT INTO users (username, is_scammer, updated_at) VALUES (?, 1, ?)
                  ON CONFLICT (username) DO UPDATE SET is_scammer = 1, updated_at = excluded.updated_at",
            )
            .bind(username)
            .bind(now)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                "UPDATE users SET is_scammer = 0, updated_at = ? WHERE username = ? AND is_scammer = 1",
            )
            .bind(now)
            .bind(username)
            .execute(&self.pool)
            .await?
        };
        Ok(result.rows_affected() > 0)
    }

    async fn list_blacklist(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT username FROM users WHERE is_scammer = 1 ORDER BY username")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("username").map_err(StoreError::from))
            .collect()
    }

    async fn count_active_premium(&self, exclude: Option<AdId>) -> Result<u32, StoreError> {
        let row = sqlx::query(
            r"SELECT COUNT(*) AS cnt FROM ads
              WHERE status = 'active' AND is_premium = 1 AND (? IS NULL OR id != ?)",
        )
        .bind(exclude)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        let count: i64 = row.try_get("cnt")?;
        u32::try_from(count).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    async fn find_ads_expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Ad>, StoreError> {
        let sql = format!(
            "SELECT {AD_COLUMNS} FROM ads WHERE status = 'active' AND pre_expiry_notified = 0 \
             AND expires_at >= ? AND expires_at <= ? ORDER BY expires_at"
        );
        self.fetch_ads(&sql, &[from.timestamp_millis(), to.timestamp_millis()])
            .await
    }

    async fn find_ads_expired_at(&self, now: DateTime<Utc>) -> Result<Vec<Ad>, StoreError> {
        let sql = format!(
            "SELECT {AD_COLUMNS} FROM ads WHERE status = 'active' \
             AND expires_at IS NOT NULL AND expires_at <= ? ORDER BY expires_at"
        );
        self.fetch_ads(&sql, &[now.timestamp_millis()]).await
    }
}
