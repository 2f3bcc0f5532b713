//! Ad lifecycle rules
//!
//! Validation and state transitions applied when a dialogue reaches a
//! terminal action: persisting a draft, publishing, renewing and retiring.

use super::ad::{Ad, AdId, AdStatus, DESCRIPTION_MAX_CHARS, TITLE_MAX_CHARS};
use super::vocabulary;
use crate::session::Operation;
use crate::store::{AdFieldUpdate, RecordStore, StoreError};
use crate::utils::truncate_str;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::warn;

/// Validity windows a manager may choose, in days
pub const ALLOWED_DURATIONS: [u32; 4] = [1, 7, 14, 30];
/// Maximum number of simultaneously active premium ads
pub const PREMIUM_CAP: u32 = 3;
/// Validity window applied when none was chosen
pub const DEFAULT_DURATION_DAYS: u32 = 7;
/// How long before expiry owners are reminded
pub const PRE_EXPIRY_WINDOW_HOURS: i64 = 24;

/// Validation and capacity failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// A required field is empty
    #[error("поле «{0}» не может быть пустым")]
    MissingField(&'static str),
    /// A value is not registered in the vocabulary
    #[error("недопустимое значение «{value}» для поля «{field}»")]
    OutOfVocabulary { field: &'static str, value: String },
    /// A new ad needs a validity window
    #[error("срок действия не может быть пустым")]
    MissingDuration,
    /// The chosen validity window is not offered
    #[error("недопустимый срок: {0} дн.")]
    InvalidDuration(u32),
    /// All premium slots are taken
    #[error("лимит премиум-объявлений ({cap}) исчерпан, сейчас активно {active}. Сначала снимите одно из текущих")]
    PremiumCapExceeded { cap: u32, active: u32 },
}

/// Checks that `days` is one of the offered validity windows
///
/// # Errors
///
/// Returns [`RuleError::InvalidDuration`] otherwise.
pub fn validate_duration(days: u32) -> Result<u32, RuleError> {
    if ALLOWED_DURATIONS.contains(&days) {
        Ok(days)
    } else {
        Err(RuleError::InvalidDuration(days))
    }
}

fn require(value: &str, field: &'static str) -> Result<(), RuleError> {
    if value.trim().is_empty() {
        Err(RuleError::MissingField(field))
    } else {
        Ok(())
    }
}

fn days(n: u32) -> Duration {
    Duration::days(i64::from(n))
}

/// Validates a draft before it is written and stamps its lifecycle fields.
///
/// On success the draft is active, un-notified, carries an expiry and, when
/// the client id is numeric and no owner was set, an owning chat id.
///
/// # Errors
///
/// Returns the first rule the draft violates; the draft's lifecycle fields
/// are untouched in that case.
pub fn validate_for_persist(
    draft: &mut Ad,
    operation: Operation,
    duration_days: u32,
    now: DateTime<Utc>,
) -> Result<(), RuleError> {
    require(&draft.title, "заголовок")?;
    require(&draft.description, "описание")?;
    require(&draft.category, "категория")?;

    let category =
        vocabulary::category(&draft.category).ok_or_else(|| RuleError::OutOfVocabulary {
            field: "категория",
            value: draft.category.clone(),
        })?;
    if draft.mode.is_empty() {
        if let Some(implicit) = category.implicit_mode() {
            draft.mode = implicit.value.to_string();
        }
    }
    require(&draft.mode, "режим")?;
    require(&draft.tag, "тег")?;
    require(&draft.client_id, "ID клиента")?;
    if category.mode(&draft.mode).is_none() {
        return Err(RuleError::OutOfVocabulary {
            field: "режим",
            value: draft.mode.clone(),
        });
    }
    if category.tag(&draft.tag).is_none() {
        return Err(RuleError::OutOfVocabulary {
            field: "тег",
            value: draft.tag.clone(),
        });
    }
    if duration_days != 0 {
        validate_duration(duration_days)?;
    } else if operation == Operation::Create {
        return Err(RuleError::MissingDuration);
    }

    if draft.username.is_empty() {
        warn!(client_id = %draft.client_id, "Ad has no contact handle");
    }
    if draft.user_id == 0 {
        match draft.client_id.trim().parse::<i64>() {
            Ok(user_id) => draft.user_id = user_id,
            Err(e) => warn!(client_id = %draft.client_id, "Client id is not a chat id: {e}"),
        }
    }

    draft.title = truncate_str(&draft.title, TITLE_MAX_CHARS);
    draft.description = truncate_str(&draft.description, DESCRIPTION_MAX_CHARS);
    if duration_days > 0 {
        draft.expires_at = Some(now + days(duration_days));
    } else if draft.expires_at.is_none() && operation == Operation::Create {
        draft.expires_at = Some(now + days(DEFAULT_DURATION_DAYS));
    }
    draft.pre_expiry_notified = false;
    draft.status = AdStatus::Active;
    Ok(())
}

/// Counts active premium ads, ignoring `exclude` (the ad being edited)
///
/// # Errors
///
/// Propagates record store failures.
pub async fn check_premium_capacity(
    store: &dyn RecordStore,
    exclude: Option<AdId>,
) -> Result<u32, StoreError> {
    store.count_active_premium(exclude).await
}

/// Fails when no premium slot is left for `active` current holders
///
/// # Errors
///
/// Returns [`RuleError::PremiumCapExceeded`] when `active >= PREMIUM_CAP`.
pub fn ensure_premium_slot(active: u32) -> Result<(), RuleError> {
    if active >= PREMIUM_CAP {
        Err(RuleError::PremiumCapExceeded {
            cap: PREMIUM_CAP,
            active,
        })
    } else {
        Ok(())
    }
}

/// Takes an ad off the marketplace without deleting it.
///
/// Returns whether the ad existed.
///
/// # Errors
///
/// Propagates record store failures.
pub async fn retire(store: &dyn RecordStore, id: AdId) -> Result<bool, StoreError> {
    store
        .update_ad_fields(id, AdFieldUpdate::status_reset(AdStatus::Inactive))
        .await
}

/// Puts an ad back on the marketplace, extending a lapsed expiry
pub fn publish(ad: &mut Ad, now: DateTime<Utc>) {
    ad.status = AdStatus::Active;
    ad.pre_expiry_notified = false;
    if ad.is_past_expiry(now) {
        ad.expires_at = Some(now + days(DEFAULT_DURATION_DAYS));
    }
}

/// Restarts the validity window of an ad
///
/// # Errors
///
/// Returns [`RuleError::InvalidDuration`] for windows that are not offered.
pub fn renew(ad: &mut Ad, duration_days: u32, now: DateTime<Utc>) -> Result<(), RuleError> {
    validate_duration(duration_days)?;
    ad.status = AdStatus::Active;
    ad.pre_expiry_notified = false;
    ad.expires_at = Some(now + days(duration_days));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockRecordStore;

    fn complete_draft() -> Ad {
        Ad {
            client_id: "12345".to_string(),
            title: "Selling channel".to_string(),
            description: "50k subs".to_string(),
            category: "buysell".to_string(),
            mode: "sell".to_string(),
            tag: "channel".to_string(),
            status: AdStatus::Inactive,
            pre_expiry_notified: true,
            ..Ad::default()
        }
    }

    #[test]
    fn test_durations() {
        for ok in ALLOWED_DURATIONS {
            assert_eq!(validate_duration(ok), Ok(ok));
        }
        for bad in [0, 2, 3, 8, 15, 31, 365] {
            assert_eq!(validate_duration(bad), Err(RuleError::InvalidDuration(bad)));
        }
    }

    #[test]
    fn test_persist_stamps_lifecycle_fields() {
        let now = Utc::now();
        let mut draft = complete_draft();
        assert_eq!(validate_for_persist(&mut draft, Operation::Create, 7, now), Ok(()));
        assert_eq!(draft.user_id, 12345);
        assert_eq!(draft.status, AdStatus::Active);
        assert!(!draft.pre_expiry_notified);
        assert_eq!(draft.expires_at, Some(now + Duration::days(7)));
    }

    #[test]
    fn test_create_requires_duration() {
        let mut draft = complete_draft();
        assert_eq!(
            validate_for_persist(&mut draft, Operation::Create, 0, Utc::now()),
            Err(RuleError::MissingDuration)
        );
        assert_eq!(draft.status, AdStatus::Inactive);
    }

    #[test]
    fn test_edit_keeps_expiry_without_duration() {
        let now = Utc::now();
        let expiry = now + Duration::days(3);
        let mut draft = complete_draft();
        draft.expires_at = Some(expiry);
        assert_eq!(validate_for_persist(&mut draft, Operation::Edit, 0, now), Ok(()));
        assert_eq!(draft.expires_at, Some(expiry));
    }

    #[test]
    fn test_missing_fields_reported_in_order() {
        let mut draft = complete_draft();
        draft.title = "  ".to_string();
        draft.tag.clear();
        assert_eq!(
            validate_for_persist(&mut draft, Operation::Create, 7, Utc::now()),
            Err(RuleError::MissingField("заголовок"))
        );

        let mut draft = complete_draft();
        draft.client_id.clear();
        assert_eq!(
            validate_for_persist(&mut draft, Operation::Create, 7, Utc::now()),
            Err(RuleError::MissingField("ID клиента"))
        );
    }

    #[test]
    fn test_vocabulary_enforced() {
        let mut draft = complete_draft();
        draft.mode = "offer".to_string();
        assert!(matches!(
            validate_for_persist(&mut draft, Operation::Create, 7, Utc::now()),
            Err(RuleError::OutOfVocabulary { field: "режим", .. })
        ));
    }

    #[test]
    fn test_other_category_gets_implicit_mode() {
        let mut draft = complete_draft();
        draft.category = "other".to_string();
        draft.mode.clear();
        draft.tag = "mods".to_string();
        assert_eq!(validate_for_persist(&mut draft, Operation::Create, 1, Utc::now()), Ok(()));
        assert_eq!(draft.mode, "general");
    }

    #[test]
    fn test_long_text_truncated() {
        let mut draft = complete_draft();
        draft.title = "я".repeat(TITLE_MAX_CHARS + 10);
        assert_eq!(validate_for_persist(&mut draft, Operation::Create, 7, Utc::now()), Ok(()));
        assert_eq!(draft.title.chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn test_premium_slot() {
        assert_eq!(ensure_premium_slot(0), Ok(()));
        assert_eq!(ensure_premium_slot(2), Ok(()));
        assert_eq!(
            ensure_premium_slot(3),
            Err(RuleError::PremiumCapExceeded { cap: 3, active: 3 })
        );
    }

    #[test]
    fn test_publish_extends_lapsed_expiry_only() {
        let now = Utc::now();
        let mut lapsed = complete_draft();
        lapsed.expires_at = Some(now - Duration::days(1));
        publish(&mut lapsed, now);
        assert_eq!(lapsed.status, AdStatus::Active);
        assert_eq!(lapsed.expires_at, Some(now + Duration::days(7)));

        let future = now + Duration::days(2);
        let mut current = complete_draft();
        current.expires_at = Some(future);
        publish(&mut current, now);
        assert_eq!(current.expires_at, Some(future));
        assert!(!current.pre_expiry_notified);
    }

    #[test]
    fn test_renew() {
        let now = Utc::now();
        let mut ad = complete_draft();
        assert_eq!(renew(&mut ad, 14, now), Ok(()));
        assert_eq!(ad.expires_at, Some(now + Duration::days(14)));
        assert_eq!(ad.status, AdStatus::Active);
        assert_eq!(renew(&mut ad, 5, now), Err(RuleError::InvalidDuration(5)));
    }

    #[tokio::test]
    async fn test_capacity_and_retire_go_through_store() -> Result<(), StoreError> {
        let mut store = MockRecordStore::new();
        store
            .expect_count_active_premium()
            .withf(|exclude| *exclude == Some(9))
            .times(1)
            .returning(|_| Ok(2));
        store
            .expect_update_ad_fields()
            .withf(|id, update| {
                *id == 9 && *update == AdFieldUpdate::status_reset(AdStatus::Inactive)
            })
            .times(1)
            .returning(|_, _| Ok(true));

        assert_eq!(check_premium_capacity(&store, Some(9)).await?, 2);
        assert!(retire(&store, 9).await?);
        Ok(())
    }
}
