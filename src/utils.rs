//! Utility functions for text processing and Telegram API retries.

// lazy_regex! builds on once_cell internally
#![allow(clippy::non_std_lazy_statics)]

use anyhow::Result;
use lazy_regex::lazy_regex;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;

/// Telegram usernames: latin letters, digits and underscores
static RE_USERNAME: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"^[A-Za-z0-9_]{1,64}$");

/// Truncates a string to at most `max_chars` characters.
///
/// Cuts on a character boundary, never inside a UTF-8 sequence.
///
/// # Examples
///
/// ```
/// use market_desk::utils::truncate_str;
/// assert_eq!(truncate_str("Привет, мир", 6), "Привет");
/// assert_eq!(truncate_str("short", 10), "short");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Normalizes a contact handle typed by a manager.
///
/// Strips surrounding whitespace and leading `@` signs. Returns `None` when
/// the remainder is not a plausible Telegram username.
///
/// # Examples
///
/// ```
/// use market_desk::utils::normalize_username;
/// assert_eq!(normalize_username("  @seller_42 "), Some("seller_42".to_string()));
/// assert_eq!(normalize_username("@"), None);
/// assert_eq!(normalize_username("two words"), None);
/// ```
#[must_use]
pub fn normalize_username(value: &str) -> Option<String> {
    let trimmed = value.trim().trim_start_matches('@').trim();
    RE_USERNAME
        .is_match(trimmed)
        .then(|| trimmed.to_string())
}

/// Escapes user-provided text for Telegram HTML parse mode.
#[must_use]
pub fn escape_html(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Retries a Telegram API operation with exponential backoff and jitter.
///
/// Used for sends and edits that may fail on transient network errors.
///
/// # Errors
///
/// Returns the last error once all attempts are exhausted.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
    };

    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Telegram API operation failed after {} attempts: {}",
            TELEGRAM_API_MAX_RETRIES, e
        );
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_truncate_str_respects_char_boundaries() {
        assert_eq!(truncate_str("абвгд", 3), "абв");
        assert_eq!(truncate_str("", 3), "");
        assert_eq!(truncate_str("abc", 0), "");
    }

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("@@name"), Some("name".to_string()));
        assert_eq!(normalize_username("name"), Some("name".to_string()));
        assert_eq!(normalize_username("   "), None);
        assert_eq!(normalize_username("имя"), None);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & c"), "a &lt; b &amp; c");
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_attempts() {
        let mut calls = 0;
        let result: Result<()> = retry_telegram_operation(|| {
            calls += 1;
            async { Err(anyhow::anyhow!("boom")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, crate::config::TELEGRAM_API_MAX_RETRIES + 1);
    }

    proptest! {
        #[test]
        fn truncate_never_exceeds_limit(s in ".{0,300}", limit in 0usize..200) {
            let out = truncate_str(&s, limit);
            prop_assert!(out.chars().count() <= limit);
            prop_assert!(s.starts_with(&out));
        }
    }
}
