//! Shared utility functions used across multiple modules.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Fail with `MissingField` when `value` is empty or whitespace-only.
pub fn require(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::MissingField(field))
    } else {
        Ok(())
    }
}

/// Collapse a tag list into a sorted set: trimmed, blanks dropped, duplicates removed.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|tag| tag.as_ref().trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Split a comma-separated query parameter into a tag list.
pub fn split_comma_separated(value: &str) -> Vec<String> {
    normalize_tags(value.split(','))
}

/// Convert a stored Unix millisecond timestamp back into a UTC datetime.
pub fn datetime_from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::Database(format!("Stored timestamp out of range: {millis}")))
}

/// Deserialize `null` the same way as a missing field.
pub fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" https://example.com ".to_string())),
            Some("https://example.com".to_string())
        );
    }

    #[test]
    fn require_treats_whitespace_as_missing() {
        assert!(require("hello", "title").is_ok());
        assert!(matches!(
            require(" \n ", "title"),
            Err(Error::MissingField("title"))
        ));
    }

    #[test]
    fn normalize_tags_dedupes_and_sorts() {
        assert_eq!(
            normalize_tags(["rust", " async ", "rust", ""]),
            vec!["async".to_string(), "rust".to_string()]
        );
    }

    #[test]
    fn split_comma_separated_drops_blanks() {
        assert_eq!(
            split_comma_separated("x, y,,x"),
            vec!["x".to_string(), "y".to_string()]
        );
    }

    #[test]
    fn datetime_from_millis_round_trips() {
        let now = Utc::now();
        let restored = datetime_from_millis(now.timestamp_millis()).unwrap();
        assert_eq!(restored.timestamp_millis(), now.timestamp_millis());
    }
}
