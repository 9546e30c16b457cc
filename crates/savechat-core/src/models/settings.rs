//! Extension settings model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::null_as_default;

/// Where the extension keeps captured conversations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Browser storage only
    #[default]
    Local,
    /// Synchronized with this server
    Cloud,
}

impl StorageMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cloud => "cloud",
        }
    }
}

impl std::str::FromStr for StorageMode {
    type Err = crate::Error;

    fn from_str(value: &str) -> crate::Result<Self> {
        match value {
            "local" => Ok(Self::Local),
            "cloud" => Ok(Self::Cloud),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown storage mode: {other}"
            ))),
        }
    }
}

/// Extraction paths used on one chat domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XPathConfig {
    #[serde(default)]
    pub conversation: String,
    #[serde(default)]
    pub message: String,
}

/// Extension settings. There is at most one stored row.
///
/// Client-only fields the extension also sends (`backend_url`, `api_key`,
/// `disable_local_cache`) are dropped during deserialization and never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "storageMode", default)]
    pub storage_mode: StorageMode,
    #[serde(default, deserialize_with = "null_as_default")]
    pub beast_enabled_per_domain: BTreeMap<String, bool>,
    #[serde(default)]
    pub selective_mode_enabled: bool,
    #[serde(rename = "devModeEnabled", default)]
    pub dev_mode_enabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub xpaths_by_domain: BTreeMap<String, XPathConfig>,
    /// `None` until the settings have been written once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_is_local_with_empty_maps() {
        let settings = Settings::default();
        assert_eq!(settings.storage_mode, StorageMode::Local);
        assert!(settings.beast_enabled_per_domain.is_empty());
        assert!(!settings.dev_mode_enabled);
        assert_eq!(settings.created_at, None);
    }

    #[test]
    fn extension_payload_uses_camel_case_names_and_drops_client_fields() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "storageMode": "cloud",
                "beast_enabled_per_domain": {"chatgpt.com": true},
                "selective_mode_enabled": true,
                "devModeEnabled": true,
                "xpaths_by_domain": {
                    "claude.ai": {"conversation": "//main", "message": "//div"}
                },
                "backend_url": "http://localhost:8080",
                "api_key": "secret",
                "disable_local_cache": true
            }"#,
        )
        .unwrap();

        assert_eq!(settings.storage_mode, StorageMode::Cloud);
        assert_eq!(settings.beast_enabled_per_domain.get("chatgpt.com"), Some(&true));
        assert!(settings.dev_mode_enabled);
        assert_eq!(settings.xpaths_by_domain["claude.ai"].message, "//div");

        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("api_key"));
        assert!(json.contains("\"storageMode\":\"cloud\""));
    }

    #[test]
    fn storage_mode_parses_stored_text() {
        assert_eq!("cloud".parse::<StorageMode>().unwrap(), StorageMode::Cloud);
        assert!("remote".parse::<StorageMode>().is_err());
    }
}
