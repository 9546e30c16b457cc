//! Backup import and export.
//!
//! The backup document is the JSON file the browser extension writes:
//! `{version, exported_at, conversations, snippets, collections, settings}`.
//! Import reconciles items one at a time and never aborts on a bad item.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::{
    Collection, Conversation, NewCollection, NewConversation, NewSnippet, Settings, Snippet,
};
use crate::services::DatabaseService;
use crate::util::null_as_default;
use crate::Result;

/// Format version written by [`export_backup`].
pub const BACKUP_FORMAT_VERSION: &str = "1.0";

/// Incoming backup document.
///
/// Items stay as raw JSON until import so that one malformed record is
/// counted as an error instead of rejecting the whole document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupPayload {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub exported_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub conversations: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub snippets: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub collections: Vec<serde_json::Value>,
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ImportOptions {
    /// Leave stored settings untouched even if the backup carries some
    #[serde(default)]
    pub skip_settings: bool,
}

/// Per-item outcome counters.
///
/// `created + updated + errors` equals the number of items attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors_details: Vec<String>,
}

impl ImportResult {
    pub const fn attempted(&self) -> usize {
        self.created + self.updated + self.errors
    }

    fn record_error(&mut self, kind: &str, index: usize, error: &crate::Error) {
        tracing::warn!(kind, index, error = %error, "Backup item failed to import");
        self.errors += 1;
        self.errors_details.push(format!("{kind} #{index}: {error}"));
    }

    fn record(&mut self, created: bool) {
        if created {
            self.created += 1;
        } else {
            self.updated += 1;
        }
    }
}

/// Outgoing backup document, re-importable as a [`BackupPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupExport {
    pub version: String,
    pub exported_at: String,
    pub conversations: Vec<Conversation>,
    pub snippets: Vec<Snippet>,
    pub collections: Vec<Collection>,
    pub settings: Settings,
}

fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

/// The `id` an item carried in the store it was exported from.
fn source_id(item: &serde_json::Value) -> Option<i64> {
    item.get("id").and_then(serde_json::Value::as_i64)
}

/// Translate a reference from source ids to ids in this store.
///
/// References to items that were not imported are dropped.
fn remap(ids: &HashMap<i64, i64>, reference: Option<i64>) -> Option<i64> {
    reference.and_then(|old| ids.get(&old).copied())
}

/// Import a backup in the order collections, conversations, snippets, settings.
///
/// Items are processed sequentially and each failure is isolated: it is
/// counted, logged and described in `errors_details`, and the import goes on.
/// Already-applied items are not rolled back.
///
/// Collections and conversations get fresh ids here, so `collection_id` on
/// conversations and `source_conversation_id` on snippets are rewritten from
/// the ids the backup carried to the ids just assigned.
pub async fn import_backup(
    service: &DatabaseService,
    payload: BackupPayload,
    options: ImportOptions,
) -> ImportResult {
    let mut result = ImportResult::default();
    let mut collection_ids = HashMap::new();
    let mut conversation_ids = HashMap::new();

    for (index, item) in payload.collections.into_iter().enumerate() {
        let old_id = source_id(&item);
        let outcome = match decode::<NewCollection>(item) {
            Ok(incoming) => service.upsert_collection(incoming).await,
            Err(error) => Err(error),
        };
        match outcome {
            Ok(reconciled) => {
                if let Some(old_id) = old_id {
                    collection_ids.insert(old_id, reconciled.get().id);
                }
                result.record(reconciled.is_created());
            }
            Err(error) => result.record_error("collection", index, &error),
        }
    }

    for (index, item) in payload.conversations.into_iter().enumerate() {
        let old_id = source_id(&item);
        let outcome = match decode::<NewConversation>(item) {
            Ok(mut incoming) => {
                incoming.collection_id = remap(&collection_ids, incoming.collection_id);
                service.upsert_conversation(incoming).await
            }
            Err(error) => Err(error),
        };
        match outcome {
            Ok(reconciled) => {
                if let Some(old_id) = old_id {
                    conversation_ids.insert(old_id, reconciled.get().id);
                }
                result.record(reconciled.is_created());
            }
            Err(error) => result.record_error("conversation", index, &error),
        }
    }

    for (index, item) in payload.snippets.into_iter().enumerate() {
        let outcome = match decode::<NewSnippet>(item) {
            Ok(mut incoming) => {
                incoming.source_conversation_id =
                    remap(&conversation_ids, incoming.source_conversation_id);
                service.create_snippet(incoming).await
            }
            Err(error) => Err(error),
        };
        match outcome {
            Ok(_) => result.record(true),
            Err(error) => result.record_error("snippet", index, &error),
        }
    }

    match payload.settings {
        Some(settings) if !settings.is_null() && !options.skip_settings => {
            let outcome = match decode::<Settings>(settings) {
                Ok(settings) => service.replace_settings(&settings).await,
                Err(error) => Err(error),
            };
            match outcome {
                Ok(_) => result.record(false),
                Err(error) => result.record_error("settings", 0, &error),
            }
        }
        Some(_) if options.skip_settings => tracing::debug!("Skipping settings from backup"),
        _ => {}
    }

    tracing::info!(
        created = result.created,
        updated = result.updated,
        errors = result.errors,
        "Backup import finished"
    );
    result
}

/// Export every stored entity as a backup document.
pub async fn export_backup(service: &DatabaseService) -> Result<BackupExport> {
    let (conversations, snippets, collections, settings) = service.snapshot().await?;
    Ok(BackupExport {
        version: BACKUP_FORMAT_VERSION.to_string(),
        exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        conversations,
        snippets,
        collections,
        settings,
    })
}

/// Build a deterministic default file name for an export taken at `exported_at`.
#[must_use]
pub fn suggested_backup_file_name(exported_at: DateTime<Utc>) -> String {
    format!(
        "savechat-backup-{}.json",
        exported_at.format("%Y-%m-%dT%H-%M-%SZ")
    )
}
