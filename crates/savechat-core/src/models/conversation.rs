//! Conversation model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::util::{normalize_tags, normalize_text_option, null_as_default, require};

/// Server-assigned surrogate key for a conversation.
pub type ConversationId = i64;

/// A conversation captured from an AI chat platform.
///
/// `canonical_url` is the natural key: two records with the same canonical URL
/// are the same conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub canonical_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,
    /// Platform tag, e.g. `chatgpt` or `claude`
    pub source: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<i64>,
    /// Once set, only [`crate::services::DatabaseService::set_conversation_ignore`] clears it
    pub ignore: bool,
    /// Starts at 1 and increases by exactly 1 on every update
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An incoming conversation record, from a live write or a backup file.
///
/// Any `id` the client sends is ignored; identity is resolved through
/// `canonical_url`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConversation {
    #[serde(default)]
    pub canonical_url: String,
    #[serde(default)]
    pub share_url: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub collection_id: Option<i64>,
    /// `None` when the client did not send the flag at all
    #[serde(default)]
    pub ignore: Option<bool>,
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl NewConversation {
    /// Convenience constructor with the four required fields.
    pub fn new(
        canonical_url: impl Into<String>,
        source: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            canonical_url: canonical_url.into(),
            source: source.into(),
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Check required fields in a fixed order: canonical URL, source, title, content.
    pub fn validate(&self) -> Result<()> {
        require(&self.canonical_url, "canonical_url")?;
        require(&self.source, "source")?;
        require(&self.title, "title")?;
        require(&self.content, "content")
    }

    /// The row to persist for a conversation that has no id yet.
    pub(crate) fn into_unsaved(
        self,
        version: i64,
        ignore: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Conversation {
        Conversation {
            id: 0,
            canonical_url: self.canonical_url,
            share_url: self.share_url,
            source: self.source,
            title: self.title,
            description: self.description,
            content: self.content,
            tags: self.tags,
            collection_id: self.collection_id,
            ignore,
            version,
            created_at,
            updated_at,
        }
    }

    /// Trim the natural key and optional text, and collapse tags into a set.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.canonical_url = self.canonical_url.trim().to_string();
        self.share_url = normalize_text_option(self.share_url);
        self.description = normalize_text_option(self.description);
        self.tags = normalize_tags(&self.tags);
        self
    }
}

impl From<Conversation> for NewConversation {
    fn from(conversation: Conversation) -> Self {
        Self {
            canonical_url: conversation.canonical_url,
            share_url: conversation.share_url,
            source: conversation.source,
            title: conversation.title,
            description: conversation.description,
            content: conversation.content,
            tags: conversation.tags,
            collection_id: conversation.collection_id,
            ignore: Some(conversation.ignore),
            version: Some(conversation.version),
            created_at: Some(conversation.created_at),
            updated_at: Some(conversation.updated_at),
        }
    }
}

/// Body of the "set ignore" operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreUpdate {
    pub ignore: bool,
}
