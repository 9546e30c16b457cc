//! Snippet model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::util::{normalize_tags, normalize_text_option, null_as_default, require};

pub type SnippetId = i64;

/// A code excerpt or quote saved from a conversation.
///
/// Snippets have no natural key; every create inserts a new row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: SnippetId,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Weak reference: the conversation may have been deleted since
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_conversation_id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub source_conversation_id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewSnippet {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        require(&self.title, "title")?;
        require(&self.content, "content")
    }

    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.source_url = normalize_text_option(self.source_url);
        self.language = normalize_text_option(self.language);
        self.tags = normalize_tags(&self.tags);
        self
    }
}

impl From<Snippet> for NewSnippet {
    fn from(snippet: Snippet) -> Self {
        Self {
            title: snippet.title,
            content: snippet.content,
            source_url: snippet.source_url,
            source_conversation_id: snippet.source_conversation_id,
            tags: snippet.tags,
            language: snippet.language,
            created_at: Some(snippet.created_at),
        }
    }
}
