//! Filtered search over conversations and snippets.
//!
//! Filters are optional and conjunctive. Each one becomes a typed
//! [`Predicate`]; the builder numbers the placeholders.

mod predicate;

pub use predicate::{Predicate, QueryParam, SelectBuilder, SelectQuery};

use serde::Deserialize;

use crate::db::schema;
use crate::util::{normalize_tags, normalize_text_option};

/// Maximum rows returned by search and listing.
pub const RESULT_LIMIT: u32 = 100;

/// Conversation search criteria. Empty strings and empty tag lists are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchFilters {
    /// Substring matched against title, description and content
    pub query: Option<String>,
    pub source: Option<String>,
    /// Matches conversations carrying at least one of these tags
    #[serde(default)]
    pub tags: Vec<String>,
    pub collection_id: Option<i64>,
}

/// Snippet listing criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SnippetFilters {
    pub language: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source_conversation_id: Option<i64>,
}

/// Lowercased copy of title, description and content kept for substring search.
const CONVERSATION_TEXT_COLUMNS: &[&str] = &["search_text"];

/// Keeps a needle from matching across two fields.
const FIELD_SEPARATOR: char = '\u{1f}';

/// Build the `search_text` value stored alongside a conversation.
pub(crate) fn fold_search_text(title: &str, description: Option<&str>, content: &str) -> String {
    let mut text = String::with_capacity(title.len() + content.len() + 2);
    text.push_str(title);
    text.push(FIELD_SEPARATOR);
    text.push_str(description.unwrap_or_default());
    text.push(FIELD_SEPARATOR);
    text.push_str(content);
    text.to_lowercase()
}

fn text_equals(column: &'static str, value: Option<&String>) -> Option<Predicate> {
    normalize_text_option(value.cloned()).map(|value| Predicate::Equals {
        column,
        value: QueryParam::Text(value),
    })
}

fn integer_equals(column: &'static str, value: Option<i64>) -> Option<Predicate> {
    value.map(|value| Predicate::Equals {
        column,
        value: QueryParam::Integer(value),
    })
}

fn tags_overlap(tags: &[String]) -> Option<Predicate> {
    let values = normalize_tags(tags);
    (!values.is_empty()).then_some(Predicate::Overlaps {
        column: "tags",
        values,
    })
}

/// Most recently updated conversations matching every supplied filter.
pub fn build_conversation_search(filters: &SearchFilters) -> SelectQuery {
    let contains = normalize_text_option(filters.query.clone()).map(|needle| Predicate::Contains {
        columns: CONVERSATION_TEXT_COLUMNS,
        needle,
    });

    SelectBuilder::new(schema::CONVERSATIONS, schema::CONVERSATION_COLUMNS)
        .filter_opt(contains)
        .filter_opt(text_equals("source", filters.source.as_ref()))
        .filter_opt(tags_overlap(&filters.tags))
        .filter_opt(integer_equals("collection_id", filters.collection_id))
        .order_by_desc("updated_at")
        .limit(RESULT_LIMIT)
        .build()
}

/// Newest snippets matching every supplied filter.
pub fn build_snippet_listing(filters: &SnippetFilters) -> SelectQuery {
    SelectBuilder::new(schema::SNIPPETS, schema::SNIPPET_COLUMNS)
        .filter_opt(text_equals("language", filters.language.as_ref()))
        .filter_opt(tags_overlap(&filters.tags))
        .filter_opt(integer_equals(
            "source_conversation_id",
            filters.source_conversation_id,
        ))
        .order_by_desc("created_at")
        .limit(RESULT_LIMIT)
        .build()
}
