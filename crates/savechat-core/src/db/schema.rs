//! Table and column names shared by the repositories and the search builder.
//!
//! Query text is only ever assembled from these constants; user input always
//! travels as a bound parameter.

pub const CONVERSATIONS: &str = "conversations";
pub const CONVERSATION_COLUMNS: &str = "id, canonical_url, share_url, source, title, description, \
     content, tags, collection_id, is_ignored, version, created_at, updated_at";

pub const SNIPPETS: &str = "snippets";
pub const SNIPPET_COLUMNS: &str =
    "id, title, content, source_url, source_conversation_id, tags, language, created_at";

pub const COLLECTIONS: &str = "collections";
pub const COLLECTION_COLUMNS: &str = "id, name, icon, color, created_at";

pub const SETTINGS: &str = "settings";
pub const SETTINGS_COLUMNS: &str = "storage_mode, beast_enabled_per_domain, \
     selective_mode_enabled, dev_mode_enabled, xpaths_by_domain, created_at, updated_at";
