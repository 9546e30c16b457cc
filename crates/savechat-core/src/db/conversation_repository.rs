//! Conversation repository implementation

use chrono::Utc;
use libsql::{Connection, Row, Value};

use super::rows;
use super::schema::{CONVERSATIONS, CONVERSATION_COLUMNS};
use crate::error::{Error, Result};
use crate::models::{Conversation, ConversationId};
use crate::search::{build_conversation_search, fold_search_text, SearchFilters};

/// Storage operations the conversation reconciler depends on
#[allow(async_fn_in_trait)]
pub trait ConversationStore {
    /// Look up a conversation by its natural key
    async fn find_by_canonical_url(&self, canonical_url: &str) -> Result<Option<Conversation>>;

    /// Insert a new row. `conversation.id` is ignored; the stored row is returned.
    ///
    /// A duplicate canonical URL fails with [`Error::Conflict`].
    async fn insert(&self, conversation: &Conversation) -> Result<Conversation>;

    /// Overwrite every mutable column of the row with `conversation.id`
    async fn update(&self, conversation: &Conversation) -> Result<Conversation>;
}

/// libSQL implementation of `ConversationStore`
pub struct LibSqlConversationRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlConversationRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Get a conversation by id
    pub async fn get(&self, id: ConversationId) -> Result<Option<Conversation>> {
        let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM {CONVERSATIONS} WHERE id = ?1");
        let mut found = self.query_all(&sql, vec![Value::Integer(id)]).await?;
        Ok(found.pop())
    }

    /// Every conversation, oldest first
    pub async fn list_all(&self) -> Result<Vec<Conversation>> {
        let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM {CONVERSATIONS} ORDER BY id");
        self.query_all(&sql, Vec::new()).await
    }

    /// Filtered search, most recently updated first
    pub async fn search(&self, filters: &SearchFilters) -> Result<Vec<Conversation>> {
        let query = build_conversation_search(filters);
        self.query_all(query.sql(), query.values()).await
    }

    /// Explicitly set or clear the ignore flag, bumping the version
    ///
    /// A row already at `i64::MAX` is left alone and reported as `InvalidInput`.
    pub async fn set_ignore(&self, id: ConversationId, ignore: bool) -> Result<Conversation> {
        let sql = format!(
            "UPDATE {CONVERSATIONS} SET is_ignored = ?1, version = version + 1, updated_at = ?2 \
             WHERE id = ?3 AND version < ?4"
        );
        let changed = self
            .conn
            .execute(
                &sql,
                vec![
                    rows::flag_value(ignore),
                    rows::timestamp_value(Utc::now()),
                    Value::Integer(id),
                    Value::Integer(i64::MAX),
                ],
            )
            .await
            .map_err(Error::from_write)?;
        if changed == 0 {
            return match self.get(id).await? {
                Some(_) => Err(Error::InvalidInput(format!(
                    "conversation {id} is at the maximum version"
                ))),
                None => Err(Error::not_found("conversation", id)),
            };
        }
        self.reload(id).await
    }

    /// Delete a conversation by id
    pub async fn delete(&self, id: ConversationId) -> Result<()> {
        let sql = format!("DELETE FROM {CONVERSATIONS} WHERE id = ?1");
        let changed = self.conn.execute(&sql, [id]).await?;
        if changed == 0 {
            return Err(Error::not_found("conversation", id));
        }
        Ok(())
    }

    async fn reload(&self, id: ConversationId) -> Result<Conversation> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::not_found("conversation", id))
    }

    async fn query_all(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Conversation>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut conversations = Vec::new();
        while let Some(row) = rows.next().await? {
            conversations.push(Self::parse_conversation(&row)?);
        }
        Ok(conversations)
    }

    /// Parse a conversation from a row selected with `CONVERSATION_COLUMNS`
    fn parse_conversation(row: &Row) -> Result<Conversation> {
        Ok(Conversation {
            id: row.get(0)?,
            canonical_url: row.get(1)?,
            share_url: rows::opt_text(row, 2)?,
            source: row.get(3)?,
            title: row.get(4)?,
            description: rows::opt_text(row, 5)?,
            content: row.get(6)?,
            tags: rows::json(row, 7)?,
            collection_id: rows::opt_integer(row, 8)?,
            ignore: rows::flag(row, 9)?,
            version: row.get(10)?,
            created_at: rows::timestamp(row, 11)?,
            updated_at: rows::timestamp(row, 12)?,
        })
    }

    fn column_values(conversation: &Conversation) -> Result<Vec<Value>> {
        Ok(vec![
            rows::text_value(&conversation.canonical_url),
            rows::opt_text_value(conversation.share_url.as_deref()),
            rows::text_value(&conversation.source),
            rows::text_value(&conversation.title),
            rows::opt_text_value(conversation.description.as_deref()),
            rows::text_value(&conversation.content),
            rows::json_value(&conversation.tags)?,
            rows::opt_integer_value(conversation.collection_id),
            rows::flag_value(conversation.ignore),
            Value::Integer(conversation.version),
            rows::timestamp_value(conversation.created_at),
            rows::timestamp_value(conversation.updated_at),
            Value::Text(fold_search_text(
                &conversation.title,
                conversation.description.as_deref(),
                &conversation.content,
            )),
        ])
    }
}

impl ConversationStore for LibSqlConversationRepository<'_> {
    async fn find_by_canonical_url(&self, canonical_url: &str) -> Result<Option<Conversation>> {
        let sql =
            format!("SELECT {CONVERSATION_COLUMNS} FROM {CONVERSATIONS} WHERE canonical_url = ?1");
        let mut found = self
            .query_all(&sql, vec![rows::text_value(canonical_url)])
            .await?;
        Ok(found.pop())
    }

    async fn insert(&self, conversation: &Conversation) -> Result<Conversation> {
        let sql = format!(
            "INSERT INTO {CONVERSATIONS} (canonical_url, share_url, source, title, description, \
             content, tags, collection_id, is_ignored, version, created_at, updated_at, \
             search_text) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        );
        self.conn
            .execute(&sql, Self::column_values(conversation)?)
            .await
            .map_err(Error::from_write)?;
        let id = self.conn.last_insert_rowid();
        self.reload(id).await
    }

    async fn update(&self, conversation: &Conversation) -> Result<Conversation> {
        let sql = format!(
            "UPDATE {CONVERSATIONS} SET canonical_url = ?1, share_url = ?2, source = ?3, \
             title = ?4, description = ?5, content = ?6, tags = ?7, collection_id = ?8, \
             is_ignored = ?9, version = ?10, created_at = ?11, updated_at = ?12, \
             search_text = ?13 WHERE id = ?14"
        );
        let mut params = Self::column_values(conversation)?;
        params.push(Value::Integer(conversation.id));

        let changed = self
            .conn
            .execute(&sql, params)
            .await
            .map_err(Error::from_write)?;
        if changed == 0 {
            return Err(Error::not_found("conversation", conversation.id));
        }
        self.reload(conversation.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::NewConversation;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn sample(url: &str, tags: &[&str]) -> Conversation {
        let now = Utc::now();
        let incoming = NewConversation {
            tags: tags.iter().map(ToString::to_string).collect(),
            ..NewConversation::new(url, "chatgpt", "Title", "Body text")
        };
        incoming.into_unsaved(1, false, now, now)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_assigns_id_and_round_trips() {
        let db = setup().await;
        let repo = LibSqlConversationRepository::new(db.connection());

        let stored = repo.insert(&sample("https://a", &["x", "y"])).await.unwrap();
        assert!(stored.id > 0);

        let found = repo.find_by_canonical_url("https://a").await.unwrap().unwrap();
        assert_eq!(found, stored);
        assert_eq!(found.tags, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(found.share_url, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_duplicate_canonical_url_is_conflict() {
        let db = setup().await;
        let repo = LibSqlConversationRepository::new(db.connection());

        repo.insert(&sample("https://a", &[])).await.unwrap();
        let err = repo.insert(&sample("https://a", &[])).await.unwrap_err();
        assert!(err.is_conflict(), "unexpected error: {err}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_collection_is_invalid_input() {
        let db = setup().await;
        let repo = LibSqlConversationRepository::new(db.connection());

        let mut conversation = sample("https://a", &[]);
        conversation.collection_id = Some(999);
        let err = repo.insert(&conversation).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)), "unexpected error: {err}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_missing_row_is_not_found() {
        let db = setup().await;
        let repo = LibSqlConversationRepository::new(db.connection());

        let mut conversation = sample("https://a", &[]);
        conversation.id = 41;
        let err = repo.update(&conversation).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_ignore_bumps_version() {
        let db = setup().await;
        let repo = LibSqlConversationRepository::new(db.connection());

        let stored = repo.insert(&sample("https://a", &[])).await.unwrap();
        let ignored = repo.set_ignore(stored.id, true).await.unwrap();
        assert!(ignored.ignore);
        assert_eq!(ignored.version, 2);

        let cleared = repo.set_ignore(stored.id, false).await.unwrap();
        assert!(!cleared.ignore);
        assert_eq!(cleared.version, 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_ignore_at_maximum_version_is_rejected() {
        let db = setup().await;
        let repo = LibSqlConversationRepository::new(db.connection());

        let mut conversation = sample("https://a", &[]);
        conversation.version = i64::MAX;
        let stored = repo.insert(&conversation).await.unwrap();

        let err = repo.set_ignore(stored.id, true).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)), "unexpected error: {err}");

        let unchanged = repo.get(stored.id).await.unwrap().unwrap();
        assert_eq!(unchanged.version, i64::MAX);
        assert!(!unchanged.ignore);

        assert!(matches!(
            repo.set_ignore(stored.id + 1, true).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete() {
        let db = setup().await;
        let repo = LibSqlConversationRepository::new(db.connection());

        let stored = repo.insert(&sample("https://a", &[])).await.unwrap();
        repo.delete(stored.id).await.unwrap();
        assert!(repo.get(stored.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(stored.id).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_search_tag_overlap() {
        let db = setup().await;
        let repo = LibSqlConversationRepository::new(db.connection());

        repo.insert(&sample("https://xy", &["x", "y"])).await.unwrap();
        repo.insert(&sample("https://x", &["x"])).await.unwrap();
        repo.insert(&sample("https://y", &["y"])).await.unwrap();

        let found = repo
            .search(&SearchFilters {
                tags: vec!["x".into()],
                ..SearchFilters::default()
            })
            .await
            .unwrap();

        let mut urls = found.into_iter().map(|c| c.canonical_url).collect::<Vec<_>>();
        urls.sort();
        assert_eq!(urls, vec!["https://x".to_string(), "https://xy".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_search_substring_is_case_insensitive_and_literal() {
        let db = setup().await;
        let repo = LibSqlConversationRepository::new(db.connection());

        let mut discount = sample("https://a", &[]);
        discount.title = "Get 50% OFF".into();
        repo.insert(&discount).await.unwrap();

        let mut plain = sample("https://b", &[]);
        plain.description = Some("fifty percent off".into());
        repo.insert(&plain).await.unwrap();

        let found = repo
            .search(&SearchFilters {
                query: Some("50% off".into()),
                ..SearchFilters::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].canonical_url, "https://a");

        let wildcard = repo
            .search(&SearchFilters {
                query: Some("%".into()),
                ..SearchFilters::default()
            })
            .await
            .unwrap();
        assert_eq!(wildcard.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_search_folds_non_ascii_case() {
        let db = setup().await;
        let repo = LibSqlConversationRepository::new(db.connection());

        let mut accented = sample("https://a", &[]);
        accented.title = "Élan vital".into();
        let stored = repo.insert(&accented).await.unwrap();

        let mut greek = sample("https://b", &[]);
        greek.content = "ΣΟΦΊΑ".into();
        repo.insert(&greek).await.unwrap();

        let search = |query: &str| SearchFilters {
            query: Some(query.into()),
            ..SearchFilters::default()
        };
        let found = repo.search(&search("élan")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].canonical_url, "https://a");
        let found = repo.search(&search("σοφία")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].canonical_url, "https://b");

        let mut renamed = stored;
        renamed.title = "Ärger".into();
        repo.update(&renamed).await.unwrap();
        assert!(repo.search(&search("élan")).await.unwrap().is_empty());
        assert_eq!(repo.search(&search("ÄRGER")).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_search_caps_at_one_hundred_newest() {
        let db = setup().await;
        let repo = LibSqlConversationRepository::new(db.connection());

        let base = Utc::now();
        for i in 0..105 {
            let mut conversation = sample(&format!("https://c/{i}"), &[]);
            conversation.updated_at = base + chrono::Duration::seconds(i);
            repo.insert(&conversation).await.unwrap();
        }

        let found = repo.search(&SearchFilters::default()).await.unwrap();
        assert_eq!(found.len(), 100);
        assert_eq!(found[0].canonical_url, "https://c/104");
        assert!(found.windows(2).all(|pair| pair[0].updated_at >= pair[1].updated_at));
    }
}
