//! Snippet repository implementation

use libsql::{Connection, Row, Value};

use super::rows;
use super::schema::{SNIPPETS, SNIPPET_COLUMNS};
use crate::error::{Error, Result};
use crate::models::{NewSnippet, Snippet, SnippetId};
use crate::search::{build_snippet_listing, SnippetFilters};

/// libSQL-backed snippet storage
///
/// Snippets carry no natural key, so there is no reconciler in front of this
/// repository.
pub struct LibSqlSnippetRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSnippetRepository<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a new snippet. `created_at` defaults to now.
    pub async fn create(&self, snippet: &NewSnippet) -> Result<Snippet> {
        let sql = format!(
            "INSERT INTO {SNIPPETS} (title, content, source_url, source_conversation_id, tags, \
             language, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
        );
        let mut params = Self::column_values(snippet)?;
        params.push(rows::timestamp_value(
            snippet.created_at.unwrap_or_else(chrono::Utc::now),
        ));

        self.conn
            .execute(&sql, params)
            .await
            .map_err(Error::from_write)?;
        self.reload(self.conn.last_insert_rowid()).await
    }

    pub async fn get(&self, id: SnippetId) -> Result<Option<Snippet>> {
        let sql = format!("SELECT {SNIPPET_COLUMNS} FROM {SNIPPETS} WHERE id = ?1");
        let mut found = self.query_all(&sql, vec![Value::Integer(id)]).await?;
        Ok(found.pop())
    }

    /// Filtered listing, newest first
    pub async fn list(&self, filters: &SnippetFilters) -> Result<Vec<Snippet>> {
        let query = build_snippet_listing(filters);
        self.query_all(query.sql(), query.values()).await
    }

    pub async fn list_all(&self) -> Result<Vec<Snippet>> {
        let sql = format!("SELECT {SNIPPET_COLUMNS} FROM {SNIPPETS} ORDER BY id");
        self.query_all(&sql, Vec::new()).await
    }

    /// Replace every mutable field. `created_at` is kept.
    pub async fn update(&self, id: SnippetId, snippet: &NewSnippet) -> Result<Snippet> {
        let sql = format!(
            "UPDATE {SNIPPETS} SET title = ?1, content = ?2, source_url = ?3, \
             source_conversation_id = ?4, tags = ?5, language = ?6 WHERE id = ?7"
        );
        let mut params = Self::column_values(snippet)?;
        params.push(Value::Integer(id));

        let changed = self
            .conn
            .execute(&sql, params)
            .await
            .map_err(Error::from_write)?;
        if changed == 0 {
            return Err(Error::not_found("snippet", id));
        }
        self.reload(id).await
    }

    pub async fn delete(&self, id: SnippetId) -> Result<()> {
        let sql = format!("DELETE FROM {SNIPPETS} WHERE id = ?1");
        let changed = self.conn.execute(&sql, [id]).await?;
        if changed == 0 {
            return Err(Error::not_found("snippet", id));
        }
        Ok(())
    }

    async fn reload(&self, id: SnippetId) -> Result<Snippet> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::not_found("snippet", id))
    }

    async fn query_all(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Snippet>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut snippets = Vec::new();
        while let Some(row) = rows.next().await? {
            snippets.push(Self::parse_snippet(&row)?);
        }
        Ok(snippets)
    }

    fn parse_snippet(row: &Row) -> Result<Snippet> {
        Ok(Snippet {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            source_url: rows::opt_text(row, 3)?,
            source_conversation_id: rows::opt_integer(row, 4)?,
            tags: rows::json(row, 5)?,
            language: rows::opt_text(row, 6)?,
            created_at: rows::timestamp(row, 7)?,
        })
    }

    fn column_values(snippet: &NewSnippet) -> Result<Vec<Value>> {
        Ok(vec![
            rows::text_value(&snippet.title),
            rows::text_value(&snippet.content),
            rows::opt_text_value(snippet.source_url.as_deref()),
            rows::opt_integer_value(snippet.source_conversation_id),
            rows::json_value(&snippet.tags)?,
            rows::opt_text_value(snippet.language.as_deref()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    fn snippet(title: &str, language: Option<&str>, tags: &[&str]) -> NewSnippet {
        NewSnippet {
            language: language.map(ToString::to_string),
            tags: tags.iter().map(ToString::to_string).collect(),
            ..NewSnippet::new(title, "fn main() {}")
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_never_dedupes() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlSnippetRepository::new(db.connection());

        let first = repo.create(&snippet("same", None, &[])).await.unwrap();
        let second = repo.create(&snippet("same", None, &[])).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(repo.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_source_conversation_is_a_weak_reference() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlSnippetRepository::new(db.connection());

        let orphan = NewSnippet {
            source_conversation_id: Some(12_345),
            ..snippet("orphan", None, &[])
        };
        let stored = repo.create(&orphan).await.unwrap();
        assert_eq!(stored.source_conversation_id, Some(12_345));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_filters_by_language_and_tags() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlSnippetRepository::new(db.connection());

        repo.create(&snippet("a", Some("rust"), &["cli"])).await.unwrap();
        repo.create(&snippet("b", Some("rust"), &["web"])).await.unwrap();
        repo.create(&snippet("c", Some("go"), &["cli"])).await.unwrap();

        let found = repo
            .list(&SnippetFilters {
                language: Some("rust".into()),
                tags: vec!["cli".into()],
                source_conversation_id: None,
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "a");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_keeps_created_at() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlSnippetRepository::new(db.connection());

        let stored = repo.create(&snippet("a", None, &[])).await.unwrap();
        let updated = repo
            .update(stored.id, &snippet("renamed", Some("sql"), &["db"]))
            .await
            .unwrap();

        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.language.as_deref(), Some("sql"));
        assert_eq!(updated.created_at, stored.created_at);
        assert!(matches!(
            repo.update(999, &snippet("x", None, &[])).await,
            Err(Error::NotFound { .. })
        ));
    }
}
