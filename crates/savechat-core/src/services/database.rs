//! Shared database service used by the HTTP layer and the backup importer.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::db::{
    Database, LibSqlCollectionRepository, LibSqlConversationRepository, LibSqlSettingsRepository,
    LibSqlSnippetRepository,
};
use crate::models::{
    Collection, CollectionId, Conversation, ConversationId, NewCollection, NewConversation,
    NewSnippet, Settings, Snippet, SnippetId,
};
use crate::reconcile::{self, Reconciled};
use crate::search::{SearchFilters, SnippetFilters};
use crate::{Error, Result};

/// Deadline applied to each operation unless configured otherwise.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Cloneable handle to the single store connection.
///
/// Every operation takes the connection lock, so reconciliation reads and
/// writes never interleave within this process. Lock acquisition counts
/// against the operation deadline.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    store_timeout: Duration,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!("Opening database at {}", db_path.display());
        let db = Database::open(&db_path).await?;
        Ok(Self::from_database(db))
    }

    /// Open an in-memory database service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self::from_database(db))
    }

    fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub const fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    async fn deadline<T>(
        &self,
        operation: &'static str,
        work: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.store_timeout, work)
            .await
            .map_err(|_| Error::Timeout {
                operation,
                after: self.store_timeout,
            })?
    }

    /// Check that the store answers queries.
    pub async fn ping(&self) -> Result<()> {
        self.deadline("ping", async {
            let db = self.db.lock().await;
            db.ping().await
        })
        .await
    }

    /// Create or update a conversation by canonical URL.
    pub async fn upsert_conversation(
        &self,
        incoming: NewConversation,
    ) -> Result<Reconciled<Conversation>> {
        self.deadline("upsert_conversation", async {
            let db = self.db.lock().await;
            let repo = LibSqlConversationRepository::new(db.connection());
            reconcile::reconcile_conversation(&repo, incoming).await
        })
        .await
    }

    pub async fn get_conversation(&self, id: ConversationId) -> Result<Conversation> {
        self.deadline("get_conversation", async {
            let db = self.db.lock().await;
            let repo = LibSqlConversationRepository::new(db.connection());
            repo.get(id)
                .await?
                .ok_or_else(|| Error::not_found("conversation", id))
        })
        .await
    }

    pub async fn get_conversation_by_url(&self, canonical_url: &str) -> Result<Conversation> {
        use crate::db::ConversationStore as _;

        self.deadline("get_conversation_by_url", async {
            let db = self.db.lock().await;
            let repo = LibSqlConversationRepository::new(db.connection());
            repo.find_by_canonical_url(canonical_url.trim())
                .await?
                .ok_or_else(|| Error::not_found("conversation", canonical_url))
        })
        .await
    }

    /// Search conversations, most recently updated first, at most 100.
    pub async fn search_conversations(&self, filters: &SearchFilters) -> Result<Vec<Conversation>> {
        self.deadline("search_conversations", async {
            let db = self.db.lock().await;
            let repo = LibSqlConversationRepository::new(db.connection());
            repo.search(filters).await
        })
        .await
    }

    /// Set or clear the ignore flag. The only way to clear it.
    pub async fn set_conversation_ignore(
        &self,
        id: ConversationId,
        ignore: bool,
    ) -> Result<Conversation> {
        self.deadline("set_conversation_ignore", async {
            let db = self.db.lock().await;
            let repo = LibSqlConversationRepository::new(db.connection());
            repo.set_ignore(id, ignore).await
        })
        .await
    }

    pub async fn delete_conversation(&self, id: ConversationId) -> Result<()> {
        self.deadline("delete_conversation", async {
            let db = self.db.lock().await;
            let repo = LibSqlConversationRepository::new(db.connection());
            repo.delete(id).await
        })
        .await
    }

    pub async fn create_snippet(&self, incoming: NewSnippet) -> Result<Snippet> {
        incoming.validate()?;
        let incoming = incoming.normalized();

        self.deadline("create_snippet", async {
            let db = self.db.lock().await;
            let repo = LibSqlSnippetRepository::new(db.connection());
            repo.create(&incoming).await
        })
        .await
    }

    pub async fn get_snippet(&self, id: SnippetId) -> Result<Snippet> {
        self.deadline("get_snippet", async {
            let db = self.db.lock().await;
            let repo = LibSqlSnippetRepository::new(db.connection());
            repo.get(id)
                .await?
                .ok_or_else(|| Error::not_found("snippet", id))
        })
        .await
    }

    /// List snippets, newest first, at most 100.
    pub async fn list_snippets(&self, filters: &SnippetFilters) -> Result<Vec<Snippet>> {
        self.deadline("list_snippets", async {
            let db = self.db.lock().await;
            let repo = LibSqlSnippetRepository::new(db.connection());
            repo.list(filters).await
        })
        .await
    }

    pub async fn update_snippet(&self, id: SnippetId, incoming: NewSnippet) -> Result<Snippet> {
        incoming.validate()?;
        let incoming = incoming.normalized();

        self.deadline("update_snippet", async {
            let db = self.db.lock().await;
            let repo = LibSqlSnippetRepository::new(db.connection());
            repo.update(id, &incoming).await
        })
        .await
    }

    pub async fn delete_snippet(&self, id: SnippetId) -> Result<()> {
        self.deadline("delete_snippet", async {
            let db = self.db.lock().await;
            let repo = LibSqlSnippetRepository::new(db.connection());
            repo.delete(id).await
        })
        .await
    }

    /// List collections, newest first.
    pub async fn list_collections(&self) -> Result<Vec<Collection>> {
        self.deadline("list_collections", async {
            let db = self.db.lock().await;
            let repo = LibSqlCollectionRepository::new(db.connection());
            repo.list().await
        })
        .await
    }

    pub async fn get_collection(&self, id: CollectionId) -> Result<Collection> {
        self.deadline("get_collection", async {
            let db = self.db.lock().await;
            let repo = LibSqlCollectionRepository::new(db.connection());
            repo.get(id)
                .await?
                .ok_or_else(|| Error::not_found("collection", id))
        })
        .await
    }

    /// Create a collection or refresh icon and color of the one with the same name.
    pub async fn upsert_collection(
        &self,
        incoming: NewCollection,
    ) -> Result<Reconciled<Collection>> {
        self.deadline("upsert_collection", async {
            let db = self.db.lock().await;
            let repo = LibSqlCollectionRepository::new(db.connection());
            reconcile::reconcile_collection(&repo, incoming).await
        })
        .await
    }

    /// Rename and restyle a collection by id. Taking another collection's name is a conflict.
    pub async fn update_collection(
        &self,
        id: CollectionId,
        incoming: NewCollection,
    ) -> Result<Collection> {
        use crate::db::CollectionStore as _;

        incoming.validate()?;
        let incoming = incoming.normalized();

        self.deadline("update_collection", async {
            let db = self.db.lock().await;
            let repo = LibSqlCollectionRepository::new(db.connection());
            let existing = repo
                .get(id)
                .await?
                .ok_or_else(|| Error::not_found("collection", id))?;
            repo.update(&Collection {
                name: incoming.name,
                icon: incoming.icon,
                color: incoming.color,
                ..existing
            })
            .await
        })
        .await
    }

    /// Delete a collection; its conversations are kept without a collection.
    pub async fn delete_collection(&self, id: CollectionId) -> Result<()> {
        self.deadline("delete_collection", async {
            let db = self.db.lock().await;
            let repo = LibSqlCollectionRepository::new(db.connection());
            repo.delete(id).await
        })
        .await
    }

    /// Current settings, or defaults when none were ever saved.
    pub async fn get_settings(&self) -> Result<Settings> {
        self.deadline("get_settings", async {
            let db = self.db.lock().await;
            let repo = LibSqlSettingsRepository::new(db.connection());
            reconcile::current_settings(&repo).await
        })
        .await
    }

    pub async fn replace_settings(&self, settings: &Settings) -> Result<Settings> {
        self.deadline("replace_settings", async {
            let db = self.db.lock().await;
            let repo = LibSqlSettingsRepository::new(db.connection());
            reconcile::replace_settings(&repo, settings).await
        })
        .await
    }

    /// Read every entity under one lock so the snapshot is consistent.
    pub(crate) async fn snapshot(
        &self,
    ) -> Result<(Vec<Conversation>, Vec<Snippet>, Vec<Collection>, Settings)> {
        self.deadline("export_backup", async {
            let db = self.db.lock().await;
            let conn = db.connection();
            let conversations = LibSqlConversationRepository::new(conn).list_all().await?;
            let snippets = LibSqlSnippetRepository::new(conn).list_all().await?;
            let mut collections = LibSqlCollectionRepository::new(conn).list().await?;
            collections.reverse();
            let settings = reconcile::current_settings(&LibSqlSettingsRepository::new(conn)).await?;
            Ok((conversations, snippets, collections, settings))
        })
        .await
    }
}
