//! Database layer for SaveChat

mod collection_repository;
mod connection;
mod conversation_repository;
mod migrations;
mod rows;
pub(crate) mod schema;
mod settings_repository;
mod snippet_repository;

pub use collection_repository::{CollectionStore, LibSqlCollectionRepository};
pub use connection::Database;
pub use conversation_repository::{ConversationStore, LibSqlConversationRepository};
pub use settings_repository::{LibSqlSettingsRepository, SettingsStore};
pub use snippet_repository::LibSqlSnippetRepository;
