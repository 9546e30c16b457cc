//! savechat-core - Core library for SaveChat
//!
//! Models, the libSQL store, the create-or-update reconcilers, the filtered
//! search builder and backup import/export used by the SaveChat server.

pub mod backup;
pub mod db;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod search;
pub mod services;
pub mod util;

pub use error::{Error, ErrorKind, Result};
pub use models::{
    Collection, Conversation, NewCollection, NewConversation, NewSnippet, Settings, Snippet,
};
pub use reconcile::Reconciled;
pub use services::DatabaseService;
