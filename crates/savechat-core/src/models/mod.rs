//! Data models for SaveChat

mod collection;
mod conversation;
mod settings;
mod snippet;

pub use collection::{Collection, CollectionId, NewCollection};
pub use conversation::{Conversation, ConversationId, IgnoreUpdate, NewConversation};
pub use settings::{Settings, StorageMode, XPathConfig};
pub use snippet::{NewSnippet, Snippet, SnippetId};
