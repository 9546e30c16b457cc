use chrono::Utc;

use super::Reconciled;
use crate::db::ConversationStore;
use crate::error::{Error, Result};
use crate::models::{Conversation, NewConversation};

/// Create or update a conversation keyed by `canonical_url`.
///
/// Validation runs before any store call. If another writer creates the same
/// canonical URL between the lookup and the insert, the record is applied as
/// an update to the winner's row instead.
pub async fn reconcile_conversation<S: ConversationStore>(
    store: &S,
    incoming: NewConversation,
) -> Result<Reconciled<Conversation>> {
    incoming.validate()?;
    let incoming = incoming.normalized();

    if let Some(existing) = store.find_by_canonical_url(&incoming.canonical_url).await? {
        return update(store, existing, incoming).await;
    }

    let now = Utc::now();
    let row = incoming.clone().into_unsaved(
        incoming.version.filter(|version| *version >= 1).unwrap_or(1),
        incoming.ignore.unwrap_or(false),
        incoming.created_at.unwrap_or(now),
        incoming.updated_at.unwrap_or(now),
    );

    match store.insert(&row).await {
        Ok(created) => {
            tracing::debug!(
                id = created.id,
                canonical_url = %created.canonical_url,
                "Created conversation"
            );
            Ok(Reconciled::Created(created))
        }
        Err(error) if error.is_conflict() => {
            tracing::debug!(
                canonical_url = %incoming.canonical_url,
                "Conversation created concurrently; applying as update"
            );
            let existing = store
                .find_by_canonical_url(&incoming.canonical_url)
                .await?
                .ok_or_else(|| Error::not_found("conversation", &incoming.canonical_url))?;
            update(store, existing, incoming).await
        }
        Err(error) => Err(error),
    }
}

async fn update<S: ConversationStore>(
    store: &S,
    existing: Conversation,
    incoming: NewConversation,
) -> Result<Reconciled<Conversation>> {
    let merged = merge_conversation(existing, incoming)?;
    let updated = store.update(&merged).await?;
    tracing::debug!(
        id = updated.id,
        version = updated.version,
        "Updated conversation"
    );
    Ok(Reconciled::Updated(updated))
}

/// Apply an incoming record to the stored row.
///
/// Identity and `created_at` come from `existing`; the version goes up by one;
/// `ignore` stays true once set; every other field is taken from `incoming`.
///
/// Fails with `InvalidInput` when the stored version cannot be incremented.
pub fn merge_conversation(
    existing: Conversation,
    incoming: NewConversation,
) -> Result<Conversation> {
    let version = existing.version.checked_add(1).ok_or_else(|| {
        Error::InvalidInput(format!(
            "conversation {} is at the maximum version",
            existing.id
        ))
    })?;
    Ok(Conversation {
        id: existing.id,
        canonical_url: existing.canonical_url,
        share_url: incoming.share_url,
        source: incoming.source,
        title: incoming.title,
        description: incoming.description,
        content: incoming.content,
        tags: incoming.tags,
        collection_id: incoming.collection_id,
        ignore: existing.ignore || incoming.ignore.unwrap_or(false),
        version,
        created_at: existing.created_at,
        updated_at: Utc::now(),
    })
}
