use chrono::Utc;

use super::Reconciled;
use crate::db::CollectionStore;
use crate::error::{Error, Result};
use crate::models::{Collection, NewCollection};

/// Create a collection, or refresh icon and color of the one with the same name.
pub async fn reconcile_collection<S: CollectionStore>(
    store: &S,
    incoming: NewCollection,
) -> Result<Reconciled<Collection>> {
    incoming.validate()?;
    let incoming = incoming.normalized();

    if let Some(existing) = store.find_by_name(&incoming.name).await? {
        let updated = store.update(&merge_collection(existing, incoming)).await?;
        tracing::debug!(id = updated.id, name = %updated.name, "Updated collection");
        return Ok(Reconciled::Updated(updated));
    }

    let row = Collection {
        id: 0,
        name: incoming.name.clone(),
        icon: incoming.icon.clone(),
        color: incoming.color.clone(),
        created_at: incoming.created_at.unwrap_or_else(Utc::now),
    };

    match store.insert(&row).await {
        Ok(created) => {
            tracing::debug!(id = created.id, name = %created.name, "Created collection");
            Ok(Reconciled::Created(created))
        }
        Err(error) if error.is_conflict() => {
            let existing = store
                .find_by_name(&incoming.name)
                .await?
                .ok_or_else(|| Error::not_found("collection", &incoming.name))?;
            let updated = store.update(&merge_collection(existing, incoming)).await?;
            Ok(Reconciled::Updated(updated))
        }
        Err(error) => Err(error),
    }
}

/// Only icon and color follow the incoming record; id, name and `created_at` stay.
pub fn merge_collection(existing: Collection, incoming: NewCollection) -> Collection {
    Collection {
        icon: incoming.icon,
        color: incoming.color,
        ..existing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, LibSqlCollectionRepository};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reimport_by_name_only_touches_icon_and_color() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlCollectionRepository::new(db.connection());
        let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

        let first = reconcile_collection(
            &repo,
            NewCollection {
                icon: Some("📁".into()),
                created_at: Some(created_at),
                ..NewCollection::named("Research")
            },
        )
        .await
        .unwrap();
        assert!(first.is_created());

        let second = reconcile_collection(
            &repo,
            NewCollection {
                icon: Some("🔬".into()),
                color: Some("#00ff00".into()),
                created_at: Some(created_at + Duration::days(30)),
                ..NewCollection::named("Research")
            },
        )
        .await
        .unwrap();

        assert!(!second.is_created());
        let updated = second.into_inner();
        assert_eq!(updated.id, first.get().id);
        assert_eq!(updated.created_at, created_at);
        assert_eq!(updated.icon.as_deref(), Some("🔬"));
        assert_eq!(updated.color.as_deref(), Some("#00ff00"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blank_name_is_rejected() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlCollectionRepository::new(db.connection());

        let err = reconcile_collection(&repo, NewCollection::named(" "))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingField("name")));
        assert!(repo.list().await.unwrap().is_empty());
    }
}
