//! Collection repository implementation

use libsql::{Connection, Row, Value};

use super::rows;
use super::schema::{COLLECTIONS, COLLECTION_COLUMNS};
use crate::error::{Error, Result};
use crate::models::{Collection, CollectionId};

/// Storage operations the collection reconciler depends on
#[allow(async_fn_in_trait)]
pub trait CollectionStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Collection>>;

    /// Insert a new row; `collection.id` is ignored. Duplicate names are `Conflict`.
    async fn insert(&self, collection: &Collection) -> Result<Collection>;

    /// Overwrite name, icon and color of the row with `collection.id`
    async fn update(&self, collection: &Collection) -> Result<Collection>;
}

/// libSQL implementation of `CollectionStore`
pub struct LibSqlCollectionRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlCollectionRepository<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: CollectionId) -> Result<Option<Collection>> {
        let sql = format!("SELECT {COLLECTION_COLUMNS} FROM {COLLECTIONS} WHERE id = ?1");
        let mut found = self.query_all(&sql, vec![Value::Integer(id)]).await?;
        Ok(found.pop())
    }

    /// All collections, newest first
    pub async fn list(&self) -> Result<Vec<Collection>> {
        let sql =
            format!("SELECT {COLLECTION_COLUMNS} FROM {COLLECTIONS} ORDER BY created_at DESC, id DESC");
        self.query_all(&sql, Vec::new()).await
    }

    /// Delete a collection. Conversations in it keep existing with no collection.
    pub async fn delete(&self, id: CollectionId) -> Result<()> {
        let sql = format!("DELETE FROM {COLLECTIONS} WHERE id = ?1");
        let changed = self.conn.execute(&sql, [id]).await?;
        if changed == 0 {
            return Err(Error::not_found("collection", id));
        }
        Ok(())
    }

    async fn reload(&self, id: CollectionId) -> Result<Collection> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::not_found("collection", id))
    }

    async fn query_all(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Collection>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut collections = Vec::new();
        while let Some(row) = rows.next().await? {
            collections.push(Self::parse_collection(&row)?);
        }
        Ok(collections)
    }

    fn parse_collection(row: &Row) -> Result<Collection> {
        Ok(Collection {
            id: row.get(0)?,
            name: row.get(1)?,
            icon: rows::opt_text(row, 2)?,
            color: rows::opt_text(row, 3)?,
            created_at: rows::timestamp(row, 4)?,
        })
    }
}

impl CollectionStore for LibSqlCollectionRepository<'_> {
    async fn find_by_name(&self, name: &str) -> Result<Option<Collection>> {
        let sql = format!("SELECT {COLLECTION_COLUMNS} FROM {COLLECTIONS} WHERE name = ?1");
        let mut found = self.query_all(&sql, vec![rows::text_value(name)]).await?;
        Ok(found.pop())
    }

    async fn insert(&self, collection: &Collection) -> Result<Collection> {
        let sql = format!(
            "INSERT INTO {COLLECTIONS} (name, icon, color, created_at) VALUES (?1, ?2, ?3, ?4)"
        );
        self.conn
            .execute(
                &sql,
                vec![
                    rows::text_value(&collection.name),
                    rows::opt_text_value(collection.icon.as_deref()),
                    rows::opt_text_value(collection.color.as_deref()),
                    rows::timestamp_value(collection.created_at),
                ],
            )
            .await
            .map_err(Error::from_write)?;
        self.reload(self.conn.last_insert_rowid()).await
    }

    async fn update(&self, collection: &Collection) -> Result<Collection> {
        let sql =
            format!("UPDATE {COLLECTIONS} SET name = ?1, icon = ?2, color = ?3 WHERE id = ?4");
        let changed = self
            .conn
            .execute(
                &sql,
                vec![
                    rows::text_value(&collection.name),
                    rows::opt_text_value(collection.icon.as_deref()),
                    rows::opt_text_value(collection.color.as_deref()),
                    Value::Integer(collection.id),
                ],
            )
            .await
            .map_err(Error::from_write)?;
        if changed == 0 {
            return Err(Error::not_found("collection", collection.id));
        }
        self.reload(collection.id).await
    }
}
