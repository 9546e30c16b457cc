//! Database migrations

use std::future::Future;

use libsql::{Connection, Value};

use super::rows;
use crate::error::Result;
use crate::search::fold_search_text;

/// Current schema version
const CURRENT_VERSION: i32 = 3;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        apply(conn, 1, V1).await?;
    }
    if version < 2 {
        apply(conn, 2, V2).await?;
    }
    if version < 3 {
        in_transaction(conn, 3, add_search_text(conn)).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Version 1: conversations, collections and snippets
const V1: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS collections (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        icon TEXT,
        color TEXT,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_collections_created ON collections(created_at DESC)",
    "CREATE TABLE IF NOT EXISTS conversations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        canonical_url TEXT NOT NULL UNIQUE,
        share_url TEXT,
        source TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        content TEXT NOT NULL,
        tags TEXT NOT NULL DEFAULT '[]',
        collection_id INTEGER REFERENCES collections(id) ON DELETE SET NULL,
        is_ignored INTEGER NOT NULL DEFAULT 0,
        version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1),
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_conversations_updated ON conversations(updated_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_conversations_source ON conversations(source)",
    "CREATE INDEX IF NOT EXISTS idx_conversations_collection ON conversations(collection_id)",
    "CREATE TABLE IF NOT EXISTS snippets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        source_url TEXT,
        source_conversation_id INTEGER,
        tags TEXT NOT NULL DEFAULT '[]',
        language TEXT,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_snippets_created ON snippets(created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_snippets_language ON snippets(language)",
    "CREATE INDEX IF NOT EXISTS idx_snippets_source_conversation ON snippets(source_conversation_id)",
];

/// Version 2: singleton settings row
const V2: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS settings (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        storage_mode TEXT NOT NULL DEFAULT 'local',
        beast_enabled_per_domain TEXT NOT NULL DEFAULT '{}',
        selective_mode_enabled INTEGER NOT NULL DEFAULT 0,
        dev_mode_enabled INTEGER NOT NULL DEFAULT 0,
        xpaths_by_domain TEXT NOT NULL DEFAULT '{}',
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
];

/// Version 3: lowercased search column on conversations, backfilled from existing rows
async fn add_search_text(conn: &Connection) -> Result<()> {
    conn.execute(
        "ALTER TABLE conversations ADD COLUMN search_text TEXT NOT NULL DEFAULT ''",
        (),
    )
    .await?;

    let mut rows = conn
        .query("SELECT id, title, description, content FROM conversations", ())
        .await?;
    let mut folded = Vec::new();
    while let Some(row) = rows.next().await? {
        let id: i64 = row.get(0)?;
        let title: String = row.get(1)?;
        let description = rows::opt_text(&row, 2)?;
        let content: String = row.get(3)?;
        folded.push((id, fold_search_text(&title, description.as_deref(), &content)));
    }
    drop(rows);

    for (id, text) in folded {
        conn.execute(
            "UPDATE conversations SET search_text = ?1 WHERE id = ?2",
            vec![Value::Text(text), Value::Integer(id)],
        )
        .await?;
    }
    Ok(())
}

/// Run one migration's statements plus its version marker in a transaction.
async fn apply(conn: &Connection, version: i32, statements: &[&str]) -> Result<()> {
    in_transaction(conn, version, async {
        for stmt in statements {
            conn.execute(stmt, ()).await?;
        }
        Ok(())
    })
    .await
}

/// Run `work` and record `version`, committing both or neither.
async fn in_transaction(
    conn: &Connection,
    version: i32,
    work: impl Future<Output = Result<()>>,
) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    let outcome: Result<()> = async {
        work.await?;
        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version]).await?;
        conn.execute("COMMIT", ()).await?;
        Ok(())
    }
    .await;

    if let Err(e) = outcome {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e);
    }

    tracing::info!("Migrated database to version {version}");
    Ok(())
}
