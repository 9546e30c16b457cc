//! Settings repository implementation

use chrono::Utc;
use libsql::{Connection, Row};

use super::rows;
use super::schema::{SETTINGS, SETTINGS_COLUMNS};
use crate::error::{Error, Result};
use crate::models::Settings;

/// Trait for settings storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SettingsStore {
    /// Load the stored settings row, if one has ever been written
    async fn load(&self) -> Result<Option<Settings>>;

    /// Replace the stored settings, creating the row on first write.
    ///
    /// `created_at` of an existing row is preserved; `updated_at` is refreshed.
    async fn save(&self, settings: &Settings) -> Result<Settings>;
}

/// libSQL implementation of `SettingsStore`
pub struct LibSqlSettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSettingsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_settings(row: &Row) -> Result<Settings> {
        let storage_mode = row.get::<String>(0)?.parse()?;
        Ok(Settings {
            storage_mode,
            beast_enabled_per_domain: rows::json(row, 1)?,
            selective_mode_enabled: rows::flag(row, 2)?,
            dev_mode_enabled: rows::flag(row, 3)?,
            xpaths_by_domain: rows::json(row, 4)?,
            created_at: Some(rows::timestamp(row, 5)?),
            updated_at: Some(rows::timestamp(row, 6)?),
        })
    }
}

impl SettingsStore for LibSqlSettingsRepository<'_> {
    async fn load(&self) -> Result<Option<Settings>> {
        let sql = format!("SELECT {SETTINGS_COLUMNS} FROM {SETTINGS} WHERE id = 1");
        let mut rows = self.conn.query(&sql, ()).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_settings(&row)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, settings: &Settings) -> Result<Settings> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO {SETTINGS} (id, {SETTINGS_COLUMNS}) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?6) \
             ON CONFLICT(id) DO UPDATE SET \
                 storage_mode = excluded.storage_mode, \
                 beast_enabled_per_domain = excluded.beast_enabled_per_domain, \
                 selective_mode_enabled = excluded.selective_mode_enabled, \
                 dev_mode_enabled = excluded.dev_mode_enabled, \
                 xpaths_by_domain = excluded.xpaths_by_domain, \
                 updated_at = excluded.updated_at"
        );
        self.conn
            .execute(
                &sql,
                vec![
                    rows::text_value(settings.storage_mode.as_str()),
                    rows::json_value(&settings.beast_enabled_per_domain)?,
                    rows::flag_value(settings.selective_mode_enabled),
                    rows::flag_value(settings.dev_mode_enabled),
                    rows::json_value(&settings.xpaths_by_domain)?,
                    rows::timestamp_value(now),
                ],
            )
            .await
            .map_err(Error::from_write)?;

        self.load()
            .await?
            .ok_or_else(|| Error::Database("Settings row missing after write".to_string()))
    }
}
