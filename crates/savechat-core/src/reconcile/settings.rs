use crate::db::SettingsStore;
use crate::error::Result;
use crate::models::Settings;

/// The stored settings, or the defaults when nothing has been written yet.
///
/// Reading never creates the row.
pub async fn current_settings<S: SettingsStore>(store: &S) -> Result<Settings> {
    Ok(store.load().await?.unwrap_or_default())
}

/// Replace the singleton settings row in full.
pub async fn replace_settings<S: SettingsStore>(store: &S, settings: &Settings) -> Result<Settings> {
    let saved = store.save(settings).await?;
    tracing::debug!(storage_mode = saved.storage_mode.as_str(), "Replaced settings");
    Ok(saved)
}
