use crate::errors::StorageError;
use crate::models::AppSettings;
use crate::storage::{StorageBackend, SETTINGS_KEY};
use std::sync::Arc;
use tracing::{error, warn};

pub struct SettingsStore {
    backend: Arc<dyn StorageBackend>,
    current: AppSettings,
}

impl SettingsStore {
    pub async fn load(backend: Arc<dyn StorageBackend>) -> Self {
        let current = match backend.read(SETTINGS_KEY).await {
            Some(payload) => match serde_json::from_str(&payload) {
                Ok(settings) => settings,
                Err(err) => {
                    error!("failed to parse stored settings: {err}");
                    AppSettings::default()
                }
            },
            None => AppSettings::default(),
        };

        Self { backend, current }
    }

    pub fn current(&self) -> &AppSettings {
        &self.current
    }

    /// Keeps the previous settings when the write is rejected.
    pub async fn save(&mut self, settings: AppSettings) -> Result<&AppSettings, StorageError> {
        let payload = serde_json::to_string(&settings)?;
        if let Err(err) = self.backend.write(SETTINGS_KEY, &payload).await {
            warn!("failed to persist settings: {err}");
            return Err(err);
        }
        self.current = settings;
        Ok(&self.current)
    }

    pub async fn reset(&mut self) -> Result<(), StorageError> {
        self.backend.remove(SETTINGS_KEY).await?;
        self.current = AppSettings::default();
        Ok(())
    }
}
