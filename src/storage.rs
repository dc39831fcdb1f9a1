use crate::errors::StorageError;
use async_trait::async_trait;
use std::{collections::HashMap, path::PathBuf};
use tokio::{fs, sync::Mutex};
use tracing::error;

pub const RECORDS_KEY: &str = "dashboard_records";
pub const SETTINGS_KEY: &str = "dashboard_settings";

/// Key-value store holding the device-local JSON documents.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Returns `None` when the key is absent or cannot be read.
    async fn read(&self, key: &str) -> Option<String>;
    async fn write(&self, key: &str, payload: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn check_quota(quota: Option<usize>, key: &str, payload: &str) -> Result<(), StorageError> {
    match quota {
        Some(limit) if payload.len() > limit => Err(StorageError::QuotaExceeded {
            key: key.to_string(),
            size: payload.len(),
            limit,
        }),
        _ => Ok(()),
    }
}

pub struct FileStorage {
    dir: PathBuf,
    quota: Option<usize>,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>, quota: Option<usize>) -> Self {
        Self {
            dir: dir.into(),
            quota,
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn read(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(payload) => Some(payload),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                error!("failed to read {key}: {err}");
                None
            }
        }
    }

    async fn write(&self, key: &str, payload: &str) -> Result<(), StorageError> {
        check_quota(self.quota, key, payload)?;
        fs::create_dir_all(&self.dir).await?;
        fs::write(self.path_for(key), payload).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)).await {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(limit: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota: Some(limit),
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn read(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    async fn write(&self, key: &str, payload: &str) -> Result<(), StorageError> {
        check_quota(self.quota, key, payload)?;
        self.entries
            .lock()
            .await
            .insert(key.to_string(), payload.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
