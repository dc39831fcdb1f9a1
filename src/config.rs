use std::{env, path::PathBuf};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "data";
/// Roughly what a browser grants one origin for local storage.
const DEFAULT_STORAGE_QUOTA: usize = 5 * 1024 * 1024;
const DEFAULT_CRM_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub storage_quota: Option<usize>,
    pub crm: Option<CrmConfig>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let data_dir = lookup("APP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let storage_quota = match lookup("APP_STORAGE_QUOTA_BYTES").and_then(|v| v.parse().ok()) {
            Some(0) => None,
            Some(limit) => Some(limit),
            None => Some(DEFAULT_STORAGE_QUOTA),
        };

        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let crm = match (non_empty("CRM_URL"), non_empty("CRM_API_KEY")) {
            (Some(base_url), Some(api_key)) => Some(CrmConfig {
                base_url,
                api_key,
                timeout_secs: lookup("CRM_TIMEOUT_SECS")
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(DEFAULT_CRM_TIMEOUT_SECS),
            }),
            _ => None,
        };

        Self {
            port,
            data_dir,
            storage_quota,
            crm,
        }
    }
}
