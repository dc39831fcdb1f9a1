use crate::errors::GatewayError;
use crate::gateway::CrmGateway;
use crate::records::RecordStore;
use crate::settings::SettingsStore;
use crate::storage::StorageBackend;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub records: Arc<Mutex<RecordStore>>,
    pub settings: Arc<Mutex<SettingsStore>>,
    pub gateway: Option<Arc<CrmGateway>>,
}

impl AppState {
    pub async fn load(
        backend: Arc<dyn StorageBackend>,
        gateway: Option<CrmGateway>,
        today: NaiveDate,
    ) -> Self {
        let records = RecordStore::load(backend.clone(), today).await;
        let settings = SettingsStore::load(backend).await;

        Self {
            records: Arc::new(Mutex::new(records)),
            settings: Arc::new(Mutex::new(settings)),
            gateway: gateway.map(Arc::new),
        }
    }

    pub fn gateway(&self) -> Result<&CrmGateway, GatewayError> {
        self.gateway.as_deref().ok_or(GatewayError::NotConfigured)
    }
}
